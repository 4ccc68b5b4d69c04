//! Built-in achievements and their unlock rules.

use crate::backend::User;
use crate::catalog::Catalog;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    /// Cumulative XP of at least `n`.
    Xp(u64),
    /// At least `n` completed modules.
    Modules(usize),
    /// At least `n` topics with every module completed.
    Topics(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub requirement: Requirement,
}

pub static ACHIEVEMENTS: [Achievement; 3] = [
    Achievement {
        id: "first-steps",
        title: "First Steps",
        description: "Complete your first module",
        icon: "Trophy",
        requirement: Requirement::Modules(1),
    },
    Achievement {
        id: "knowledge-seeker",
        title: "Knowledge Seeker",
        description: "Reach Level 5",
        icon: "Star",
        requirement: Requirement::Xp(4_000),
    },
    Achievement {
        id: "expert",
        title: "Expert",
        description: "Complete all modules in a topic",
        icon: "Award",
        requirement: Requirement::Topics(1),
    },
];

impl Requirement {
    #[must_use]
    pub fn is_met(&self, user: &User, catalog: &Catalog) -> bool {
        match *self {
            Self::Xp(xp) => user.xp >= xp,
            Self::Modules(count) => {
                // Ids the catalog no longer knows do not count.
                let known = user
                    .completed_modules
                    .iter()
                    .filter(|id| catalog.module(id).is_some())
                    .count();
                known >= count
            }
            Self::Topics(count) => {
                let mastered = catalog
                    .topics()
                    .iter()
                    .filter(|topic| topic.is_mastered(&user.completed_modules))
                    .count();
                mastered >= count
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AchievementStatus {
    pub achievement: &'static Achievement,
    pub unlocked: bool,
}

/// Status of every built-in achievement for `user`. An achievement counts as
/// unlocked when its id is stored on the user or its requirement is met.
#[must_use]
pub fn evaluate(user: &User, catalog: &Catalog) -> Vec<AchievementStatus> {
    ACHIEVEMENTS
        .iter()
        .map(|achievement| AchievementStatus {
            achievement,
            unlocked: user.achievements.contains(achievement.id)
                || achievement.requirement.is_met(user, catalog),
        })
        .collect()
}
