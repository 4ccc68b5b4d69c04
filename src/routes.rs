//! Navigation surface: view selection by path.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Auth,
    Profile,
    Topic(String),
    NotFound(String),
}

impl Route {
    /// Maps a path to a route. Trailing slashes are ignored; anything
    /// unrecognised becomes [`Route::NotFound`].
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim();
        let normalized = trimmed.trim_end_matches('/');
        match normalized {
            "" => Self::Dashboard,
            "/auth" => Self::Auth,
            "/profile" => Self::Profile,
            _ => match normalized.strip_prefix("/topic/") {
                Some(id) if !id.is_empty() && !id.contains('/') => Self::Topic(id.to_string()),
                _ => Self::NotFound(trimmed.to_string()),
            },
        }
    }

    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Dashboard => "/".to_string(),
            Self::Auth => "/auth".to_string(),
            Self::Profile => "/profile".to_string(),
            Self::Topic(id) => format!("/topic/{id}"),
            Self::NotFound(path) => path.clone(),
        }
    }

    /// Views that need a signed-in user.
    #[must_use]
    pub const fn requires_user(&self) -> bool {
        matches!(self, Self::Profile)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
