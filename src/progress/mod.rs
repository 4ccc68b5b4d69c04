//! Progress synchronizer and level arithmetic.
//!
//! [`ProgressSync::complete_module`] writes one partial row update (completed
//! set plus XP award) and then reloads the session from the store. The local
//! snapshot is never mutated optimistically, and a failed write is logged and
//! left alone: no retry, no rollback of the quiz result.

use crate::auth::AuthController;
use crate::backend::{ProgressUpdate, ServiceError, UserStore};
use crate::catalog::Catalog;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

pub const XP_PER_LEVEL: u64 = 1_000;

/// Level implied by a cumulative XP total; level 1 starts at 0 XP.
#[must_use]
pub fn level_for_xp(xp: u64) -> u32 {
    u32::try_from(xp / XP_PER_LEVEL)
        .unwrap_or(u32::MAX)
        .saturating_add(1)
}

/// Progress through the current level, 0-99.
#[must_use]
pub fn level_progress_percent(xp: u64) -> u8 {
    u8::try_from((xp % XP_PER_LEVEL) / 10).unwrap_or(99)
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("progress update failed: {0}")]
    Update(#[source] ServiceError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nobody is signed in; nothing was sent.
    SignedOut,
    /// The module id is not in the catalog; nothing was sent.
    UnknownModule,
    /// The module is already in the user's completed set; nothing was sent.
    AlreadyCompleted,
    /// The update was stored; `xp` is the new total written.
    Synced { xp: u64 },
}

pub struct ProgressSync {
    catalog: Arc<Catalog>,
    auth: Arc<AuthController>,
    store: Arc<dyn UserStore>,
}

impl ProgressSync {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, auth: Arc<AuthController>, store: Arc<dyn UserStore>) -> Self {
        Self {
            catalog,
            auth,
            store,
        }
    }

    /// Records a completed module for the signed-in user.
    ///
    /// # Errors
    /// Returns [`SyncError::Update`] when the store rejects the write. The
    /// error is already logged; callers are not expected to show it.
    #[instrument(skip(self))]
    pub async fn complete_module(&self, module_id: &str) -> Result<SyncOutcome, SyncError> {
        let Some(user) = self.auth.current_user() else {
            debug!("no user signed in, skipping progress sync");
            return Ok(SyncOutcome::SignedOut);
        };
        let Some((_, module)) = self.catalog.module(module_id) else {
            warn!("module not in catalog, skipping progress sync");
            return Ok(SyncOutcome::UnknownModule);
        };
        if user.has_completed(module_id) {
            debug!("module already completed, no award");
            return Ok(SyncOutcome::AlreadyCompleted);
        }

        let mut completed_modules = user.completed_modules.clone();
        completed_modules.insert(module_id.to_string());
        let update = ProgressUpdate {
            completed_modules,
            xp: user.xp.saturating_add(u64::from(module.xp)),
        };

        if let Err(err) = self.store.update_progress(&user.id, &update).await {
            error!(error = %err, "failed to sync progress");
            return Err(SyncError::Update(err));
        }
        info!(award = module.xp, total = update.xp, "progress synced");

        if let Err(err) = self.auth.load_user().await {
            warn!(error = %err, "failed to reload user after progress sync");
        }

        Ok(SyncOutcome::Synced { xp: update.xp })
    }
}
