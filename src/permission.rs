use crate::library::PhotoLibrary;
use crate::models::AccessStatus;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Idempotent "ensure access, then proceed" gate
///
/// At most one authorization check is in flight at a time: a reentrant call
/// parks on the serialization lock and, once the first check resolves,
/// reuses the stored decision instead of prompting again.
pub struct PermissionGate<L> {
    library: Arc<L>,
    check: Mutex<()>,
}

impl<L: PhotoLibrary> PermissionGate<L> {
    pub fn new(library: Arc<L>) -> Self {
        Self {
            library,
            check: Mutex::new(()),
        }
    }

    /// Resolve the library authorization state, prompting the user if it has
    /// never been decided.
    ///
    /// Returns the raw four-way status; callers that only need a binary
    /// decision collapse it with [`AccessStatus::is_granted`]. A denied
    /// outcome is not retried here; the caller re-invokes after the user
    /// changes system settings.
    pub async fn ensure_access(&self) -> AccessStatus {
        let _in_flight = self.check.lock().await;
        let status = self.library.authorization_status();
        match status {
            AccessStatus::NotDetermined => {
                log::debug!("library access not determined, prompting");
                let decided = self.library.request_authorization().await;
                log::info!("library access decided: {}", decided);
                decided
            }
            status => {
                log::debug!("library access already decided: {}", status);
                status
            }
        }
    }
}
