use crate::library::{ImageData, PhotoLibrary};
use crate::store::SelectionStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::AbortHandle;
use uuid::Uuid;

/// Opaque handle for one outstanding image fetch
///
/// Valid from issuance until the delivery callback fires or the fetch is
/// cancelled; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchToken(Uuid);

impl FetchToken {
    fn new() -> Self {
        FetchToken(Uuid::new_v4())
    }
}

type PendingRequests = Arc<Mutex<HashMap<FetchToken, AbortHandle>>>;

/// Per-identifier asynchronous image retrieval with explicit cancellation
///
/// Each `request` issues one underlying fetch and registers it under a
/// fresh token; the entry is removed synchronously on completion or
/// cancellation, so the mapping always reflects exactly the in-flight
/// fetches. Concurrent requests for the same id are not deduplicated.
pub struct FetchCache<L> {
    library: Arc<L>,
    store: Arc<SelectionStore>,
    pending: PendingRequests,
}

impl<L: PhotoLibrary> FetchCache<L> {
    pub fn new(library: Arc<L>, store: Arc<SelectionStore>) -> Self {
        Self {
            library,
            store,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(pending: &PendingRequests) -> MutexGuard<'_, HashMap<FetchToken, AbortHandle>> {
        pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start an image fetch for the record with the given id.
    ///
    /// If the id is not in the store the callback fires immediately with
    /// `None` and no token is created. Otherwise the callback fires exactly
    /// once with the fetched bytes, or `None` on failure; a cancelled fetch
    /// either never fires or fires with `None`.
    pub fn request(
        &self,
        id: Uuid,
        callback: impl FnOnce(Option<ImageData>) + Send + 'static,
    ) -> Option<FetchToken> {
        let record = match self.store.get(&id) {
            Some(record) => record,
            None => {
                log::debug!("image request for unknown id {}", id);
                callback(None);
                return None;
            }
        };

        let token = FetchToken::new();
        let library = Arc::clone(&self.library);
        let pending = Arc::clone(&self.pending);

        // The registry lock is held across the spawn so the task's own
        // removal cannot run before the entry exists.
        let mut map = Self::lock(&self.pending);
        let handle = tokio::spawn(async move {
            let bytes = library.fetch_image(&record.asset).await;
            // removed before the callback fires: a callback that requests
            // again never observes its own stale entry
            let still_pending = Self::lock(&pending).remove(&token).is_some();
            if still_pending {
                callback(bytes);
            }
        });
        map.insert(token, handle.abort_handle());
        Some(token)
    }

    /// Cancel an outstanding fetch.
    ///
    /// Best-effort: a fetch that already produced data may still deliver
    /// it. The token is gone from the pending set when this returns.
    pub fn cancel(&self, token: FetchToken) {
        let handle = Self::lock(&self.pending).remove(&token);
        if let Some(handle) = handle {
            log::debug!("cancelling image fetch {:?}", token);
            handle.abort();
        }
    }

    pub fn is_pending(&self, token: FetchToken) -> bool {
        Self::lock(&self.pending).contains_key(&token)
    }

    pub fn pending_count(&self) -> usize {
        Self::lock(&self.pending).len()
    }
}
