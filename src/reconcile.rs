use crate::extract::records_from_assets;
use crate::library::PhotoLibrary;
use crate::models::{AssetRef, RawPick, SelectionRecord};
use crate::service::PickerError;
use crate::store::SelectionStore;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Where a partial-access recovery flow currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    /// Pick completed under partial access with unresolved items
    Idle,
    /// Recovery prompt is up; waiting for cancel or expand-access
    AwaitingUserChoice,
    /// Subscribed to library changes, re-resolving on each notification
    ObservingLibraryChanges,
    /// All originally picked items resolved; terminal
    Resolved,
    /// The user gave up on the flow; terminal
    Abandoned,
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReconcileState::Idle => "idle",
            ReconcileState::AwaitingUserChoice => "awaiting user choice",
            ReconcileState::ObservingLibraryChanges => "observing library changes",
            ReconcileState::Resolved => "resolved",
            ReconcileState::Abandoned => "abandoned",
        };
        f.write_str(s)
    }
}

/// Recovery flow for picks that are invisible under a partial grant
///
/// Holds the original pick set and waits for the user to either give up or
/// widen the grant through the host's limited-access picker, in which case
/// it re-attempts resolution on every library-change notification until all
/// picks are visible. No timeout is imposed on the wait.
pub struct AccessReconciler<L> {
    library: Arc<L>,
    store: Arc<SelectionStore>,
    picks: Vec<RawPick>,
    state: watch::Sender<ReconcileState>,
}

impl<L: PhotoLibrary> AccessReconciler<L> {
    pub(crate) fn new(library: Arc<L>, store: Arc<SelectionStore>, picks: Vec<RawPick>) -> Self {
        let (state, _) = watch::channel(ReconcileState::Idle);
        Self {
            library,
            store,
            picks,
            state,
        }
    }

    /// Surface the recovery prompt
    pub(crate) fn begin(&self) {
        self.transition(ReconcileState::AwaitingUserChoice);
    }

    pub fn state(&self) -> ReconcileState {
        *self.state.borrow()
    }

    /// Observe state transitions; the receiver's current value is the
    /// present state
    pub fn watch_state(&self) -> watch::Receiver<ReconcileState> {
        self.state.subscribe()
    }

    /// The picks this flow is trying to resolve
    pub fn picks(&self) -> &[RawPick] {
        &self.picks
    }

    /// The user cancelled the recovery prompt; emits an empty sequence and
    /// leaves the store untouched.
    pub fn abandon(&self) -> Vec<SelectionRecord> {
        match self.state() {
            ReconcileState::Idle | ReconcileState::AwaitingUserChoice => {
                self.transition(ReconcileState::Abandoned);
            }
            state => {
                log::warn!("abandon ignored in state: {}", state);
            }
        }
        Vec::new()
    }

    /// The user chose to expand access.
    ///
    /// Asks the host to present its limited-access picker surface, then
    /// observes library-change notifications, re-attempting resolution of
    /// the original picks on each one. Returns once every pick is visible,
    /// with the extracted records committed to the store; the change
    /// subscription is dropped exactly then. Errs only if the host stops
    /// delivering notifications; dropping the returned future cancels the
    /// observation.
    pub async fn expand_access(&self) -> Result<Vec<SelectionRecord>, PickerError> {
        if self.state() != ReconcileState::AwaitingUserChoice {
            log::warn!("expand_access ignored in state: {}", self.state());
            return Ok(Vec::new());
        }

        // subscribe before the picker surface goes up so no grant is missed
        let mut changes = self.library.subscribe_changes();
        self.library.present_limited_picker();
        self.transition(ReconcileState::ObservingLibraryChanges);

        let refs: Vec<AssetRef> = self.picks.iter().map(|p| p.asset.clone()).collect();
        loop {
            if changes.changed().await.is_err() {
                return Err(PickerError::LibraryUnavailable(
                    "change notifications ended while awaiting partial-access picks".to_string(),
                ));
            }

            let assets = self.library.resolve_assets(&refs).await;
            if assets.len() == self.picks.len() {
                let records = records_from_assets(assets);
                self.transition(ReconcileState::Resolved);
                log::info!(
                    "partial-access picks resolved, {} of {} carry location data",
                    records.len(),
                    self.picks.len()
                );
                if !records.is_empty() {
                    self.store.replace(records.clone());
                }
                return Ok(records);
            }
            log::debug!(
                "library changed, {} of {} picks visible",
                assets.len(),
                self.picks.len()
            );
        }
    }

    fn transition(&self, next: ReconcileState) {
        log::debug!("reconciler: {} -> {}", self.state(), next);
        self.state.send_replace(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryAsset, MemoryLibrary};
    use crate::models::AccessStatus;
    use std::time::Duration;

    fn limited_library(visible: &[&str]) -> Arc<MemoryLibrary> {
        let library = Arc::new(MemoryLibrary::new());
        library.insert_asset(MemoryAsset::geotagged("a", 40.7, -74.0));
        library.insert_asset(MemoryAsset::geotagged("b", 51.5, -0.1));
        library.set_status(AccessStatus::Limited);
        let refs: Vec<AssetRef> = visible.iter().map(|id| AssetRef::from(*id)).collect();
        library.restrict_visibility(&refs);
        library
    }

    fn reconciler(
        library: &Arc<MemoryLibrary>,
        store: &Arc<SelectionStore>,
        picks: &[&str],
    ) -> AccessReconciler<MemoryLibrary> {
        AccessReconciler::new(
            Arc::clone(library),
            Arc::clone(store),
            picks.iter().map(|id| RawPick::from(*id)).collect(),
        )
    }

    #[tokio::test]
    async fn begins_idle_then_awaits_choice() {
        let library = limited_library(&["a"]);
        let store = Arc::new(SelectionStore::new());
        let flow = reconciler(&library, &store, &["a", "b"]);

        assert_eq!(flow.state(), ReconcileState::Idle);
        flow.begin();
        assert_eq!(flow.state(), ReconcileState::AwaitingUserChoice);
    }

    #[tokio::test]
    async fn abandon_emits_empty_and_leaves_store_alone() {
        let library = limited_library(&["a"]);
        let store = Arc::new(SelectionStore::new());
        let flow = reconciler(&library, &store, &["a", "b"]);
        flow.begin();

        assert!(flow.abandon().is_empty());
        assert_eq!(flow.state(), ReconcileState::Abandoned);
        assert!(store.is_empty());
        assert_eq!(library.limited_picker_requests(), 0);
    }

    #[tokio::test]
    async fn expand_access_observes_until_all_picks_resolve() {
        let library = limited_library(&["a"]);
        let store = Arc::new(SelectionStore::new());
        let flow = Arc::new(reconciler(&library, &store, &["a", "b"]));
        flow.begin();

        let mut states = flow.watch_state();
        let task = {
            let flow = Arc::clone(&flow);
            tokio::spawn(async move { flow.expand_access().await })
        };

        // the picker surface goes up and observation starts
        states
            .wait_for(|s| *s == ReconcileState::ObservingLibraryChanges)
            .await
            .unwrap();
        assert_eq!(library.limited_picker_requests(), 1);

        // an unrelated change leaves the flow observing
        library.notify_change();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(flow.state(), ReconcileState::ObservingLibraryChanges);

        // widening the grant resolves both picks
        library.grant_visibility(&[AssetRef::from("b")]);
        let records = task.await.unwrap().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(flow.state(), ReconcileState::Resolved);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn resolution_still_drops_items_without_location() {
        let library = Arc::new(MemoryLibrary::new());
        library.insert_asset(MemoryAsset::geotagged("a", 40.7, -74.0));
        library.insert_asset(MemoryAsset::untagged("c"));
        library.set_status(AccessStatus::Limited);
        library.restrict_visibility(&[AssetRef::from("a")]);

        let store = Arc::new(SelectionStore::new());
        let flow = Arc::new(reconciler(&library, &store, &["a", "c"]));
        flow.begin();

        let task = {
            let flow = Arc::clone(&flow);
            tokio::spawn(async move { flow.expand_access().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        library.grant_visibility(&[AssetRef::from("c")]);
        let records = task.await.unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].asset, AssetRef::from("a"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn expand_access_is_a_noop_after_abandon() {
        let library = limited_library(&["a"]);
        let store = Arc::new(SelectionStore::new());
        let flow = reconciler(&library, &store, &["a", "b"]);
        flow.begin();
        flow.abandon();

        let records = flow.expand_access().await.unwrap();
        assert!(records.is_empty());
        assert_eq!(flow.state(), ReconcileState::Abandoned);
        assert_eq!(library.limited_picker_requests(), 0);
    }
}
