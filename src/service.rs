use crate::extract::{records_from_assets, SelectionExtractor};
use crate::fetch::{FetchCache, FetchToken};
use crate::library::{ImageData, PhotoLibrary};
use crate::models::{AccessStatus, AssetRef, PickerConfig, RawPick, SelectionRecord};
use crate::permission::PermissionGate;
use crate::reconcile::AccessReconciler;
use crate::store::SelectionStore;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Error type for the picking flow
#[derive(Debug)]
pub enum PickerError {
    /// Library access was not granted; the user must change system settings
    AccessDenied(AccessStatus),
    /// The host library stopped delivering change notifications
    LibraryUnavailable(String),
}

impl std::fmt::Display for PickerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PickerError::AccessDenied(status) => write!(f, "Photos access denied: {}", status),
            PickerError::LibraryUnavailable(msg) => write!(f, "Photo library unavailable: {}", msg),
        }
    }
}

impl std::error::Error for PickerError {}

/// How a picking session ended
pub enum PickOutcome<L> {
    /// Records extracted and committed; may be empty if nothing was picked
    /// or nothing carried location data
    Completed(Vec<SelectionRecord>),
    /// Partial grant with picks not yet visible; drive the reconciler
    /// (already awaiting the user's choice) to finish the session
    NeedsReconciliation(AccessReconciler<L>),
}

/// Application-level picking model
///
/// Owns the permission gate, extractor, selection store and fetch cache,
/// and exposes the inbound surface the host UI drives: begin a picking
/// session, hand back the raw picks, observe the store, request and cancel
/// image loads.
pub struct PhotoPickerService<L> {
    config: PickerConfig,
    library: Arc<L>,
    gate: PermissionGate<L>,
    extractor: SelectionExtractor<L>,
    store: Arc<SelectionStore>,
    cache: FetchCache<L>,
}

impl<L: PhotoLibrary> PhotoPickerService<L> {
    pub fn new(config: PickerConfig, library: Arc<L>) -> Self {
        let store = Arc::new(SelectionStore::new());
        Self {
            gate: PermissionGate::new(Arc::clone(&library)),
            extractor: SelectionExtractor::new(Arc::clone(&library)),
            cache: FetchCache::new(Arc::clone(&library), Arc::clone(&store)),
            store,
            library,
            config,
        }
    }

    /// Resolve library access, prompting at most once per install
    pub async fn ensure_access(&self) -> AccessStatus {
        self.gate.ensure_access().await
    }

    /// Start a picking session.
    ///
    /// `Ok(status)` means access is granted and the host should present its
    /// picker surface; `Err(AccessDenied)` means the UI should offer the
    /// settings hand-off instead.
    pub async fn begin_picking(&self) -> Result<AccessStatus, PickerError> {
        let status = self.gate.ensure_access().await;
        if status.is_granted() {
            Ok(status)
        } else {
            Err(PickerError::AccessDenied(status))
        }
    }

    /// Complete a picking session with the host picker's raw results.
    ///
    /// Re-checks authorization (the grant may have changed while the picker
    /// was up), then extracts and commits. An empty pick set completes
    /// immediately and leaves the previous selection in place. Under a
    /// partial grant with picks that are not all visible, the session is
    /// handed back as [`PickOutcome::NeedsReconciliation`].
    pub async fn finish_picking(
        &self,
        mut picks: Vec<RawPick>,
    ) -> Result<PickOutcome<L>, PickerError> {
        if picks.is_empty() {
            log::debug!("picking session ended without picks");
            return Ok(PickOutcome::Completed(Vec::new()));
        }

        let limit = self.config.selection_limit;
        if limit > 0 && picks.len() > limit {
            log::warn!(
                "picking session returned {} items, truncating to the limit of {}",
                picks.len(),
                limit
            );
            picks.truncate(limit);
        }

        let status = self.gate.ensure_access().await;
        match status {
            AccessStatus::Full => {
                let records = self.extractor.extract(&picks).await;
                self.commit(&records);
                Ok(PickOutcome::Completed(records))
            }
            AccessStatus::Limited => {
                let refs: Vec<AssetRef> = picks.iter().map(|p| p.asset.clone()).collect();
                let assets = self.library.resolve_assets(&refs).await;
                if assets.len() == picks.len() {
                    let records = records_from_assets(assets);
                    self.commit(&records);
                    Ok(PickOutcome::Completed(records))
                } else {
                    log::info!(
                        "partial access: {} of {} picks visible, starting reconciliation",
                        assets.len(),
                        picks.len()
                    );
                    let reconciler = AccessReconciler::new(
                        Arc::clone(&self.library),
                        Arc::clone(&self.store),
                        picks,
                    );
                    reconciler.begin();
                    Ok(PickOutcome::NeedsReconciliation(reconciler))
                }
            }
            status => Err(PickerError::AccessDenied(status)),
        }
    }

    /// The most recently committed selection
    pub fn snapshot(&self) -> Vec<SelectionRecord> {
        self.store.snapshot()
    }

    /// Observe selection generations as they commit
    pub fn subscribe(&self) -> watch::Receiver<Vec<SelectionRecord>> {
        self.store.subscribe()
    }

    /// Start an image load for one selection; see [`FetchCache::request`]
    pub fn request_image(
        &self,
        id: Uuid,
        callback: impl FnOnce(Option<ImageData>) + Send + 'static,
    ) -> Option<FetchToken> {
        self.cache.request(id, callback)
    }

    /// Cancel an outstanding image load; see [`FetchCache::cancel`]
    pub fn cancel_image_request(&self, token: FetchToken) {
        self.cache.cancel(token);
    }

    /// Ask the host to open the system settings screen (the recovery path
    /// after a denied access check). Fire-and-forget.
    pub fn open_settings(&self) {
        self.library.open_settings();
    }

    // An all-dropped or empty result set leaves the previous selection in
    // place; replace only commits real generations.
    fn commit(&self, records: &[SelectionRecord]) {
        if records.is_empty() {
            log::debug!("no records extracted, selection unchanged");
        } else {
            self.store.replace(records.to_vec());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryAsset, MemoryLibrary};
    use crate::reconcile::ReconcileState;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn seeded_library() -> Arc<MemoryLibrary> {
        let library = Arc::new(MemoryLibrary::new());
        library.insert_asset(
            MemoryAsset::geotagged("a", 40.7, -74.0).with_image(vec![0xAA]),
        );
        library.insert_asset(
            MemoryAsset::geotagged("b", 51.5, -0.1).with_image(vec![0xBB]),
        );
        library.insert_asset(MemoryAsset::untagged("c"));
        library
    }

    fn service(library: &Arc<MemoryLibrary>) -> PhotoPickerService<MemoryLibrary> {
        PhotoPickerService::new(PickerConfig::default(), Arc::clone(library))
    }

    fn picks(ids: &[&str]) -> Vec<RawPick> {
        ids.iter().map(|id| RawPick::from(*id)).collect()
    }

    #[tokio::test]
    async fn full_access_session_commits_geotagged_picks() {
        let library = seeded_library();
        let model = service(&library);

        assert_eq!(model.begin_picking().await.unwrap(), AccessStatus::Full);

        let outcome = model.finish_picking(picks(&["a", "b", "c"])).await.unwrap();
        let records = match outcome {
            PickOutcome::Completed(records) => records,
            PickOutcome::NeedsReconciliation(_) => panic!("unexpected reconciliation"),
        };

        assert_eq!(records.len(), 2);
        let snapshot_ids: HashSet<_> = model.snapshot().iter().map(|r| r.id).collect();
        let record_ids: HashSet<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(snapshot_ids, record_ids);
    }

    #[tokio::test]
    async fn denied_access_is_surfaced_before_and_after_picking() {
        let library = seeded_library();
        library.set_prompt_response(AccessStatus::Denied);
        let model = service(&library);

        assert!(matches!(
            model.begin_picking().await,
            Err(PickerError::AccessDenied(AccessStatus::Denied))
        ));
        assert!(matches!(
            model.finish_picking(picks(&["a"])).await,
            Err(PickerError::AccessDenied(AccessStatus::Denied))
        ));
        assert!(model.snapshot().is_empty());

        model.open_settings();
        assert_eq!(library.settings_requests(), 1);
    }

    #[tokio::test]
    async fn empty_session_keeps_previous_selection() {
        let library = seeded_library();
        library.set_status(AccessStatus::Full);
        let model = service(&library);

        model.finish_picking(picks(&["a"])).await.unwrap();
        assert_eq!(model.snapshot().len(), 1);

        let outcome = model.finish_picking(Vec::new()).await.unwrap();
        assert!(matches!(outcome, PickOutcome::Completed(ref r) if r.is_empty()));
        assert_eq!(model.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn all_untagged_session_keeps_previous_selection() {
        let library = seeded_library();
        library.set_status(AccessStatus::Full);
        let model = service(&library);

        model.finish_picking(picks(&["a", "b"])).await.unwrap();
        assert_eq!(model.snapshot().len(), 2);

        model.finish_picking(picks(&["c"])).await.unwrap();
        assert_eq!(model.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn limited_access_with_all_picks_visible_completes() {
        let library = seeded_library();
        library.set_status(AccessStatus::Limited);
        library.restrict_visibility(&[AssetRef::from("a"), AssetRef::from("b")]);
        let model = service(&library);

        let outcome = model.finish_picking(picks(&["a", "b"])).await.unwrap();
        assert!(matches!(outcome, PickOutcome::Completed(ref r) if r.len() == 2));
        assert_eq!(model.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn limited_access_with_hidden_picks_reconciles_end_to_end() {
        let library = seeded_library();
        library.set_status(AccessStatus::Limited);
        library.restrict_visibility(&[AssetRef::from("a")]);
        let model = service(&library);

        let outcome = model.finish_picking(picks(&["a", "b"])).await.unwrap();
        let reconciler = match outcome {
            PickOutcome::NeedsReconciliation(reconciler) => Arc::new(reconciler),
            PickOutcome::Completed(_) => panic!("expected reconciliation"),
        };
        assert_eq!(reconciler.state(), ReconcileState::AwaitingUserChoice);
        assert!(model.snapshot().is_empty());

        let mut states = reconciler.watch_state();
        let task = {
            let reconciler = Arc::clone(&reconciler);
            tokio::spawn(async move { reconciler.expand_access().await })
        };
        states
            .wait_for(|s| *s == ReconcileState::ObservingLibraryChanges)
            .await
            .unwrap();

        library.grant_visibility(&[AssetRef::from("b")]);
        let records = task.await.unwrap().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(model.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn selection_limit_truncates_oversized_pick_sets() {
        let library = seeded_library();
        library.set_status(AccessStatus::Full);
        let model = PhotoPickerService::new(
            PickerConfig { selection_limit: 1 },
            Arc::clone(&library),
        );

        let outcome = model.finish_picking(picks(&["a", "b"])).await.unwrap();
        assert!(matches!(outcome, PickOutcome::Completed(ref r) if r.len() == 1));
    }

    #[tokio::test]
    async fn image_requests_flow_through_the_cache() {
        let library = seeded_library();
        library.set_status(AccessStatus::Full);
        let model = service(&library);

        model.finish_picking(picks(&["a"])).await.unwrap();
        let id = model.snapshot()[0].id;

        let (tx, rx) = oneshot::channel();
        let token = model
            .request_image(id, move |bytes| {
                let _ = tx.send(bytes);
            })
            .expect("record is in the store");
        assert_eq!(rx.await.unwrap(), Some(vec![0xAA]));

        // a fresh request can be cancelled; its callback stays silent
        library.set_fetch_delay(Duration::from_secs(5));
        let token2 = model
            .request_image(id, |_| panic!("cancelled request delivered"))
            .expect("record is in the store");
        assert_ne!(token, token2);
        model.cancel_image_request(token2);
    }
}
