//! In-memory photo library
//!
//! A self-contained [`PhotoLibrary`] implementation backed by process
//! memory. Hosts can use it as a reference while wiring up a real library;
//! the crate's own tests run against it.

use crate::library::{ImageData, PhotoLibrary};
use crate::models::{AccessStatus, AssetMetadata, AssetRef, Coordinate, GeoLocation};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

/// One asset held by the in-memory library
#[derive(Debug, Clone)]
pub struct MemoryAsset {
    pub metadata: AssetMetadata,
    /// Original-resolution bytes; `None` makes every fetch fail
    pub image: Option<ImageData>,
}

impl MemoryAsset {
    pub fn new(metadata: AssetMetadata) -> Self {
        Self {
            metadata,
            image: None,
        }
    }

    /// Asset with a geotag and no further metadata
    pub fn geotagged(id: &str, latitude: f64, longitude: f64) -> Self {
        Self::new(AssetMetadata {
            asset: AssetRef::from(id),
            location: Some(GeoLocation {
                coordinate: Coordinate {
                    latitude,
                    longitude,
                },
                altitude: None,
                course: -1.0,
            }),
            pixel_width: None,
            pixel_height: None,
        })
    }

    /// Asset without location data
    pub fn untagged(id: &str) -> Self {
        Self::new(AssetMetadata {
            asset: AssetRef::from(id),
            location: None,
            pixel_width: None,
            pixel_height: None,
        })
    }

    pub fn with_image(mut self, bytes: ImageData) -> Self {
        self.image = Some(bytes);
        self
    }
}

struct LibraryState {
    status: AccessStatus,
    /// What the simulated user answers at the authorization prompt
    prompt_response: AccessStatus,
    assets: HashMap<AssetRef, MemoryAsset>,
    /// Visible subset under a limited grant; `None` = everything visible
    visible: Option<HashSet<AssetRef>>,
    prompt_delay: Duration,
    fetch_delay: Duration,
}

/// In-memory [`PhotoLibrary`] implementation
pub struct MemoryLibrary {
    state: Mutex<LibraryState>,
    changes: watch::Sender<u64>,
    prompts: AtomicUsize,
    limited_picker_requests: AtomicUsize,
    settings_requests: AtomicUsize,
}

impl Default for MemoryLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLibrary {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            state: Mutex::new(LibraryState {
                status: AccessStatus::NotDetermined,
                prompt_response: AccessStatus::Full,
                assets: HashMap::new(),
                visible: None,
                prompt_delay: Duration::ZERO,
                fetch_delay: Duration::ZERO,
            }),
            changes,
            prompts: AtomicUsize::new(0),
            limited_picker_requests: AtomicUsize::new(0),
            settings_requests: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, LibraryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the ambient authorization state directly (no prompt involved)
    pub fn set_status(&self, status: AccessStatus) {
        self.state().status = status;
    }

    /// Script the answer the user will give at the next prompt
    pub fn set_prompt_response(&self, status: AccessStatus) {
        self.state().prompt_response = status;
    }

    /// Delay the prompt resolution, to let callers race against it
    pub fn set_prompt_delay(&self, delay: Duration) {
        self.state().prompt_delay = delay;
    }

    /// Delay every image fetch by this much
    pub fn set_fetch_delay(&self, delay: Duration) {
        self.state().fetch_delay = delay;
    }

    pub fn insert_asset(&self, asset: MemoryAsset) {
        let key = asset.metadata.asset.clone();
        self.state().assets.insert(key, asset);
    }

    /// Limit visibility to exactly the given references and notify observers
    pub fn restrict_visibility(&self, refs: &[AssetRef]) {
        self.state().visible = Some(refs.iter().cloned().collect());
        self.notify_change();
    }

    /// Extend the visible subset (a limited-picker grant) and notify observers
    pub fn grant_visibility(&self, refs: &[AssetRef]) {
        {
            let mut state = self.state();
            match state.visible.as_mut() {
                Some(visible) => visible.extend(refs.iter().cloned()),
                // no restriction in place, everything is visible already
                None => {}
            }
        }
        self.notify_change();
    }

    /// Bump the change generation without touching any asset
    pub fn notify_change(&self) {
        self.changes.send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    /// Number of authorization prompts shown so far
    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    /// Number of limited-picker presentation requests received
    pub fn limited_picker_requests(&self) -> usize {
        self.limited_picker_requests.load(Ordering::SeqCst)
    }

    /// Number of open-settings requests received
    pub fn settings_requests(&self) -> usize {
        self.settings_requests.load(Ordering::SeqCst)
    }

    fn is_visible(state: &LibraryState, asset: &AssetRef) -> bool {
        match (&state.status, &state.visible) {
            (AccessStatus::Limited, Some(visible)) => visible.contains(asset),
            (AccessStatus::Limited, None) => true,
            (status, _) => status.is_granted(),
        }
    }
}

impl PhotoLibrary for MemoryLibrary {
    fn authorization_status(&self) -> AccessStatus {
        self.state().status
    }

    async fn request_authorization(&self) -> AccessStatus {
        let pending = {
            let state = self.state();
            if state.status == AccessStatus::NotDetermined {
                self.prompts.fetch_add(1, Ordering::SeqCst);
                Some((state.prompt_delay, state.prompt_response))
            } else {
                None
            }
        };

        match pending {
            Some((delay, response)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                self.state().status = response;
                log::debug!("authorization prompt answered: {}", response);
                response
            }
            None => self.state().status,
        }
    }

    async fn resolve_assets(&self, refs: &[AssetRef]) -> Vec<AssetMetadata> {
        let state = self.state();
        if !state.status.is_granted() {
            return Vec::new();
        }
        refs.iter()
            .filter_map(|r| {
                if Self::is_visible(&state, r) {
                    state.assets.get(r).map(|a| a.metadata.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    async fn fetch_image(&self, asset: &AssetRef) -> Option<ImageData> {
        let (delay, image) = {
            let state = self.state();
            let image = if Self::is_visible(&state, asset) {
                state.assets.get(asset).and_then(|a| a.image.clone())
            } else {
                None
            };
            (state.fetch_delay, image)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        image
    }

    fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn present_limited_picker(&self) {
        self.limited_picker_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn open_settings(&self) {
        self.settings_requests.fetch_add(1, Ordering::SeqCst);
    }
}
