//! Host photo-library boundary
//!
//! The embedding application owns the actual photo library (picker UI,
//! authorization prompts, asset storage). The core only talks to it through
//! this trait; all data shapes beyond the resolved metadata fields are
//! opaque to us.

use crate::models::{AccessStatus, AssetMetadata, AssetRef};
use std::future::Future;
use tokio::sync::watch;

/// Image bytes as delivered by the host, format opaque to the core
pub type ImageData = Vec<u8>;

/// The host photo-library service
///
/// Async methods return `impl Future + Send` so generic callers can spawn
/// the fetches onto worker tasks.
pub trait PhotoLibrary: Send + Sync + 'static {
    /// Current authorization state, without prompting.
    fn authorization_status(&self) -> AccessStatus;

    /// Prompt the user for library access.
    ///
    /// The host stores the decision; a prompt is only ever shown while the
    /// status is [`AccessStatus::NotDetermined`], so at most one prompt per
    /// install. Returns the status after the decision.
    fn request_authorization(&self) -> impl Future<Output = AccessStatus> + Send;

    /// Resolve metadata for the given references, one entry per reference,
    /// in request order.
    ///
    /// References that are unknown or not visible under the current grant
    /// are omitted, so the result may be shorter than the input.
    fn resolve_assets(
        &self,
        refs: &[AssetRef],
    ) -> impl Future<Output = Vec<AssetMetadata>> + Send;

    /// Fetch original-resolution image data for one asset.
    ///
    /// Network access is permitted; may be slow. `None` means the data is
    /// not available, whatever the reason.
    fn fetch_image(&self, asset: &AssetRef) -> impl Future<Output = Option<ImageData>> + Send;

    /// Subscribe to library-change notifications.
    ///
    /// The watched value is a change generation the host bumps on every
    /// library mutation (grants included); the value itself carries no
    /// meaning beyond "something changed".
    fn subscribe_changes(&self) -> watch::Receiver<u64>;

    /// Ask the host to present its limited-access management surface.
    /// Fire-and-forget; any outcome arrives as a change notification.
    fn present_limited_picker(&self);

    /// Ask the host to open the system settings screen. Fire-and-forget.
    fn open_settings(&self);
}
