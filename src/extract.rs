use crate::library::PhotoLibrary;
use crate::models::{AssetMetadata, AssetRef, RawPick, SelectionRecord};
use std::sync::Arc;
use uuid::Uuid;

/// Resolves raw picks into selection records
///
/// Pure apart from the host metadata lookups: items without location data
/// are dropped silently (missing geotags are the common case, not an
/// error), and every accepted item gets a freshly assigned id, so repeated
/// extraction of the same asset always produces new records.
pub struct SelectionExtractor<L> {
    library: Arc<L>,
}

impl<L: PhotoLibrary> SelectionExtractor<L> {
    pub fn new(library: Arc<L>) -> Self {
        Self { library }
    }

    pub async fn extract(&self, picks: &[RawPick]) -> Vec<SelectionRecord> {
        let refs: Vec<AssetRef> = picks.iter().map(|p| p.asset.clone()).collect();
        let assets = self.library.resolve_assets(&refs).await;
        let records = records_from_assets(assets);
        log::debug!(
            "extracted {} of {} picked items with location data",
            records.len(),
            picks.len()
        );
        records
    }
}

/// Turn resolved metadata into records, dropping items without a geotag
pub(crate) fn records_from_assets(assets: Vec<AssetMetadata>) -> Vec<SelectionRecord> {
    assets
        .into_iter()
        .filter_map(|asset| {
            let location = asset.location?;
            Some(SelectionRecord {
                id: Uuid::new_v4(),
                asset: asset.asset,
                coordinate: location.coordinate,
                altitude: location.altitude,
                heading: normalize_heading(location.course),
                pixel_width: asset.pixel_width,
                pixel_height: asset.pixel_height,
            })
        })
        .collect()
}

/// Map a raw course into [0, 360); negative or non-finite means unknown
fn normalize_heading(course: f64) -> f64 {
    if !course.is_finite() || course < 0.0 {
        0.0
    } else {
        course.rem_euclid(360.0)
    }
}
