use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Latitude/longitude pair (WGS 84 degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Capture location as resolved by the host library
///
/// `course` keeps the host convention: degrees of travel direction,
/// negative when the source did not record one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub coordinate: Coordinate,
    pub altitude: Option<f64>,
    pub course: f64,
}

/// Opaque stable reference permanently naming an asset in the host library
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(id: impl Into<String>) -> Self {
        AssetRef(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetRef {
    fn from(id: &str) -> Self {
        AssetRef(id.to_string())
    }
}

/// One item returned by the host's selection UI, before metadata resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPick {
    pub asset: AssetRef,
}

impl RawPick {
    pub fn new(asset: impl Into<AssetRef>) -> Self {
        RawPick {
            asset: asset.into(),
        }
    }
}

impl From<&str> for RawPick {
    fn from(id: &str) -> Self {
        RawPick::new(AssetRef::from(id))
    }
}

/// Metadata the host library resolves for a single asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub asset: AssetRef,
    pub location: Option<GeoLocation>,
    pub pixel_width: Option<u32>,
    pub pixel_height: Option<u32>,
}

/// One accepted photo, immutable once extracted
///
/// Records are only ever created for assets with a geotag; `id` is assigned
/// at extraction time and never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub id: Uuid,
    pub asset: AssetRef,
    pub coordinate: Coordinate,
    pub altitude: Option<f64>,
    /// Direction of travel at capture, degrees in [0, 360); zero if unknown
    pub heading: f64,
    pub pixel_width: Option<u32>,
    pub pixel_height: Option<u32>,
}

/// Library authorization state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessStatus {
    /// The user has not been asked yet
    NotDetermined,
    /// Access is blocked by policy (e.g. parental controls)
    Restricted,
    /// The user declined access
    Denied,
    /// Full library access
    Full,
    /// Access to a user-chosen subset of the library
    Limited,
}

impl AccessStatus {
    /// Binary collapse for callers that only need granted/denied
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessStatus::Full | AccessStatus::Limited)
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessStatus::NotDetermined => "not determined",
            AccessStatus::Restricted => "restricted",
            AccessStatus::Denied => "denied",
            AccessStatus::Full => "full",
            AccessStatus::Limited => "limited",
        };
        f.write_str(s)
    }
}

/// Configuration for the picking flow
#[derive(Debug, Clone)]
pub struct PickerConfig {
    /// Maximum number of photos accepted per picking session (0 = unlimited)
    pub selection_limit: usize,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self { selection_limit: 0 }
    }
}
