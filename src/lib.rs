//! # Photo Picker
//!
//! A photo selection and authorization library with geotag extraction and
//! on-demand image loading.
//!
//! This crate provides the model side of a "place your photos somewhere"
//! feature: the user picks photos from their library, the picks are
//! resolved to geotagged selection records, and each record can later be
//! re-resolved to full image data. It covers:
//! - Permission-gated picking with a recovery path for partial library
//!   access
//! - Geotag extraction (items without location data are dropped)
//! - An observable, atomically replaced selection store
//! - A keyed async image fetch cache with explicit cancellation
//!
//! ## Platform Separation
//!
//! The actual photo library (picker UI, authorization prompts, asset
//! storage, networking) belongs to the host application, which implements
//! the [`PhotoLibrary`] trait. An in-memory implementation,
//! [`MemoryLibrary`], ships with the crate as a reference host.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use photo_picker::{PhotoPickerService, PickerConfig, MemoryLibrary};
//! use std::sync::Arc;
//!
//! let library = Arc::new(MemoryLibrary::new());
//! let service = PhotoPickerService::new(PickerConfig::default(), library);
//!
//! let status = service.begin_picking().await?;
//! // present the host picker, then:
//! let outcome = service.finish_picking(raw_picks).await?;
//! ```

pub mod extract;
pub mod fetch;
pub mod library;
pub mod memory;
pub mod models;
pub mod permission;
pub mod reconcile;
pub mod service;
pub mod store;

pub use extract::SelectionExtractor;
pub use fetch::{FetchCache, FetchToken};
pub use library::{ImageData, PhotoLibrary};
pub use memory::{MemoryAsset, MemoryLibrary};
pub use models::{
    AccessStatus, AssetMetadata, AssetRef, Coordinate, GeoLocation, PickerConfig, RawPick,
    SelectionRecord,
};
pub use permission::PermissionGate;
pub use reconcile::{AccessReconciler, ReconcileState};
pub use service::{PhotoPickerService, PickOutcome, PickerError};
pub use store::SelectionStore;
