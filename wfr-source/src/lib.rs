//! Core types and source adapters for raster-derived environmental series.
//!
//! A run samples three satellite products (land-surface temperature,
//! vegetation index, cumulative precipitation) at a fixed set of points.
//! Each product publishes on its own cadence, so [`search`] walks backward
//! from "now" until the adapter reports an observation window.

pub mod adapter;
pub mod date_range;
pub mod error;
pub mod fixture;
pub mod observation;
pub mod point;
pub mod search;
pub mod source;

#[cfg(feature = "api")]
pub mod api;

pub use adapter::{SampleRequest, SourceAdapter};
pub use error::{AcquisitionError, AdapterError, ConfigError};
pub use observation::ObservationWindow;
pub use point::{SamplePoint, Site};
pub use source::{SourceSpec, Variable};
