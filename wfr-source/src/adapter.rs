use crate::{
    date_range::DateWindow, error::AdapterError, observation::RawSamples, point::SamplePoint,
    source::Aggregation,
};

/// One sampling request: which band, over which window, reduced how.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRequest<'a> {
    pub collection: &'a str,
    pub band: &'a str,
    pub window: DateWindow,
    pub aggregation: Aggregation,
    /// Nominal pixel size in metres used for sampling
    pub scale_m: u32,
    /// Tiling factor hint; larger values trade speed for memory on big point sets
    pub tile_scale: u32,
}

/// Access to an upstream raster catalogue.
///
/// Implementations sample a single (first/nearest) pixel per point from the
/// window composite. A call that fails is reported as an [`AdapterError`];
/// the caller decides whether the failure is recoverable.
#[allow(async_fn_in_trait)]
pub trait SourceAdapter {
    /// Confirm the data-source session exists before any search starts.
    async fn authenticate(&self) -> Result<(), AdapterError>;

    /// Number of images of `collection`/`band` inside the window.
    async fn count(
        &self,
        collection: &str,
        band: &str,
        window: &DateWindow,
    ) -> Result<usize, AdapterError>;

    /// Aggregate the window and sample it at every point.
    async fn query(
        &self,
        request: &SampleRequest<'_>,
        points: &[SamplePoint],
    ) -> Result<RawSamples, AdapterError>;
}
