pub(crate) mod empty_loader;
pub(crate) mod exr_loader;
pub(crate) mod header;
pub(crate) mod loader;
pub(crate) mod pfm_loader;
pub(crate) mod raster_loader;
