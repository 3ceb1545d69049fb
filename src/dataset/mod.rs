//! Dataset management: raw features, labels and their binned form.

pub mod bin_mapper;
#[allow(clippy::module_inception)]
pub mod dataset;

pub use bin_mapper::BinMapper;
pub use dataset::Dataset;
