pub mod advertisement;
pub mod format5;
pub mod generator;

pub use advertisement::AdvertisementFrame;
pub use format5::{decode, encode, Format5Data, Format5Payload, MeasurementCounters};
pub use generator::generate;
