pub mod calibration_store;
pub mod color_mask;
pub mod color_profile;
pub mod command_encoder;
pub mod frame;
pub mod frame_source;
pub mod overlay;
pub mod pixel;
pub mod region;
pub mod region_extractor;
pub mod snapshot;
pub mod transport;
pub mod zone_classifier;
