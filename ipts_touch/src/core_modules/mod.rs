pub mod blob;
pub mod blob_detector;
pub mod contact;
pub mod frame_decoder;
pub mod geometry;
pub mod heatmap;
pub mod tracker;
