// THEORY:
// The two firmware generations this code has been run against disagree on a
// handful of calibration constants (baseline offset, overlap ratio) and on
// whether palm rejection and temporal tracking are active at all. Rather than
// baking either set in, every tunable lives in `TouchConfig`, which is handed
// to the pipeline once at construction and never mutated afterwards.
//
// The capacity fields (`max_blobs`, `max_blob_pixels`, `max_contacts`) can only
// lower the compile-time capacities of the fixed-size containers used per
// frame; `validate` enforces that.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core_modules::blob::{MAX_BLOB_PIXELS, MAX_BLOBS};
use crate::core_modules::contact::MAX_CONTACT_SLOTS;
use crate::core_modules::frame_decoder::HID_HEADER_LEN;
use crate::error::ConfigError;

/// Size of one device report in the observed protocol generation.
pub const DEFAULT_FRAME_SIZE: usize = 7485;
pub const DEFAULT_GRID_WIDTH: usize = 64;
pub const DEFAULT_GRID_HEIGHT: usize = 44;

/// Configuration for the `TouchPipeline`, allowing for tunable behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchConfig {
    /// Width of the sensor heatmap in cells.
    pub grid_width: usize,
    /// Height of the sensor heatmap in cells.
    pub grid_height: usize,
    /// Exact size of one device report in bytes.
    pub frame_size: usize,
    /// Per-firmware noise floor subtracted from every inverted sensor value.
    pub baseline: u8,
    /// A blob whose box overlaps another by more than this fraction of its own
    /// area is dropped in favour of the larger one.
    pub overlap_ratio: f32,
    /// Any blob wider than this (grid units) suppresses every contact in the frame.
    pub palm_diameter: f32,
    /// Blobs at or below this diameter are noise.
    pub min_diameter: f32,
    /// Converts accumulated intensity into an approximate contact diameter.
    pub diameter_divisor: f32,
    /// Number of multi-touch slots reported to the input sink.
    pub max_contacts: usize,
    pub max_blobs: usize,
    pub max_blob_pixels: usize,
    /// Grid units to device units for emitted positions and sizes.
    pub output_scale: f32,
    pub palm_rejection: bool,
    /// When off, ids are assigned from scratch every frame.
    pub tracking: bool,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            grid_width: DEFAULT_GRID_WIDTH,
            grid_height: DEFAULT_GRID_HEIGHT,
            frame_size: DEFAULT_FRAME_SIZE,
            baseline: 100,
            overlap_ratio: 0.25,
            palm_diameter: 10.0,
            min_diameter: 0.5,
            diameter_divisor: 100.0,
            max_contacts: 6,
            max_blobs: MAX_BLOBS,
            max_blob_pixels: MAX_BLOB_PIXELS,
            output_scale: 16.0,
            palm_rejection: true,
            tracking: true,
        }
    }
}

impl TouchConfig {
    /// The earlier firmware variant: higher noise tolerance, no palm rejection,
    /// no frame-to-frame identity.
    pub fn simple() -> Self {
        Self {
            baseline: 90,
            overlap_ratio: 0.5,
            palm_rejection: false,
            tracking: false,
            ..Self::default()
        }
    }

    /// Number of bytes in one heatmap section body.
    pub fn grid_len(&self) -> usize {
        self.grid_width * self.grid_height
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(ConfigError::Invalid("grid dimensions must be non-zero".into()));
        }
        if self.grid_width > 256 || self.grid_height > 256 {
            return Err(ConfigError::Invalid(format!(
                "grid {}x{} exceeds 8-bit cell coordinates",
                self.grid_width, self.grid_height
            )));
        }
        if self.frame_size < HID_HEADER_LEN {
            return Err(ConfigError::Invalid(format!(
                "frame_size {} cannot hold the {HID_HEADER_LEN}-byte report header",
                self.frame_size
            )));
        }
        if !(1..=MAX_BLOBS).contains(&self.max_blobs) {
            return Err(ConfigError::Invalid(format!("max_blobs must be in 1..={MAX_BLOBS}")));
        }
        if !(1..=MAX_BLOB_PIXELS).contains(&self.max_blob_pixels) {
            return Err(ConfigError::Invalid(format!(
                "max_blob_pixels must be in 1..={MAX_BLOB_PIXELS}"
            )));
        }
        if !(1..=MAX_CONTACT_SLOTS).contains(&self.max_contacts) {
            return Err(ConfigError::Invalid(format!(
                "max_contacts must be in 1..={MAX_CONTACT_SLOTS}"
            )));
        }
        for (name, value) in [
            ("overlap_ratio", self.overlap_ratio),
            ("palm_diameter", self.palm_diameter),
            ("diameter_divisor", self.diameter_divisor),
            ("output_scale", self.output_scale),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive and finite")));
            }
        }
        if !self.min_diameter.is_finite() || self.min_diameter < 0.0 {
            return Err(ConfigError::Invalid("min_diameter must be non-negative".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_tracking_variant() {
        let config = TouchConfig::default();
        assert_eq!(config.baseline, 100);
        assert_eq!(config.overlap_ratio, 0.25);
        assert!(config.palm_rejection && config.tracking);
        assert_eq!(config.grid_len(), 2816);
        config.validate().expect("default config is valid");
    }

    #[test]
    fn simple_variant_differs_only_in_calibration() {
        let simple = TouchConfig::simple();
        assert_eq!(simple.baseline, 90);
        assert_eq!(simple.overlap_ratio, 0.5);
        assert!(!simple.palm_rejection && !simple.tracking);
        assert_eq!(simple.grid_width, 64);
        simple.validate().expect("simple config is valid");
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = TouchConfig::from_json_str(r#"{ "baseline": 90, "tracking": false }"#)
            .expect("partial config parses");
        assert_eq!(config.baseline, 90);
        assert!(!config.tracking);
        assert_eq!(config.max_contacts, 6);
    }

    #[test]
    fn rejects_capacities_beyond_fixed_storage() {
        let config = TouchConfig { max_blobs: 17, ..TouchConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = TouchConfig { max_blob_pixels: 0, ..TouchConfig::default() };
        assert!(config.validate().is_err());

        let config = TouchConfig { max_contacts: 11, ..TouchConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_degenerate_geometry_parameters() {
        let config = TouchConfig { diameter_divisor: 0.0, ..TouchConfig::default() };
        assert!(config.validate().is_err());

        let config = TouchConfig { overlap_ratio: f32::NAN, ..TouchConfig::default() };
        assert!(config.validate().is_err());

        let config = TouchConfig { grid_width: 300, ..TouchConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            TouchConfig::from_json_str("{ baseline: }"),
            Err(ConfigError::Parse(_))
        ));
    }
}
