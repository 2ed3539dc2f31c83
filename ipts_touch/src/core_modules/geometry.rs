// THEORY:
// The geometry resolver turns each blob's raw pixels into a contact estimate and
// decides which blobs survive:
// 1.  **Measurement**: intensity-weighted centroid (plus half a cell, so the
//     centre of cell `(x, y)` is `(x + 0.5, y + 0.5)`), a diameter proportional
//     to total intensity, and a square box of that side around the centroid.
// 2.  **Validity**: blobs at or below `min_diameter` are noise.
// 3.  **Palm rejection**: a single blob above `palm_diameter` means a hand is
//     resting on the panel, and every blob in the frame is dropped.
// 4.  **Overlap removal**: for each pair of still-valid blobs, if their
//     intersection covers more than `overlap_ratio` of the smaller box, the
//     smaller one is dropped. On equal areas the earlier blob is kept. This
//     also folds together the duplicate blobs a plateau produces.

use tracing::trace;

use crate::config::TouchConfig;
use crate::core_modules::blob::{Blob, BoundingBox, FrameBlobSet};

/// Outcome of resolving one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resolution {
    pub palm_rejected: bool,
    pub overlaps_removed: usize,
    pub valid: usize,
}

/// Fills in centroid, diameter, bounding box and size-based validity.
/// Returns `true` if the blob is large enough to trigger palm rejection.
pub fn measure(blob: &mut Blob, config: &TouchConfig) -> bool {
    let (mut weighted_x, mut weighted_y, mut total) = (0.0f32, 0.0f32, 0.0f32);
    for p in &blob.pixels {
        let v = p.value as f32;
        weighted_x += p.x as f32 * v;
        weighted_y += p.y as f32 * v;
        total += v;
    }

    if total <= 0.0 {
        blob.diameter = 0.0;
        blob.valid = false;
        return false;
    }

    blob.centroid = (weighted_x / total + 0.5, weighted_y / total + 0.5);
    blob.diameter = total / config.diameter_divisor;
    blob.bbox = BoundingBox::square(blob.centroid.0, blob.centroid.1, blob.diameter);
    blob.valid = blob.diameter > config.min_diameter;
    blob.diameter > config.palm_diameter
}

/// Drops the smaller of every pair of valid blobs that overlap too much.
/// Returns the number of blobs invalidated.
pub fn remove_overlaps(blobs: &mut [Blob], overlap_ratio: f32) -> usize {
    let mut removed = 0;
    for i in 0..blobs.len() {
        for j in i + 1..blobs.len() {
            if !(blobs[i].valid && blobs[j].valid) {
                continue;
            }
            let intersection = blobs[i].bbox.intersection(&blobs[j].bbox);
            let area_i = blobs[i].bbox.area();
            let area_j = blobs[j].bbox.area();
            let (smaller, smaller_area) = if area_i >= area_j { (j, area_j) } else { (i, area_i) };
            if smaller_area > 0.0 && intersection / smaller_area > overlap_ratio {
                blobs[smaller].valid = false;
                removed += 1;
            }
        }
    }
    removed
}

/// Runs measurement, palm rejection and overlap removal over one frame.
pub fn resolve(set: &mut FrameBlobSet, config: &TouchConfig) -> Resolution {
    let mut palm = false;
    for blob in set.blobs_mut() {
        palm |= measure(blob, config);
    }

    let palm_rejected = palm && config.palm_rejection;
    if palm_rejected {
        trace!(blobs = set.len(), "palm-sized contact, suppressing frame");
        for blob in set.blobs_mut() {
            blob.valid = false;
        }
    }

    let overlaps_removed = remove_overlaps(set.blobs_mut(), config.overlap_ratio);
    Resolution {
        palm_rejected,
        overlaps_removed,
        valid: set.valid_count(),
    }
}
