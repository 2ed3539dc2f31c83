// THEORY:
// Debug rendering of one processed heatmap. Each sensor cell becomes a
// `scale`x`scale` gray square (brighter is stronger). Every blob's box is drawn
// on top, green if it survived resolution and red if it did not, and a valid
// blob with an id gets a marker at its centroid: one dot per id unit, stacked
// to the right, so ids can be told apart on a still image. A row of tally
// marks in the top-left corner counts the valid blobs.
//
// The background is whatever grid the caller passes. The pipeline's grid has
// the baseline removed; `raw_intensity` rebuilds the plain inverted sensor
// values from the section bytes for a view of the idle noise floor.

use std::path::Path;

use image::{ImageEncoder, Rgb, RgbImage};

use crate::core_modules::blob::{Blob, FrameBlobSet};
use crate::core_modules::heatmap::{self, Heatmap};

const VALID: Rgb<u8> = Rgb([0, 220, 0]);
const INVALID: Rgb<u8> = Rgb([220, 0, 0]);
const MARKER: Rgb<u8> = Rgb([255, 200, 0]);
const TALLY: Rgb<u8> = Rgb([0, 200, 255]);

/// Inverted sensor values (`255 - raw`) without baseline removal.
pub fn raw_intensity(section: &[u8], width: usize, height: usize) -> Heatmap {
    heatmap::extract(section, width, height, 0)
}

pub fn render_frame(heatmap: &Heatmap, blobs: &FrameBlobSet, scale: u32) -> RgbImage {
    let scale = scale.max(1);
    let width = heatmap.width() as u32 * scale;
    let height = heatmap.height() as u32 * scale;

    let mut image = RgbImage::from_fn(width, height, |px, py| {
        let v = heatmap.get((px / scale) as usize, (py / scale) as usize);
        Rgb([v, v, v])
    });

    // Invalid first so a surviving box is never painted over.
    for blob in blobs.iter().filter(|b| !b.valid).chain(blobs.valid()) {
        draw_box(&mut image, blob, scale);
    }
    for blob in blobs.valid().filter(|b| b.id > 0) {
        draw_marker(&mut image, blob, scale);
    }
    draw_tally(&mut image, blobs.valid_count());
    image
}

fn draw_tally(image: &mut RgbImage, count: usize) {
    for n in 0..count as u32 {
        let x = 1 + n * 3;
        for (dx, dy) in [(0, 1), (0, 2), (0, 3), (0, 4)] {
            if x + dx < image.width() && dy < image.height() {
                image.put_pixel(x + dx, dy, TALLY);
            }
        }
    }
}

fn draw_box(image: &mut RgbImage, blob: &Blob, scale: u32) {
    let color = if blob.valid { VALID } else { INVALID };
    let (w, h) = (image.width() as f32, image.height() as f32);
    let to_px = |v: f32, limit: f32| (v * scale as f32).clamp(0.0, limit - 1.0) as u32;

    let x1 = to_px(blob.bbox.x1, w);
    let x2 = to_px(blob.bbox.x2, w);
    let y1 = to_px(blob.bbox.y1, h);
    let y2 = to_px(blob.bbox.y2, h);

    for x in x1..=x2 {
        image.put_pixel(x, y1, color);
        image.put_pixel(x, y2, color);
    }
    for y in y1..=y2 {
        image.put_pixel(x1, y, color);
        image.put_pixel(x2, y, color);
    }
}

fn draw_marker(image: &mut RgbImage, blob: &Blob, scale: u32) {
    let cx = (blob.centroid.0 * scale as f32) as u32;
    let cy = (blob.centroid.1 * scale as f32) as u32;
    for n in 0..blob.id as u32 {
        let x = cx + n * 3;
        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            if x + dx < image.width() && cy + dy < image.height() {
                image.put_pixel(x + dx, cy + dy, MARKER);
            }
        }
    }
}

pub fn save_png(path: impl AsRef<Path>, image: &RgbImage) -> Result<(), image::ImageError> {
    let output = std::io::BufWriter::new(std::fs::File::create(path)?);
    let encoder = image::codecs::png::PngEncoder::new(output);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(())
}
