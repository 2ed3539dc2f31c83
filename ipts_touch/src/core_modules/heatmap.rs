// THEORY:
// The `heatmap` module turns one raw sensor section into the intensity grid
// every later stage reads. The digitizer reports capacitance as "255 means
// nothing", scanned from the opposite corner to the screen's origin, so
// extraction does three things per cell:
// 1.  Mirrors both axes: destination `(x, y)` reads source `(W-1-x, H-1-y)`.
// 2.  Inverts the byte so that touch is bright.
// 3.  Subtracts the per-firmware baseline and clamps to `0..=255`, which
//     zeroes the idle noise floor.
//
// Extraction is a pure function of its input. The pipeline reuses one grid
// allocation across frames via `extract_into`.

/// One grid cell and its post-processing intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pixel {
    pub x: u8,
    pub y: u8,
    pub value: u8,
}

/// Row-major intensity grid. `0` is no signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heatmap {
    width: usize,
    height: usize,
    values: Vec<u8>,
}

impl Heatmap {
    /// An all-zero grid. Dimensions must fit 8-bit coordinates.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            values: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.values[self.index(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        let i = self.index(x, y);
        self.values[i] = value;
    }

    pub fn pixel(&self, x: usize, y: usize) -> Pixel {
        Pixel {
            x: x as u8,
            y: y as u8,
            value: self.get(x, y),
        }
    }

    /// Iterates every cell in row-major (scan) order.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| self.pixel(x, y)))
    }

    /// `true` when no cell carries any signal.
    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|&v| v == 0)
    }
}

/// Intensity of one raw sensor byte after inversion and baseline removal.
#[inline]
pub fn normalize(raw: u8, baseline: u8) -> u8 {
    (255 - raw as i32 - baseline as i32).clamp(0, 255) as u8
}

/// Refills `heatmap` from a raw section. `raw` must hold at least
/// `width * height` bytes; the decoder guarantees it.
pub fn extract_into(heatmap: &mut Heatmap, raw: &[u8], baseline: u8) {
    let (w, h) = (heatmap.width, heatmap.height);
    for y in 0..h {
        let source_row = (h - 1 - y) * w;
        for x in 0..w {
            heatmap.values[y * w + x] = normalize(raw[source_row + (w - 1 - x)], baseline);
        }
    }
}

/// Builds a fresh grid from a raw section.
pub fn extract(raw: &[u8], width: usize, height: usize, baseline: u8) -> Heatmap {
    let mut heatmap = Heatmap::new(width, height);
    extract_into(&mut heatmap, raw, baseline);
    heatmap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::heatmap_body;

    #[test]
    fn normalize_inverts_and_clamps() {
        assert_eq!(normalize(255, 0), 0);
        assert_eq!(normalize(0, 0), 255);
        assert_eq!(normalize(200, 0), 55);
        assert_eq!(normalize(200, 100), 0);
        assert_eq!(normalize(100, 100), 55);
        assert_eq!(normalize(0, 100), 155);
    }

    #[test]
    fn both_axes_are_mirrored() {
        let (w, h) = (64, 44);
        let mut raw = vec![0xFF; w * h];
        // Source top-left corner lands at the destination bottom-right.
        raw[0] = 0xFF - 40;
        // Source (x=1, y=0) lands at destination (62, 43).
        raw[1] = 0xFF - 20;

        let heatmap = extract(&raw, w, h, 0);
        assert_eq!(heatmap.get(63, 43), 40);
        assert_eq!(heatmap.get(62, 43), 20);
        assert_eq!(heatmap.get(0, 0), 0);
    }

    #[test]
    fn baseline_removes_idle_noise() {
        let raw = heatmap_body(&[(5, 6, 30)], 90);
        let heatmap = extract(&raw, 64, 44, 90);
        assert_eq!(heatmap.get(5, 6), 30);
        assert_eq!(heatmap.pixels().filter(|p| p.value != 0).count(), 1);

        // The same bytes read with a higher baseline lose the weak signal.
        let heatmap = extract(&raw, 64, 44, 120);
        assert!(heatmap.is_blank());
    }

    #[test]
    fn extraction_is_idempotent() {
        let raw: Vec<u8> = (0..64 * 44).map(|i| (i * 37 % 256) as u8).collect();
        let first = extract(&raw, 64, 44, 100);
        let second = extract(&raw, 64, 44, 100);
        assert_eq!(first, second);

        let mut reused = first.clone();
        extract_into(&mut reused, &raw, 100);
        assert_eq!(reused, first);
    }

    #[test]
    fn pixels_carry_their_coordinates_in_scan_order() {
        let mut heatmap = Heatmap::new(3, 2);
        heatmap.set(2, 1, 9);
        let pixels: Vec<Pixel> = heatmap.pixels().collect();
        assert_eq!(pixels.len(), 6);
        assert_eq!(pixels[5], Pixel { x: 2, y: 1, value: 9 });
        assert_eq!(pixels[1], Pixel { x: 1, y: 0, value: 0 });
    }
}
