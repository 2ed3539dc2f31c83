// THEORY:
// A `Blob` is one candidate touch contact in a single frame: the set of grid
// cells grown from one local maximum, plus the geometry derived from them.
// Like the heatmap it is a plain data container; the cluster engine fills its
// pixels, the geometry resolver fills its centroid/diameter/box and validity,
// and the identity tracker fills its id.
//
// Storage is fixed-capacity (`heapless`) so that a frame's worth of blobs lives
// inline in the tracker's double buffer and no frame allocates.

use heapless::Vec as FixedVec;

use crate::core_modules::heatmap::Pixel;

/// Upper bound on blobs produced per frame.
pub const MAX_BLOBS: usize = 16;
/// Upper bound on pixels admitted into one blob. Growth beyond it is truncated.
pub const MAX_BLOB_PIXELS: usize = 128;

/// Axis-aligned rectangle in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    /// The square of side `side` centred on `(cx, cy)`.
    pub fn square(cx: f32, cy: f32, side: f32) -> Self {
        let half = side / 2.0;
        Self {
            x1: cx - half,
            y1: cy - half,
            x2: cx + half,
            y2: cy + half,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Area shared with `other`; zero when disjoint.
    pub fn intersection(&self, other: &BoundingBox) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        w * h
    }
}

/// One candidate contact within a single frame.
#[derive(Debug, Clone, Default)]
pub struct Blob {
    pub pixels: FixedVec<Pixel, MAX_BLOB_PIXELS>,
    /// Intensity-weighted centre, offset by half a cell to the cell centre.
    pub centroid: (f32, f32),
    pub bbox: BoundingBox,
    pub diameter: f32,
    pub valid: bool,
    /// Tracking id; `0` is unassigned.
    pub id: i32,
}

impl Blob {
    pub fn size(&self) -> usize {
        self.pixels.len()
    }

    /// `true` if the blob already holds the cell at `(x, y)`.
    pub fn contains(&self, x: u8, y: u8) -> bool {
        self.pixels.iter().any(|p| p.x == x && p.y == y)
    }

    pub fn total_intensity(&self) -> u32 {
        self.pixels.iter().map(|p| p.value as u32).sum()
    }

    /// Squared distance between this blob's centroid and `other`'s.
    pub fn distance_sq(&self, other: &Blob) -> f32 {
        let dx = self.centroid.0 - other.centroid.0;
        let dy = self.centroid.1 - other.centroid.1;
        dx * dx + dy * dy
    }
}

/// One frame's blobs.
#[derive(Debug, Clone, Default)]
pub struct FrameBlobSet {
    blobs: FixedVec<Blob, MAX_BLOBS>,
}

impl FrameBlobSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.blobs.is_full()
    }

    /// Adds a blob, handing it back if the set is full.
    pub fn push(&mut self, blob: Blob) -> Result<(), Blob> {
        self.blobs.push(blob)
    }

    pub fn clear(&mut self) {
        self.blobs.clear();
    }

    pub fn blobs(&self) -> &[Blob] {
        &self.blobs
    }

    pub fn blobs_mut(&mut self) -> &mut [Blob] {
        &mut self.blobs
    }

    pub fn iter(&self) -> impl Iterator<Item = &Blob> {
        self.blobs.iter()
    }

    pub fn valid(&self) -> impl Iterator<Item = &Blob> {
        self.blobs.iter().filter(|b| b.valid)
    }

    pub fn valid_count(&self) -> usize {
        self.valid().count()
    }

    /// The valid blob carrying `id`, if any.
    pub fn find_valid(&self, id: i32) -> Option<&Blob> {
        self.valid().find(|b| b.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_box_is_centred() {
        let bbox = BoundingBox::square(10.5, 4.0, 3.0);
        assert_eq!(bbox, BoundingBox { x1: 9.0, y1: 2.5, x2: 12.0, y2: 5.5 });
        assert_eq!(bbox.area(), 9.0);
    }

    #[test]
    fn intersection_of_disjoint_boxes_is_zero() {
        let a = BoundingBox::square(0.0, 0.0, 2.0);
        let b = BoundingBox::square(5.0, 5.0, 2.0);
        assert_eq!(a.intersection(&b), 0.0);
        assert_eq!(b.intersection(&a), 0.0);
    }

    #[test]
    fn intersection_of_overlapping_boxes() {
        let a = BoundingBox::square(0.0, 0.0, 2.0);
        let b = BoundingBox::square(1.0, 0.0, 2.0);
        assert_eq!(a.intersection(&b), 2.0);
        // Containment yields the inner box's area.
        let inner = BoundingBox::square(0.0, 0.0, 1.0);
        assert_eq!(a.intersection(&inner), 1.0);
    }

    #[test]
    fn set_refuses_blobs_past_capacity() {
        let mut set = FrameBlobSet::new();
        for _ in 0..MAX_BLOBS {
            assert!(set.push(Blob::default()).is_ok());
        }
        assert!(set.is_full());
        assert!(set.push(Blob::default()).is_err());
        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn find_valid_ignores_invalid_blobs() {
        let mut set = FrameBlobSet::new();
        let invalid = Blob { id: 1, valid: false, ..Blob::default() };
        let valid = Blob { id: 2, valid: true, ..Blob::default() };
        set.push(invalid).expect("room");
        set.push(valid).expect("room");
        assert!(set.find_valid(1).is_none());
        assert_eq!(set.find_valid(2).map(|b| b.id), Some(2));
        assert_eq!(set.valid_count(), 1);
    }
}
