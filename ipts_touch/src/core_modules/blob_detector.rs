// THEORY:
// The `BlobDetector` is the cluster engine. It implements a "Heatmap Peak-Finding
// and Region Growing" algorithm: instead of thresholding the grid into a binary
// mask, it starts at the brightest points and flows downhill from them, so two
// fingers that touch each other's halo still separate at the saddle between
// them.
//
// Algorithm steps:
// 1.  **Peak Finding (Seeding)**: A cell is a seed if it is non-zero and none
//     of its 8 neighbours is strictly brighter. Plateaus therefore produce
//     several adjacent seeds; the geometry resolver later folds their
//     duplicate blobs together.
// 2.  **Region Growing**: From each seed, the blob floods outwards through the
//     8-neighbourhood. A cell is admitted if it is non-zero and no brighter
//     than the cell that reached it, which keeps the flood inside the seed's
//     own basin. Pixel ownership is not exclusive: where two basins meet at
//     equal height, both blobs may claim the same cells.
// 3.  **Truncation, not rejection**: At most `max_blobs` seeds (scan order
//     wins) become blobs and a blob stops admitting cells at
//     `max_blob_pixels`. Neither is an error.
//
// Growth uses an explicit work-list and a generation-stamped presence grid
// scoped to the current blob, so neither depth nor membership checks depend
// on blob size, and the scratch space is allocated once per detector.

use tracing::trace;

use crate::core_modules::blob::{Blob, FrameBlobSet};
use crate::core_modules::heatmap::Heatmap;

const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// In-bounds 8-neighbours of `(x, y)`.
fn neighbours(x: usize, y: usize, width: usize, height: usize) -> impl Iterator<Item = (usize, usize)> {
    NEIGHBOURS.iter().filter_map(move |&(dx, dy)| {
        let nx = x.checked_add_signed(dx)?;
        let ny = y.checked_add_signed(dy)?;
        (nx < width && ny < height).then_some((nx, ny))
    })
}

/// A cell is a seed if it has signal and no strictly brighter neighbour.
pub fn is_seed(heatmap: &Heatmap, x: usize, y: usize) -> bool {
    let value = heatmap.get(x, y);
    value != 0
        && neighbours(x, y, heatmap.width(), heatmap.height())
            .all(|(nx, ny)| heatmap.get(nx, ny) <= value)
}

/// All seeds in scan order.
pub fn find_seeds(heatmap: &Heatmap) -> impl Iterator<Item = (usize, usize)> + '_ {
    (0..heatmap.height())
        .flat_map(move |y| (0..heatmap.width()).map(move |x| (x, y)))
        .filter(move |&(x, y)| is_seed(heatmap, x, y))
}

/// Pending visit: the cell and the brightness it may not exceed.
#[derive(Debug, Clone, Copy)]
struct Visit {
    x: usize,
    y: usize,
    threshold: u8,
}

/// Region-growing cluster engine with reusable scratch space.
#[derive(Debug, Clone)]
pub struct BlobDetector {
    max_blobs: usize,
    max_blob_pixels: usize,
    /// `membership[i] == generation` means cell `i` is in the blob being grown.
    membership: Vec<u32>,
    generation: u32,
    work: Vec<Visit>,
}

impl BlobDetector {
    pub fn new(max_blobs: usize, max_blob_pixels: usize) -> Self {
        Self {
            max_blobs,
            max_blob_pixels,
            membership: Vec::new(),
            generation: 0,
            work: Vec::new(),
        }
    }

    /// Clears `out` and fills it with one freshly grown blob per seed.
    pub fn find_blobs(&mut self, heatmap: &Heatmap, out: &mut FrameBlobSet) {
        out.clear();
        let limit = self.max_blobs.min(crate::core_modules::blob::MAX_BLOBS);
        let mut skipped = 0usize;

        for (x, y) in find_seeds(heatmap) {
            if out.len() >= limit {
                skipped += 1;
                continue;
            }
            let blob = self.grow(heatmap, x, y);
            let pushed = out.push(blob).is_ok();
            debug_assert!(pushed, "seed limit exceeds blob set capacity");
        }

        if skipped > 0 {
            trace!(skipped, limit, "seed limit reached, extra seeds ignored");
        }
    }

    /// Grows one blob from the seed at `(x, y)`.
    pub fn grow(&mut self, heatmap: &Heatmap, x: usize, y: usize) -> Blob {
        let cells = heatmap.width() * heatmap.height();
        if self.membership.len() != cells {
            self.membership.clear();
            self.membership.resize(cells, 0);
            self.generation = 0;
        }
        self.next_generation();

        let cap = self.max_blob_pixels.min(crate::core_modules::blob::MAX_BLOB_PIXELS);
        let mut blob = Blob::default();
        self.work.clear();
        self.work.push(Visit {
            x,
            y,
            threshold: heatmap.get(x, y),
        });

        while let Some(visit) = self.work.pop() {
            if blob.size() >= cap {
                trace!(seed_x = x, seed_y = y, cap, "blob pixel cap reached, growth truncated");
                break;
            }
            let index = heatmap.index(visit.x, visit.y);
            if self.membership[index] == self.generation {
                continue;
            }
            let value = heatmap.get(visit.x, visit.y);
            if value == 0 || value > visit.threshold {
                continue;
            }

            self.membership[index] = self.generation;
            let pushed = blob.pixels.push(heatmap.pixel(visit.x, visit.y)).is_ok();
            debug_assert!(pushed, "pixel cap exceeds blob capacity");

            for (nx, ny) in neighbours(visit.x, visit.y, heatmap.width(), heatmap.height()) {
                if self.membership[heatmap.index(nx, ny)] != self.generation {
                    self.work.push(Visit {
                        x: nx,
                        y: ny,
                        threshold: value,
                    });
                }
            }
        }

        blob
    }

    fn next_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.membership.fill(0);
            self.generation = 1;
        }
    }
}
