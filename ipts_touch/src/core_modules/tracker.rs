// THEORY:
// The `tracker` module gives contacts "object permanence": a finger that moves
// across the panel keeps the same tracking id from frame to frame, which is what
// the multi-touch slot protocol downstream relies on.
//
// Key architectural principles:
// 1.  **Double buffer**: exactly two `FrameBlobSet`s are alive, `current` and
//     `previous`. Each frame flips the selector and reclaims the older buffer
//     in place as the new `current`. Nothing is allocated per frame and the
//     previous frame is only ever read while the current one is being tracked.
// 2.  **Greedy nearest-neighbour matching**: in the previous frame's index
//     order, each valid previous blob hands its id to the closest still
//     unassigned valid blob of the current frame (squared centroid distance).
//     Each current blob can be claimed once. This is not a globally optimal
//     assignment; with at most 16 blobs and small per-frame displacement it
//     does not need to be.
// 3.  **Lowest free id**: any valid blob still unassigned after matching gets
//     the smallest positive id not in use in the current frame, so an id freed
//     by a lifted finger is the next one handed out.

use tracing::trace;

use crate::core_modules::blob::FrameBlobSet;

/// Frame-to-frame identity assignment over a double-buffered pair of blob sets.
#[derive(Debug, Clone, Default)]
pub struct IdentityTracker {
    buffers: [FrameBlobSet; 2],
    current: usize,
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the buffers and returns the reclaimed, emptied `current` set.
    pub fn begin_frame(&mut self) -> &mut FrameBlobSet {
        self.current ^= 1;
        let current = &mut self.buffers[self.current];
        current.clear();
        current
    }

    pub fn current(&self) -> &FrameBlobSet {
        &self.buffers[self.current]
    }

    pub fn previous(&self) -> &FrameBlobSet {
        &self.buffers[self.current ^ 1]
    }

    /// Forgets both frames: the next frame starts with no previous contacts.
    pub fn reset(&mut self) {
        for buffer in &mut self.buffers {
            buffer.clear();
        }
    }

    /// Current set writable, previous set read-only.
    fn split(&mut self) -> (&mut FrameBlobSet, &FrameBlobSet) {
        let [first, second] = &mut self.buffers;
        if self.current == 0 {
            (first, second)
        } else {
            (second, first)
        }
    }

    /// Assigns ids to the current frame's valid blobs. With `carry_over` off the
    /// previous frame is ignored and ids start from scratch.
    pub fn assign_ids(&mut self, carry_over: bool) {
        let (current, previous) = self.split();
        if carry_over {
            match_previous(current, previous);
        }
        assign_fresh_ids(current);
    }
}

/// Hands each valid previous blob's id to its nearest unassigned valid successor.
pub fn match_previous(current: &mut FrameBlobSet, previous: &FrameBlobSet) {
    for old in previous.valid() {
        let closest = current
            .iter()
            .enumerate()
            .filter(|(_, blob)| blob.valid && blob.id == 0)
            .map(|(index, blob)| (index, blob.distance_sq(old)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index);

        if let Some(index) = closest {
            trace!(id = old.id, index, "id carried over");
            current.blobs_mut()[index].id = old.id;
        }
    }
}

/// Gives every unassigned valid blob the lowest id not yet used in `set`.
pub fn assign_fresh_ids(set: &mut FrameBlobSet) {
    for index in 0..set.len() {
        let blob = &set.blobs()[index];
        if !blob.valid || blob.id != 0 {
            continue;
        }
        let id = lowest_unused_id(set);
        set.blobs_mut()[index].id = id;
    }
}

fn lowest_unused_id(set: &FrameBlobSet) -> i32 {
    (1..)
        .find(|candidate| set.iter().all(|b| b.id != *candidate))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::blob::Blob;

    fn valid_at(x: f32, y: f32) -> Blob {
        Blob {
            centroid: (x, y),
            diameter: 2.0,
            valid: true,
            ..Blob::default()
        }
    }

    fn load(tracker: &mut IdentityTracker, blobs: &[Blob]) {
        let current = tracker.begin_frame();
        for blob in blobs {
            current.push(blob.clone()).expect("room");
        }
        tracker.assign_ids(true);
    }

    fn ids(set: &FrameBlobSet) -> Vec<i32> {
        set.iter().map(|b| b.id).collect()
    }

    #[test]
    fn id_survives_sub_cell_motion() {
        let mut tracker = IdentityTracker::new();
        load(&mut tracker, &[valid_at(10.5, 10.5)]);
        assert_eq!(ids(tracker.current()), vec![1]);

        load(&mut tracker, &[valid_at(11.2, 10.9)]);
        assert_eq!(ids(tracker.current()), vec![1]);
        assert_eq!(ids(tracker.previous()), vec![1]);
    }

    #[test]
    fn vacated_id_is_reused() {
        let mut tracker = IdentityTracker::new();
        load(&mut tracker, &[valid_at(10.0, 10.0)]);
        load(&mut tracker, &[]);
        load(&mut tracker, &[valid_at(40.0, 30.0)]);
        assert_eq!(ids(tracker.current()), vec![1]);
    }

    #[test]
    fn ids_follow_their_contacts_when_order_changes() {
        let mut tracker = IdentityTracker::new();
        load(&mut tracker, &[valid_at(5.0, 5.0), valid_at(50.0, 30.0)]);
        assert_eq!(ids(tracker.current()), vec![1, 2]);

        // Same fingers, detected in the opposite order.
        load(&mut tracker, &[valid_at(50.5, 30.2), valid_at(5.3, 5.1)]);
        assert_eq!(ids(tracker.current()), vec![2, 1]);
    }

    #[test]
    fn new_contacts_fill_the_lowest_free_ids() {
        let mut set = FrameBlobSet::new();
        for id in [3, 0, 1, 0] {
            set.push(Blob { id, ..valid_at(0.0, 0.0) }).expect("room");
        }
        assign_fresh_ids(&mut set);
        assert_eq!(ids(&set), vec![3, 2, 1, 4]);
    }

    #[test]
    fn arriving_contact_keeps_existing_ids_intact() {
        let mut tracker = IdentityTracker::new();
        load(&mut tracker, &[valid_at(5.0, 5.0), valid_at(40.0, 5.0)]);
        load(&mut tracker, &[valid_at(30.0, 30.0), valid_at(40.2, 5.0), valid_at(5.1, 5.2)]);
        assert_eq!(ids(tracker.current()), vec![3, 2, 1]);
    }

    #[test]
    fn matching_is_greedy_in_previous_order() {
        let mut tracker = IdentityTracker::new();
        load(&mut tracker, &[valid_at(10.0, 10.0), valid_at(13.0, 10.0)]);
        // A single contact between both: the first previous blob claims it.
        load(&mut tracker, &[valid_at(12.0, 10.0)]);
        assert_eq!(ids(tracker.current()), vec![1]);
    }

    #[test]
    fn invalid_blobs_neither_give_nor_take_ids() {
        let mut tracker = IdentityTracker::new();
        load(&mut tracker, &[valid_at(5.0, 5.0)]);

        let mut ghost = valid_at(5.0, 5.0);
        ghost.valid = false;
        load(&mut tracker, &[ghost, valid_at(30.0, 30.0)]);
        assert_eq!(ids(tracker.current()), vec![0, 1]);
    }

    #[test]
    fn ids_are_unique_among_valid_blobs() {
        let mut tracker = IdentityTracker::new();
        let frames: [&[Blob]; 4] = [
            &[valid_at(1.0, 1.0), valid_at(2.0, 2.0)],
            &[valid_at(1.5, 1.5), valid_at(2.5, 2.5), valid_at(9.0, 9.0)],
            &[valid_at(9.0, 9.0)],
            &[valid_at(1.0, 1.0), valid_at(9.0, 9.5), valid_at(20.0, 1.0), valid_at(3.0, 3.0)],
        ];
        for frame in frames {
            load(&mut tracker, frame);
            let mut seen = ids(tracker.current());
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), tracker.current().len());
            assert!(seen.iter().all(|&id| id > 0));
        }
    }

    #[test]
    fn without_carry_over_ids_restart_each_frame() {
        let mut tracker = IdentityTracker::new();
        load(&mut tracker, &[valid_at(5.0, 5.0), valid_at(30.0, 5.0)]);

        let current = tracker.begin_frame();
        current.push(valid_at(30.0, 5.0)).expect("room");
        tracker.assign_ids(false);
        assert_eq!(ids(tracker.current()), vec![1]);
    }

    #[test]
    fn reset_forgets_previous_contacts() {
        let mut tracker = IdentityTracker::new();
        load(&mut tracker, &[valid_at(5.0, 5.0), valid_at(30.0, 5.0)]);
        tracker.reset();
        assert!(tracker.current().is_empty() && tracker.previous().is_empty());

        load(&mut tracker, &[valid_at(30.0, 5.0)]);
        assert_eq!(ids(tracker.current()), vec![1]);
    }
}
