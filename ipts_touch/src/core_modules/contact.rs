// THEORY:
// The contact emitter is the boundary between blob tracking and the input sink.
// It maps tracking ids onto a fixed table of multi-touch slots (slot `n` shows
// the valid blob whose id is `n + 1`), derives the single-touch pointer, and
// can flatten the table into the ordered event sequence a multi-touch input
// device consumes. A `ContactFrame` is always emitted whole; a sink applies it
// as one atomic update.

use heapless::Vec as FixedVec;

use crate::core_modules::blob::FrameBlobSet;

/// Hardware maximum of multi-touch slots.
pub const MAX_CONTACT_SLOTS: usize = 10;

/// Tracking id reported for an empty slot.
pub const LIFTED: i32 = -1;

/// One multi-touch slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub slot: u8,
    /// `LIFTED` when inactive; position and size are then meaningless.
    pub tracking_id: i32,
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

impl Contact {
    pub fn lifted(slot: u8) -> Self {
        Self {
            slot,
            tracking_id: LIFTED,
            x: 0.0,
            y: 0.0,
            size: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.tracking_id != LIFTED
    }
}

/// The complete contact table for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContactFrame {
    pub slots: FixedVec<Contact, MAX_CONTACT_SLOTS>,
    /// Single-touch pointer position, present only while exactly one contact is down.
    pub pointer: Option<(f32, f32)>,
}

impl ContactFrame {
    /// A table with every slot lifted and the pointer up.
    pub fn lifted(slot_count: usize) -> Self {
        let mut slots = FixedVec::new();
        for slot in 0..slot_count.min(MAX_CONTACT_SLOTS) {
            let pushed = slots.push(Contact::lifted(slot as u8)).is_ok();
            debug_assert!(pushed, "slot count clamped to capacity");
        }
        Self { slots, pointer: None }
    }

    pub fn touching(&self) -> bool {
        self.pointer.is_some()
    }

    pub fn active(&self) -> impl Iterator<Item = &Contact> {
        self.slots.iter().filter(|c| c.is_active())
    }

    /// Flattens the table into device events, positions scaled by `scale`.
    pub fn to_input_events(&self, scale: f32) -> Vec<InputEvent> {
        let to_device = |v: f32| (v * scale) as i32;
        let mut events = Vec::with_capacity(self.slots.len() * 7 + 2);

        for contact in &self.slots {
            events.push(InputEvent::Slot(contact.slot));
            if contact.is_active() {
                events.push(InputEvent::PositionX(to_device(contact.x)));
                events.push(InputEvent::PositionY(to_device(contact.y)));
                events.push(InputEvent::TouchMajor(to_device(contact.size)));
                // The pointer only exists while this is the sole active slot.
                if let Some((x, y)) = self.pointer {
                    events.push(InputEvent::PointerX(to_device(x)));
                    events.push(InputEvent::PointerY(to_device(y)));
                    events.push(InputEvent::Touch(true));
                }
            }
            events.push(InputEvent::TrackingId(contact.tracking_id));
        }

        if !self.touching() {
            events.push(InputEvent::Touch(false));
        }
        events.push(InputEvent::Sync);
        events
    }
}

/// Device-level multi-touch events, in the order a sink should write them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Slot(u8),
    PositionX(i32),
    PositionY(i32),
    TouchMajor(i32),
    TrackingId(i32),
    PointerX(i32),
    PointerY(i32),
    Touch(bool),
    /// Ends one atomic update.
    Sync,
}

/// Builds the contact table for the current frame's resolved, identified blobs.
pub fn emit(blobs: &FrameBlobSet, slot_count: usize) -> ContactFrame {
    let mut frame = ContactFrame::lifted(slot_count);

    for contact in frame.slots.iter_mut() {
        if let Some(blob) = blobs.find_valid(contact.slot as i32 + 1) {
            contact.tracking_id = blob.id;
            contact.x = blob.centroid.0;
            contact.y = blob.centroid.1;
            contact.size = blob.diameter;
        }
    }

    if blobs.valid_count() == 1 {
        let pointer = frame.active().next().map(|c| (c.x, c.y));
        frame.pointer = pointer;
    }
    frame
}
