// THEORY:
// The touch core never writes to a device itself. Two seams hang off the
// pipeline instead:
// - A `ContactSink` receives each finished `ContactFrame` and applies it as one
//   atomic update. The uinput writer of a real driver lives behind this trait.
// - A `FrameObserver` sees the extracted heatmap and resolved blobs of every
//   processed section. Debug tooling (the PNG dumper in `touch_tester`) plugs in
//   here without the pipeline knowing about images.

use std::convert::Infallible;

use tracing::{debug, info};

use crate::core_modules::blob::FrameBlobSet;
use crate::core_modules::contact::ContactFrame;
use crate::core_modules::heatmap::Heatmap;

pub use crate::core_modules::contact::InputEvent;

/// Consumer of contact tables.
pub trait ContactSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn submit(&mut self, frame: &ContactFrame) -> Result<(), Self::Error>;
}

/// Read-only tap on each processed heatmap section.
pub trait FrameObserver {
    fn observe(&mut self, heatmap: &Heatmap, blobs: &FrameBlobSet);

    /// Like `observe`, with the raw section body the heatmap was extracted
    /// from. Debug views that want the sensor values before baseline
    /// removal override this.
    fn observe_section(&mut self, _section: &[u8], heatmap: &Heatmap, blobs: &FrameBlobSet) {
        self.observe(heatmap, blobs);
    }
}

impl FrameObserver for () {
    fn observe(&mut self, _heatmap: &Heatmap, _blobs: &FrameBlobSet) {}
}

/// Logs contact tables through `tracing`: touch transitions at `info`,
/// active slots at `debug` in device units.
#[derive(Debug)]
pub struct LogSink {
    scale: f32,
    touching: bool,
    submitted: u64,
}

impl LogSink {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            touching: false,
            submitted: 0,
        }
    }

    pub fn submitted(&self) -> u64 {
        self.submitted
    }
}

impl ContactSink for LogSink {
    type Error = Infallible;

    fn submit(&mut self, frame: &ContactFrame) -> Result<(), Self::Error> {
        self.submitted += 1;

        let touching = frame.touching();
        if touching != self.touching {
            match frame.pointer {
                Some((x, y)) => info!(x, y, "touch down"),
                None => info!("touch up"),
            }
            self.touching = touching;
        }

        for contact in frame.active() {
            debug!(
                slot = contact.slot,
                id = contact.tracking_id,
                x = (contact.x * self.scale) as i32,
                y = (contact.y * self.scale) as i32,
                size = (contact.size * self.scale) as i32,
                "contact"
            );
        }
        Ok(())
    }
}

/// Keeps the flattened device events of every submitted table.
#[derive(Debug)]
pub struct RecordingSink {
    scale: f32,
    events: Vec<InputEvent>,
}

impl RecordingSink {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    /// Number of complete updates recorded so far.
    pub fn updates(&self) -> usize {
        self.events.iter().filter(|e| **e == InputEvent::Sync).count()
    }

    pub fn take(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }
}

impl ContactSink for RecordingSink {
    type Error = Infallible;

    fn submit(&mut self, frame: &ContactFrame) -> Result<(), Self::Error> {
        self.events.extend(frame.to_input_events(self.scale));
        Ok(())
    }
}
