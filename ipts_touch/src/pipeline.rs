// THEORY:
// The `pipeline` module is the top-level API of the touch engine. It owns every
// piece of cross-frame state (the reusable heatmap grid, the cluster engine's
// scratch space and the tracker's double buffer) and runs one device report
// through all stages before returning:
//
//   decode -> extract -> cluster -> resolve -> track -> emit
//
// State discipline: a report is decoded and validated in full before any
// state is touched. A short or malformed report therefore leaves the tracker
// exactly as it was, and the next good frame is matched against the last good
// one. The caller reports `lifted_contacts()` for the dropped cycle.

use tracing::{debug, trace, warn};

use crate::config::TouchConfig;
use crate::core_modules::blob::FrameBlobSet;
use crate::core_modules::blob_detector::BlobDetector;
use crate::core_modules::contact::{self, ContactFrame};
use crate::core_modules::frame_decoder::{SectionKind, StylusReport, sections};
use crate::core_modules::geometry::{self, Resolution};
use crate::core_modules::heatmap::{self, Heatmap};
use crate::core_modules::tracker::IdentityTracker;
use crate::error::{ConfigError, DecodeError, PipelineError};
use crate::sink::FrameObserver;

/// The main, top-level struct for the touch engine.
#[derive(Debug)]
pub struct TouchPipeline {
    config: TouchConfig,
    heatmap: Heatmap,
    detector: BlobDetector,
    tracker: IdentityTracker,
    last_resolution: Resolution,
    frames_processed: u64,
}

impl TouchPipeline {
    pub fn new(config: TouchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            heatmap: Heatmap::new(config.grid_width, config.grid_height),
            detector: BlobDetector::new(config.max_blobs, config.max_blob_pixels),
            tracker: IdentityTracker::new(),
            last_resolution: Resolution::default(),
            frames_processed: 0,
            config,
        })
    }

    pub fn config(&self) -> &TouchConfig {
        &self.config
    }

    /// Processes one device report. Returns the contact table of its last
    /// heatmap section, or `None` if it carried no heatmap.
    pub fn process_frame(&mut self, raw: &[u8]) -> Result<Option<ContactFrame>, PipelineError> {
        self.process_frame_with(raw, &mut ())
    }

    /// Like `process_frame`, handing each processed heatmap and its blobs to
    /// `observer` before the next section is processed.
    pub fn process_frame_with<O>(
        &mut self,
        raw: &[u8],
        observer: &mut O,
    ) -> Result<Option<ContactFrame>, PipelineError>
    where
        O: FrameObserver + ?Sized,
    {
        let expected = self.config.frame_size;
        if raw.len() < expected {
            return Err(PipelineError::ShortRead {
                got: raw.len(),
                expected,
            });
        }
        let raw = &raw[..expected];

        // Stage 0: Validation. Nothing below may fail once this passes.
        let heatmaps = self.validate(raw).inspect_err(|err| {
            warn!(%err, "dropping malformed frame");
        })?;
        if heatmaps == 0 {
            return Ok(None);
        }

        let mut contacts = None;
        for section in sections(raw).flatten() {
            if section.kind == SectionKind::Heatmap {
                let body = section.bytes(raw);
                contacts = Some(self.process_heatmap(body));
                observer.observe_section(body, &self.heatmap, self.tracker.current());
            }
        }
        Ok(contacts)
    }

    /// Walks every section and checks what later stages rely on. Returns the
    /// number of heatmap sections.
    fn validate(&self, raw: &[u8]) -> Result<usize, DecodeError> {
        let grid_len = self.config.grid_len();
        let mut heatmaps = 0;
        for section in sections(raw) {
            let section = section?;
            match section.kind {
                SectionKind::Heatmap => {
                    if section.len < grid_len {
                        return Err(DecodeError::HeatmapSize {
                            expected: grid_len,
                            actual: section.len,
                        });
                    }
                    heatmaps += 1;
                }
                SectionKind::Stylus => {
                    let report = StylusReport::parse(section.bytes(raw))?;
                    debug!(serial = report.serial, elements = report.len(), "stylus report");
                    for element in report.elements() {
                        trace!(
                            mode = element.mode,
                            x = element.x,
                            y = element.y,
                            pressure = element.pressure,
                            altitude = element.altitude,
                            azimuth = element.azimuth,
                            "stylus element"
                        );
                    }
                }
                SectionKind::Other(report_type) => {
                    trace!(report_type, len = section.len, "skipping report");
                }
            }
        }
        Ok(heatmaps)
    }

    fn process_heatmap(&mut self, body: &[u8]) -> ContactFrame {
        // Stage 1: Extraction
        heatmap::extract_into(&mut self.heatmap, body, self.config.baseline);

        // Stage 2: Clustering into the reclaimed buffer
        let current = self.tracker.begin_frame();
        self.detector.find_blobs(&self.heatmap, current);

        // Stage 3: Geometry, validity, palm rejection, overlap removal
        self.last_resolution = geometry::resolve(current, &self.config);

        // Stage 4: Identity
        self.tracker.assign_ids(self.config.tracking);

        // Stage 5: Emission
        let contacts = contact::emit(self.tracker.current(), self.config.max_contacts);
        self.frames_processed += 1;
        debug!(
            frame = self.frames_processed,
            blobs = self.tracker.current().len(),
            valid = self.last_resolution.valid,
            palm = self.last_resolution.palm_rejected,
            "heatmap processed"
        );
        contacts
    }

    /// The table to report when a cycle produced no usable frame.
    pub fn lifted_contacts(&self) -> ContactFrame {
        ContactFrame::lifted(self.config.max_contacts)
    }

    /// Drops tracking history; the next frame starts with no previous contacts.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.last_resolution = Resolution::default();
    }

    pub fn heatmap(&self) -> &Heatmap {
        &self.heatmap
    }

    pub fn blobs(&self) -> &FrameBlobSet {
        self.tracker.current()
    }

    pub fn previous_blobs(&self) -> &FrameBlobSet {
        self.tracker.previous()
    }

    pub fn last_resolution(&self) -> Resolution {
        self.last_resolution
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}
