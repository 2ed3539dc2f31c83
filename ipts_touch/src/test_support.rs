//! Synthetic device reports and heatmaps for unit tests.

use crate::config::{DEFAULT_FRAME_SIZE, DEFAULT_GRID_HEIGHT, DEFAULT_GRID_WIDTH};
use crate::core_modules::frame_decoder::{
    HID_HEADER_LEN, PAYLOAD_RAW_DATA, REPORT_HEATMAP, STYLUS_HEADER_LEN, SUB_FRAME_TOUCH,
};
use crate::core_modules::heatmap::Heatmap;

/// Builds one device report, padded with zeros to the full frame size.
pub(crate) struct ReportBuilder {
    payload_type: u8,
    sub_frames: Vec<(u16, Vec<u8>)>,
}

impl ReportBuilder {
    pub(crate) fn new() -> Self {
        Self {
            payload_type: PAYLOAD_RAW_DATA,
            sub_frames: Vec::new(),
        }
    }

    pub(crate) fn payload_type(mut self, payload_type: u8) -> Self {
        self.payload_type = payload_type;
        self
    }

    /// Appends a sub-frame made of `(report type, body)` reports.
    pub(crate) fn sub_frame(self, kind: u16, reports: &[(u8, Vec<u8>)]) -> Self {
        let mut body = Vec::new();
        for (report_type, report) in reports {
            body.push(*report_type);
            body.push(0);
            body.extend_from_slice(&(report.len() as u16).to_le_bytes());
            body.extend_from_slice(report);
        }
        self.raw_sub_frame(kind, body)
    }

    pub(crate) fn raw_sub_frame(mut self, kind: u16, body: Vec<u8>) -> Self {
        self.sub_frames.push((kind, body));
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.extend_from_slice(&(self.sub_frames.len() as u32).to_le_bytes());
        payload.extend_from_slice(&[0; 4]);
        for (index, (kind, body)) in self.sub_frames.iter().enumerate() {
            payload.extend_from_slice(&(index as u16).to_le_bytes());
            payload.extend_from_slice(&kind.to_le_bytes());
            payload.extend_from_slice(&(body.len() as u32).to_le_bytes());
            payload.extend_from_slice(&[0; 8]);
            payload.extend_from_slice(body);
        }

        let mut frame = Vec::with_capacity(DEFAULT_FRAME_SIZE);
        frame.push(0x0B);
        frame.extend_from_slice(&0u16.to_le_bytes());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.push(0);
        frame.push(self.payload_type);
        frame.push(0);
        debug_assert_eq!(frame.len(), HID_HEADER_LEN);
        frame.extend_from_slice(&payload);
        assert!(frame.len() <= DEFAULT_FRAME_SIZE, "test report exceeds frame size");
        frame.resize(DEFAULT_FRAME_SIZE, 0);
        frame
    }
}

/// Raw sensor bytes that extract to `cells` on a zero background for `baseline`.
pub(crate) fn heatmap_body(cells: &[(usize, usize, u8)], baseline: u8) -> Vec<u8> {
    let (w, h) = (DEFAULT_GRID_WIDTH, DEFAULT_GRID_HEIGHT);
    let mut raw = vec![0xFF; w * h];
    for &(x, y, value) in cells {
        raw[(h - 1 - y) * w + (w - 1 - x)] = 255 - value - baseline;
    }
    raw
}

/// A complete report carrying a single heatmap section.
pub(crate) fn heatmap_report(cells: &[(usize, usize, u8)], baseline: u8) -> Vec<u8> {
    ReportBuilder::new()
        .sub_frame(SUB_FRAME_TOUCH, &[(REPORT_HEATMAP, heatmap_body(cells, baseline))])
        .build()
}

/// A stylus section body with `elements` raw 16-byte records.
pub(crate) fn stylus_body(serial: u32, elements: &[[u8; 16]]) -> Vec<u8> {
    let mut body = Vec::with_capacity(STYLUS_HEADER_LEN + elements.len() * 16);
    body.push(elements.len() as u8);
    body.extend_from_slice(&[0; 3]);
    body.extend_from_slice(&serial.to_le_bytes());
    for element in elements {
        body.extend_from_slice(element);
    }
    body
}

/// A default-sized heatmap with the given cells set.
pub(crate) fn heatmap_with(cells: &[(usize, usize, u8)]) -> Heatmap {
    let mut heatmap = Heatmap::new(DEFAULT_GRID_WIDTH, DEFAULT_GRID_HEIGHT);
    for &(x, y, value) in cells {
        heatmap.set(x, y, value);
    }
    heatmap
}

/// The 3x3 square of `value` centred on `(cx, cy)`.
pub(crate) fn square(cx: usize, cy: usize, value: u8) -> Vec<(usize, usize, u8)> {
    let mut cells = Vec::with_capacity(9);
    for y in cy - 1..=cy + 1 {
        for x in cx - 1..=cx + 1 {
            cells.push((x, y, value));
        }
    }
    cells
}

/// A 5x5 dome centred on `(cx, cy)`: `levels[d]` at Chebyshev distance `d`.
/// Only the centre is a seed when the levels strictly decrease.
pub(crate) fn dome(cx: usize, cy: usize, levels: [u8; 3]) -> Vec<(usize, usize, u8)> {
    let mut cells = Vec::with_capacity(25);
    for y in cy - 2..=cy + 2 {
        for x in cx - 2..=cx + 2 {
            let d = x.abs_diff(cx).max(y.abs_diff(cy));
            cells.push((x, y, levels[d]));
        }
    }
    cells
}
