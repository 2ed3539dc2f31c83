// THEORY:
// The `frame_decoder` walks the nested binary envelope of one IPTS device report
// and tells the rest of the system where the interesting sections live. It never
// copies payload bytes; it yields `(kind, offset, length)` triples into the
// caller's buffer.
//
// Envelope, all little-endian and packed:
// 1.  HID header (10 bytes): report id, timestamp, payload size, reserved,
//     payload type, reserved. Only payload type `0xEE` (raw data) carries
//     further structure; anything else yields no sections at all.
// 2.  Raw-data header (12 bytes): counter, sub-frame count, reserved.
// 3.  `count` sub-frames, each a 16-byte header (index, type, size, reserved)
//     followed by `size` body bytes. Only types 6 and 8 are decoded further;
//     every other sub-frame is skipped as one opaque unit.
// 4.  Inside a decoded sub-frame, 4-byte report headers (type, flags, size)
//     each precede `size` bytes of report body, until the sub-frame's end.
//     Report `0x25` is a heatmap, `0x60` a stylus report.
//
// Size fields come from the device and are not trusted: every header and body
// is bounds-checked against both the buffer and its enclosing sub-frame before
// it is read. The first violation ends the walk with a `DecodeError`.

use crate::error::DecodeError;

pub const HID_HEADER_LEN: usize = 10;
pub const RAW_HEADER_LEN: usize = 12;
pub const SUB_FRAME_HEADER_LEN: usize = 16;
pub const REPORT_HEADER_LEN: usize = 4;

/// HID payload type announcing a raw-data (heatmap/stylus) payload.
pub const PAYLOAD_RAW_DATA: u8 = 0xEE;
pub const SUB_FRAME_STYLUS: u16 = 6;
pub const SUB_FRAME_TOUCH: u16 = 8;
pub const REPORT_HEATMAP: u8 = 0x25;
pub const REPORT_STYLUS: u8 = 0x60;

pub const STYLUS_HEADER_LEN: usize = 8;
pub const STYLUS_ELEMENT_LEN: usize = 16;

pub const STYLUS_MODE_PROXIMITY: u16 = 1;
pub const STYLUS_MODE_TOUCH: u16 = 2;
pub const STYLUS_MODE_BUTTON: u16 = 4;
pub const STYLUS_MODE_RUBBER: u16 = 8;

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Returns `buf[offset..offset + needed]` if it ends at or before `limit`.
fn take<'a>(
    buf: &'a [u8],
    offset: usize,
    needed: usize,
    limit: usize,
    what: &'static str,
) -> Result<&'a [u8], DecodeError> {
    let limit = limit.min(buf.len());
    match offset.checked_add(needed) {
        Some(end) if end <= limit => Ok(&buf[offset..end]),
        _ => Err(DecodeError::Truncated {
            what,
            offset,
            needed,
            available: limit.saturating_sub(offset),
        }),
    }
}

/// The outer HID header of a device report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidHeader {
    pub report_id: u8,
    pub timestamp: u16,
    pub payload_size: u32,
    pub payload_type: u8,
}

impl HidHeader {
    pub fn parse(buf: &[u8]) -> Result<Self, DecodeError> {
        let raw = take(buf, 0, HID_HEADER_LEN, buf.len(), "HID header")?;
        Ok(Self {
            report_id: raw[0],
            timestamp: le_u16(raw, 1),
            payload_size: le_u32(raw, 3),
            payload_type: raw[8],
        })
    }

    pub fn is_raw_data(&self) -> bool {
        self.payload_type == PAYLOAD_RAW_DATA
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Heatmap,
    Stylus,
    /// Any other report type inside a decoded sub-frame.
    Other(u8),
}

impl SectionKind {
    fn from_report_type(report_type: u8) -> Self {
        match report_type {
            REPORT_HEATMAP => Self::Heatmap,
            REPORT_STYLUS => Self::Stylus,
            other => Self::Other(other),
        }
    }
}

/// Location of one report body inside a device report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    /// Index field of the enclosing sub-frame.
    pub sub_frame: u16,
    pub offset: usize,
    pub len: usize,
}

impl Section {
    /// Body bytes of this section. `buf` must be the buffer it was decoded from.
    pub fn bytes<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.offset..self.offset + self.len]
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenSubFrame {
    index: u16,
    end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    Start,
    Walking,
    Done,
}

/// Lazy iterator over the sections of one device report.
///
/// Yields `Err` at most once; the iterator is exhausted afterwards.
#[derive(Debug, Clone)]
pub struct Sections<'a> {
    buf: &'a [u8],
    pos: usize,
    sub_frames_left: u32,
    open: Option<OpenSubFrame>,
    state: WalkState,
}

/// Starts walking `buf`, which holds exactly one device report.
pub fn sections(buf: &[u8]) -> Sections<'_> {
    Sections {
        buf,
        pos: 0,
        sub_frames_left: 0,
        open: None,
        state: WalkState::Start,
    }
}

impl<'a> Sections<'a> {
    /// Reads the HID and raw-data headers. `false` means the report carries no
    /// raw-data payload.
    fn enter(&mut self) -> Result<bool, DecodeError> {
        let header = HidHeader::parse(self.buf)?;
        if !header.is_raw_data() {
            return Ok(false);
        }
        let raw = take(self.buf, HID_HEADER_LEN, RAW_HEADER_LEN, self.buf.len(), "raw-data header")?;
        self.sub_frames_left = le_u32(raw, 4);
        self.pos = HID_HEADER_LEN + RAW_HEADER_LEN;
        Ok(true)
    }

    /// Consumes one sub-frame header. Opaque sub-frames are skipped whole.
    fn open_sub_frame(&mut self) -> Result<(), DecodeError> {
        let header = take(self.buf, self.pos, SUB_FRAME_HEADER_LEN, self.buf.len(), "sub-frame header")?;
        let index = le_u16(header, 0);
        let kind = le_u16(header, 2);
        let size = le_u32(header, 4) as usize;
        let body = self.pos + SUB_FRAME_HEADER_LEN;
        take(self.buf, body, size, self.buf.len(), "sub-frame body")?;
        let end = body + size;

        if kind == SUB_FRAME_STYLUS || kind == SUB_FRAME_TOUCH {
            self.open = Some(OpenSubFrame { index, end });
            self.pos = body;
        } else {
            self.pos = end;
        }
        Ok(())
    }

    fn next_report(&mut self, sub_frame: OpenSubFrame) -> Result<Section, DecodeError> {
        let header = take(self.buf, self.pos, REPORT_HEADER_LEN, sub_frame.end, "report header")?;
        let kind = SectionKind::from_report_type(header[0]);
        let size = le_u16(header, 2) as usize;
        let offset = self.pos + REPORT_HEADER_LEN;
        take(self.buf, offset, size, sub_frame.end, "report body")?;
        self.pos = offset + size;
        Ok(Section {
            kind,
            sub_frame: sub_frame.index,
            offset,
            len: size,
        })
    }

    fn step(&mut self) -> Result<Option<Section>, DecodeError> {
        loop {
            match self.state {
                WalkState::Done => return Ok(None),
                WalkState::Start => {
                    self.state = if self.enter()? {
                        WalkState::Walking
                    } else {
                        WalkState::Done
                    };
                }
                WalkState::Walking => {
                    if let Some(sub_frame) = self.open {
                        if self.pos < sub_frame.end {
                            return self.next_report(sub_frame).map(Some);
                        }
                        self.open = None;
                    }
                    if self.sub_frames_left == 0 {
                        self.state = WalkState::Done;
                        return Ok(None);
                    }
                    self.sub_frames_left -= 1;
                    self.open_sub_frame()?;
                }
            }
        }
    }
}

impl Iterator for Sections<'_> {
    type Item = Result<Section, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(section) => section.map(Ok),
            Err(err) => {
                self.state = WalkState::Done;
                Some(Err(err))
            }
        }
    }
}

/// One pen sample inside a stylus report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StylusElement {
    pub timestamp: u16,
    pub mode: u16,
    pub x: u16,
    pub y: u16,
    pub pressure: u16,
    pub altitude: u16,
    pub azimuth: u16,
}

impl StylusElement {
    fn from_bytes(raw: &[u8]) -> Self {
        Self {
            timestamp: le_u16(raw, 0),
            mode: le_u16(raw, 2),
            x: le_u16(raw, 4),
            y: le_u16(raw, 6),
            pressure: le_u16(raw, 8),
            altitude: le_u16(raw, 10),
            azimuth: le_u16(raw, 12),
        }
    }

    pub fn in_proximity(&self) -> bool {
        self.mode & STYLUS_MODE_PROXIMITY != 0
    }

    pub fn touching(&self) -> bool {
        self.mode & STYLUS_MODE_TOUCH != 0
    }

    pub fn button(&self) -> bool {
        self.mode & STYLUS_MODE_BUTTON != 0
    }

    pub fn rubber(&self) -> bool {
        self.mode & STYLUS_MODE_RUBBER != 0
    }
}

/// Structural view of a stylus section body. Nothing downstream acts on it.
#[derive(Debug, Clone, Copy)]
pub struct StylusReport<'a> {
    pub serial: u32,
    elements: &'a [u8],
}

impl<'a> StylusReport<'a> {
    pub fn parse(body: &'a [u8]) -> Result<Self, DecodeError> {
        let header = take(body, 0, STYLUS_HEADER_LEN, body.len(), "stylus header")?;
        let count = header[0] as usize;
        let needed = STYLUS_HEADER_LEN + count * STYLUS_ELEMENT_LEN;
        if needed > body.len() {
            return Err(DecodeError::StylusOverrun {
                elements: count,
                len: body.len(),
            });
        }
        Ok(Self {
            serial: le_u32(header, 4),
            elements: &body[STYLUS_HEADER_LEN..needed],
        })
    }

    pub fn len(&self) -> usize {
        self.elements.len() / STYLUS_ELEMENT_LEN
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> impl Iterator<Item = StylusElement> + 'a {
        self.elements
            .chunks_exact(STYLUS_ELEMENT_LEN)
            .map(StylusElement::from_bytes)
    }
}
