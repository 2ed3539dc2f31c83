// THEORY:
// Frames reach the pipeline as fixed-size byte buffers. Two sources exist:
// - The device node, where one `read` call returns one whole report. A read
//   that returns fewer bytes is a short read and the cycle is dropped.
// - A capture file of back-to-back reports. Here a `read` may stop anywhere,
//   so the reader keeps filling until the buffer is full or the file ends.
// The reader owns a single buffer reused for every frame.

use tokio::io::{AsyncRead, AsyncReadExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// One read per report.
    Device,
    /// Reports concatenated in a file.
    Capture,
}

/// Result of one read cycle.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome<'a> {
    /// A full report.
    Frame(&'a [u8]),
    /// Fewer bytes than one report. Handing this to the pipeline yields
    /// `PipelineError::ShortRead`.
    Short(&'a [u8]),
    /// The source returned no bytes.
    Eof,
}

#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    mode: ReadMode,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R, mode: ReadMode, frame_size: usize) -> Self {
        Self {
            inner,
            mode,
            buffer: vec![0; frame_size],
        }
    }

    pub fn device(inner: R, frame_size: usize) -> Self {
        Self::new(inner, ReadMode::Device, frame_size)
    }

    pub fn capture(inner: R, frame_size: usize) -> Self {
        Self::new(inner, ReadMode::Capture, frame_size)
    }

    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    pub async fn next_frame(&mut self) -> std::io::Result<ReadOutcome<'_>> {
        let filled = match self.mode {
            ReadMode::Device => self.inner.read(&mut self.buffer).await?,
            ReadMode::Capture => {
                let mut filled = 0;
                while filled < self.buffer.len() {
                    let n = self.inner.read(&mut self.buffer[filled..]).await?;
                    if n == 0 {
                        break;
                    }
                    filled += n;
                }
                filled
            }
        };

        Ok(if filled == 0 {
            ReadOutcome::Eof
        } else if filled < self.buffer.len() {
            ReadOutcome::Short(&self.buffer[..filled])
        } else {
            ReadOutcome::Frame(&self.buffer)
        })
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn capture_mode_fills_across_partial_reads() {
        let first = [1u8; 3];
        let second = [2u8; 5];
        let mut reader = FrameReader::capture((&first[..]).chain(&second[..]), 4);

        assert_eq!(reader.next_frame().await.expect("read"), ReadOutcome::Frame(&[1, 1, 1, 2]));
        assert_eq!(reader.next_frame().await.expect("read"), ReadOutcome::Frame(&[2, 2, 2, 2]));
        assert_eq!(reader.next_frame().await.expect("read"), ReadOutcome::Eof);
    }

    #[tokio::test]
    async fn capture_mode_reports_a_trailing_partial_frame() {
        let data = [7u8; 6];
        let mut reader = FrameReader::capture(&data[..], 4);
        assert!(matches!(reader.next_frame().await.expect("read"), ReadOutcome::Frame(_)));
        assert_eq!(reader.next_frame().await.expect("read"), ReadOutcome::Short(&[7, 7]));
        assert_eq!(reader.next_frame().await.expect("read"), ReadOutcome::Eof);
    }

    #[tokio::test]
    async fn device_mode_treats_a_partial_read_as_short() {
        let first = [1u8; 3];
        let second = [2u8; 4];
        let mut reader = FrameReader::device((&first[..]).chain(&second[..]), 4);

        assert_eq!(reader.next_frame().await.expect("read"), ReadOutcome::Short(&[1, 1, 1]));
        assert_eq!(reader.next_frame().await.expect("read"), ReadOutcome::Frame(&[2, 2, 2, 2]));
        assert_eq!(reader.mode(), ReadMode::Device);
    }
}
