//! Chunked drivers that feed a [`Splitter`] from a byte source
//!
//! The driver owns the window buffer: it reads a chunk, appends it to the
//! unconsumed remainder, and lets the splitter consume as many whole segments
//! as it can before reading again.

use crate::error::SplitError;
use crate::segment::SegmentList;
use crate::splitter::{Splitter, Step};
use bytes::{Buf, BytesMut};
use std::io::{ErrorKind, Read};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

/// Default read size
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

#[derive(Error, Debug)]
pub enum DriveError {
    #[error("failed to read JPEG data: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error("stream ended before EOI at offset {offset:#010x} ({buffered} bytes unconsumed)")]
    Unterminated { offset: usize, buffered: usize },

    /// Strict drives stop at the first read past EOI, so the count covers
    /// what had been read by then, not the rest of the source.
    #[error("{0} bytes of trailing data after EOI")]
    TrailingData(usize),
}

/// How a driver treats the stream around the segments it splits.
#[derive(Debug, Clone, Copy)]
pub struct DriveOptions {
    pub chunk_size: usize,
    pub allow_trailing_data: bool,
}

impl Default for DriveOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            allow_trailing_data: true,
        }
    }
}

/// What a completed drive saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveSummary {
    /// Bytes pulled from the source
    pub bytes_read: u64,

    /// Bytes found after EOI
    pub trailing_bytes: u64,

    /// Number of reads issued
    pub reads: u64,
}

/// Window state shared by the blocking and async drivers.
struct Window {
    buffer: BytesMut,
    summary: DriveSummary,
    eof: bool,
}

impl Window {
    fn new(chunk_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(chunk_size),
            summary: DriveSummary::default(),
            eof: false,
        }
    }

    fn record_read(&mut self, n: usize) {
        self.summary.reads += 1;
        if n == 0 {
            self.eof = true;
        } else {
            self.summary.bytes_read += n as u64;
        }
    }

    /// Runs the splitter over the buffer until it needs more data or is done.
    /// Returns true once EOI has been consumed.
    fn drain(&mut self, splitter: &mut Splitter<'_>) -> Result<bool, DriveError> {
        while !splitter.is_finished() {
            match splitter.split(&self.buffer, self.eof)? {
                Step::Advance(n) => self.buffer.advance(n),
                Step::NeedMoreData if self.eof => {
                    return Err(DriveError::Unterminated {
                        offset: splitter.offset(),
                        buffered: self.buffer.len(),
                    });
                }
                Step::NeedMoreData => return Ok(false),
            }
        }
        Ok(true)
    }

    fn finish(
        mut self,
        splitter: &Splitter<'_>,
        extra: u64,
        options: &DriveOptions,
    ) -> Result<DriveSummary, DriveError> {
        self.summary.trailing_bytes = self.buffer.len() as u64 + extra;
        self.summary.bytes_read += extra;

        if self.summary.trailing_bytes > 0 {
            if !options.allow_trailing_data {
                return Err(DriveError::TrailingData(self.summary.trailing_bytes as usize));
            }
            warn!(bytes = self.summary.trailing_bytes, "Trailing data after EOI");
        }

        info!(
            segments = splitter.segments().len(),
            bytes = self.summary.bytes_read,
            reads = self.summary.reads,
            "Split complete"
        );
        Ok(self.summary)
    }
}

/// Reads once, retrying reads interrupted by a signal.
fn read_chunk<R: Read>(reader: &mut R, chunk: &mut [u8]) -> std::io::Result<usize> {
    loop {
        match reader.read(chunk) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

async fn read_chunk_async<R: AsyncRead + Unpin>(
    reader: &mut R,
    chunk: &mut [u8],
) -> std::io::Result<usize> {
    loop {
        match reader.read(chunk).await {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

/// Drives `splitter` over a blocking reader until EOI.
///
/// On error the splitter still holds every segment completed so far.
pub fn split_reader<R: Read>(
    mut reader: R,
    splitter: &mut Splitter<'_>,
    options: &DriveOptions,
) -> Result<DriveSummary, DriveError> {
    let chunk_size = options.chunk_size.max(1);
    let mut window = Window::new(chunk_size);
    let mut chunk = vec![0u8; chunk_size];

    loop {
        let n = read_chunk(&mut reader, &mut chunk)?;
        window.record_read(n);
        window.buffer.extend_from_slice(&chunk[..n]);
        debug!(read = n, buffered = window.buffer.len(), "Read chunk");

        if window.drain(splitter)? {
            break;
        }
    }

    let extra = if options.allow_trailing_data {
        // Count what is left without keeping it.
        std::io::copy(&mut reader, &mut std::io::sink())?
    } else if window.buffer.is_empty() && !window.eof {
        // One more read decides; the source may never end.
        read_chunk(&mut reader, &mut chunk)? as u64
    } else {
        0
    };
    window.finish(splitter, extra, options)
}

/// Drives `splitter` over an async reader until EOI.
pub async fn split_async<R: AsyncRead + Unpin>(
    mut reader: R,
    splitter: &mut Splitter<'_>,
    options: &DriveOptions,
) -> Result<DriveSummary, DriveError> {
    let chunk_size = options.chunk_size.max(1);
    let mut window = Window::new(chunk_size);
    let mut chunk = vec![0u8; chunk_size];

    loop {
        let n = read_chunk_async(&mut reader, &mut chunk).await?;
        window.record_read(n);
        window.buffer.extend_from_slice(&chunk[..n]);
        debug!(read = n, buffered = window.buffer.len(), "Read chunk");

        if window.drain(splitter)? {
            break;
        }
    }

    let extra = if options.allow_trailing_data {
        tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?
    } else if window.buffer.is_empty() && !window.eof {
        read_chunk_async(&mut reader, &mut chunk).await? as u64
    } else {
        0
    };
    window.finish(splitter, extra, options)
}

/// Splits a complete in-memory JPEG in one pass.
pub fn split_bytes(data: &[u8]) -> Result<SegmentList, SplitError> {
    let mut splitter = Splitter::new();
    let mut rest = data;

    while !splitter.is_finished() {
        match splitter.split(rest, true)? {
            Step::Advance(n) => rest = &rest[n..],
            Step::NeedMoreData => {
                return Err(SplitError::malformed(
                    splitter.offset(),
                    splitter.marker_id(),
                    "stream ended before EOI",
                ));
            }
        }
    }

    Ok(splitter.into_segments())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const MINIMAL: [u8; 10] = [0xFF, 0xD8, 0xFF, 0xDA, 0x01, 0x02, 0x03, 0x04, 0xFF, 0xD9];

    #[test]
    fn test_split_bytes() {
        let segments = split_bytes(&MINIMAL).unwrap();
        assert_eq!(segments.len(), 4);
        segments.validate(&MINIMAL).unwrap();
    }

    #[test]
    fn test_split_bytes_unterminated() {
        let result = split_bytes(&MINIMAL[..8]);
        assert!(matches!(result, Err(SplitError::MalformedSegment { .. })));
    }

    #[test]
    fn test_split_reader_one_byte_chunks() {
        let mut splitter = Splitter::new();
        let options = DriveOptions {
            chunk_size: 1,
            ..Default::default()
        };
        let summary = split_reader(Cursor::new(MINIMAL), &mut splitter, &options).unwrap();

        assert_eq!(summary.bytes_read, 10);
        assert_eq!(summary.trailing_bytes, 0);
        assert_eq!(splitter.into_segments(), split_bytes(&MINIMAL).unwrap());
    }

    #[test]
    fn test_split_reader_unterminated() {
        let mut splitter = Splitter::new();
        let result = split_reader(
            Cursor::new(&MINIMAL[..9]),
            &mut splitter,
            &DriveOptions::default(),
        );

        assert!(matches!(
            result,
            Err(DriveError::Unterminated {
                offset: 4,
                buffered: 5
            })
        ));
        assert_eq!(splitter.segments().len(), 2);
    }

    #[test]
    fn test_trailing_data() {
        let mut data = MINIMAL.to_vec();
        data.extend(&[0u8; 7]);

        let mut splitter = Splitter::new();
        let summary =
            split_reader(Cursor::new(&data), &mut splitter, &DriveOptions::default()).unwrap();
        assert_eq!(summary.trailing_bytes, 7);

        // Reads of 4 end at byte 12: two bytes past EOI are already buffered.
        let strict = DriveOptions {
            chunk_size: 4,
            allow_trailing_data: false,
        };
        let mut splitter = Splitter::new();
        let result = split_reader(Cursor::new(&data), &mut splitter, &strict);
        assert!(matches!(result, Err(DriveError::TrailingData(2))));
    }

    #[test]
    fn test_strict_stops_on_endless_source() {
        let endless = Read::chain(Cursor::new(MINIMAL), std::io::repeat(0));

        let strict = DriveOptions {
            chunk_size: 5,
            allow_trailing_data: false,
        };
        let mut splitter = Splitter::new();
        let result = split_reader(endless, &mut splitter, &strict);

        // EOI ends exactly on a chunk boundary, so one extra read is issued.
        assert!(matches!(result, Err(DriveError::TrailingData(5))));
        assert!(splitter.is_finished());
    }

    #[test]
    fn test_strict_clean_end() {
        let strict = DriveOptions {
            chunk_size: 5,
            allow_trailing_data: false,
        };
        let mut splitter = Splitter::new();
        let summary = split_reader(Cursor::new(MINIMAL), &mut splitter, &strict).unwrap();
        assert_eq!(summary.trailing_bytes, 0);
        assert_eq!(summary.bytes_read, 10);
    }

    /// Fails every other read with `Interrupted`.
    struct Interrupting<R> {
        inner: R,
        interrupt: bool,
    }

    impl<R: Read> Read for Interrupting<R> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(std::io::Error::new(ErrorKind::Interrupted, "signal"));
            }
            self.inner.read(buf)
        }
    }

    #[test]
    fn test_interrupted_reads_are_retried() {
        let reader = Interrupting {
            inner: Cursor::new(MINIMAL),
            interrupt: false,
        };
        let options = DriveOptions {
            chunk_size: 3,
            ..Default::default()
        };
        let mut splitter = Splitter::new();
        let summary = split_reader(reader, &mut splitter, &options).unwrap();

        assert_eq!(summary.bytes_read, 10);
        assert_eq!(splitter.into_segments(), split_bytes(&MINIMAL).unwrap());
    }
}
