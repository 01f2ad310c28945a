//! Incremental JPEG segment splitter
//!
//! [`Splitter::split`] is handed whatever bytes are currently available and
//! either consumes one complete segment from the front of the window or asks
//! for more data. It never consumes a partial segment, so a caller can feed it
//! arbitrarily small fragments: append newly read bytes to the unconsumed
//! remainder and call again.
//!
//! ```text
//!   magic check ──► marker mode ──(SOS)──► scan-data mode
//!                      ▲                        │
//!                      └──────(FF D9 found)─────┘
//! ```

mod visitor;

pub use visitor::{FrameVisitor, FullVisitor, Recorder, SegmentEvent, SegmentVisitor, Visitor};

use crate::error::SplitError;
use crate::frame::FrameHeader;
use crate::marker::{self, LengthClass};
use crate::segment::{Segment, SegmentList};
use bytes::Bytes;
use tracing::{debug, trace};

/// Outcome of one [`Splitter::split`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing consumed; call again with a longer window.
    NeedMoreData,

    /// This many bytes were consumed from the front of the window.
    Advance(usize),
}

/// State of one scan session.
pub struct Splitter<'a> {
    last_marker_id: u8,
    last_marker_name: &'static str,
    counter: usize,
    last_is_scan_data: bool,
    current_offset: usize,
    segments: SegmentList,
    visitor: Option<Visitor<'a>>,
}

impl Default for Splitter<'_> {
    fn default() -> Self {
        Self {
            last_marker_id: 0,
            last_marker_name: "",
            counter: 0,
            last_is_scan_data: false,
            current_offset: 0,
            segments: SegmentList::new(),
            visitor: None,
        }
    }
}

impl<'a> Splitter<'a> {
    /// Creates a splitter that only accumulates the segment list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a splitter that reports to `visitor` as segments complete.
    pub fn with_visitor(visitor: Visitor<'a>) -> Self {
        Self {
            visitor: Some(visitor),
            ..Self::default()
        }
    }

    pub fn segments(&self) -> &SegmentList {
        &self.segments
    }

    pub fn into_segments(self) -> SegmentList {
        self.segments
    }

    /// Id of the last completed marker segment; zero right after scan data.
    pub fn marker_id(&self) -> u8 {
        self.last_marker_id
    }

    pub fn marker_name(&self) -> &'static str {
        self.last_marker_name
    }

    /// Number of structural segments completed.
    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn is_scan_data(&self) -> bool {
        self.last_is_scan_data
    }

    /// Stream offset of the next unconsumed byte.
    pub fn offset(&self) -> usize {
        self.current_offset
    }

    /// True once EOI has been consumed.
    pub fn is_finished(&self) -> bool {
        self.last_marker_id == marker::EOI
    }

    /// Consumes at most one segment from the front of `data`.
    ///
    /// `at_eof` tells the splitter no more bytes will follow. It does not change
    /// the result: a caller that gets [`Step::NeedMoreData`] with nothing left to
    /// read is looking at a truncated stream.
    pub fn split(&mut self, data: &[u8], at_eof: bool) -> Result<Step, SplitError> {
        if self.counter == 0 {
            if data.len() < 3 {
                debug!(len = data.len(), at_eof, "Not enough data for magic bytes");
                return Ok(Step::NeedMoreData);
            }

            let lead = [data[0], data[1], data[2]];
            if lead == marker::JPEG2000_MAGIC {
                return Err(SplitError::UnsupportedFormat);
            }
            if lead != marker::JPEG_MAGIC {
                return Err(SplitError::NotAJpeg { found: lead });
            }
        }

        trace!(len = data.len(), counter = self.counter, at_eof, "split");

        // Sitting on entropy-coded data: it ends where EOI begins.
        if self.last_marker_id == marker::SOS {
            return self.process_scan_data(data, at_eof);
        }
        self.last_is_scan_data = false;

        let Some(&first) = data.first() else {
            return Ok(Step::NeedMoreData);
        };
        if first != marker::PREFIX {
            return Err(SplitError::malformed(
                self.current_offset,
                first,
                format!("not on a segment marker: found {:#04x}", first),
            ));
        }

        // Any number of 0xFF fill bytes may precede the marker id.
        let Some(id_pos) = data.iter().position(|&b| b != marker::PREFIX) else {
            debug!(fill = data.len(), at_eof, "Not enough data after fill bytes");
            return Ok(Step::NeedMoreData);
        };
        trace!(fill = id_pos - 1, "Skipped fill bytes");

        let marker_id = data[id_pos];
        let offset = self.current_offset + id_pos - 1;
        if marker_id == marker::SCAN_DATA {
            return Err(SplitError::malformed(
                offset,
                marker_id,
                "stuffed 0xFF 0x00 outside of scan data",
            ));
        }

        let class = marker::length_class(marker_id);
        let field_pos = id_pos + 1;
        trace!(marker = marker_id, ?class, "Marker");

        let payload_len = match class {
            LengthClass::Implicit => 0,
            LengthClass::Standard16 => {
                let Some(field) = data.get(field_pos..field_pos + 2) else {
                    debug!(marker = marker_id, at_eof, "Not enough data for length field");
                    return Ok(Step::NeedMoreData);
                };

                // The length counts its own two bytes.
                let len = u16::from_be_bytes([field[0], field[1]]) as usize;
                if len <= 2 {
                    return Err(SplitError::malformed(
                        offset,
                        marker_id,
                        format!("length field {} is not more than two", len),
                    ));
                }
                len - 2
            }
            LengthClass::Extended32 => {
                let Some(field) = data.get(field_pos..field_pos + 4) else {
                    debug!(marker = marker_id, at_eof, "Not enough data for extended length field");
                    return Ok(Step::NeedMoreData);
                };

                let len = u32::from_be_bytes([field[0], field[1], field[2], field[3]]) as usize;
                len.checked_sub(4).ok_or_else(|| {
                    SplitError::malformed(
                        offset,
                        marker_id,
                        format!("extended length field {} is less than four", len),
                    )
                })?
            }
        };

        let payload_pos = field_pos + class.field_size();
        let end = payload_pos.checked_add(payload_len).ok_or_else(|| {
            SplitError::malformed(
                offset,
                marker_id,
                format!("payload length {} overflows the stream offset", payload_len),
            )
        })?;
        let Some(payload) = data.get(payload_pos..end) else {
            debug!(
                marker = marker_id,
                payload_len,
                available = data.len().saturating_sub(payload_pos),
                at_eof,
                "Not enough data for payload"
            );
            return Ok(Step::NeedMoreData);
        };

        debug!(
            marker = marker_id,
            name = marker::marker_name(marker_id),
            offset,
            payload_len,
            "Found whole segment"
        );

        let segment = Segment::new(marker_id, offset, Bytes::copy_from_slice(payload));
        self.segments.push(segment);
        self.current_offset += end;
        self.counter += 1;
        self.last_marker_id = marker_id;
        self.last_marker_name = marker::marker_name(marker_id);

        self.dispatch(marker_id, self.last_marker_name, payload)?;

        Ok(Step::Advance(end))
    }

    fn process_scan_data(&mut self, data: &[u8], at_eof: bool) -> Result<Step, SplitError> {
        // The whole window is searched again on every call.
        let Some(end) = data
            .windows(2)
            .position(|w| w[0] == marker::PREFIX && w[1] == marker::EOI)
        else {
            debug!(buffered = data.len(), at_eof, "Scan data terminator not in window");
            return Ok(Step::NeedMoreData);
        };

        let offset = self.current_offset;
        if end == 0 {
            // An empty block would share its offset with the EOI after it.
            return Err(SplitError::malformed(
                offset,
                marker::SOS,
                "SOS not followed by scan data",
            ));
        }

        self.segments
            .push(Segment::scan_data(offset, Bytes::copy_from_slice(&data[..end])));
        self.current_offset += end;

        // Scan data is not a structural segment, so the counter stays put.
        self.last_is_scan_data = true;
        self.last_marker_id = 0;
        self.last_marker_name = "";

        debug!(offset, len = end, "End of scan data");

        self.dispatch(marker::SCAN_DATA, marker::SCAN_DATA_NAME, &[])?;

        Ok(Step::Advance(end))
    }

    fn dispatch(
        &mut self,
        marker_id: u8,
        marker_name: &'static str,
        payload: &[u8],
    ) -> Result<(), SplitError> {
        let event = SegmentEvent {
            marker_id,
            marker_name,
            counter: self.counter,
            is_scan_data: self.last_is_scan_data,
        };

        let Some(visitor) = self.visitor.as_mut() else {
            return Ok(());
        };

        visitor
            .segment(&event)
            .map_err(SplitError::ObserverFailure)?;

        if marker::is_sof(marker_id) && visitor.wants_frames() {
            let frame = FrameHeader::parse(payload)?;
            debug!(%frame, "Frame header");
            visitor.frame(&frame).map_err(SplitError::ObserverFailure)?;
        }

        Ok(())
    }
}
