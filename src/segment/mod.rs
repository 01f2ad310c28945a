//! Segment records and the ordered segment list
//!
//! A [`Segment`] is one marker-delimited unit of a JPEG file, or one block of
//! entropy-coded scan data. Payloads are owned copies, independent of whatever
//! buffer the splitter was reading from.

mod stats;
mod write;

pub use stats::SegmentStats;
pub use write::WriteError;

use crate::error::{SplitError, ValidationCheck};
use crate::frame::FrameHeader;
use crate::marker::{self, LengthClass};
use bytes::Bytes;
use serde::Serialize;
use std::fmt::Write as _;
use std::ops::Deref;

/// Exif identifier code "Exif\0\0" at the start of an APP1 payload.
pub const EXIF_ID: [u8; 6] = [0x45, 0x78, 0x69, 0x66, 0x00, 0x00];

/// One structural unit of a JPEG stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Marker id, `0x00` for scan data
    pub marker_id: u8,

    /// Registry name, `"!SCANDATA"` for scan data, empty if unknown
    pub marker_name: &'static str,

    /// Offset of the `0xFF` preceding the marker id (scan data: first byte)
    pub offset: usize,

    /// Body without marker and length field
    pub payload: Bytes,
}

impl Segment {
    pub fn new(marker_id: u8, offset: usize, payload: Bytes) -> Self {
        Self {
            marker_id,
            marker_name: marker::marker_name(marker_id),
            offset,
            payload,
        }
    }

    pub fn scan_data(offset: usize, payload: Bytes) -> Self {
        Self {
            marker_id: marker::SCAN_DATA,
            marker_name: marker::SCAN_DATA_NAME,
            offset,
            payload,
        }
    }

    pub fn is_scan_data(&self) -> bool {
        self.marker_id == marker::SCAN_DATA
    }

    /// Bytes this segment occupies when written back out.
    pub fn encoded_len(&self) -> usize {
        if self.is_scan_data() {
            self.payload.len()
        } else {
            marker::length_class(self.marker_id).header_size() + self.payload.len()
        }
    }

    pub fn length_class(&self) -> LengthClass {
        marker::length_class(self.marker_id)
    }
}

/// Serializable one-line view of a segment.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentSummary {
    pub index: usize,
    pub marker_id: u8,
    pub marker_name: &'static str,
    pub offset: usize,
    pub length: usize,
}

/// Segments in stream order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentList {
    segments: Vec<Segment>,
}

impl SegmentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn into_vec(self) -> Vec<Segment> {
        self.segments
    }

    /// Checks that the list describes `data`: SOI first, EOI last, strictly
    /// increasing offsets, and every marker found where it was recorded.
    pub fn validate(&self, data: &[u8]) -> Result<(), SplitError> {
        let fail = |index: usize, check: ValidationCheck| -> Result<(), SplitError> {
            Err(SplitError::StructuralInconsistency { index, check })
        };

        if self.segments.len() < 2 {
            return fail(0, ValidationCheck::TooFewSegments);
        }

        if self.segments[0].marker_id != marker::SOI {
            return fail(0, ValidationCheck::FirstNotSoi);
        }

        let last = self.segments.len() - 1;
        if self.segments[last].marker_id != marker::EOI {
            return fail(last, ValidationCheck::LastNotEoi);
        }

        let mut previous: Option<usize> = None;
        for (index, segment) in self.segments.iter().enumerate() {
            let offset = segment.offset;

            if let Some(previous) = previous {
                if offset <= previous {
                    return fail(index, ValidationCheck::OffsetNotIncreasing { offset, previous });
                }
            }
            previous = Some(offset);

            // Scan data does not start with a marker.
            if segment.is_scan_data() {
                continue;
            }

            let found = offset
                .checked_add(2)
                .and_then(|end| data.get(offset..end));
            if found != Some(&[marker::PREFIX, segment.marker_id][..]) {
                return fail(
                    index,
                    ValidationCheck::MarkerMismatch {
                        offset,
                        expected: segment.marker_id,
                    },
                );
            }
        }

        Ok(())
    }

    /// First segment with `marker_id`.
    pub fn find(&self, marker_id: u8) -> Option<&Segment> {
        self.segments.iter().find(|s| s.marker_id == marker_id)
    }

    /// Every segment with `marker_id`, in stream order.
    pub fn find_all(&self, marker_id: u8) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(move |s| s.marker_id == marker_id)
    }

    /// EXIF block of the first APP1 segment that carries one, identifier
    /// stripped.
    pub fn exif(&self) -> Option<Bytes> {
        self.find_all(marker::APP1)
            .find(|s| s.payload.starts_with(&EXIF_ID))
            .map(|s| s.payload.slice(EXIF_ID.len()..))
    }

    /// Frame header of the first Start-Of-Frame segment.
    pub fn frame_header(&self) -> Result<Option<FrameHeader>, SplitError> {
        self.segments
            .iter()
            .find(|s| marker::is_sof(s.marker_id))
            .map(|s| FrameHeader::parse(&s.payload))
            .transpose()
    }

    /// Copy of the list without the segments matching `remove`. Offsets are
    /// recomputed for the rewritten layout.
    pub fn without<F>(&self, mut remove: F) -> SegmentList
    where
        F: FnMut(&Segment) -> bool,
    {
        let mut offset = 0;
        let segments = self
            .segments
            .iter()
            .filter(|s| !remove(s))
            .map(|s| {
                let mut kept = s.clone();
                kept.offset = offset;
                offset += kept.encoded_len();
                kept
            })
            .collect();

        SegmentList { segments }
    }

    pub fn summaries(&self) -> Vec<SegmentSummary> {
        self.segments
            .iter()
            .enumerate()
            .map(|(index, s)| SegmentSummary {
                index,
                marker_id: s.marker_id,
                marker_name: s.marker_name,
                offset: s.offset,
                length: s.payload.len(),
            })
            .collect()
    }

    /// Human-readable listing, one segment per line.
    pub fn dump(&self) -> String {
        if self.segments.is_empty() {
            return "No segments.\n".to_string();
        }

        let mut out = String::new();
        for (i, s) in self.segments.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:2}: ID=(0x{:02x}) NAME=({}) OFFSET=(0x{:08x} {}) LEN=({})",
                i,
                s.marker_id,
                s.marker_name,
                s.offset,
                s.offset,
                s.payload.len()
            );
        }
        out
    }
}

impl Deref for SegmentList {
    type Target = [Segment];

    fn deref(&self) -> &Self::Target {
        &self.segments
    }
}

impl From<Vec<Segment>> for SegmentList {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

impl IntoIterator for SegmentList {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

impl<'a> IntoIterator for &'a SegmentList {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // SOI, APP1 (Exif), SOS, scan data, EOI
    fn sample() -> (Vec<u8>, SegmentList) {
        let mut data = vec![0xFF, 0xD8];
        data.extend(&[0xFF, 0xE1, 0x00, 0x0A]);
        data.extend(&EXIF_ID);
        data.extend(&[0x4D, 0x4D]);
        data.extend(&[0xFF, 0xDA]);
        data.extend(&[0x11, 0x22, 0x33]);
        data.extend(&[0xFF, 0xD9]);

        let list = SegmentList::from(vec![
            Segment::new(marker::SOI, 0, Bytes::new()),
            Segment::new(marker::APP1, 2, Bytes::copy_from_slice(&data[6..14])),
            Segment::new(marker::SOS, 14, Bytes::new()),
            Segment::scan_data(16, Bytes::copy_from_slice(&data[16..19])),
            Segment::new(marker::EOI, 19, Bytes::new()),
        ]);

        (data, list)
    }

    fn check_of(result: Result<(), SplitError>) -> (usize, ValidationCheck) {
        match result {
            Err(SplitError::StructuralInconsistency { index, check }) => (index, check),
            other => panic!("expected structural inconsistency, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_ok() {
        let (data, list) = sample();
        list.validate(&data).unwrap();
    }

    #[test]
    fn test_validate_too_few() {
        let list = SegmentList::from(vec![Segment::new(marker::SOI, 0, Bytes::new())]);
        let (index, check) = check_of(list.validate(&[0xFF, 0xD8]));
        assert_eq!(index, 0);
        assert_eq!(check, ValidationCheck::TooFewSegments);
    }

    #[test]
    fn test_validate_first_not_soi() {
        let (data, list) = sample();
        let list = list.without(|s| s.marker_id == marker::SOI);
        assert_eq!(check_of(list.validate(&data)).1, ValidationCheck::FirstNotSoi);
    }

    #[test]
    fn test_validate_last_not_eoi() {
        let (data, list) = sample();
        let mut segments = list.into_vec();
        segments.pop();
        let (index, check) = check_of(SegmentList::from(segments).validate(&data));
        assert_eq!(index, 3);
        assert_eq!(check, ValidationCheck::LastNotEoi);
    }

    #[test]
    fn test_validate_offsets_must_increase() {
        let (data, list) = sample();
        let mut segments = list.into_vec();
        segments[3].offset = 14;
        let (index, check) = check_of(SegmentList::from(segments).validate(&data));
        assert_eq!(index, 3);
        assert!(matches!(check, ValidationCheck::OffsetNotIncreasing { offset: 14, previous: 14 }));
    }

    #[test]
    fn test_validate_marker_mismatch() {
        let (data, list) = sample();
        let mut segments = list.into_vec();
        segments[1].offset = 3;
        let (index, check) = check_of(SegmentList::from(segments).validate(&data));
        assert_eq!(index, 1);
        assert!(matches!(check, ValidationCheck::MarkerMismatch { offset: 3, expected: 0xE1 }));
    }

    #[test]
    fn test_validate_offset_past_end() {
        let (data, list) = sample();
        let mut segments = list.into_vec();
        segments[4].offset = data.len() + 10;
        let (index, _) = check_of(SegmentList::from(segments).validate(&data));
        assert_eq!(index, 4);
    }

    #[test]
    fn test_exif_lookup() {
        let (_, list) = sample();
        assert_eq!(list.exif().unwrap().as_ref(), &[0x4D, 0x4D]);
    }

    #[test]
    fn test_without_recomputes_offsets() {
        let (_, list) = sample();
        let stripped = list.without(|s| s.marker_id == marker::APP1);

        assert_eq!(stripped.len(), 4);
        let offsets: Vec<usize> = stripped.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0, 2, 4, 7]);
        assert!(stripped.exif().is_none());
    }

    #[test]
    fn test_frame_header_absent() {
        let (_, list) = sample();
        assert_eq!(list.frame_header().unwrap(), None);
    }

    #[test]
    fn test_dump() {
        let (_, list) = sample();
        let text = list.dump();
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("NAME=(!SCANDATA)"));
        assert_eq!(SegmentList::new().dump(), "No segments.\n");
    }
}
