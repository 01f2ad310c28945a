//! Writing a segment list back out as a JPEG stream

use super::{Segment, SegmentList};
use crate::marker::{self, LengthClass};
use bytes::{BufMut, BytesMut};
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to write segment: {0}")]
    Io(#[from] std::io::Error),

    #[error("segment {index} (marker {marker:#04x}): {len} payload bytes do not fit the length field")]
    PayloadTooLarge { index: usize, marker: u8, len: usize },

    #[error("segment {index} (marker {marker:#04x}) has no length field but carries {len} payload bytes")]
    UnexpectedPayload { index: usize, marker: u8, len: usize },
}

/// Encodes `0xFF id [length]` for one marker segment.
fn encode_header(index: usize, segment: &Segment) -> Result<BytesMut, WriteError> {
    let class = segment.length_class();
    let len = segment.payload.len();
    let mut header = BytesMut::with_capacity(class.header_size());

    header.put_u8(marker::PREFIX);
    header.put_u8(segment.marker_id);

    match class {
        LengthClass::Implicit => {
            if len != 0 {
                return Err(WriteError::UnexpectedPayload {
                    index,
                    marker: segment.marker_id,
                    len,
                });
            }
        }
        LengthClass::Standard16 => {
            let field = u16::try_from(len + 2).map_err(|_| WriteError::PayloadTooLarge {
                index,
                marker: segment.marker_id,
                len,
            })?;
            header.put_u16(field);
        }
        LengthClass::Extended32 => {
            let field = u32::try_from(len + 4).map_err(|_| WriteError::PayloadTooLarge {
                index,
                marker: segment.marker_id,
                len,
            })?;
            header.put_u32(field);
        }
    }

    Ok(header)
}

impl SegmentList {
    /// Writes every segment in order and returns the number of bytes written.
    /// Scan data is written raw.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize, WriteError> {
        let mut written = 0;

        for (index, segment) in self.iter().enumerate() {
            if !segment.is_scan_data() {
                let header = encode_header(index, segment)?;
                writer.write_all(&header)?;
                written += header.len();
            }

            writer.write_all(&segment.payload)?;
            written += segment.payload.len();
        }

        Ok(written)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, WriteError> {
        let capacity: usize = self.iter().map(Segment::encoded_len).sum();
        let mut out = Vec::with_capacity(capacity);
        self.write_to(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_write_minimal() {
        let list = SegmentList::from(vec![
            Segment::new(marker::SOI, 0, Bytes::new()),
            Segment::new(marker::COM, 2, Bytes::from_static(b"ok")),
            Segment::new(marker::SOS, 8, Bytes::new()),
            Segment::scan_data(10, Bytes::from_static(&[0xAB, 0xCD])),
            Segment::new(marker::EOI, 12, Bytes::new()),
        ]);

        let bytes = list.to_bytes().unwrap();
        assert_eq!(
            bytes,
            vec![
                0xFF, 0xD8, 0xFF, 0xFE, 0x00, 0x04, b'o', b'k', 0xFF, 0xDA, 0xAB, 0xCD, 0xFF,
                0xD9
            ]
        );
        list.validate(&bytes).unwrap();
    }

    #[test]
    fn test_extended_length_field() {
        let list = SegmentList::from(vec![Segment::new(0x74, 0, Bytes::from_static(&[9, 9]))]);
        let bytes = list.to_bytes().unwrap();
        assert_eq!(bytes, vec![0xFF, 0x74, 0x00, 0x00, 0x00, 0x06, 9, 9]);
    }

    #[test]
    fn test_payload_too_large() {
        let big = Bytes::from(vec![0u8; 0xFFFE]);
        let list = SegmentList::from(vec![Segment::new(marker::APP1, 0, big)]);

        let result = list.to_bytes();
        assert!(matches!(
            result,
            Err(WriteError::PayloadTooLarge { index: 0, marker: 0xE1, .. })
        ));
    }

    #[test]
    fn test_implicit_marker_with_payload() {
        let list = SegmentList::from(vec![Segment::new(marker::SOI, 0, Bytes::from_static(&[1]))]);
        assert!(matches!(
            list.to_bytes(),
            Err(WriteError::UnexpectedPayload { .. })
        ));
    }
}
