//! Start-Of-Frame header decoding

use crate::error::SplitError;
use serde::Serialize;
use std::fmt;

/// Bytes of the SOF payload that carry the frame header.
pub const FRAME_HEADER_SIZE: usize = 6;

/// Fixed part of a Start-Of-Frame payload.
///
/// ```text
/// +-----+--------+-------+------------+
/// | P   | Y (BE) | X (BE)| Nf         |
/// | u8  | u16    | u16   | u8         |
/// +-----+--------+-------+------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameHeader {
    /// Sample precision in bits
    pub bits_per_sample: u8,

    /// Number of lines
    pub height: u16,

    /// Samples per line
    pub width: u16,

    /// Number of image components
    pub component_count: u8,
}

impl FrameHeader {
    /// Decodes the frame header from a SOF payload (length field excluded).
    ///
    /// Values are not range checked.
    pub fn parse(payload: &[u8]) -> Result<Self, SplitError> {
        if payload.len() < FRAME_HEADER_SIZE {
            return Err(SplitError::TruncatedPayload {
                needed: FRAME_HEADER_SIZE,
                found: payload.len(),
            });
        }

        Ok(Self {
            bits_per_sample: payload[0],
            height: u16::from_be_bytes([payload[1], payload[2]]),
            width: u16::from_be_bytes([payload[3], payload[4]]),
            component_count: payload[5],
        })
    }
}

impl fmt::Display for FrameHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SOF<BitsPerSample=({}) Width=({}) Height=({}) ComponentCount=({})>",
            self.bits_per_sample, self.width, self.height, self.component_count
        )
    }
}
