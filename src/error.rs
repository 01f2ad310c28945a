//! Errors raised while splitting and validating a JPEG stream

use std::fmt;
use thiserror::Error;

/// Boxed error returned by visitor callbacks.
pub type VisitError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("not a JPEG: leading bytes {found:02X?}")]
    NotAJpeg { found: [u8; 3] },

    #[error("unsupported format: JPEG-2000 codestream")]
    UnsupportedFormat,

    #[error("malformed segment at offset {offset:#010x} (marker {marker:#04x}): {reason}")]
    MalformedSegment {
        offset: usize,
        marker: u8,
        reason: String,
    },

    #[error("truncated payload: need {needed} bytes, found {found}")]
    TruncatedPayload { needed: usize, found: usize },

    #[error("structural inconsistency at segment {index}: {check}")]
    StructuralInconsistency { index: usize, check: ValidationCheck },

    #[error("visitor failed: {0}")]
    ObserverFailure(#[source] VisitError),
}

/// The structural rule a segment list broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCheck {
    /// Fewer than two segments.
    TooFewSegments,
    /// First segment is not SOI.
    FirstNotSoi,
    /// Last segment is not EOI.
    LastNotEoi,
    /// Offset not greater than the previous one.
    OffsetNotIncreasing { offset: usize, previous: usize },
    /// Bytes at the recorded offset are not `0xFF` + marker id.
    MarkerMismatch { offset: usize, expected: u8 },
}

impl fmt::Display for ValidationCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationCheck::TooFewSegments => write!(f, "minimum segments not found"),
            ValidationCheck::FirstNotSoi => write!(f, "first segment not SOI"),
            ValidationCheck::LastNotEoi => write!(f, "last segment not EOI"),
            ValidationCheck::OffsetNotIncreasing { offset, previous } => write!(
                f,
                "segment offset not greater than the last: ({:#010x}) <= ({:#010x})",
                offset, previous
            ),
            ValidationCheck::MarkerMismatch { offset, expected } => write!(
                f,
                "offset {:#010x} does not point to marker 0xFF {:#04x}",
                offset, expected
            ),
        }
    }
}

impl SplitError {
    pub(crate) fn malformed(offset: usize, marker: u8, reason: impl Into<String>) -> Self {
        SplitError::MalformedSegment {
            offset,
            marker,
            reason: reason.into(),
        }
    }
}
