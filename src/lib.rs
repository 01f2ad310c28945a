//! Structural JPEG parsing
//!
//! This library splits a JPEG byte stream into its marker segments without
//! decoding any image data:
//! - Incremental splitting of arbitrarily chunked input
//! - Standard 16-bit, implicit and 32-bit extended length fields
//! - Scan data located by searching for the EOI marker
//! - Owned `bytes::Bytes` payloads and an offset-checked segment list
//!
//! # Example
//!
//! ```no_run
//! use jpeg_structure::reader::split_bytes;
//!
//! let data = std::fs::read("photo.jpg").unwrap();
//! let segments = split_bytes(&data).unwrap();
//! segments.validate(&data).unwrap();
//! if let Some(exif) = segments.exif() {
//!     println!("EXIF block: {} bytes", exif.len());
//! }
//! ```

pub mod config;
pub mod error;
pub mod frame;
pub mod marker;
pub mod reader;
pub mod segment;
pub mod splitter;

// Re-exports for convenience
pub use error::{SplitError, ValidationCheck, VisitError};
pub use frame::FrameHeader;
pub use reader::{split_async, split_bytes, split_reader, DriveError, DriveOptions, DriveSummary};
pub use segment::{Segment, SegmentList, SegmentStats, WriteError};
pub use splitter::{FrameVisitor, SegmentEvent, SegmentVisitor, Splitter, Step, Visitor};
