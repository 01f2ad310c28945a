//! Callbacks invoked by the splitter as segments complete

use crate::error::VisitError;
use crate::frame::FrameHeader;

/// What the per-segment callback is told about a completed segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentEvent {
    pub marker_id: u8,
    pub marker_name: &'static str,

    /// Structural segments completed so far, this one included
    pub counter: usize,

    /// Whether this is a scan-data block
    pub is_scan_data: bool,
}

/// Called once for every completed segment, scan data included. Returning an
/// error stops the scan.
pub trait SegmentVisitor {
    fn handle_segment(&mut self, event: &SegmentEvent) -> Result<(), VisitError>;
}

/// Called with the decoded header of every Start-Of-Frame segment.
pub trait FrameVisitor {
    fn handle_frame(&mut self, frame: &FrameHeader) -> Result<(), VisitError>;
}

/// A type that wants both callbacks.
pub trait FullVisitor: SegmentVisitor + FrameVisitor {}

impl<T: SegmentVisitor + FrameVisitor> FullVisitor for T {}

/// Callbacks handed to a [`Splitter`](super::Splitter) at construction.
pub enum Visitor<'a> {
    Segments(&'a mut dyn SegmentVisitor),
    Frames(&'a mut dyn FrameVisitor),
    Both(&'a mut dyn FullVisitor),
}

impl Visitor<'_> {
    pub(crate) fn wants_frames(&self) -> bool {
        matches!(self, Visitor::Frames(_) | Visitor::Both(_))
    }

    pub(crate) fn segment(&mut self, event: &SegmentEvent) -> Result<(), VisitError> {
        match self {
            Visitor::Segments(v) => v.handle_segment(event),
            Visitor::Both(v) => v.handle_segment(event),
            Visitor::Frames(_) => Ok(()),
        }
    }

    pub(crate) fn frame(&mut self, frame: &FrameHeader) -> Result<(), VisitError> {
        match self {
            Visitor::Frames(v) => v.handle_frame(frame),
            Visitor::Both(v) => v.handle_frame(frame),
            Visitor::Segments(_) => Ok(()),
        }
    }
}

/// Records every event it sees. Handy for progress output and tests.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<SegmentEvent>,
    pub frames: Vec<FrameHeader>,
}

impl SegmentVisitor for Recorder {
    fn handle_segment(&mut self, event: &SegmentEvent) -> Result<(), VisitError> {
        self.events.push(*event);
        Ok(())
    }
}

impl FrameVisitor for Recorder {
    fn handle_frame(&mut self, frame: &FrameHeader) -> Result<(), VisitError> {
        self.frames.push(*frame);
        Ok(())
    }
}
