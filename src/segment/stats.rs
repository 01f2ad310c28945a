//! Segment list statistics

use super::SegmentList;
use crate::marker;
use serde::{Deserialize, Serialize};

/// Byte and segment counts for one split JPEG
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentStats {
    /// All entries, scan data included
    pub segments: usize,

    /// Marker segments only
    pub structural: usize,

    /// Entropy-coded bytes
    pub scan_data_bytes: u64,

    /// APPn and COM payload bytes
    pub metadata_bytes: u64,

    /// Size of the list when written back out
    pub total_bytes: u64,
}

impl SegmentStats {
    pub fn collect(list: &SegmentList) -> Self {
        let mut stats = Self::default();

        for segment in list.iter() {
            stats.segments += 1;
            stats.total_bytes += segment.encoded_len() as u64;

            if segment.is_scan_data() {
                stats.scan_data_bytes += segment.payload.len() as u64;
                continue;
            }

            stats.structural += 1;
            if marker::is_app(segment.marker_id) || segment.marker_id == marker::COM {
                stats.metadata_bytes += segment.payload.len() as u64;
            }
        }

        stats
    }

    /// Share of the file taken by metadata payloads
    pub fn metadata_ratio(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }

        self.metadata_bytes as f64 / self.total_bytes as f64
    }
}

impl SegmentList {
    pub fn stats(&self) -> SegmentStats {
        SegmentStats::collect(self)
    }
}
