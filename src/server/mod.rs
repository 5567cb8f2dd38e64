//! In-process stand-in for the analysis server's timeline endpoints.

pub mod analysis;
pub mod archive;
pub mod segmenter;
pub mod timeline;

pub use archive::{ArchiveError, FileTimelineArchive, TimelineArchive};
pub use segmenter::{FixedSegmentation, Segmenter};
pub use timeline::LocalTimeline;
