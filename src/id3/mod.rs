// ID3 metadata handling module
pub mod file;
pub mod frames;
pub mod header;
pub mod timestamp;
pub mod unsync;
pub mod v1;
pub mod v2;

pub use file::MpegFile;
pub use frames::Frame;
pub use header::{FrameId, Version};
pub use timestamp::Timestamp;
pub use v1::Id3v1Tag;
pub use v2::Id3v2Tag;
