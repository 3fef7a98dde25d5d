// FLAC metadata handling module

pub mod file;
pub mod metadata;
pub mod picture;
pub mod streaminfo;
pub mod tag;
pub mod vorbis;

pub use file::FlacFile;
pub use metadata::{BlockHeader, BlockType, MetadataBlock, FLAC_SIGNATURE};
pub use streaminfo::StreamInfo;
pub use tag::FlacTag;
pub use vorbis::{Framing, VorbisComment};
