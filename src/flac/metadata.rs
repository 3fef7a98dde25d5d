// FLAC metadata block implementation

use std::io::Read;

use log::warn;

use super::picture::{read_picture, write_picture};
use super::streaminfo::StreamInfo;
use super::vorbis::{Framing, VorbisComment};
use crate::error::{Error, Result};
use crate::picture::AttachedPicture;
use crate::utils::io;

/// FLAC file signature
pub const FLAC_SIGNATURE: &[u8; 4] = b"fLaC";
pub const MARKER_LEN: u64 = FLAC_SIGNATURE.len() as u64;
pub const BLOCK_HEADER_LEN: u64 = 4;
/// Block lengths are 24-bit.
pub const MAX_BLOCK_LEN: u32 = 0xFF_FFFF;

/// FLAC metadata block types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    StreamInfo,
    Padding,
    Application,
    SeekTable,
    VorbisComment,
    CueSheet,
    Picture,
    Reserved(u8),
    Invalid,
}

impl BlockType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => BlockType::StreamInfo,
            1 => BlockType::Padding,
            2 => BlockType::Application,
            3 => BlockType::SeekTable,
            4 => BlockType::VorbisComment,
            5 => BlockType::CueSheet,
            6 => BlockType::Picture,
            127 => BlockType::Invalid,
            other => BlockType::Reserved(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            BlockType::StreamInfo => 0,
            BlockType::Padding => 1,
            BlockType::Application => 2,
            BlockType::SeekTable => 3,
            BlockType::VorbisComment => 4,
            BlockType::CueSheet => 5,
            BlockType::Picture => 6,
            BlockType::Reserved(code) => code,
            BlockType::Invalid => 127,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockType::StreamInfo => "STREAMINFO",
            BlockType::Padding => "PADDING",
            BlockType::Application => "APPLICATION",
            BlockType::SeekTable => "SEEKTABLE",
            BlockType::VorbisComment => "VORBIS_COMMENT",
            BlockType::CueSheet => "CUESHEET",
            BlockType::Picture => "PICTURE",
            BlockType::Reserved(_) => "RESERVED",
            BlockType::Invalid => "INVALID",
        }
    }
}

impl std::str::FromStr for BlockType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase().replace('-', "_");
        [
            BlockType::StreamInfo,
            BlockType::Padding,
            BlockType::Application,
            BlockType::SeekTable,
            BlockType::VorbisComment,
            BlockType::CueSheet,
            BlockType::Picture,
        ]
        .into_iter()
        .find(|ty| ty.name() == upper)
        .ok_or_else(|| format!("unknown block type {s:?}"))
    }
}

/// FLAC metadata block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub is_last: bool,
    pub block_type: BlockType,
    pub length: u32,
}

impl BlockHeader {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let buffer: [u8; 4] = io::read_array(reader)?;
        Ok(BlockHeader {
            is_last: buffer[0] & 0x80 != 0,
            block_type: BlockType::from_code(buffer[0] & 0x7F),
            length: io::be_u24([buffer[1], buffer[2], buffer[3]]),
        })
    }

    pub fn to_bytes(&self) -> Result<[u8; 4]> {
        if self.length > MAX_BLOCK_LEN {
            return Err(Error::TooLarge {
                what: "FLAC metadata block",
                size: u64::from(self.length),
                limit: u64::from(MAX_BLOCK_LEN),
            });
        }
        let len = io::be_u24_bytes(self.length)?;
        let last = if self.is_last { 0x80 } else { 0 };
        Ok([last | self.block_type.code(), len[0], len[1], len[2]])
    }
}

/// FLAC metadata block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataBlock {
    StreamInfo(StreamInfo),
    VorbisComment(VorbisComment),
    Picture(AttachedPicture),
    Padding(u32),
    /// Any other block, kept byte for byte.
    Unknown { block_type: BlockType, data: Vec<u8> },
}

impl MetadataBlock {
    /// Decode a block body. Malformed comment or picture blocks are kept as
    /// raw data.
    pub fn parse(block_type: BlockType, data: Vec<u8>) -> Result<Self> {
        let block = match block_type {
            BlockType::StreamInfo => MetadataBlock::StreamInfo(StreamInfo::parse(&data)?),
            BlockType::Padding => MetadataBlock::Padding(data.len() as u32),
            BlockType::VorbisComment => match VorbisComment::parse(&data, Framing::Absent) {
                Ok(comment) => MetadataBlock::VorbisComment(comment),
                Err(err) => {
                    warn!(target: "flac", "keeping unreadable VORBIS_COMMENT block as raw data: {}", err);
                    MetadataBlock::Unknown { block_type, data }
                }
            },
            BlockType::Picture => match read_picture(&data) {
                Ok(picture) => MetadataBlock::Picture(picture),
                Err(err) => {
                    warn!(target: "flac", "keeping unreadable PICTURE block as raw data: {}", err);
                    MetadataBlock::Unknown { block_type, data }
                }
            },
            _ => MetadataBlock::Unknown { block_type, data },
        };
        Ok(block)
    }

    /// Read one block, header included.
    pub fn read<R: Read>(reader: &mut R) -> Result<(BlockHeader, Self)> {
        let header = BlockHeader::read(reader)?;
        let mut data = vec![0u8; header.length as usize];
        reader.read_exact(&mut data)?;
        Ok((header, Self::parse(header.block_type, data)?))
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            MetadataBlock::StreamInfo(_) => BlockType::StreamInfo,
            MetadataBlock::VorbisComment(_) => BlockType::VorbisComment,
            MetadataBlock::Picture(_) => BlockType::Picture,
            MetadataBlock::Padding(_) => BlockType::Padding,
            MetadataBlock::Unknown { block_type, .. } => *block_type,
        }
    }

    /// Write order: STREAMINFO, VORBIS_COMMENT, PICTURE, everything else,
    /// PADDING.
    pub(crate) fn priority(&self) -> u8 {
        match self {
            MetadataBlock::StreamInfo(_) => 0,
            MetadataBlock::VorbisComment(_) => 1,
            MetadataBlock::Picture(_) => 2,
            MetadataBlock::Unknown { .. } => 3,
            MetadataBlock::Padding(_) => 4,
        }
    }

    pub fn body(&self) -> Result<Vec<u8>> {
        match self {
            MetadataBlock::StreamInfo(info) => Ok(info.as_bytes().to_vec()),
            MetadataBlock::VorbisComment(comment) => comment.to_bytes(Framing::Absent),
            MetadataBlock::Picture(picture) => write_picture(picture),
            MetadataBlock::Padding(len) => Ok(vec![0; *len as usize]),
            MetadataBlock::Unknown { data, .. } => Ok(data.clone()),
        }
    }
}

/// Serialise `blocks` in write order followed by a padding block of
/// `padding` bytes (none when zero). The last block gets the last flag.
pub fn assemble(blocks: &[MetadataBlock], padding: u32) -> Result<Vec<u8>> {
    let mut ordered: Vec<&MetadataBlock> = blocks
        .iter()
        .filter(|block| !matches!(block, MetadataBlock::Padding(_)))
        .collect();
    ordered.sort_by_key(|block| block.priority());

    let padding_block = MetadataBlock::Padding(padding);
    if padding > 0 {
        ordered.push(&padding_block);
    }

    let mut out = Vec::new();
    let count = ordered.len();
    for (idx, block) in ordered.into_iter().enumerate() {
        let body = block.body()?;
        let header = BlockHeader {
            is_last: idx + 1 == count,
            block_type: block.block_type(),
            length: u32::try_from(body.len()).unwrap_or(u32::MAX),
        };
        out.extend(header.to_bytes()?);
        out.extend(body);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::flac::streaminfo::tests::sample_streaminfo;
    use crate::picture::PictureType;

    #[test]
    fn block_header_round_trip() {
        let header = BlockHeader {
            is_last: true,
            block_type: BlockType::VorbisComment,
            length: 0x012345,
        };
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes, [0x84, 0x01, 0x23, 0x45]);
        assert_eq!(BlockHeader::read(&mut Cursor::new(bytes)).unwrap(), header);

        let too_big = BlockHeader {
            length: MAX_BLOCK_LEN + 1,
            ..header
        };
        assert!(too_big.to_bytes().is_err());
    }

    #[test]
    fn block_type_codes() {
        assert_eq!(BlockType::from_code(9), BlockType::Reserved(9));
        assert_eq!(BlockType::Reserved(9).code(), 9);
        assert_eq!("picture".parse::<BlockType>(), Ok(BlockType::Picture));
        assert_eq!("vorbis-comment".parse::<BlockType>(), Ok(BlockType::VorbisComment));
        assert!("nope".parse::<BlockType>().is_err());
    }

    #[test]
    fn assemble_orders_blocks() {
        let info = StreamInfo::parse(&sample_streaminfo()).unwrap();
        let picture = AttachedPicture::new(PictureType::CoverFront, "image/png", "", vec![1]).unwrap();
        let blocks = vec![
            MetadataBlock::Unknown {
                block_type: BlockType::SeekTable,
                data: vec![0; 18],
            },
            MetadataBlock::Picture(picture),
            MetadataBlock::Padding(100),
            MetadataBlock::VorbisComment(VorbisComment::new("v")),
            MetadataBlock::StreamInfo(info),
        ];

        let bytes = assemble(&blocks, 20).unwrap();
        let mut cursor = Cursor::new(&bytes);
        let mut order = Vec::new();
        loop {
            let (header, block) = MetadataBlock::read(&mut cursor).unwrap();
            order.push(block.block_type());
            if header.is_last {
                assert_eq!(block, MetadataBlock::Padding(20));
                break;
            }
        }
        assert_eq!(
            order,
            [
                BlockType::StreamInfo,
                BlockType::VorbisComment,
                BlockType::Picture,
                BlockType::SeekTable,
                BlockType::Padding,
            ]
        );
        assert_eq!(cursor.position() as usize, bytes.len());
    }

    #[test]
    fn zero_padding_adds_no_block() {
        let info = StreamInfo::parse(&sample_streaminfo()).unwrap();
        let bytes = assemble(&[MetadataBlock::StreamInfo(info)], 0).unwrap();
        assert_eq!(bytes.len(), 38);
        assert_eq!(bytes[0], 0x80);
    }

    #[test]
    fn malformed_picture_is_kept_raw() {
        let block = MetadataBlock::parse(BlockType::Picture, vec![0, 0, 0, 3]).unwrap();
        assert_eq!(
            block,
            MetadataBlock::Unknown {
                block_type: BlockType::Picture,
                data: vec![0, 0, 0, 3],
            }
        );
        // Raw blocks keep their type code when written
        assert_eq!(block.block_type().code(), 6);
    }
}
