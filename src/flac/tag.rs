// The editable FLAC metadata chain

use super::metadata::{BlockType, MetadataBlock};
use super::streaminfo::StreamInfo;
use super::vorbis::VorbisComment;
use crate::commit::{self, DEFAULT_PADDING};
use crate::error::{ArgumentError, Result};
use crate::field_mapping::StandardField;
use crate::picture::{AttachedPicture, PictureType};
use crate::tag::Tag;

/// Metadata blocks of a FLAC stream, minus padding.
///
/// Padding is tracked as a single byte count and regenerated as one PADDING
/// block when the chain is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlacTag {
    blocks: Vec<MetadataBlock>,
    padding: u32,
}

impl FlacTag {
    /// Build a tag from a parsed chain. The chain must hold exactly one
    /// STREAMINFO block.
    pub fn from_blocks(blocks: Vec<MetadataBlock>) -> Result<Self> {
        let stream_infos = blocks
            .iter()
            .filter(|b| matches!(b, MetadataBlock::StreamInfo(_)))
            .count();
        if stream_infos != 1 {
            return Err(crate::error::Error::invalid(
                "FLAC",
                format!("expected one STREAMINFO block, found {}", stream_infos),
            ));
        }

        let mut padding = 0u32;
        let blocks = blocks
            .into_iter()
            .filter(|block| match block {
                MetadataBlock::Padding(len) => {
                    padding = padding.saturating_add(*len);
                    false
                }
                _ => true,
            })
            .collect();

        Ok(FlacTag { blocks, padding })
    }

    /// A chain holding only `stream_info`, with the default padding.
    pub fn new(stream_info: StreamInfo) -> Self {
        FlacTag {
            blocks: vec![MetadataBlock::StreamInfo(stream_info)],
            padding: DEFAULT_PADDING,
        }
    }

    pub fn blocks(&self) -> &[MetadataBlock] {
        &self.blocks
    }

    pub fn stream_info(&self) -> Option<&StreamInfo> {
        self.blocks.iter().find_map(|block| match block {
            MetadataBlock::StreamInfo(info) => Some(info),
            _ => None,
        })
    }

    pub(crate) fn stream_info_mut(&mut self) -> Option<&mut StreamInfo> {
        self.blocks.iter_mut().find_map(|block| match block {
            MetadataBlock::StreamInfo(info) => Some(info),
            _ => None,
        })
    }

    pub fn vorbis_comment(&self) -> Option<&VorbisComment> {
        self.blocks.iter().find_map(|block| match block {
            MetadataBlock::VorbisComment(comment) => Some(comment),
            _ => None,
        })
    }

    /// The VORBIS_COMMENT block, created empty if missing.
    pub fn vorbis_comment_mut(&mut self) -> &mut VorbisComment {
        let idx = match self
            .blocks
            .iter()
            .position(|b| matches!(b, MetadataBlock::VorbisComment(_)))
        {
            Some(idx) => idx,
            None => {
                self.blocks
                    .push(MetadataBlock::VorbisComment(VorbisComment::default()));
                self.blocks.len() - 1
            }
        };
        match &mut self.blocks[idx] {
            MetadataBlock::VorbisComment(comment) => comment,
            _ => unreachable!("index points at a VORBIS_COMMENT block"),
        }
    }

    pub fn pictures(&self) -> impl Iterator<Item = &AttachedPicture> {
        self.blocks.iter().filter_map(|block| match block {
            MetadataBlock::Picture(picture) => Some(picture),
            _ => None,
        })
    }

    /// Add a PICTURE block without touching existing ones.
    pub fn add_picture(&mut self, picture: AttachedPicture) -> Result<()> {
        picture.validate()?;
        self.blocks.push(MetadataBlock::Picture(picture));
        Ok(())
    }

    /// Remove every block of `block_type`, returning how many were removed.
    /// STREAMINFO cannot be removed; removing PADDING sets the padding to zero.
    pub fn remove_blocks(&mut self, block_type: BlockType) -> Result<usize> {
        match block_type {
            BlockType::StreamInfo => Err(ArgumentError::MandatoryBlock("STREAMINFO").into()),
            BlockType::Padding => {
                let had_padding = self.padding > 0;
                self.padding = 0;
                Ok(usize::from(had_padding))
            }
            _ => {
                let before = self.blocks.len();
                self.blocks.retain(|block| block.block_type() != block_type);
                Ok(before - self.blocks.len())
            }
        }
    }

    pub fn padding(&self) -> u32 {
        self.padding
    }

    pub fn set_padding(&mut self, padding: u32) -> Result<()> {
        commit::validate_padding(padding)?;
        self.padding = padding;
        Ok(())
    }

    pub(crate) fn set_padding_unchecked(&mut self, padding: u32) {
        self.padding = padding;
    }
}

impl Tag for FlacTag {
    fn format_name(&self) -> String {
        "FLAC".to_string()
    }

    fn field(&self, key: StandardField) -> Option<String> {
        self.vorbis_comment()?.field(key)
    }

    fn set_field(&mut self, key: StandardField, value: &str) -> Result<()> {
        crate::tag::require_text(key)?;
        self.vorbis_comment_mut().set_field(key, value)
    }

    fn remove_field(&mut self, key: StandardField) {
        if self.vorbis_comment().is_some() {
            self.vorbis_comment_mut().remove_field(key);
        }
    }

    fn picture(&self) -> Option<AttachedPicture> {
        self.pictures()
            .find(|p| p.picture_type() == PictureType::CoverFront)
            .or_else(|| self.pictures().next())
            .cloned()
    }

    fn set_picture(&mut self, picture: AttachedPicture) -> Result<()> {
        picture.validate()?;
        self.blocks
            .retain(|block| !matches!(block, MetadataBlock::Picture(_)));
        self.blocks.push(MetadataBlock::Picture(picture));
        Ok(())
    }

    fn remove_picture(&mut self) {
        self.blocks
            .retain(|block| !matches!(block, MetadataBlock::Picture(_)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::flac::streaminfo::tests::sample_streaminfo;

    fn tag() -> FlacTag {
        FlacTag::new(StreamInfo::parse(&sample_streaminfo()).unwrap())
    }

    #[test]
    fn requires_one_streaminfo() {
        assert!(FlacTag::from_blocks(vec![MetadataBlock::Padding(10)]).is_err());

        let info = StreamInfo::parse(&sample_streaminfo()).unwrap();
        let tag = FlacTag::from_blocks(vec![
            MetadataBlock::StreamInfo(info),
            MetadataBlock::Padding(10),
            MetadataBlock::Padding(30),
        ])
        .unwrap();
        assert_eq!(tag.padding(), 40);
        assert_eq!(tag.blocks().len(), 1);
    }

    #[test]
    fn fields_create_the_comment_block() {
        let mut tag = tag();
        assert!(tag.vorbis_comment().is_none());
        assert_eq!(tag.field(StandardField::Title), None);

        tag.set_field(StandardField::Title, "Song").unwrap();
        assert_eq!(tag.field(StandardField::Title).as_deref(), Some("Song"));
        assert_eq!(tag.vorbis_comment().unwrap().get("TITLE"), Some("Song"));

        tag.remove_field(StandardField::Title);
        assert!(tag.is_empty());
    }

    #[test]
    fn pictures_are_blocks() {
        let mut tag = tag();
        let back = AttachedPicture::new(PictureType::CoverBack, "image/png", "", vec![1]).unwrap();
        let front = AttachedPicture::new(PictureType::CoverFront, "image/jpeg", "", vec![2]).unwrap();
        tag.add_picture(back.clone()).unwrap();
        tag.add_picture(front.clone()).unwrap();
        assert_eq!(tag.pictures().count(), 2);
        assert_eq!(tag.picture(), Some(front));

        tag.set_picture(back.clone()).unwrap();
        assert_eq!(tag.pictures().collect::<Vec<_>>(), [&back]);

        assert_eq!(tag.remove_blocks(BlockType::Picture).unwrap(), 1);
        assert!(tag.picture().is_none());
    }

    #[test]
    fn streaminfo_is_mandatory() {
        let mut tag = tag();
        assert!(matches!(
            tag.remove_blocks(BlockType::StreamInfo),
            Err(Error::InvalidArgument(ArgumentError::MandatoryBlock(_)))
        ));
        assert!(tag.stream_info().is_some());

        assert_eq!(tag.remove_blocks(BlockType::Padding).unwrap(), 1);
        assert_eq!(tag.padding(), 0);
    }

    #[test]
    fn padding_bounds() {
        let mut tag = tag();
        assert!(tag.set_padding(0).is_ok());
        assert!(tag.set_padding(8).is_err());
        assert_eq!(tag.padding(), 0);
        assert!(tag.set_padding(commit::MAX_PADDING + 1).is_err());
        assert!(tag.set_padding(4096).is_ok());
    }
}
