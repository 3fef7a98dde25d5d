// Editing the metadata chain of a FLAC file

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use log::debug;

use super::metadata::{assemble, MetadataBlock, BLOCK_HEADER_LEN, FLAC_SIGNATURE, MARKER_LEN};
use super::tag::FlacTag;
use crate::commit::{self, Strategy};
use crate::error::{Error, Result};
use crate::id3::header::{self, ID3_SIGNATURE};
use crate::utils::io;

/// A FLAC stream and the layout of its metadata on disk.
#[derive(Debug, Clone)]
pub struct FlacFile {
    tag: FlacTag,
    /// Offset of the `fLaC` marker; non-zero when an ID3v2 tag precedes it.
    stream_start: u64,
    /// Length of the block chain after the marker, headers included.
    metadata_len: u64,
    audio_len: u64,
}

impl FlacFile {
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;

        let mut stream_start = 0;
        if io::check_signature(reader, ID3_SIGNATURE)? {
            stream_start = header::region_len(&io::read_array(reader)?).ok_or_else(|| {
                Error::invalid("FLAC", "ID3v2 tag in front of the stream has no usable size")
            })?;
            debug!("skipping {} byte ID3v2 tag in front of FLAC stream", stream_start);
        }

        reader.seek(SeekFrom::Start(stream_start))?;
        let marker: [u8; 4] = io::read_array(reader)?;
        if &marker != FLAC_SIGNATURE {
            return Err(Error::invalid("FLAC", "missing fLaC marker"));
        }

        let mut blocks = Vec::new();
        let mut metadata_len = 0u64;
        loop {
            let (header, block) = MetadataBlock::read(reader)?;
            metadata_len += BLOCK_HEADER_LEN + u64::from(header.length);
            blocks.push(block);
            if header.is_last {
                break;
            }
        }

        let audio_start = stream_start + MARKER_LEN + metadata_len;
        let file_len = reader.seek(SeekFrom::End(0))?;
        let audio_len = file_len.saturating_sub(audio_start);

        let mut tag = FlacTag::from_blocks(blocks)?;
        if let Some(info) = tag.stream_info_mut() {
            info.derive_bitrate(audio_len);
        }
        debug!(
            "FLAC file: {} blocks in {} bytes, {} bytes of padding, {} bytes of audio",
            tag.blocks().len(),
            metadata_len,
            tag.padding(),
            audio_len
        );

        Ok(FlacFile {
            tag,
            stream_start,
            metadata_len,
            audio_len,
        })
    }

    pub fn tag(&self) -> &FlacTag {
        &self.tag
    }

    pub fn tag_mut(&mut self) -> &mut FlacTag {
        &mut self.tag
    }

    pub fn stream_start(&self) -> u64 {
        self.stream_start
    }

    pub fn metadata_len(&self) -> u64 {
        self.metadata_len
    }

    pub fn audio_len(&self) -> u64 {
        self.audio_len
    }

    /// Drop the comment and picture blocks. STREAMINFO and any other blocks
    /// stay.
    pub fn remove_tag(&mut self) -> Result<()> {
        use super::metadata::BlockType;

        self.tag.remove_blocks(BlockType::VorbisComment)?;
        self.tag.remove_blocks(BlockType::Picture)?;
        Ok(())
    }

    /// Write the metadata chain back, reusing padding when possible.
    pub fn save_to(&mut self, file: &mut File) -> Result<()> {
        let content = assemble(self.tag.blocks(), 0)?;
        let chain_start = self.stream_start + MARKER_LEN;

        match commit::plan(self.metadata_len, content.len() as u64, BLOCK_HEADER_LEN) {
            Strategy::InPlace { padding } => {
                debug!("FLAC metadata fits, {} bytes of padding left", padding);
                let bytes = if padding == 0 {
                    content
                } else {
                    assemble(self.tag.blocks(), padding)?
                };
                commit::write_in_place(file, chain_start, &bytes)?;
                self.tag.set_padding_unchecked(padding);
            }
            Strategy::Rewrite => {
                let padding = commit::clamp_padding(self.tag.padding());
                let bytes = assemble(self.tag.blocks(), padding)?;
                let audio_start = chain_start + self.metadata_len;
                commit::rewrite(file, |src, dst| {
                    commit::copy_range(src, 0, Some(chain_start), dst)?;
                    dst.write_all(&bytes)?;
                    commit::copy_range(src, audio_start, None, dst)?;
                    Ok(())
                })?;
                self.tag.set_padding_unchecked(padding);
                self.metadata_len = bytes.len() as u64;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::field_mapping::StandardField;
    use crate::flac::streaminfo::tests::sample_streaminfo;
    use crate::flac::streaminfo::StreamInfo;
    use crate::id3::{Id3v2Tag, Version};
    use crate::tag::Tag;

    const AUDIO: &[u8] = b"\xFF\xF8\x69\x08audio";

    fn flac_bytes(padding: u32) -> Vec<u8> {
        let info = StreamInfo::parse(&sample_streaminfo()).unwrap();
        let mut tag = FlacTag::new(info);
        tag.set_padding_unchecked(padding);
        let mut out = FLAC_SIGNATURE.to_vec();
        out.extend(assemble(tag.blocks(), padding).unwrap());
        out.extend(AUDIO);
        out
    }

    fn file_with(contents: &[u8]) -> File {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    fn contents(file: &mut File) -> Vec<u8> {
        let mut out = Vec::new();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn reads_layout() {
        let mut file = file_with(&flac_bytes(50));
        let flac = FlacFile::read_from(&mut file).unwrap();
        assert_eq!(flac.stream_start(), 0);
        assert_eq!(flac.metadata_len(), 38 + 4 + 50);
        assert_eq!(flac.audio_len(), AUDIO.len() as u64);
        assert_eq!(flac.tag().padding(), 50);
        assert!(flac.tag().stream_info().unwrap().bitrate.is_some());
    }

    #[test]
    fn rejects_missing_marker() {
        let mut file = file_with(b"RIFF\0\0\0\0WAVE");
        let err = FlacFile::read_from(&mut file).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn skips_leading_id3() {
        let mut data = Id3v2Tag::new(Version::V24).to_bytes().unwrap();
        let id3_len = data.len() as u64;
        data.extend(flac_bytes(0));
        let mut file = file_with(&data);

        let mut flac = FlacFile::read_from(&mut file).unwrap();
        assert_eq!(flac.stream_start(), id3_len);

        flac.tag_mut().set_field(StandardField::Title, "Behind ID3").unwrap();
        flac.save_to(&mut file).unwrap();

        let data = contents(&mut file);
        assert!(data.starts_with(b"ID3"));
        assert_eq!(&data[id3_len as usize..id3_len as usize + 4], FLAC_SIGNATURE);
        assert!(data.ends_with(AUDIO));

        let reread = FlacFile::read_from(&mut file).unwrap();
        assert_eq!(
            reread.tag().field(StandardField::Title).as_deref(),
            Some("Behind ID3")
        );
    }

    #[test]
    fn skips_leading_id3v22_tag() {
        let mut data = b"ID3\x02\x00\x00\x00\x00\x00\x0ATT2\x00\x00\x04\x00Old".to_vec();
        data.extend(flac_bytes(64));
        let mut file = file_with(&data);

        let flac = FlacFile::read_from(&mut file).unwrap();
        assert_eq!(flac.stream_start(), 20);
        assert_eq!(flac.audio_len(), AUDIO.len() as u64);
    }

    #[test]
    fn in_place_when_padding_suffices() {
        let original = flac_bytes(200);
        let mut file = file_with(&original);

        let mut flac = FlacFile::read_from(&mut file).unwrap();
        flac.tag_mut().set_field(StandardField::Artist, "Someone").unwrap();
        flac.save_to(&mut file).unwrap();

        let data = contents(&mut file);
        assert_eq!(data.len(), original.len());
        assert!(data.ends_with(AUDIO));

        let reread = FlacFile::read_from(&mut file).unwrap();
        assert_eq!(reread.metadata_len(), 38 + 4 + 200);
        assert!(reread.tag().padding() < 200);
        assert_eq!(reread.tag().padding(), flac.tag().padding());
    }

    #[test]
    fn rewrites_when_there_is_no_room() {
        let mut file = file_with(&flac_bytes(0));

        let mut flac = FlacFile::read_from(&mut file).unwrap();
        flac.tag_mut().set_field(StandardField::Album, "Record").unwrap();
        flac.tag_mut().set_padding(64).unwrap();
        flac.save_to(&mut file).unwrap();

        let reread = FlacFile::read_from(&mut file).unwrap();
        assert_eq!(reread.tag().padding(), 64);
        assert_eq!(reread.metadata_len(), flac.metadata_len());
        assert_eq!(reread.audio_len(), AUDIO.len() as u64);
        assert_eq!(reread.tag().field(StandardField::Album).as_deref(), Some("Record"));
    }

    #[test]
    fn remove_tag_keeps_streaminfo() {
        let mut file = file_with(&flac_bytes(100));
        let mut flac = FlacFile::read_from(&mut file).unwrap();
        flac.tag_mut().set_field(StandardField::Title, "x").unwrap();
        flac.save_to(&mut file).unwrap();

        let mut flac = FlacFile::read_from(&mut file).unwrap();
        flac.remove_tag().unwrap();
        flac.save_to(&mut file).unwrap();

        let reread = FlacFile::read_from(&mut file).unwrap();
        assert!(reread.tag().vorbis_comment().is_none());
        assert_eq!(reread.tag().stream_info().unwrap().sample_rate, 44100);
    }
}
