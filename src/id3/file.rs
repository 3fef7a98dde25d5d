// Editing the ID3 tags of an MPEG audio file

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use log::{debug, warn};

use super::header::{self, Version, HEADER_LEN, ID3_SIGNATURE};
use super::v1::Id3v1Tag;
use super::v2::Id3v2Tag;
use crate::commit::{self, Strategy};
use crate::error::Result;
use crate::tag::Tag;
use crate::utils::io;

/// An MPEG file with an optional ID3v2 tag at the start and an optional
/// ID3v1 tag at the end. Only the ID3v2 tag is ever written.
#[derive(Debug, Clone)]
pub struct MpegFile {
    tag: Option<Id3v2Tag>,
    legacy: Option<Id3v1Tag>,
    /// On-disk length of the ID3v2 tag at offset 0, footer included.
    tag_region: u64,
    /// The region holds a tag that could not be parsed. It is left alone
    /// unless a new tag replaces it or the tag is removed.
    unreadable: bool,
}

impl MpegFile {
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;

        let mut tag = None;
        let mut tag_region = 0;
        let mut unreadable = false;
        if io::check_signature(reader, ID3_SIGNATURE)? {
            let region = match io::read_array(reader) {
                Ok(data) => header::region_len(&data),
                Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => None,
                Err(err) => return Err(err.into()),
            };
            reader.seek(SeekFrom::Start(0))?;
            match Id3v2Tag::read_from(reader) {
                Ok(parsed) => {
                    tag = Some(parsed);
                    tag_region = region.unwrap_or(0);
                }
                Err(err) if err.is_format_error() => {
                    warn!(target: "id3v2", "ignoring unreadable ID3v2 tag: {}", err);
                    let file_len = reader.seek(SeekFrom::End(0))?;
                    tag_region = region.unwrap_or(0).min(file_len);
                    unreadable = tag_region > 0;
                }
                Err(err) => return Err(err),
            }
        }

        let legacy = Id3v1Tag::read_from(reader)?;
        debug!(
            "MPEG file: ID3v2 region of {} bytes, ID3v1 {}",
            tag_region,
            if legacy.is_some() { "present" } else { "absent" }
        );

        Ok(MpegFile {
            tag,
            legacy,
            tag_region,
            unreadable,
        })
    }

    pub fn tag(&self) -> Option<&Id3v2Tag> {
        self.tag.as_ref()
    }

    pub fn tag_mut(&mut self) -> Option<&mut Id3v2Tag> {
        self.tag.as_mut()
    }

    /// The ID3v2 tag, creating an ID3v2.4 tag seeded from the ID3v1 tag if
    /// there is none yet.
    pub fn tag_or_insert(&mut self) -> &mut Id3v2Tag {
        let legacy = self.legacy.as_ref();
        self.tag.get_or_insert_with(|| {
            let mut tag = Id3v2Tag::new(Version::V24);
            if let Some(legacy) = legacy {
                tag.copy_from(legacy);
            }
            tag
        })
    }

    pub fn legacy_tag(&self) -> Option<&Id3v1Tag> {
        self.legacy.as_ref()
    }

    /// Drop the ID3v2 tag; the next save removes it from the file.
    pub fn remove_tag(&mut self) {
        self.tag = None;
        self.unreadable = false;
    }

    pub fn tag_region(&self) -> u64 {
        self.tag_region
    }

    /// Write the ID3v2 tag back, in place when it fits.
    pub fn save_to(&mut self, file: &mut File) -> Result<()> {
        let old_region = self.tag_region;

        let Some(tag) = self.tag.as_mut() else {
            if old_region > 0 && !self.unreadable {
                commit::rewrite(file, |src, dst| {
                    commit::copy_range(src, old_region, None, dst)?;
                    Ok(())
                })?;
                self.tag_region = 0;
            }
            return Ok(());
        };

        let frames = tag.render_frames()?;
        let content_len = (HEADER_LEN + frames.len()) as u64;

        match commit::plan(old_region, content_len, 0) {
            Strategy::InPlace { padding } => {
                debug!("ID3v2 tag fits, {} bytes of padding left", padding);
                let bytes = tag.assemble(&frames, padding)?;
                commit::write_in_place(file, 0, &bytes)?;
                tag.set_padding_unchecked(padding);
            }
            Strategy::Rewrite => {
                let padding = commit::clamp_padding(tag.padding());
                let bytes = tag.assemble(&frames, padding)?;
                commit::rewrite(file, |src, dst| {
                    dst.write_all(&bytes)?;
                    commit::copy_range(src, old_region, None, dst)?;
                    Ok(())
                })?;
                tag.set_padding_unchecked(padding);
                self.tag_region = bytes.len() as u64;
            }
        }
        self.unreadable = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::field_mapping::StandardField;

    const AUDIO: &[u8] = b"\xFF\xFB\x90\x64audio-frames";

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
    fn adds_a_tag_to_a_bare_file() {
        let mut file = file_with(AUDIO);
        let mut mpeg = MpegFile::read_from(&mut file).unwrap();
        assert!(mpeg.tag().is_none());

        mpeg.tag_or_insert()
            .set_field(StandardField::Title, "New")
            .unwrap();
        mpeg.save_to(&mut file).unwrap();

        let data = contents(&mut file);
        assert!(data.starts_with(b"ID3\x04"));
        assert!(data.ends_with(AUDIO));
        assert_eq!(mpeg.tag_region(), (data.len() - AUDIO.len()) as u64);

        let reread = MpegFile::read_from(&mut file).unwrap();
        assert_eq!(
            reread.tag().unwrap().field(StandardField::Title).as_deref(),
            Some("New")
        );
        assert_eq!(reread.tag().unwrap().padding(), commit::DEFAULT_PADDING);
    }

    #[test]
    fn small_edits_stay_in_place() {
        let mut tag = Id3v2Tag::new(Version::V24);
        tag.set_field(StandardField::Title, "Old title").unwrap();
        tag.set_padding(200).unwrap();
        let mut data = tag.to_bytes().unwrap();
        data.extend(AUDIO);
        let original_len = data.len();
        let mut file = file_with(&data);

        let mut mpeg = MpegFile::read_from(&mut file).unwrap();
        let tag = mpeg.tag_mut().unwrap();
        tag.set_field(StandardField::Title, "A longer new title").unwrap();
        tag.set_field(StandardField::Artist, "Artist").unwrap();
        mpeg.save_to(&mut file).unwrap();

        let data = contents(&mut file);
        assert_eq!(data.len(), original_len);
        assert!(data.ends_with(AUDIO));

        let reread = MpegFile::read_from(&mut file).unwrap();
        let tag = reread.tag().unwrap();
        assert_eq!(tag.field(StandardField::Artist).as_deref(), Some("Artist"));
        assert!(tag.padding() < 200);
    }

    #[test]
    fn removing_the_tag_strips_it() {
        let mut data = Id3v2Tag::new(Version::V23).to_bytes().unwrap();
        data.extend(AUDIO);
        let mut file = file_with(&data);

        let mut mpeg = MpegFile::read_from(&mut file).unwrap();
        assert!(mpeg.tag().is_some());
        mpeg.remove_tag();
        mpeg.save_to(&mut file).unwrap();

        assert_eq!(contents(&mut file), AUDIO);
    }

    /// An ID3v2.2 tag, which is neither read nor written.
    fn v22_tag() -> Vec<u8> {
        let frame = b"TT2\x00\x00\x04\x00Old";
        let mut data = b"ID3\x02\x00\x00\x00\x00\x00".to_vec();
        data.push(frame.len() as u8);
        data.extend(frame);
        data
    }

    fn id3v1(title: &[u8]) -> Vec<u8> {
        let mut v1 = vec![0u8; 128];
        v1[..3].copy_from_slice(b"TAG");
        v1[3..3 + title.len()].copy_from_slice(title);
        v1
    }

    #[test]
    fn unreadable_tag_falls_back_to_id3v1() {
        let mut data = v22_tag();
        data.extend(AUDIO);
        data.extend(id3v1(b"Legacy"));
        let mut file = file_with(&data);

        let mut mpeg = MpegFile::read_from(&mut file).unwrap();
        assert!(mpeg.tag().is_none());
        assert_eq!(mpeg.tag_region(), v22_tag().len() as u64);
        assert_eq!(
            mpeg.legacy_tag().unwrap().field(StandardField::Title).as_deref(),
            Some("Legacy")
        );

        // Saving without edits leaves the old tag alone
        mpeg.save_to(&mut file).unwrap();
        assert_eq!(contents(&mut file), data);
    }

    #[test]
    fn new_tag_replaces_unreadable_region() {
        let mut data = v22_tag();
        data.extend(AUDIO);
        let mut file = file_with(&data);

        let mut mpeg = MpegFile::read_from(&mut file).unwrap();
        mpeg.tag_or_insert()
            .set_field(StandardField::Title, "New")
            .unwrap();
        mpeg.save_to(&mut file).unwrap();

        let data = contents(&mut file);
        assert!(data.starts_with(b"ID3\x04"));
        assert_eq!(data.len() as u64, mpeg.tag_region() + AUDIO.len() as u64);
        assert!(data.ends_with(AUDIO));
        assert!(!data.windows(3).any(|w| w == b"TT2"));
    }

    #[test]
    fn seeds_from_id3v1() {
        let mut data = AUDIO.to_vec();
        let mut v1 = vec![0u8; 128];
        v1[..3].copy_from_slice(b"TAG");
        v1[3..6].copy_from_slice(b"Old");
        v1[93..97].copy_from_slice(b"1987");
        data.extend(v1);
        let mut file = file_with(&data);

        let mut mpeg = MpegFile::read_from(&mut file).unwrap();
        assert!(mpeg.legacy_tag().is_some());
        let tag = mpeg.tag_or_insert();
        assert_eq!(tag.field(StandardField::Title).as_deref(), Some("Old"));
        assert_eq!(tag.field(StandardField::Date).as_deref(), Some("1987"));
    }
}
