// ID3v2 tag implementation

use std::borrow::Cow;
use std::io::Read;

use log::{debug, warn};

use super::frames::{
    self, CommentFrame, Frame, PictureFrame, ReadOutcome, TextFrame, TimestampFrame, APIC, COMM,
    USLT,
};
use super::header::{self, FrameId, TagFlags, TagHeader, Version, HEADER_LEN};
use super::timestamp::{Timestamp, V23_DATE_FRAMES};
use super::unsync;
use crate::commit::{self, DEFAULT_PADDING};
use crate::error::{ArgumentError, Error, Result};
use crate::field_mapping::{FieldMappings, StandardField};
use crate::picture::{AttachedPicture, PictureType};
use crate::tag::{self, Tag};
use crate::utils::cursor::ByteCursor;
use crate::utils::encoding::TextEncoding;
use crate::utils::io;

const TDRC: FrameId = FrameId::from_static(b"TDRC");
const TDOR: FrameId = FrameId::from_static(b"TDOR");
const TYER: FrameId = FrameId::from_static(b"TYER");
const TDAT: FrameId = FrameId::from_static(b"TDAT");
const TIME: FrameId = FrameId::from_static(b"TIME");
const TORY: FrameId = FrameId::from_static(b"TORY");

/// An ID3v2.3 or ID3v2.4 tag.
///
/// Frames keep the order they were read in. Extended headers and footers
/// are accepted on read but never written.
#[derive(Debug, Clone, PartialEq)]
pub struct Id3v2Tag {
    version: Version,
    frames: Vec<Frame>,
    padding: u32,
    unsynchronisation: bool,
    compression: bool,
}

impl Id3v2Tag {
    pub fn new(version: Version) -> Self {
        Id3v2Tag {
            version,
            frames: Vec::new(),
            padding: DEFAULT_PADDING,
            unsynchronisation: false,
            compression: false,
        }
    }

    /// Read a complete tag, header first.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let header_bytes: [u8; HEADER_LEN] = io::read_array(reader)?;
        let header = TagHeader::parse(&header_bytes)?;

        let mut body = vec![0; header.size as usize];
        reader.read_exact(&mut body)?;

        Self::parse_body(&header, &body)
    }

    /// Parse a tag from a buffer that starts with the tag header.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let header = TagHeader::parse(&cursor.read_array()?)?;
        let body = cursor.take(header.size as usize)?;
        Self::parse_body(&header, body)
    }

    fn parse_body(header: &TagHeader, body: &[u8]) -> Result<Self> {
        let version = header.version;

        // ID3v2.3 unsynchronises the whole tag, ID3v2.4 each frame
        let region: Cow<[u8]> = if version == Version::V23 && header.flags.unsynchronisation {
            Cow::Owned(unsync::decode(body))
        } else {
            Cow::Borrowed(body)
        };

        let mut cursor = ByteCursor::new(&region);
        if header.flags.extended_header {
            header::skip_extended_header(version, &mut cursor)?;
        }

        let tag_unsync = version == Version::V24 && header.flags.unsynchronisation;
        let mut frames = Vec::new();
        loop {
            match frames::read_frame(version, tag_unsync, &mut cursor) {
                Ok(ReadOutcome::Frame(frame)) => frames.push(frame),
                Ok(ReadOutcome::Skipped) => {}
                Ok(ReadOutcome::End) => break,
                Err(err) => {
                    warn!(target: "id3v2", "stopping at unreadable frame data: {}", err);
                    break;
                }
            }
        }

        let padding = u32::try_from(cursor.remaining()).unwrap_or(u32::MAX);
        debug!(
            target: "id3v2",
            "read {} tag with {} frames and {} bytes of padding",
            version,
            frames.len(),
            padding
        );

        Ok(Id3v2Tag {
            version,
            frames,
            padding,
            unsynchronisation: header.flags.unsynchronisation,
            compression: false,
        })
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut Vec<Frame> {
        &mut self.frames
    }

    pub fn frame(&self, id: &str) -> Option<&Frame> {
        self.frames.iter().find(|frame| frame.id() == id)
    }

    pub fn add_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Remove every frame with this id, returning how many were removed.
    pub fn remove_frames(&mut self, id: &str) -> usize {
        let before = self.frames.len();
        self.frames.retain(|frame| frame.id() != id);
        before - self.frames.len()
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

    pub fn unsynchronisation(&self) -> bool {
        self.unsynchronisation
    }

    pub fn set_unsynchronisation(&mut self, enabled: bool) {
        self.unsynchronisation = enabled;
    }

    pub fn compression(&self) -> bool {
        self.compression
    }

    /// Compress every frame with zlib when the tag is written.
    pub fn set_compression(&mut self, enabled: bool) {
        self.compression = enabled;
    }

    /// Text of the first text or timestamp frame with this id. Multiple
    /// values are joined with `/`.
    pub fn text(&self, id: &str) -> Option<String> {
        self.frames.iter().find_map(|frame| match frame {
            Frame::Text(text) if text.id == id => Some(text.values().collect::<Vec<_>>().join("/")),
            Frame::Timestamp(ts) if ts.id == id => Some(ts.timestamp.to_iso()),
            _ => None,
        })
    }

    /// Replace the text frame `id`, keeping the position of the first one.
    pub fn set_text(&mut self, id: &str, value: &str) -> Result<()> {
        let id = FrameId::try_from(id)?;
        if !id.starts_with(b'T') || id == "TXXX" {
            return Err(ArgumentError::Other(format!("{id} is not a text frame")).into());
        }
        self.replace_frame(Frame::Text(TextFrame::new(id, value, self.version)));
        Ok(())
    }

    /// The recording time, from `TDRC` or from the ID3v2.3 date frames.
    pub fn timestamp(&self) -> Option<Timestamp> {
        let recorded = self.frames.iter().find_map(|frame| match frame {
            Frame::Timestamp(ts) if ts.id == TDRC => Some(ts.timestamp),
            _ => None,
        });
        recorded.or_else(|| {
            Timestamp::from_v23(
                &self.text("TYER")?,
                self.text("TDAT").as_deref(),
                self.text("TIME").as_deref(),
            )
        })
    }

    fn set_timestamp(&mut self, timestamp: Timestamp) {
        self.remove_date_frames();
        match self.version {
            Version::V24 => self.frames.push(Frame::Timestamp(TimestampFrame::new(
                TDRC,
                timestamp,
                self.version,
            ))),
            Version::V23 => self.push_v23_date(timestamp),
        }
    }

    fn push_v23_date(&mut self, timestamp: Timestamp) {
        let version = self.version;
        self.frames
            .push(Frame::Text(TextFrame::new(TYER, timestamp.year_text(), version)));
        if let Some(date) = timestamp.date_text() {
            self.frames.push(Frame::Text(TextFrame::new(TDAT, date, version)));
        }
        if let Some(time) = timestamp.time_text() {
            self.frames.push(Frame::Text(TextFrame::new(TIME, time, version)));
        }
    }

    fn remove_date_frames(&mut self) {
        self.frames.retain(|frame| {
            let id = frame.id();
            id != TDRC && !V23_DATE_FRAMES.contains(&id.as_str())
        });
    }

    fn comment_frame(&self, id: FrameId) -> Option<&CommentFrame> {
        let mut candidates = self.frames.iter().filter_map(|frame| match frame {
            Frame::Comment(comment) if id == COMM => Some(comment),
            Frame::UnsyncLyrics(lyrics) if id == USLT => Some(lyrics),
            _ => None,
        });
        let first = candidates.next()?;
        if first.description.is_empty() {
            return Some(first);
        }
        candidates
            .find(|comment| comment.description.is_empty())
            .or(Some(first))
    }

    /// Replace the first frame with the same id, dropping any others.
    fn replace_frame(&mut self, frame: Frame) {
        let id = frame.id();
        match self.frames.iter().position(|f| f.id() == id) {
            Some(idx) => {
                self.frames[idx] = frame;
                let mut seen = 0;
                self.frames.retain(|f| {
                    if f.id() != id {
                        return true;
                    }
                    seen += 1;
                    seen == 1
                });
            }
            None => self.frames.push(frame),
        }
    }

    /// Convert frames so the tag is valid for `target`.
    ///
    /// Dates move between `TDRC` and `TYER`/`TDAT`/`TIME`, and text is
    /// re-encoded into UTF-16 for ID3v2.3. Frames that cannot be expressed
    /// in the target version are dropped.
    pub fn convert_version(&mut self, target: Version) {
        if target == self.version {
            return;
        }

        let timestamp = self.timestamp();
        let original = self.frames.iter().find_map(|frame| match frame {
            Frame::Timestamp(ts) if ts.id == TDOR => Some(ts.timestamp),
            Frame::Text(text) if text.id == TORY => {
                text.text.trim().parse().ok().map(Timestamp::year)
            }
            _ => None,
        });
        self.remove_date_frames();
        self.remove_frames("TDOR");
        self.remove_frames("TORY");

        self.frames.retain(|frame| match frame {
            Frame::Unknown(unknown) if unknown.is_verbatim() => {
                warn!(target: "id3v2", "dropping compressed frame {} that could not be read", unknown.id);
                false
            }
            Frame::Timestamp(ts) if target == Version::V23 => {
                debug!(target: "id3v2", "{} has no ID3v2.3 equivalent, dropping it", ts.id);
                false
            }
            _ => true,
        });

        self.version = target;
        match target {
            Version::V23 => {
                for frame in &mut self.frames {
                    if let Some(encoding) = frame.encoding() {
                        if !encoding.is_v23_compatible() {
                            frame.set_encoding(TextEncoding::Utf16);
                        }
                    }
                }
                if let Some(timestamp) = timestamp {
                    self.push_v23_date(timestamp);
                }
                if let Some(original) = original {
                    self.frames
                        .push(Frame::Text(TextFrame::new(TORY, original.year_text(), target)));
                }
            }
            Version::V24 => {
                if let Some(timestamp) = timestamp {
                    self.frames
                        .push(Frame::Timestamp(TimestampFrame::new(TDRC, timestamp, target)));
                }
                if let Some(original) = original {
                    self.frames
                        .push(Frame::Timestamp(TimestampFrame::new(TDOR, original, target)));
                }
            }
        }
    }

    /// Encode the frame region, without header or padding.
    pub(crate) fn render_frames(&self) -> Result<Vec<u8>> {
        let frame_unsync = self.unsynchronisation && self.version == Version::V24;
        let mut region = Vec::new();
        for frame in &self.frames {
            region.extend(frames::render_frame(
                frame,
                self.version,
                self.compression,
                frame_unsync,
            )?);
        }

        if self.unsynchronisation && self.version == Version::V23 {
            region = unsync::encode(&region);
        }
        Ok(region)
    }

    /// Wrap an encoded frame region into a complete tag.
    pub(crate) fn assemble(&self, region: &[u8], padding: u32) -> Result<Vec<u8>> {
        let size = region.len() as u64 + u64::from(padding);
        if size > u64::from(io::SYNCHSAFE_MAX) {
            return Err(Error::TooLarge {
                what: "ID3v2 tag",
                size,
                limit: u64::from(io::SYNCHSAFE_MAX),
            });
        }

        let header = TagHeader {
            version: self.version,
            revision: 0,
            flags: TagFlags {
                unsynchronisation: self.unsynchronisation,
                ..TagFlags::default()
            },
            size: size as u32,
        };

        let mut out = Vec::with_capacity(HEADER_LEN + size as usize);
        out.extend(header.to_bytes()?);
        out.extend_from_slice(region);
        out.resize(HEADER_LEN + size as usize, 0);
        Ok(out)
    }

    /// The complete tag with its own padding.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.assemble(&self.render_frames()?, self.padding)
    }
}

impl Tag for Id3v2Tag {
    fn format_name(&self) -> String {
        self.version.to_string()
    }

    fn field(&self, key: StandardField) -> Option<String> {
        let value = match key {
            StandardField::Date => self
                .timestamp()
                .map(|ts| ts.to_iso())
                .or_else(|| self.text("TDRC")),
            StandardField::Comment => self.comment_frame(COMM).map(|c| c.text.clone()),
            StandardField::Lyrics => self.comment_frame(USLT).map(|c| c.text.clone()),
            StandardField::Picture => None,
            _ => FieldMappings::to_id3v2(key).and_then(|id| self.text(id)),
        };
        value.filter(|v| !v.is_empty())
    }

    fn set_field(&mut self, key: StandardField, value: &str) -> Result<()> {
        tag::require_text(key)?;
        match key {
            StandardField::Date => {
                let timestamp = Timestamp::parse_iso(value).ok_or_else(|| {
                    ArgumentError::Other(format!("{value:?} is not a valid date"))
                })?;
                self.set_timestamp(timestamp);
            }
            StandardField::Comment | StandardField::Lyrics => {
                let id = if key == StandardField::Comment { COMM } else { USLT };
                let mut frame = CommentFrame::new(value, self.version);
                if let Some(existing) = self.comment_frame(id) {
                    frame.language = existing.language;
                    frame.description = existing.description.clone();
                    frame.encoding = TextEncoding::preferred_for(
                        &format!("{}{}", frame.description, value),
                        self.version.major(),
                    );
                }
                let description = frame.description.clone();
                let wrapped = if id == COMM {
                    Frame::Comment(frame)
                } else {
                    Frame::UnsyncLyrics(frame)
                };
                match self.frames.iter().position(|f| match f {
                    Frame::Comment(c) | Frame::UnsyncLyrics(c) => {
                        f.id() == id && c.description == description
                    }
                    _ => false,
                }) {
                    Some(idx) => self.frames[idx] = wrapped,
                    None => self.frames.push(wrapped),
                }
            }
            _ => {
                if let Some(id) = FieldMappings::to_id3v2(key) {
                    self.set_text(id, value)?;
                }
            }
        }
        Ok(())
    }

    fn remove_field(&mut self, key: StandardField) {
        match key {
            StandardField::Date => self.remove_date_frames(),
            _ => {
                if let Some(id) = FieldMappings::to_id3v2(key) {
                    self.remove_frames(id);
                }
            }
        }
    }

    fn picture(&self) -> Option<AttachedPicture> {
        let mut pictures = self.frames.iter().filter_map(|frame| match frame {
            Frame::Picture(pic) => Some(&pic.picture),
            _ => None,
        });
        let first = pictures.next()?;
        if first.picture_type() == PictureType::CoverFront {
            return Some(first.clone());
        }
        pictures
            .find(|pic| pic.picture_type() == PictureType::CoverFront)
            .or(Some(first))
            .cloned()
    }

    fn set_picture(&mut self, picture: AttachedPicture) -> Result<()> {
        picture.validate()?;
        self.remove_frames("APIC");
        self.frames
            .push(Frame::Picture(PictureFrame::new(picture, self.version)));
        Ok(())
    }

    fn remove_picture(&mut self) {
        self.remove_frames(APIC.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flac::VorbisComment;

    fn tag_with(version: Version, fields: &[(StandardField, &str)]) -> Id3v2Tag {
        let mut tag = Id3v2Tag::new(version);
        for (key, value) in fields {
            tag.set_field(*key, value).unwrap();
        }
        tag
    }

    #[test]
    fn single_text_frame_layout() {
        let mut tag = tag_with(Version::V24, &[(StandardField::Title, "Title")]);
        tag.set_padding(0).unwrap();
        let bytes = tag.to_bytes().unwrap();

        assert_eq!(&bytes[..10], b"ID3\x04\x00\x00\x00\x00\x00\x10");
        assert_eq!(&bytes[10..], b"TIT2\x00\x00\x00\x06\x00\x00\x03Title");
    }

    #[test]
    fn padding_is_zero_filled() {
        let mut tag = tag_with(Version::V23, &[(StandardField::Artist, "A")]);
        tag.set_padding(100).unwrap();
        let bytes = tag.to_bytes().unwrap();

        assert_eq!(bytes.len(), 10 + 12 + 100);
        assert!(bytes[22..].iter().all(|&b| b == 0));

        let parsed = Id3v2Tag::parse(&bytes).unwrap();
        assert_eq!(parsed.padding(), 100);
        assert_eq!(parsed.field(StandardField::Artist).as_deref(), Some("A"));
    }

    #[test]
    fn rejects_out_of_range_padding() {
        let mut tag = Id3v2Tag::new(Version::V24);
        assert!(tag.set_padding(8).is_err());
        assert_eq!(tag.padding(), DEFAULT_PADDING);
    }

    #[test]
    fn fields_round_trip_through_bytes() {
        for version in [Version::V23, Version::V24] {
            let tag = tag_with(
                version,
                &[
                    (StandardField::Title, "T\u{ed}tulo"),
                    (StandardField::Artist, "\u{30a2}\u{30fc}\u{30c6}\u{30a3}\u{30b9}\u{30c8}"),
                    (StandardField::TrackNumber, "3/12"),
                    (StandardField::Comment, "nice"),
                    (StandardField::Lyrics, "la la"),
                    (StandardField::Date, "2024-03-15T10:30"),
                ],
            );
            let parsed = Id3v2Tag::parse(&tag.to_bytes().unwrap()).unwrap();

            for key in [
                StandardField::Title,
                StandardField::Artist,
                StandardField::TrackNumber,
                StandardField::Comment,
                StandardField::Lyrics,
                StandardField::Date,
            ] {
                assert_eq!(parsed.field(key), tag.field(key), "{version} {key}");
            }
            assert_eq!(
                parsed.field(StandardField::Date).as_deref(),
                Some("2024-03-15T10:30")
            );
        }
    }

    #[test]
    fn v23_date_uses_three_frames() {
        let tag = tag_with(Version::V23, &[(StandardField::Date, "2024-03-15T10:30")]);
        assert_eq!(tag.text("TYER").as_deref(), Some("2024"));
        assert_eq!(tag.text("TDAT").as_deref(), Some("1503"));
        assert_eq!(tag.text("TIME").as_deref(), Some("1030"));
        assert!(tag.frame("TDRC").is_none());
    }

    #[test]
    fn invalid_date_is_rejected() {
        let mut tag = Id3v2Tag::new(Version::V24);
        assert!(tag.set_field(StandardField::Date, "next tuesday").is_err());
        assert!(tag.frames().is_empty());
    }

    #[test]
    fn copy_skips_fields_it_cannot_store() {
        let mut source = VorbisComment::new("v");
        source.set("TITLE", "Song").unwrap();
        source.set("DATE", "1970s").unwrap();
        source.set("COMMENT", "kept").unwrap();
        source.set("BPM", "96").unwrap();

        let mut tag = Id3v2Tag::new(Version::V24);
        let skipped = tag.copy_from(&source);

        assert_eq!(skipped, [StandardField::Date]);
        assert_eq!(tag.field(StandardField::Title).as_deref(), Some("Song"));
        assert_eq!(tag.field(StandardField::Comment).as_deref(), Some("kept"));
        assert_eq!(tag.field(StandardField::Bpm).as_deref(), Some("96"));
        assert_eq!(tag.field(StandardField::Date), None);
    }

    #[test]
    fn convert_between_versions() {
        let mut tag = tag_with(
            Version::V24,
            &[
                (StandardField::Title, "\u{65e5}\u{672c}"),
                (StandardField::Date, "2024-03-15T10:30"),
            ],
        );

        tag.convert_version(Version::V23);
        assert_eq!(tag.version(), Version::V23);
        assert!(tag
            .frames()
            .iter()
            .filter_map(Frame::encoding)
            .all(TextEncoding::is_v23_compatible));
        assert_eq!(tag.text("TDAT").as_deref(), Some("1503"));

        let bytes = tag.to_bytes().unwrap();
        assert_eq!(bytes[3], 3);
        let mut parsed = Id3v2Tag::parse(&bytes).unwrap();
        assert_eq!(parsed.field(StandardField::Title).as_deref(), Some("\u{65e5}\u{672c}"));

        parsed.convert_version(Version::V24);
        assert_eq!(
            parsed.field(StandardField::Date).as_deref(),
            Some("2024-03-15T10:30")
        );
        assert!(parsed.frame("TYER").is_none());
        assert!(matches!(parsed.frame("TDRC"), Some(Frame::Timestamp(_))));
    }

    #[test]
    fn unsynchronised_tags_round_trip() {
        let picture =
            AttachedPicture::new(PictureType::CoverFront, "image/jpeg", "", vec![0xFF, 0xD8, 0xFF, 0xE0, 0xFF])
                .unwrap();
        for version in [Version::V23, Version::V24] {
            let mut tag = tag_with(version, &[(StandardField::Title, "x")]);
            tag.set_picture(picture.clone()).unwrap();
            tag.set_unsynchronisation(true);

            let bytes = tag.to_bytes().unwrap();
            assert_eq!(bytes[5] & 0x80, 0x80);
            let parsed = Id3v2Tag::parse(&bytes).unwrap();
            assert_eq!(parsed.picture(), Some(picture.clone()));
            assert_eq!(parsed.field(StandardField::Title).as_deref(), Some("x"));
        }
    }

    #[test]
    fn compressed_tags_round_trip() {
        let mut tag = tag_with(Version::V24, &[(StandardField::Lyrics, &"lyrics ".repeat(100))]);
        tag.set_compression(true);
        let bytes = tag.to_bytes().unwrap();
        let parsed = Id3v2Tag::parse(&bytes).unwrap();
        assert_eq!(parsed.field(StandardField::Lyrics), tag.field(StandardField::Lyrics));
    }

    #[test]
    fn picture_prefers_front_cover() {
        let mut tag = Id3v2Tag::new(Version::V24);
        let back = AttachedPicture::new(PictureType::CoverBack, "image/png", "", vec![1]).unwrap();
        let front = AttachedPicture::new(PictureType::CoverFront, "image/png", "", vec![2]).unwrap();
        tag.add_frame(Frame::Picture(PictureFrame::new(back, Version::V24)));
        tag.add_frame(Frame::Picture(PictureFrame::new(front.clone(), Version::V24)));
        assert_eq!(tag.picture(), Some(front.clone()));

        tag.set_picture(front).unwrap();
        assert_eq!(tag.frames().len(), 1);
        tag.remove_picture();
        assert!(tag.is_empty());
    }

    #[test]
    fn skips_extended_header() {
        // ID3v2.3 extended header: size 6, flags, padding size
        let mut body = b"\x00\x00\x00\x06\x00\x00\x00\x00\x00\x00".to_vec();
        body.extend(b"TIT2\x00\x00\x00\x02\x00\x00\x00x");
        let mut data = b"ID3\x03\x00\x40\x00\x00\x00".to_vec();
        data.push(body.len() as u8);
        data.extend(body);

        let tag = Id3v2Tag::parse(&data).unwrap();
        assert_eq!(tag.field(StandardField::Title).as_deref(), Some("x"));
        // Extended headers are never written back
        assert_eq!(tag.to_bytes().unwrap()[5], 0);
    }

    #[test]
    fn stops_at_garbage() {
        let mut data = b"ID3\x04\x00\x00\x00\x00\x00\x1E".to_vec();
        data.extend(b"TIT2\x00\x00\x00\x02\x00\x00\x03x");
        data.extend(b"ab!d\x00\x00\x00\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00");
        let tag = Id3v2Tag::parse(&data).unwrap();
        assert_eq!(tag.frames().len(), 1);
    }

    #[test]
    fn set_text_rejects_non_text_frames() {
        let mut tag = Id3v2Tag::new(Version::V24);
        assert!(tag.set_text("APIC", "x").is_err());
        assert!(tag.set_text("TXXX", "x").is_err());
        assert!(tag.set_text("TOOLONG", "x").is_err());
        tag.set_text("TSSE", "encoder").unwrap();
        assert_eq!(tag.text("TSSE").as_deref(), Some("encoder"));
    }
}
