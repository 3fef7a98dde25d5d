// ID3v2 frame bodies and their on-disk encoding

use std::borrow::Cow;

use log::{debug, warn};
use miniz_oxide::deflate::compress_to_vec_zlib;
use miniz_oxide::inflate::decompress_to_vec_zlib_with_limit;

use super::header::{FrameFlags, FrameHeader, FrameId, Version};
use super::timestamp::{Timestamp, V24_TIMESTAMP_FRAMES};
use super::unsync;
use crate::error::{Error, Result};
use crate::picture::{AttachedPicture, PictureType};
use crate::utils::cursor::ByteCursor;
use crate::utils::encoding::{decode_text, encode_terminated, encode_text, TextEncoding};
use crate::utils::io;

pub const COMM: FrameId = FrameId::from_static(b"COMM");
pub const USLT: FrameId = FrameId::from_static(b"USLT");
pub const APIC: FrameId = FrameId::from_static(b"APIC");
pub const SYLT: FrameId = FrameId::from_static(b"SYLT");
pub const TXXX: FrameId = FrameId::from_static(b"TXXX");

/// Upper bound for a decompressed frame body.
const MAX_INFLATED_LEN: usize = 64 << 20;
const COMPRESSION_LEVEL: u8 = 6;

/// Language code written when the caller gives none.
pub const DEFAULT_LANGUAGE: [u8; 3] = *b"eng";

/// A `T***` frame. ID3v2.4 separates multiple values with NUL, which is kept
/// as `'\0'` inside `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFrame {
    pub id: FrameId,
    pub encoding: TextEncoding,
    pub text: String,
    /// Status flags read from the file, written back unchanged.
    pub status: FrameFlags,
}

impl TextFrame {
    pub fn new(id: FrameId, text: impl Into<String>, version: Version) -> Self {
        let text = text.into();
        TextFrame {
            id,
            encoding: TextEncoding::preferred_for(&text, version.major()),
            text,
            status: FrameFlags::default(),
        }
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.text.split('\0')
    }

    fn parse(id: FrameId, data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let encoding = TextEncoding::from_byte(cursor.read_u8()?)?;

        let mut values = Vec::new();
        while !cursor.is_empty() {
            values.push(decode_text(cursor.read_terminated(encoding), encoding));
        }

        Ok(TextFrame {
            id,
            encoding,
            text: values.join("\0"),
            status: FrameFlags::default(),
        })
    }

    fn render(&self, version: Version) -> Vec<u8> {
        let encoding = encoding_for(self.encoding, version);
        let mut out = vec![encoding.to_byte()];
        for (idx, value) in self.values().enumerate() {
            if idx > 0 {
                out.extend(std::iter::repeat(0).take(encoding.terminator_len()));
            }
            out.extend(encode_text(value, encoding));
        }
        out
    }
}

/// `COMM` and `USLT` share one layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentFrame {
    pub encoding: TextEncoding,
    pub language: [u8; 3],
    pub description: String,
    pub text: String,
    pub status: FrameFlags,
}

impl CommentFrame {
    pub fn new(text: impl Into<String>, version: Version) -> Self {
        let text = text.into();
        CommentFrame {
            encoding: TextEncoding::preferred_for(&text, version.major()),
            language: DEFAULT_LANGUAGE,
            description: String::new(),
            text,
            status: FrameFlags::default(),
        }
    }

    fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let encoding = TextEncoding::from_byte(cursor.read_u8()?)?;
        let language = cursor.read_array()?;
        let description = decode_text(cursor.read_terminated(encoding), encoding);
        let text = decode_text(cursor.take_rest(), encoding);

        Ok(CommentFrame {
            encoding,
            language,
            description,
            text,
            status: FrameFlags::default(),
        })
    }

    fn render(&self, version: Version) -> Vec<u8> {
        let encoding = encoding_for(self.encoding, version);
        let mut out = vec![encoding.to_byte()];
        out.extend(self.language);
        out.extend(encode_terminated(&self.description, encoding));
        out.extend(encode_text(&self.text, encoding));
        out
    }
}

/// A date-valued frame such as `TDRC`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFrame {
    pub id: FrameId,
    pub encoding: TextEncoding,
    pub timestamp: Timestamp,
    pub status: FrameFlags,
}

impl TimestampFrame {
    pub fn new(id: FrameId, timestamp: Timestamp, version: Version) -> Self {
        TimestampFrame {
            id,
            encoding: TextEncoding::preferred_for("", version.major()),
            timestamp,
            status: FrameFlags::default(),
        }
    }

    fn render(&self, version: Version) -> Vec<u8> {
        let encoding = encoding_for(self.encoding, version);
        let mut out = vec![encoding.to_byte()];
        out.extend(encode_text(&self.timestamp.to_iso(), encoding));
        out
    }
}

/// `APIC`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureFrame {
    pub encoding: TextEncoding,
    pub picture: AttachedPicture,
    pub status: FrameFlags,
}

impl PictureFrame {
    pub fn new(picture: AttachedPicture, version: Version) -> Self {
        PictureFrame {
            encoding: TextEncoding::preferred_for(picture.description(), version.major()),
            picture,
            status: FrameFlags::default(),
        }
    }

    fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let encoding = TextEncoding::from_byte(cursor.read_u8()?)?;
        let mime_type = decode_text(cursor.read_terminated(TextEncoding::Latin1), TextEncoding::Latin1);
        let picture_type = PictureType::from_code_lossy(u32::from(cursor.read_u8()?));
        let description = decode_text(cursor.read_terminated(encoding), encoding);

        Ok(PictureFrame {
            encoding,
            picture: AttachedPicture {
                picture_type,
                mime_type,
                description,
                width: 0,
                height: 0,
                color_depth: 0,
                indexed_colors: 0,
                data: cursor.take_rest().to_vec(),
            },
            status: FrameFlags::default(),
        })
    }

    fn render(&self, version: Version) -> Vec<u8> {
        let encoding = encoding_for(self.encoding, version);
        let picture = &self.picture;
        let mut out = vec![encoding.to_byte()];
        out.extend(encode_terminated(picture.mime_type(), TextEncoding::Latin1));
        out.push(picture.picture_type().code());
        out.extend(encode_terminated(picture.description(), encoding));
        out.extend_from_slice(picture.data());
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedText {
    pub timestamp: u32,
    pub text: String,
}

/// `SYLT`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedLyricsFrame {
    pub encoding: TextEncoding,
    pub language: [u8; 3],
    pub timestamp_format: u8,
    pub content_type: u8,
    pub description: String,
    pub lines: Vec<SyncedText>,
    pub status: FrameFlags,
}

impl SyncedLyricsFrame {
    fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let encoding = TextEncoding::from_byte(cursor.read_u8()?)?;
        let language = cursor.read_array()?;
        let timestamp_format = cursor.read_u8()?;
        let content_type = cursor.read_u8()?;
        let description = decode_text(cursor.read_terminated(encoding), encoding);

        let mut lines = Vec::new();
        while !cursor.is_empty() {
            let text = decode_text(cursor.read_terminated(encoding), encoding);
            let timestamp = cursor.read_be_u32()?;
            lines.push(SyncedText { timestamp, text });
        }

        Ok(SyncedLyricsFrame {
            encoding,
            language,
            timestamp_format,
            content_type,
            description,
            lines,
            status: FrameFlags::default(),
        })
    }

    fn render(&self, version: Version) -> Vec<u8> {
        let encoding = encoding_for(self.encoding, version);
        let mut out = vec![encoding.to_byte()];
        out.extend(self.language);
        out.push(self.timestamp_format);
        out.push(self.content_type);
        out.extend(encode_terminated(&self.description, encoding));
        for line in &self.lines {
            out.extend(encode_terminated(&line.text, encoding));
            out.extend(line.timestamp.to_be_bytes());
        }
        out
    }
}

/// A frame kept as raw bytes. When `flags` still mark the data as compressed
/// the bytes are written back exactly as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFrame {
    pub id: FrameId,
    pub flags: FrameFlags,
    pub data: Vec<u8>,
}

impl UnknownFrame {
    pub fn new(id: FrameId, data: &[u8]) -> Self {
        UnknownFrame {
            id,
            flags: FrameFlags::default(),
            data: data.to_vec(),
        }
    }

    pub(crate) fn is_verbatim(&self) -> bool {
        self.flags.compressed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(TextFrame),
    Comment(CommentFrame),
    UnsyncLyrics(CommentFrame),
    Timestamp(TimestampFrame),
    Picture(PictureFrame),
    SyncedLyrics(SyncedLyricsFrame),
    Unknown(UnknownFrame),
}

impl Frame {
    pub fn id(&self) -> FrameId {
        match self {
            Frame::Text(frame) => frame.id,
            Frame::Comment(_) => COMM,
            Frame::UnsyncLyrics(_) => USLT,
            Frame::Timestamp(frame) => frame.id,
            Frame::Picture(_) => APIC,
            Frame::SyncedLyrics(_) => SYLT,
            Frame::Unknown(frame) => frame.id,
        }
    }

    pub fn encoding(&self) -> Option<TextEncoding> {
        match self {
            Frame::Text(frame) => Some(frame.encoding),
            Frame::Comment(frame) | Frame::UnsyncLyrics(frame) => Some(frame.encoding),
            Frame::Timestamp(frame) => Some(frame.encoding),
            Frame::Picture(frame) => Some(frame.encoding),
            Frame::SyncedLyrics(frame) => Some(frame.encoding),
            Frame::Unknown(_) => None,
        }
    }

    /// The frame's status flags (tag/file alter preservation, read-only).
    pub fn status(&self) -> FrameFlags {
        match self {
            Frame::Text(frame) => frame.status,
            Frame::Comment(frame) | Frame::UnsyncLyrics(frame) => frame.status,
            Frame::Timestamp(frame) => frame.status,
            Frame::Picture(frame) => frame.status,
            Frame::SyncedLyrics(frame) => frame.status,
            Frame::Unknown(frame) => frame.flags.status_only(),
        }
    }

    fn set_status(&mut self, status: FrameFlags) {
        match self {
            Frame::Text(frame) => frame.status = status,
            Frame::Comment(frame) | Frame::UnsyncLyrics(frame) => frame.status = status,
            Frame::Timestamp(frame) => frame.status = status,
            Frame::Picture(frame) => frame.status = status,
            Frame::SyncedLyrics(frame) => frame.status = status,
            Frame::Unknown(frame) => frame.flags = status,
        }
    }

    pub(crate) fn set_encoding(&mut self, encoding: TextEncoding) {
        match self {
            Frame::Text(frame) => frame.encoding = encoding,
            Frame::Comment(frame) | Frame::UnsyncLyrics(frame) => frame.encoding = encoding,
            Frame::Timestamp(frame) => frame.encoding = encoding,
            Frame::Picture(frame) => frame.encoding = encoding,
            Frame::SyncedLyrics(frame) => frame.encoding = encoding,
            Frame::Unknown(_) => {}
        }
    }

    /// Decode a frame body that has already been decompressed and
    /// de-unsynchronised.
    pub fn parse_body(id: FrameId, data: &[u8]) -> Result<Frame> {
        let frame = match id.as_bytes() {
            b"TXXX" => Frame::Unknown(UnknownFrame::new(id, data)),
            b"COMM" => Frame::Comment(CommentFrame::parse(data)?),
            b"USLT" => Frame::UnsyncLyrics(CommentFrame::parse(data)?),
            b"APIC" => Frame::Picture(PictureFrame::parse(data)?),
            b"SYLT" => Frame::SyncedLyrics(SyncedLyricsFrame::parse(data)?),
            _ if V24_TIMESTAMP_FRAMES.contains(&id.as_str()) => {
                let text = TextFrame::parse(id, data)?;
                match Timestamp::parse_iso(&text.text) {
                    Some(timestamp) => Frame::Timestamp(TimestampFrame {
                        id,
                        encoding: text.encoding,
                        timestamp,
                        status: text.status,
                    }),
                    None => {
                        debug!(target: "id3v2", "{} holds no valid timestamp: {:?}", id, text.text);
                        Frame::Text(text)
                    }
                }
            }
            _ if id.starts_with(b'T') => Frame::Text(TextFrame::parse(id, data)?),
            _ => Frame::Unknown(UnknownFrame::new(id, data)),
        };
        Ok(frame)
    }

    /// Encode the frame body for `version`, excluding the header.
    pub fn render_body(&self, version: Version) -> Vec<u8> {
        match self {
            Frame::Text(frame) => frame.render(version),
            Frame::Comment(frame) | Frame::UnsyncLyrics(frame) => frame.render(version),
            Frame::Timestamp(frame) => frame.render(version),
            Frame::Picture(frame) => frame.render(version),
            Frame::SyncedLyrics(frame) => frame.render(version),
            Frame::Unknown(frame) => frame.data.clone(),
        }
    }
}

/// ID3v2.3 cannot store UTF-8 or UTF-16BE.
fn encoding_for(encoding: TextEncoding, version: Version) -> TextEncoding {
    if version == Version::V23 && !encoding.is_v23_compatible() {
        TextEncoding::Utf16
    } else {
        encoding
    }
}

pub(crate) enum ReadOutcome {
    Frame(Frame),
    Skipped,
    End,
}

/// Read one frame from the frame region.
pub(crate) fn read_frame(
    version: Version,
    tag_unsync: bool,
    cursor: &mut ByteCursor,
) -> Result<ReadOutcome> {
    let Some(header) = FrameHeader::parse(version, cursor)? else {
        return Ok(ReadOutcome::End);
    };
    let body = cursor.take(header.size as usize)?;
    let id = header.id;
    let mut flags = header.flags;

    if flags.encrypted {
        warn!(target: "id3v2", "encryption is not supported, dropping frame {}", id);
        return Ok(ReadOutcome::Skipped);
    }

    let data: Cow<[u8]> = if version == Version::V24 && (flags.unsynchronised || tag_unsync) {
        flags.unsynchronised = false;
        Cow::Owned(unsync::decode(body))
    } else {
        Cow::Borrowed(body)
    };

    let mut body_cursor = ByteCursor::new(&data);
    let mut inflated_len = None;
    match version {
        Version::V23 => {
            if flags.compressed {
                inflated_len = Some(body_cursor.read_be_u32()?);
            }
            if flags.grouping {
                body_cursor.skip(1)?;
            }
        }
        Version::V24 => {
            if flags.grouping {
                body_cursor.skip(1)?;
            }
            if flags.data_length_indicator {
                let len = body_cursor.read_synchsafe_u32()?;
                if flags.compressed {
                    inflated_len = Some(len);
                }
            }
        }
    }
    let payload = body_cursor.take_rest();

    let content: Cow<[u8]> = if flags.compressed {
        match inflate(payload, inflated_len) {
            Ok(inflated) => Cow::Owned(inflated),
            Err(err) => {
                warn!(target: "id3v2", "keeping frame {} compressed: {}", id, err);
                return Ok(ReadOutcome::Frame(Frame::Unknown(UnknownFrame {
                    id,
                    flags,
                    data: data.to_vec(),
                })));
            }
        }
    } else {
        Cow::Borrowed(payload)
    };

    let frame = match Frame::parse_body(id, &content) {
        Ok(mut frame) => {
            frame.set_status(flags.status_only());
            frame
        }
        Err(err) => {
            warn!(target: "id3v2", "keeping malformed frame {} as raw data: {}", id, err);
            Frame::Unknown(UnknownFrame {
                id,
                flags: flags.status_only(),
                data: content.to_vec(),
            })
        }
    };

    Ok(ReadOutcome::Frame(frame))
}

fn inflate(payload: &[u8], expected: Option<u32>) -> Result<Vec<u8>> {
    let limit = expected.map_or(MAX_INFLATED_LEN, |len| (len as usize).min(MAX_INFLATED_LEN));
    let inflated = decompress_to_vec_zlib_with_limit(payload, limit).map_err(|err| {
        Error::invalid("ID3v2", format!("could not decompress frame: {:?}", err.status))
    })?;

    match expected {
        Some(len) if inflated.len() != len as usize => Err(Error::invalid(
            "ID3v2",
            format!(
                "frame decompressed to {} bytes, expected {}",
                inflated.len(),
                len
            ),
        )),
        _ => Ok(inflated),
    }
}

/// Encode a complete frame, header included.
pub(crate) fn render_frame(
    frame: &Frame,
    version: Version,
    compress: bool,
    unsynchronise: bool,
) -> Result<Vec<u8>> {
    let (mut flags, mut body) = match frame {
        Frame::Unknown(unknown) if unknown.is_verbatim() => (unknown.flags, unknown.data.clone()),
        _ => (frame.status(), frame.render_body(version)),
    };

    if compress && !flags.compressed {
        let len = u32::try_from(body.len()).map_err(|_| Error::TooLarge {
            what: "ID3v2 frame",
            size: body.len() as u64,
            limit: u64::from(u32::MAX),
        })?;
        let mut packed = match version {
            Version::V23 => len.to_be_bytes().to_vec(),
            Version::V24 => {
                flags.data_length_indicator = true;
                io::u32_to_synchsafe(len)?.to_vec()
            }
        };
        packed.extend(compress_to_vec_zlib(&body, COMPRESSION_LEVEL));
        flags.compressed = true;
        body = packed;
    }

    if unsynchronise && version == Version::V24 {
        body = unsync::encode(&body);
        flags.unsynchronised = true;
    }

    let size = u32::try_from(body.len()).map_err(|_| Error::TooLarge {
        what: "ID3v2 frame",
        size: body.len() as u64,
        limit: u64::from(u32::MAX),
    })?;
    let header = FrameHeader {
        id: frame.id(),
        size,
        flags,
    };

    let mut out = Vec::with_capacity(body.len() + 10);
    out.extend(header.to_bytes(version)?);
    out.extend(body);
    Ok(out)
}
