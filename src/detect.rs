//! Container detection from magic bytes.

use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use log::debug;
use serde::Serialize;

use crate::error::Result;
use crate::flac::FLAC_SIGNATURE;
use crate::id3::header::{self, ID3_SIGNATURE};
use crate::ogg::page::{Page, OGG_SIGNATURE};
use crate::opus::OPUS_SIGNATURE;
use crate::utils::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileType {
    Mpeg,
    Flac,
    OggVorbis,
    OggOpus,
    M4a,
}

impl FileType {
    pub fn mime_type(self) -> &'static str {
        match self {
            FileType::Mpeg => "audio/mpeg",
            FileType::Flac => "audio/flac",
            FileType::OggVorbis => "audio/x-vorbis+ogg",
            FileType::OggOpus => "audio/x-opus+ogg",
            FileType::M4a => "audio/m4a",
        }
    }

    pub fn from_mime_type(mime: &str) -> Option<Self> {
        [
            FileType::Mpeg,
            FileType::Flac,
            FileType::OggVorbis,
            FileType::OggOpus,
            FileType::M4a,
        ]
        .into_iter()
        .find(|ty| ty.mime_type().eq_ignore_ascii_case(mime))
    }

    pub fn name(self) -> &'static str {
        match self {
            FileType::Mpeg => "MPEG",
            FileType::Flac => "FLAC",
            FileType::OggVorbis => "Ogg Vorbis",
            FileType::OggOpus => "Ogg Opus",
            FileType::M4a => "MPEG-4 audio",
        }
    }

    /// Whether tags of this container can be edited.
    pub fn is_supported(self) -> bool {
        !matches!(self, FileType::M4a)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sniff the container type. The reader is left at offset 0.
pub fn detect<R: Read + Seek>(reader: &mut R) -> Result<Option<FileType>> {
    let detected = sniff(reader);
    reader.seek(SeekFrom::Start(0))?;
    let detected = detected?;
    debug!(
        "detected container: {}",
        detected.map_or("unrecognized", FileType::mime_type)
    );
    Ok(detected)
}

fn sniff<R: Read + Seek>(reader: &mut R) -> Result<Option<FileType>> {
    reader.seek(SeekFrom::Start(0))?;

    // A leading ID3v2 tag may front MPEG audio or, unusually, a FLAC stream.
    let mut start = 0;
    if io::check_signature(reader, ID3_SIGNATURE)? {
        match header::region_len(&io::read_array(reader)?) {
            Some(len) => start = len,
            None => return Ok(Some(FileType::Mpeg)),
        }
    }

    reader.seek(SeekFrom::Start(start))?;
    let mut magic = [0u8; 12];
    let filled = read_up_to(reader, &mut magic)?;
    let magic = &magic[..filled];

    if magic.starts_with(FLAC_SIGNATURE) {
        return Ok(Some(FileType::Flac));
    }
    if start > 0 {
        return Ok(Some(FileType::Mpeg));
    }
    if magic.starts_with(OGG_SIGNATURE) {
        return sniff_ogg(reader);
    }
    if magic.len() >= 8 && &magic[4..8] == b"ftyp" {
        return Ok(Some(FileType::M4a));
    }
    if magic.len() >= 2 && is_frame_sync(magic[0], magic[1]) {
        return Ok(Some(FileType::Mpeg));
    }
    Ok(None)
}

/// 11 set sync bits and a layer other than the reserved 00.
fn is_frame_sync(b0: u8, b1: u8) -> bool {
    b0 == 0xFF && b1 & 0xE0 == 0xE0 && (b1 >> 1) & 0x03 != 0
}

fn sniff_ogg<R: Read + Seek>(reader: &mut R) -> Result<Option<FileType>> {
    reader.seek(SeekFrom::Start(0))?;
    let Ok(Some(page)) = Page::read(reader) else {
        return Ok(None);
    };
    let payload = &page.payload;
    if payload.starts_with(OPUS_SIGNATURE) {
        Ok(Some(FileType::OggOpus))
    } else if payload.starts_with(b"\x01vorbis") {
        Ok(Some(FileType::OggVorbis))
    } else {
        Ok(None)
    }
}

fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
