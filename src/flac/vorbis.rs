// Vorbis comment codec, shared by FLAC, Ogg Vorbis and Opus

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::warn;

use super::picture::{read_picture, write_picture};
use crate::error::{ArgumentError, Error, Result};
use crate::field_mapping::{FieldMappings, StandardField};
use crate::picture::{AttachedPicture, PictureType};
use crate::tag::{self, Tag};
use crate::utils::cursor::ByteCursor;

/// Vendor string written into comment blocks created from scratch.
pub const DEFAULT_VENDOR: &str = concat!("oxitag ", env!("CARGO_PKG_VERSION"));

/// Whether the comment packet ends with a framing byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Ogg Vorbis: a byte with the low bit set follows the last comment.
    Required,
    /// FLAC and Opus: the list simply ends.
    Absent,
}

/// Vorbis comment structure
///
/// Keys are stored uppercase; the order of comments is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VorbisComment {
    vendor: String,
    comments: Vec<(String, String)>,
}

impl Default for VorbisComment {
    fn default() -> Self {
        VorbisComment::new(DEFAULT_VENDOR)
    }
}

impl VorbisComment {
    pub fn new(vendor: impl Into<String>) -> Self {
        VorbisComment {
            vendor: vendor.into(),
            comments: Vec::new(),
        }
    }

    pub fn parse(data: &[u8], framing: Framing) -> Result<Self> {
        Self::parse_with_trailer(data, framing).map(|(comment, _)| comment)
    }

    /// Parse a comment list and return whatever follows it.
    pub fn parse_with_trailer(data: &[u8], framing: Framing) -> Result<(Self, &[u8])> {
        let mut cursor = ByteCursor::new(data);

        let vendor = String::from_utf8_lossy(cursor.read_le_prefixed()?).into_owned();
        let count = cursor.read_le_u32()?;

        let mut comments = Vec::new();
        for _ in 0..count {
            let raw = String::from_utf8_lossy(cursor.read_le_prefixed()?).into_owned();
            match raw.split_once('=') {
                Some((key, value)) => comments.push((key.to_ascii_uppercase(), value.to_string())),
                None => warn!(target: "vorbis", "skipping comment without '=': {:?}", raw),
            }
        }

        if framing == Framing::Required && !cursor.is_empty() {
            let framing_byte = cursor.read_u8()?;
            if framing_byte & 0x01 == 0 {
                return Err(Error::invalid("Vorbis comment", "framing bit is not set"));
            }
        }

        Ok((VorbisComment { vendor, comments }, cursor.take_rest()))
    }

    pub fn to_bytes(&self, framing: Framing) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        write_prefixed(&mut out, self.vendor.as_bytes())?;
        out.extend(length_of(self.comments.len())?.to_le_bytes());
        for (key, value) in &self.comments {
            write_prefixed(&mut out, format!("{key}={value}").as_bytes())?;
        }
        if framing == Framing::Required {
            out.push(0x01);
        }
        Ok(out)
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn set_vendor(&mut self, vendor: impl Into<String>) {
        self.vendor = vendor.into();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.comments.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Get the first value of a field, ignoring case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.comments
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.comments
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Replace every value of `key` with `value`, keeping the position of
    /// the first one.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let key = normalize_key(key)?;
        match self.comments.iter().position(|(k, _)| *k == key) {
            Some(idx) => {
                self.comments[idx].1 = value.to_string();
                let mut seen = false;
                self.comments.retain(|(k, _)| {
                    if *k != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.comments.push((key, value.to_string())),
        }
        Ok(())
    }

    /// Append a value without touching existing ones.
    pub fn add(&mut self, key: &str, value: &str) -> Result<()> {
        let key = normalize_key(key)?;
        self.comments.push((key, value.to_string()));
        Ok(())
    }

    /// Remove every value of `key`, returning how many were removed.
    pub fn remove(&mut self, key: &str) -> usize {
        let before = self.comments.len();
        self.comments.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        before - self.comments.len()
    }

    /// Pictures stored as base64 PICTURE blocks. Unreadable ones are skipped.
    pub fn pictures(&self) -> Vec<AttachedPicture> {
        self.get_all(FieldMappings::VORBIS_PICTURE)
            .filter_map(|encoded| {
                let decoded = BASE64
                    .decode(encoded.trim())
                    .map_err(|err| Error::invalid("Vorbis comment", err.to_string()))
                    .and_then(|bytes| read_picture(&bytes));
                match decoded {
                    Ok(picture) => Some(picture),
                    Err(err) => {
                        warn!(target: "vorbis", "skipping unreadable embedded picture: {}", err);
                        None
                    }
                }
            })
            .collect()
    }
}

/// Field names are printable ASCII without '='.
fn normalize_key(key: &str) -> Result<String> {
    if key.is_empty() || !key.bytes().all(|b| (0x20..=0x7D).contains(&b) && b != b'=') {
        return Err(ArgumentError::Other(format!("{key:?} is not a valid comment field name")).into());
    }
    Ok(key.to_ascii_uppercase())
}

fn length_of(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::TooLarge {
        what: "Vorbis comment field",
        size: len as u64,
        limit: u64::from(u32::MAX),
    })
}

fn write_prefixed(out: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    out.extend(length_of(data.len())?.to_le_bytes());
    out.extend_from_slice(data);
    Ok(())
}

impl Tag for VorbisComment {
    fn format_name(&self) -> String {
        "Vorbis comment".to_string()
    }

    fn field(&self, key: StandardField) -> Option<String> {
        if !key.is_text() {
            return None;
        }
        let primary = FieldMappings::to_vorbis(key);
        self.get(primary)
            .or_else(|| {
                self.iter()
                    .find(|(k, _)| FieldMappings::from_vorbis(k) == Some(key))
                    .map(|(_, v)| v)
            })
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn set_field(&mut self, key: StandardField, value: &str) -> Result<()> {
        tag::require_text(key)?;
        self.set(FieldMappings::to_vorbis(key), value)
    }

    fn remove_field(&mut self, key: StandardField) {
        let aliases: Vec<String> = self
            .iter()
            .filter(|(k, _)| FieldMappings::from_vorbis(k) == Some(key))
            .map(|(k, _)| k.to_string())
            .collect();
        for alias in aliases {
            self.remove(&alias);
        }
    }

    fn picture(&self) -> Option<AttachedPicture> {
        let pictures = self.pictures();
        let front = pictures
            .iter()
            .position(|pic| pic.picture_type() == PictureType::CoverFront)
            .unwrap_or(0);
        pictures.into_iter().nth(front)
    }

    fn set_picture(&mut self, picture: AttachedPicture) -> Result<()> {
        picture.validate()?;
        let encoded = BASE64.encode(write_picture(&picture)?);
        self.set(FieldMappings::VORBIS_PICTURE, &encoded)
    }

    fn remove_picture(&mut self) {
        self.remove(FieldMappings::VORBIS_PICTURE);
    }
}
