// ID3v1 tag implementation (read-only)

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};
use crate::field_mapping::StandardField;
use crate::picture::AttachedPicture;
use crate::tag::Tag;
use crate::utils::encoding::{decode_text, TextEncoding};

pub const TAG_SIZE: u64 = 128;
const TAG_ID: &[u8; 3] = b"TAG";

/// Genre names indexed by the ID3v1 genre byte.
pub const GENRES: [&str; 80] = [
    "Blues", "Classic Rock", "Country", "Dance", "Disco", "Funk", "Grunge", "Hip-Hop", "Jazz",
    "Metal", "New Age", "Oldies", "Other", "Pop", "R&B", "Rap", "Reggae", "Rock", "Techno",
    "Industrial", "Alternative", "Ska", "Death Metal", "Pranks", "Soundtrack", "Euro-Techno",
    "Ambient", "Trip-Hop", "Vocal", "Jazz+Funk", "Fusion", "Trance", "Classical", "Instrumental",
    "Acid", "House", "Game", "Sound Clip", "Gospel", "Noise", "AlternRock", "Bass", "Soul", "Punk",
    "Space", "Meditative", "Instrumental Pop", "Instrumental Rock", "Ethnic", "Gothic", "Darkwave",
    "Techno-Industrial", "Electronic", "Pop-Folk", "Eurodance", "Dream", "Southern Rock", "Comedy",
    "Cult", "Gangsta", "Top 40", "Christian Rap", "Pop/Funk", "Jungle", "Native American",
    "Cabaret", "New Wave", "Psychadelic", "Rave", "Showtunes", "Trailer", "Lo-Fi", "Tribal",
    "Acid Punk", "Acid Jazz", "Polka", "Retro", "Musical", "Rock & Roll", "Hard Rock",
];

/// ID3v1 tag structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Id3v1Tag {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    pub comment: String,
    pub track: Option<u8>,
    pub genre: u8,
}

impl Id3v1Tag {
    /// Read the tag from the last 128 bytes, if there is one.
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Option<Self>> {
        let len = reader.seek(SeekFrom::End(0))?;
        if len < TAG_SIZE {
            return Ok(None);
        }

        reader.seek(SeekFrom::Start(len - TAG_SIZE))?;
        let mut buffer = [0u8; TAG_SIZE as usize];
        reader.read_exact(&mut buffer)?;

        if &buffer[0..3] != TAG_ID {
            return Ok(None);
        }

        Ok(Some(Self::parse(&buffer)))
    }

    /// Parse ID3v1 tag from buffer
    pub fn parse(buffer: &[u8; TAG_SIZE as usize]) -> Self {
        // ID3v1.1 puts a track number into the last two comment bytes
        let (comment, track) = if buffer[125] == 0 && buffer[126] != 0 {
            (parse_string(&buffer[97..125]), Some(buffer[126]))
        } else {
            (parse_string(&buffer[97..127]), None)
        };

        Id3v1Tag {
            title: parse_string(&buffer[3..33]),
            artist: parse_string(&buffer[33..63]),
            album: parse_string(&buffer[63..93]),
            year: parse_string(&buffer[93..97]),
            comment,
            track,
            genre: buffer[127],
        }
    }

    pub fn genre_name(&self) -> Option<&'static str> {
        GENRES.get(usize::from(self.genre)).copied()
    }
}

/// Fixed-width, NUL or space padded Latin-1 text.
fn parse_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    decode_text(&bytes[..end], TextEncoding::Latin1)
        .trim_end()
        .to_string()
}

fn read_only() -> Error {
    Error::Unsupported("ID3v1 tags are read-only".to_string())
}

impl Tag for Id3v1Tag {
    fn format_name(&self) -> String {
        if self.track.is_some() { "ID3v1.1" } else { "ID3v1" }.to_string()
    }

    fn field(&self, key: StandardField) -> Option<String> {
        let value = match key {
            StandardField::Title => self.title.clone(),
            StandardField::Artist => self.artist.clone(),
            StandardField::Album => self.album.clone(),
            StandardField::Date => self.year.clone(),
            StandardField::Comment => self.comment.clone(),
            StandardField::TrackNumber => self.track?.to_string(),
            StandardField::Genre => self.genre_name()?.to_string(),
            _ => return None,
        };
        Some(value).filter(|v| !v.is_empty())
    }

    fn set_field(&mut self, _key: StandardField, _value: &str) -> Result<()> {
        Err(read_only())
    }

    fn remove_field(&mut self, _key: StandardField) {}

    fn picture(&self) -> Option<AttachedPicture> {
        None
    }

    fn set_picture(&mut self, _picture: AttachedPicture) -> Result<()> {
        Err(read_only())
    }

    fn remove_picture(&mut self) {}
}
