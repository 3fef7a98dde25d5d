// Unified metadata field mapping system
//
// Every tag format stores the same handful of semantic fields under its own
// names:
// - ID3v2: Frame IDs (TIT2, TPE1, TALB, etc.)
// - FLAC/OGG: Vorbis Comment keys (TITLE, ARTIST, ALBUM, etc.)
//
// StandardField is the format-agnostic key; FieldMappings translates it.

use std::fmt;
use std::str::FromStr;

/// Standard metadata fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardField {
    Title,
    Artist,
    Album,
    AlbumArtist,
    Composer,
    Genre,
    Date,
    TrackNumber,
    DiscNumber,
    Comment,
    Lyrics,
    Copyright,
    Publisher,
    EncodedBy,
    Bpm,
    Picture,
}

impl StandardField {
    /// Every field, in enumeration order. Tag conversion walks this list.
    pub const ALL: [StandardField; 16] = [
        StandardField::Title,
        StandardField::Artist,
        StandardField::Album,
        StandardField::AlbumArtist,
        StandardField::Composer,
        StandardField::Genre,
        StandardField::Date,
        StandardField::TrackNumber,
        StandardField::DiscNumber,
        StandardField::Comment,
        StandardField::Lyrics,
        StandardField::Copyright,
        StandardField::Publisher,
        StandardField::EncodedBy,
        StandardField::Bpm,
        StandardField::Picture,
    ];

    /// Get standard field name (lowercase)
    pub fn as_str(&self) -> &'static str {
        match self {
            StandardField::Title => "title",
            StandardField::Artist => "artist",
            StandardField::Album => "album",
            StandardField::AlbumArtist => "album_artist",
            StandardField::Composer => "composer",
            StandardField::Genre => "genre",
            StandardField::Date => "date",
            StandardField::TrackNumber => "track_number",
            StandardField::DiscNumber => "disc_number",
            StandardField::Comment => "comment",
            StandardField::Lyrics => "lyrics",
            StandardField::Copyright => "copyright",
            StandardField::Publisher => "publisher",
            StandardField::EncodedBy => "encoded_by",
            StandardField::Bpm => "bpm",
            StandardField::Picture => "picture",
        }
    }

    pub fn is_text(&self) -> bool {
        *self != StandardField::Picture
    }

    /// All text-valued fields.
    pub fn text_fields() -> impl Iterator<Item = StandardField> {
        Self::ALL.into_iter().filter(StandardField::is_text)
    }
}

impl fmt::Display for StandardField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StandardField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "title" => Ok(StandardField::Title),
            "artist" => Ok(StandardField::Artist),
            "album" => Ok(StandardField::Album),
            "album_artist" | "albumartist" => Ok(StandardField::AlbumArtist),
            "composer" => Ok(StandardField::Composer),
            "genre" => Ok(StandardField::Genre),
            "date" | "year" => Ok(StandardField::Date),
            "track_number" | "tracknumber" | "track" => Ok(StandardField::TrackNumber),
            "disc_number" | "discnumber" | "disc" => Ok(StandardField::DiscNumber),
            "comment" => Ok(StandardField::Comment),
            "lyrics" => Ok(StandardField::Lyrics),
            "copyright" => Ok(StandardField::Copyright),
            "publisher" => Ok(StandardField::Publisher),
            "encoded_by" | "encodedby" => Ok(StandardField::EncodedBy),
            "bpm" => Ok(StandardField::Bpm),
            "picture" | "cover" => Ok(StandardField::Picture),
            _ => Err(format!("unknown field {s:?}")),
        }
    }
}

/// Format-specific field mappings
pub struct FieldMappings;

impl FieldMappings {
    // ID3v2 frame IDs
    pub const ID3V2_TITLE: &'static str = "TIT2";
    pub const ID3V2_ARTIST: &'static str = "TPE1";
    pub const ID3V2_ALBUM: &'static str = "TALB";
    pub const ID3V2_ALBUM_ARTIST: &'static str = "TPE2";
    pub const ID3V2_COMPOSER: &'static str = "TCOM";
    pub const ID3V2_GENRE: &'static str = "TCON";
    pub const ID3V2_TRACK: &'static str = "TRCK";
    pub const ID3V2_DISC: &'static str = "TPOS";
    pub const ID3V2_COMMENT: &'static str = "COMM";
    pub const ID3V2_LYRICS: &'static str = "USLT";
    pub const ID3V2_COPYRIGHT: &'static str = "TCOP";
    pub const ID3V2_PUBLISHER: &'static str = "TPUB";
    pub const ID3V2_ENCODED_BY: &'static str = "TENC";
    pub const ID3V2_BPM: &'static str = "TBPM";
    pub const ID3V2_COVER: &'static str = "APIC";

    // Vorbis Comment keys (FLAC/OGG)
    pub const VORBIS_TITLE: &'static str = "TITLE";
    pub const VORBIS_ARTIST: &'static str = "ARTIST";
    pub const VORBIS_ALBUM: &'static str = "ALBUM";
    pub const VORBIS_ALBUM_ARTIST: &'static str = "ALBUMARTIST";
    pub const VORBIS_COMPOSER: &'static str = "COMPOSER";
    pub const VORBIS_GENRE: &'static str = "GENRE";
    pub const VORBIS_DATE: &'static str = "DATE";
    pub const VORBIS_TRACK: &'static str = "TRACKNUMBER";
    pub const VORBIS_DISC: &'static str = "DISCNUMBER";
    pub const VORBIS_COMMENT: &'static str = "COMMENT";
    pub const VORBIS_LYRICS: &'static str = "LYRICS";
    pub const VORBIS_COPYRIGHT: &'static str = "COPYRIGHT";
    pub const VORBIS_PUBLISHER: &'static str = "PUBLISHER";
    pub const VORBIS_ENCODED_BY: &'static str = "ENCODED-BY";
    pub const VORBIS_BPM: &'static str = "BPM";
    pub const VORBIS_PICTURE: &'static str = "METADATA_BLOCK_PICTURE";

    /// Get the ID3v2 frame ID for a field.
    ///
    /// `Date` has no single frame: it is a timestamp frame in ID3v2.4 and
    /// three frames in ID3v2.3, so it maps to `None` here.
    pub fn to_id3v2(field: StandardField) -> Option<&'static str> {
        match field {
            StandardField::Title => Some(Self::ID3V2_TITLE),
            StandardField::Artist => Some(Self::ID3V2_ARTIST),
            StandardField::Album => Some(Self::ID3V2_ALBUM),
            StandardField::AlbumArtist => Some(Self::ID3V2_ALBUM_ARTIST),
            StandardField::Composer => Some(Self::ID3V2_COMPOSER),
            StandardField::Genre => Some(Self::ID3V2_GENRE),
            StandardField::Date => None,
            StandardField::TrackNumber => Some(Self::ID3V2_TRACK),
            StandardField::DiscNumber => Some(Self::ID3V2_DISC),
            StandardField::Comment => Some(Self::ID3V2_COMMENT),
            StandardField::Lyrics => Some(Self::ID3V2_LYRICS),
            StandardField::Copyright => Some(Self::ID3V2_COPYRIGHT),
            StandardField::Publisher => Some(Self::ID3V2_PUBLISHER),
            StandardField::EncodedBy => Some(Self::ID3V2_ENCODED_BY),
            StandardField::Bpm => Some(Self::ID3V2_BPM),
            StandardField::Picture => Some(Self::ID3V2_COVER),
        }
    }

    /// Get Vorbis Comment key for a standard field
    pub fn to_vorbis(field: StandardField) -> &'static str {
        match field {
            StandardField::Title => Self::VORBIS_TITLE,
            StandardField::Artist => Self::VORBIS_ARTIST,
            StandardField::Album => Self::VORBIS_ALBUM,
            StandardField::AlbumArtist => Self::VORBIS_ALBUM_ARTIST,
            StandardField::Composer => Self::VORBIS_COMPOSER,
            StandardField::Genre => Self::VORBIS_GENRE,
            StandardField::Date => Self::VORBIS_DATE,
            StandardField::TrackNumber => Self::VORBIS_TRACK,
            StandardField::DiscNumber => Self::VORBIS_DISC,
            StandardField::Comment => Self::VORBIS_COMMENT,
            StandardField::Lyrics => Self::VORBIS_LYRICS,
            StandardField::Copyright => Self::VORBIS_COPYRIGHT,
            StandardField::Publisher => Self::VORBIS_PUBLISHER,
            StandardField::EncodedBy => Self::VORBIS_ENCODED_BY,
            StandardField::Bpm => Self::VORBIS_BPM,
            StandardField::Picture => Self::VORBIS_PICTURE,
        }
    }

    /// Convert ID3v2 frame to standard field
    pub fn from_id3v2(frame_id: &str) -> Option<StandardField> {
        match frame_id {
            "TDRC" | "TYER" | "TDAT" | "TIME" => Some(StandardField::Date),
            _ => StandardField::ALL
                .into_iter()
                .find(|&field| Self::to_id3v2(field) == Some(frame_id)),
        }
    }

    /// Convert Vorbis Comment key to standard field
    pub fn from_vorbis(key: &str) -> Option<StandardField> {
        let key = key.to_ascii_uppercase();
        match key.as_str() {
            "YEAR" => Some(StandardField::Date),
            "ALBUM ARTIST" => Some(StandardField::AlbumArtist),
            "ORGANIZATION" => Some(StandardField::Publisher),
            "UNSYNCEDLYRICS" => Some(StandardField::Lyrics),
            _ => StandardField::ALL
                .into_iter()
                .find(|&field| Self::to_vorbis(field) == key),
        }
    }
}
