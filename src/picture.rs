// Attached picture model shared by every tag format

use std::fmt;
use std::path::Path;

use crate::error::{ArgumentError, Result};

/// MIME marker meaning "the payload is a URL, not image data".
pub const URL_MIME_MARKER: &str = "-->";

/// Longest picture description accepted from callers, in bytes.
pub const MAX_DESCRIPTION_LEN: usize = 64;

/// Image MIME types accepted for embedded pictures.
pub const IMAGE_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/tiff",
    "image/webp",
];

/// Human-readable names, indexed by picture type code.
pub const PICTURE_TYPE_NAMES: [&str; 21] = [
    "Other",
    "32x32 pixels file icon",
    "Other file icon",
    "Cover (front)",
    "Cover (back)",
    "Leaflet page",
    "Media",
    "Lead artist",
    "Artist",
    "Conductor",
    "Band",
    "Composer",
    "Lyricist",
    "Recording location",
    "During recording",
    "During performance",
    "Video screen capture",
    "A bright coloured fish",
    "Illustration",
    "Band logo",
    "Publisher logo",
];

/// Picture types shared by ID3v2 APIC frames and FLAC PICTURE blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PictureType {
    Other = 0,
    FileIcon = 1,
    OtherFileIcon = 2,
    CoverFront = 3,
    CoverBack = 4,
    LeafletPage = 5,
    Media = 6,
    LeadArtist = 7,
    Artist = 8,
    Conductor = 9,
    Band = 10,
    Composer = 11,
    Lyricist = 12,
    RecordingLocation = 13,
    DuringRecording = 14,
    DuringPerformance = 15,
    VideoScreenCapture = 16,
    BrightColouredFish = 17,
    Illustration = 18,
    BandLogo = 19,
    PublisherLogo = 20,
}

impl PictureType {
    const ALL: [PictureType; 21] = [
        PictureType::Other,
        PictureType::FileIcon,
        PictureType::OtherFileIcon,
        PictureType::CoverFront,
        PictureType::CoverBack,
        PictureType::LeafletPage,
        PictureType::Media,
        PictureType::LeadArtist,
        PictureType::Artist,
        PictureType::Conductor,
        PictureType::Band,
        PictureType::Composer,
        PictureType::Lyricist,
        PictureType::RecordingLocation,
        PictureType::DuringRecording,
        PictureType::DuringPerformance,
        PictureType::VideoScreenCapture,
        PictureType::BrightColouredFish,
        PictureType::Illustration,
        PictureType::BandLogo,
        PictureType::PublisherLogo,
    ];

    /// Lenient conversion for parsed data: unknown codes become `Other`.
    pub fn from_code_lossy(code: u32) -> Self {
        Self::try_from(code).unwrap_or(PictureType::Other)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        PICTURE_TYPE_NAMES[self as usize]
    }
}

impl TryFrom<u32> for PictureType {
    type Error = ArgumentError;

    fn try_from(code: u32) -> std::result::Result<Self, Self::Error> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or(ArgumentError::PictureType(code))
    }
}

impl fmt::Display for PictureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A picture attached to a tag: either embedded image bytes or a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedPicture {
    pub(crate) picture_type: PictureType,
    pub(crate) mime_type: String,
    pub(crate) description: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) color_depth: u32,
    pub(crate) indexed_colors: u32,
    pub(crate) data: Vec<u8>,
}

impl AttachedPicture {
    /// Create an embedded picture, validating MIME type and description.
    pub fn new(
        picture_type: PictureType,
        mime_type: impl Into<String>,
        description: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<Self> {
        let picture = AttachedPicture {
            picture_type,
            mime_type: mime_type.into(),
            description: description.into(),
            width: 0,
            height: 0,
            color_depth: 0,
            indexed_colors: 0,
            data,
        };
        picture.validate()?;
        Ok(picture)
    }

    /// Create a URL-mode picture; the URL text is stored as the payload.
    pub fn from_url(
        picture_type: PictureType,
        url: &str,
        description: impl Into<String>,
    ) -> Result<Self> {
        Self::new(
            picture_type,
            URL_MIME_MARKER,
            description,
            url.as_bytes().to_vec(),
        )
    }

    /// Load a local image file, deriving its MIME type from the file's magic bytes.
    pub fn from_file(
        picture_type: PictureType,
        path: impl AsRef<Path>,
        description: impl Into<String>,
    ) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let mime = sniff_image_mime(&data).ok_or_else(|| {
            ArgumentError::MimeType(format!("unrecognized image in {}", path.as_ref().display()))
        })?;
        Self::new(picture_type, mime, description, data)
    }

    /// Informational image dimensions; never checked against the payload.
    pub fn with_dimensions(mut self, width: u32, height: u32, color_depth: u32) -> Self {
        self.width = width;
        self.height = height;
        self.color_depth = color_depth;
        self
    }

    /// Check every caller-controlled constraint.
    pub fn validate(&self) -> Result<()> {
        if !is_supported_mime(&self.mime_type) {
            return Err(ArgumentError::MimeType(self.mime_type.clone()).into());
        }
        if self.description.len() > MAX_DESCRIPTION_LEN {
            return Err(ArgumentError::DescriptionTooLong(self.description.len()).into());
        }
        Ok(())
    }

    pub fn picture_type(&self) -> PictureType {
        self.picture_type
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_depth(&self) -> u32 {
        self.color_depth
    }

    pub fn indexed_colors(&self) -> u32 {
        self.indexed_colors
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_url(&self) -> bool {
        self.mime_type == URL_MIME_MARKER
    }

    /// The link target of a URL-mode picture.
    pub fn url(&self) -> Option<&str> {
        if self.is_url() {
            std::str::from_utf8(&self.data).ok()
        } else {
            None
        }
    }

    /// Get file extension based on MIME type
    pub fn extension(&self) -> &'static str {
        match self.mime_type.to_ascii_lowercase().as_str() {
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/bmp" => "bmp",
            "image/tiff" => "tiff",
            URL_MIME_MARKER => "url",
            _ => "jpg",
        }
    }
}

impl fmt::Display for AttachedPicture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.url() {
            Some(url) => write!(f, "{} -> {}", self.picture_type, url),
            None => write!(
                f,
                "{} ({}, {} bytes, {}x{})",
                self.picture_type,
                self.mime_type,
                self.data.len(),
                self.width,
                self.height
            ),
        }
    }
}

/// MIME types compare case-insensitively; the stored spelling is kept as is.
pub fn is_supported_mime(mime: &str) -> bool {
    mime == URL_MIME_MARKER || IMAGE_MIME_TYPES.iter().any(|m| m.eq_ignore_ascii_case(mime))
}

/// Guess an image MIME type from the leading bytes of `data`.
pub fn sniff_image_mime(data: &[u8]) -> Option<&'static str> {
    match data {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'B', b'M', ..] => Some("image/bmp"),
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some("image/tiff"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}
