//! Oxitag - audio metadata tag codec and in-place rewriter.
//!
//! Supported containers are MPEG audio with ID3v2 (and read-only ID3v1),
//! FLAC, Ogg Vorbis and Ogg Opus. Every tag is exposed through the [`Tag`]
//! trait; [`AudioFile`] ties detection, parsing and saving together.
//!
//! ```no_run
//! use oxitag::{AudioFile, StandardField};
//!
//! let mut file = AudioFile::open("song.flac")?;
//! file.tag_mut().set_field(StandardField::Title, "New title")?;
//! file.save()?;
//! # Ok::<(), oxitag::Error>(())
//! ```

use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::debug;

pub mod commit;
pub mod detect;
pub mod error;
pub mod field_mapping;
pub mod flac;
pub mod id3;
pub mod ogg;
pub mod opus;
pub mod picture;
pub mod tag;
pub mod utils;

pub use detect::FileType;
pub use error::{ArgumentError, Error, Result};
pub use field_mapping::{FieldMappings, StandardField};
pub use flac::{FlacFile, FlacTag, VorbisComment};
pub use id3::{Id3v1Tag, Id3v2Tag, MpegFile};
pub use ogg::OggVorbisFile;
pub use opus::OpusFile;
pub use picture::{AttachedPicture, PictureType};
pub use tag::Tag;

/// Parsed container, one variant per supported format.
#[derive(Debug, Clone)]
pub enum Container {
    Mpeg(MpegFile),
    Flac(FlacFile),
    OggVorbis(OggVorbisFile),
    OggOpus(OpusFile),
}

impl Container {
    fn read(file_type: FileType, file: &mut File) -> Result<Self> {
        let mut reader = BufReader::new(file);
        let container = match file_type {
            FileType::Mpeg => Container::Mpeg(MpegFile::read_from(&mut reader)?),
            FileType::Flac => Container::Flac(FlacFile::read_from(&mut reader)?),
            FileType::OggVorbis => Container::OggVorbis(OggVorbisFile::read_from(&mut reader)?),
            FileType::OggOpus => Container::OggOpus(OpusFile::read_from(&mut reader)?),
            FileType::M4a => {
                return Err(Error::Unsupported(format!(
                    "{} tags ({})",
                    file_type.name(),
                    file_type.mime_type()
                )))
            }
        };
        Ok(container)
    }
}

/// An editing session on one audio file.
#[derive(Debug, Clone)]
pub struct AudioFile {
    path: PathBuf,
    file_type: FileType,
    container: Container,
}

impl AudioFile {
    /// Detect the container of `path` and parse its metadata.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let file_type = detect::detect(&mut file)?
            .ok_or_else(|| Error::Unsupported("unrecognized audio container".to_string()))?;
        debug!("{}: {}", path.display(), file_type.mime_type());

        let container = Container::read(file_type, &mut file)?;
        Ok(AudioFile {
            path,
            file_type,
            container,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    /// The file's tag, if it has one. MPEG files without ID3v2 fall back to
    /// their ID3v1 tag.
    pub fn tag(&self) -> Option<&dyn Tag> {
        match &self.container {
            Container::Mpeg(mpeg) => match mpeg.tag() {
                Some(tag) => Some(tag as &dyn Tag),
                None => mpeg.legacy_tag().map(|tag| tag as &dyn Tag),
            },
            Container::Flac(flac) => Some(flac.tag() as &dyn Tag),
            Container::OggVorbis(vorbis) => Some(vorbis.tag() as &dyn Tag),
            Container::OggOpus(opus) => Some(opus.tag() as &dyn Tag),
        }
    }

    /// The editable tag, created if the file has none.
    pub fn tag_mut(&mut self) -> &mut dyn Tag {
        match &mut self.container {
            Container::Mpeg(mpeg) => mpeg.tag_or_insert(),
            Container::Flac(flac) => flac.tag_mut(),
            Container::OggVorbis(vorbis) => vorbis.tag_mut(),
            Container::OggOpus(opus) => opus.tag_mut(),
        }
    }

    /// Remove the tag on the next save. FLAC keeps STREAMINFO and other
    /// non-tag blocks; Ogg streams keep an empty comment header.
    pub fn remove_tag(&mut self) -> Result<()> {
        match &mut self.container {
            Container::Mpeg(mpeg) => mpeg.remove_tag(),
            Container::Flac(flac) => flac.remove_tag()?,
            Container::OggVorbis(vorbis) => vorbis.remove_tag(),
            Container::OggOpus(opus) => opus.remove_tag(),
        }
        Ok(())
    }

    /// Padding to reserve when the tag has to be rewritten. Ogg streams
    /// carry no padding.
    pub fn set_padding(&mut self, padding: u32) -> Result<()> {
        match &mut self.container {
            Container::Mpeg(mpeg) => mpeg.tag_or_insert().set_padding(padding),
            Container::Flac(flac) => flac.tag_mut().set_padding(padding),
            Container::OggVorbis(_) | Container::OggOpus(_) => Err(Error::Unsupported(format!(
                "padding in {} files",
                self.file_type.name()
            ))),
        }
    }

    /// Write the tag back to the file and re-read its layout.
    pub fn save(&mut self) -> Result<()> {
        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        match &mut self.container {
            Container::Mpeg(mpeg) => mpeg.save_to(&mut file)?,
            Container::Flac(flac) => flac.save_to(&mut file)?,
            Container::OggVorbis(vorbis) => vorbis.save_to(&mut file)?,
            Container::OggOpus(opus) => opus.save_to(&mut file)?,
        }
        self.container = Container::read(self.file_type, &mut file)?;
        debug!("saved {}", self.path.display());
        Ok(())
    }
}
