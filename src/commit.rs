//! Writing edited metadata back into a file.
//!
//! A tag region is overwritten in place when the new metadata fits into the
//! old region with an acceptable amount of padding left over. Anything else
//! goes through a staged rewrite: the complete new file is written to a
//! temporary file, which is then copied over the original.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};

use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::error::{ArgumentError, Result};

/// Smallest padding an in-place write may leave behind.
pub const MIN_PADDING: u32 = 16;
/// Largest padding an in-place write may leave behind.
pub const MAX_PADDING: u32 = 1 << 20;
/// Padding reserved when a tag is written for the first time.
pub const DEFAULT_PADDING: u32 = 1024;

/// Padding requested by a caller must be zero or within the bounds.
pub fn validate_padding(padding: u32) -> Result<()> {
    if padding == 0 || (MIN_PADDING..=MAX_PADDING).contains(&padding) {
        Ok(())
    } else {
        Err(ArgumentError::Padding(padding).into())
    }
}

/// Bring padding found in a file back within bounds for a rewrite.
pub fn clamp_padding(padding: u32) -> u32 {
    if padding == 0 {
        0
    } else {
        padding.clamp(MIN_PADDING, MAX_PADDING)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Overwrite the existing region, filling the rest with `padding` bytes.
    InPlace { padding: u32 },
    /// Rebuild the whole file.
    Rewrite,
}

/// Decide how `content_len` bytes of new metadata replace a region of
/// `region_len` bytes.
///
/// `padding_overhead` is what a padding area costs beyond its payload: 4 for
/// the FLAC block header, 0 for ID3v2 where padding is bare zeros.
pub fn plan(region_len: u64, content_len: u64, padding_overhead: u64) -> Strategy {
    if region_len == 0 {
        return Strategy::Rewrite;
    }
    let Some(slack) = region_len.checked_sub(content_len) else {
        return Strategy::Rewrite;
    };
    if slack == 0 {
        return Strategy::InPlace { padding: 0 };
    }

    match slack.checked_sub(padding_overhead) {
        Some(padding)
            if (u64::from(MIN_PADDING)..=u64::from(MAX_PADDING)).contains(&padding) =>
        {
            Strategy::InPlace {
                padding: padding as u32,
            }
        }
        _ => Strategy::Rewrite,
    }
}

/// Overwrite `data.len()` bytes at `offset`. The file length never changes.
pub fn write_in_place(file: &mut File, offset: u64, data: &[u8]) -> Result<()> {
    debug!("writing {} bytes in place at offset {}", data.len(), offset);
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(data)?;
    file.flush()?;
    Ok(())
}

/// Rebuild `file` through a staging file.
///
/// `build` receives the original file for reading and a writer for the new
/// contents. The original is only touched after `build` succeeded; the
/// staging file is removed afterwards. Returns the new file length.
pub fn rewrite<F>(file: &mut File, build: F) -> Result<u64>
where
    F: FnOnce(&mut File, &mut dyn Write) -> Result<()>,
{
    let mut staged = NamedTempFile::new()?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        build(&mut *file, &mut writer)?;
        writer.flush()?;
    }

    let staged_file = staged.as_file_mut();
    let new_len = staged_file.seek(SeekFrom::End(0))?;
    staged_file.seek(SeekFrom::Start(0))?;
    file.seek(SeekFrom::Start(0))?;
    io::copy(staged_file, &mut *file)?;
    file.set_len(new_len)?;
    file.flush()?;
    debug!("rewrote file, {} bytes", new_len);

    if let Err(err) = staged.close() {
        warn!("could not remove staging file: {}", err);
    }

    Ok(new_len)
}

/// Copy `len` bytes (or everything up to EOF) starting at `start`.
pub fn copy_range(
    src: &mut File,
    start: u64,
    len: Option<u64>,
    dst: &mut dyn Write,
) -> Result<u64> {
    src.seek(SeekFrom::Start(start))?;
    let mut reader = BufReader::new(src);
    let copied = match len {
        Some(len) => io::copy(&mut reader.by_ref().take(len), dst)?,
        None => io::copy(&mut reader, dst)?,
    };
    if let Some(len) = len {
        if copied != len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
    }
    Ok(copied)
}
