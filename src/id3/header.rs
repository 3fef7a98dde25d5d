// ID3v2 tag and frame headers

use std::fmt;
use std::str;

use crate::error::{Error, Result};
use crate::utils::cursor::ByteCursor;
use crate::utils::io;

pub const ID3_SIGNATURE: &[u8; 3] = b"ID3";
pub const HEADER_LEN: usize = 10;
pub const FOOTER_LEN: usize = 10;
pub const FRAME_HEADER_LEN: usize = 10;

/// Supported ID3v2 major versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Version {
    V23,
    V24,
}

impl Version {
    pub fn from_major(major: u8) -> Result<Self> {
        match major {
            3 => Ok(Version::V23),
            4 => Ok(Version::V24),
            other => Err(Error::invalid(
                "ID3v2",
                format!("unsupported version 2.{other}"),
            )),
        }
    }

    pub fn major(self) -> u8 {
        match self {
            Version::V23 => 3,
            Version::V24 => 4,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID3v2.{}", self.major())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagFlags {
    pub unsynchronisation: bool,
    pub extended_header: bool,
    pub experimental: bool,
    pub footer: bool,
}

impl TagFlags {
    fn from_byte(flags: u8) -> Self {
        TagFlags {
            unsynchronisation: flags & 0x80 != 0,
            extended_header: flags & 0x40 != 0,
            experimental: flags & 0x20 != 0,
            footer: flags & 0x10 != 0,
        }
    }

    fn to_byte(self) -> u8 {
        let mut flags = 0;
        if self.unsynchronisation {
            flags |= 0x80;
        }
        if self.extended_header {
            flags |= 0x40;
        }
        if self.experimental {
            flags |= 0x20;
        }
        if self.footer {
            flags |= 0x10;
        }
        flags
    }
}

/// ID3v2 header structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    pub version: Version,
    pub revision: u8,
    pub flags: TagFlags,
    /// Size of everything after the header, excluding a footer.
    pub size: u32,
}

impl TagHeader {
    pub fn parse(data: &[u8; HEADER_LEN]) -> Result<Self> {
        if &data[0..3] != ID3_SIGNATURE {
            return Err(Error::invalid("ID3v2", "missing ID3 signature"));
        }

        let version = Version::from_major(data[3])?;
        let revision = data[4];
        if revision == 0xFF {
            return Err(Error::invalid("ID3v2", "revision cannot be 0xFF"));
        }

        let size_bytes = [data[6], data[7], data[8], data[9]];
        if !io::is_synchsafe(size_bytes) {
            return Err(Error::invalid("ID3v2", "tag size is not synch-safe"));
        }

        let mut flags = TagFlags::from_byte(data[5]);
        if version == Version::V23 {
            // No footer in ID3v2.3
            flags.footer = false;
        }

        Ok(TagHeader {
            version,
            revision,
            flags,
            size: io::synchsafe_to_u32(size_bytes),
        })
    }

    pub fn to_bytes(&self) -> Result<[u8; HEADER_LEN]> {
        let size = io::u32_to_synchsafe(self.size)?;
        Ok([
            b'I',
            b'D',
            b'3',
            self.version.major(),
            self.revision,
            self.flags.to_byte(),
            size[0],
            size[1],
            size[2],
            size[3],
        ])
    }

    /// Bytes the whole tag occupies on disk, header and footer included.
    pub fn total_len(&self) -> u64 {
        let footer = if self.flags.footer { FOOTER_LEN } else { 0 };
        (HEADER_LEN + footer) as u64 + u64::from(self.size)
    }
}

/// On-disk length of whatever tag starts with `data`, even one whose version
/// or flags cannot be parsed. `None` when the size field is not synch-safe,
/// since the end of the tag is then unknown.
pub fn region_len(data: &[u8; HEADER_LEN]) -> Option<u64> {
    if &data[0..3] != ID3_SIGNATURE {
        return None;
    }
    let size_bytes = [data[6], data[7], data[8], data[9]];
    if !io::is_synchsafe(size_bytes) {
        return None;
    }
    // Only ID3v2.4 defines a footer
    let footer = if data[3] == 4 && TagFlags::from_byte(data[5]).footer {
        FOOTER_LEN
    } else {
        0
    };
    Some((HEADER_LEN + footer) as u64 + u64::from(io::synchsafe_to_u32(size_bytes)))
}

/// Skip an extended header at the start of the frame region.
pub(crate) fn skip_extended_header(version: Version, cursor: &mut ByteCursor) -> Result<()> {
    match version {
        // The ID3v2.3 size excludes the size field itself
        Version::V23 => {
            let size = cursor.read_be_u32()? as usize;
            cursor.skip(size)
        }
        // The ID3v2.4 size is synch-safe and includes itself
        Version::V24 => {
            let size = cursor.read_synchsafe_u32()? as usize;
            if size < 6 {
                return Err(Error::invalid("ID3v2", "extended header is too small"));
            }
            cursor.skip(size - 4)
        }
    }
}

/// A four character frame identifier made of `A-Z` and `0-9`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId([u8; 4]);

impl FrameId {
    pub fn parse(id: [u8; 4]) -> Result<Self> {
        if id.iter().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
            Ok(FrameId(id))
        } else {
            Err(Error::invalid(
                "ID3v2",
                format!("invalid frame id {:?}", String::from_utf8_lossy(&id)),
            ))
        }
    }

    /// For identifiers known to be valid at compile time.
    pub(crate) const fn from_static(id: &[u8; 4]) -> Self {
        FrameId(*id)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII is ever accepted by `parse`
        str::from_utf8(&self.0).unwrap_or("????")
    }

    pub fn starts_with(&self, ch: u8) -> bool {
        self.0[0] == ch
    }
}

impl TryFrom<&str> for FrameId {
    type Error = Error;

    fn try_from(id: &str) -> Result<Self> {
        let bytes: [u8; 4] = id
            .as_bytes()
            .try_into()
            .map_err(|_| Error::invalid("ID3v2", format!("frame id {id:?} is not 4 bytes")))?;
        FrameId::parse(bytes)
    }
}

impl PartialEq<&str> for FrameId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameId({})", self.as_str())
    }
}

/// Frame flags in a version-neutral form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameFlags {
    pub tag_alter_preservation: bool,
    pub file_alter_preservation: bool,
    pub read_only: bool,
    pub grouping: bool,
    pub compressed: bool,
    pub encrypted: bool,
    pub unsynchronised: bool,
    pub data_length_indicator: bool,
}

impl FrameFlags {
    pub fn parse(version: Version, raw: [u8; 2]) -> Self {
        let [status, format] = raw;
        match version {
            Version::V23 => FrameFlags {
                tag_alter_preservation: status & 0x80 != 0,
                file_alter_preservation: status & 0x40 != 0,
                read_only: status & 0x20 != 0,
                compressed: format & 0x80 != 0,
                encrypted: format & 0x40 != 0,
                grouping: format & 0x20 != 0,
                unsynchronised: false,
                data_length_indicator: false,
            },
            Version::V24 => FrameFlags {
                tag_alter_preservation: status & 0x40 != 0,
                file_alter_preservation: status & 0x20 != 0,
                read_only: status & 0x10 != 0,
                grouping: format & 0x40 != 0,
                compressed: format & 0x08 != 0,
                encrypted: format & 0x04 != 0,
                unsynchronised: format & 0x02 != 0,
                data_length_indicator: format & 0x01 != 0,
            },
        }
    }

    pub fn to_bytes(self, version: Version) -> [u8; 2] {
        let bit = |set: bool, mask: u8| if set { mask } else { 0 };
        match version {
            Version::V23 => [
                bit(self.tag_alter_preservation, 0x80)
                    | bit(self.file_alter_preservation, 0x40)
                    | bit(self.read_only, 0x20),
                bit(self.compressed, 0x80) | bit(self.encrypted, 0x40) | bit(self.grouping, 0x20),
            ],
            Version::V24 => [
                bit(self.tag_alter_preservation, 0x40)
                    | bit(self.file_alter_preservation, 0x20)
                    | bit(self.read_only, 0x10),
                bit(self.grouping, 0x40)
                    | bit(self.compressed, 0x08)
                    | bit(self.encrypted, 0x04)
                    | bit(self.unsynchronised, 0x02)
                    | bit(self.data_length_indicator, 0x01),
            ],
        }
    }

    /// Only the status flags; format flags describe a particular encoding of the body.
    pub(crate) fn status_only(self) -> Self {
        FrameFlags {
            tag_alter_preservation: self.tag_alter_preservation,
            file_alter_preservation: self.file_alter_preservation,
            read_only: self.read_only,
            ..FrameFlags::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub id: FrameId,
    pub size: u32,
    pub flags: FrameFlags,
}

impl FrameHeader {
    /// Parse a frame header. `Ok(None)` means the padding area has started.
    pub fn parse(version: Version, cursor: &mut ByteCursor) -> Result<Option<Self>> {
        if cursor.remaining() < FRAME_HEADER_LEN || cursor.peek(4)? == [0, 0, 0, 0] {
            return Ok(None);
        }

        let id = FrameId::parse(cursor.read_array()?)?;
        let size_bytes: [u8; 4] = cursor.read_array()?;
        let size = match version {
            // Some writers put plain integers into ID3v2.4 sizes
            Version::V24 if io::is_synchsafe(size_bytes) => io::synchsafe_to_u32(size_bytes),
            _ => io::be_u32(size_bytes),
        };
        let flags = FrameFlags::parse(version, cursor.read_array()?);

        Ok(Some(FrameHeader { id, size, flags }))
    }

    pub fn to_bytes(&self, version: Version) -> Result<[u8; FRAME_HEADER_LEN]> {
        let size = match version {
            Version::V23 => self.size.to_be_bytes(),
            Version::V24 => io::u32_to_synchsafe(self.size)?,
        };
        let flags = self.flags.to_bytes(version);
        let id = self.id.as_bytes();
        Ok([
            id[0], id[1], id[2], id[3], size[0], size[1], size[2], size[3], flags[0], flags[1],
        ])
    }
}
