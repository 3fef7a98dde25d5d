// Ogg Vorbis comment editing
//
// A Vorbis stream opens with three header packets, each starting with a
// type byte and "vorbis":
// 1. Identification header (type 1), alone on the first page
// 2. Comment header (type 3), a Vorbis comment list with framing bit
// 3. Setup header (type 5)

use std::fs::File;
use std::io::{BufReader, Read, Seek};

use super::stream::OggStream;
use crate::error::{Error, Result};
use crate::flac::vorbis::{Framing, VorbisComment};
use crate::utils::io;

pub const VORBIS_MAGIC: &[u8; 6] = b"vorbis";
pub const IDENTIFICATION_HEADER: u8 = 0x01;
pub const COMMENT_HEADER: u8 = 0x03;
pub const SETUP_HEADER: u8 = 0x05;

/// Identification, comment and setup.
pub const HEADER_PACKETS: usize = 3;

/// Fields of the Vorbis identification header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VorbisInfo {
    pub channels: u8,
    pub sample_rate: u32,
    pub bitrate_nominal: i32,
}

impl VorbisInfo {
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if packet.len() < 30 || !is_header(packet, IDENTIFICATION_HEADER) {
            return Err(Error::invalid("Ogg Vorbis", "bad identification header"));
        }
        Ok(VorbisInfo {
            channels: packet[11],
            sample_rate: io::le_u32([packet[12], packet[13], packet[14], packet[15]]),
            bitrate_nominal: io::le_u32([packet[20], packet[21], packet[22], packet[23]]) as i32,
        })
    }
}

fn is_header(packet: &[u8], kind: u8) -> bool {
    packet.len() >= 7 && packet[0] == kind && &packet[1..7] == VORBIS_MAGIC
}

/// An Ogg Vorbis file's comment header.
#[derive(Debug, Clone)]
pub struct OggVorbisFile {
    stream: OggStream,
    info: VorbisInfo,
    comment: VorbisComment,
}

impl OggVorbisFile {
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let mut reader = BufReader::new(reader);
        let stream = OggStream::read_from(&mut reader, HEADER_PACKETS)?;
        let packets = stream.packets();

        let info = VorbisInfo::parse(&packets[0])?;
        if !is_header(&packets[1], COMMENT_HEADER) {
            return Err(Error::invalid("Ogg Vorbis", "second packet is not a comment header"));
        }
        if !is_header(&packets[2], SETUP_HEADER) {
            return Err(Error::invalid("Ogg Vorbis", "third packet is not a setup header"));
        }
        let comment = VorbisComment::parse(&packets[1][7..], Framing::Required)?;

        Ok(OggVorbisFile {
            stream,
            info,
            comment,
        })
    }

    pub fn info(&self) -> &VorbisInfo {
        &self.info
    }

    pub fn stream(&self) -> &OggStream {
        &self.stream
    }

    pub fn tag(&self) -> &VorbisComment {
        &self.comment
    }

    pub fn tag_mut(&mut self) -> &mut VorbisComment {
        &mut self.comment
    }

    /// Duration in seconds from the final granule position.
    pub fn duration(&self) -> Option<f64> {
        let granule = self.stream.last_granule();
        (granule > 0 && self.info.sample_rate > 0)
            .then(|| granule as f64 / f64::from(self.info.sample_rate))
    }

    /// Empty the comment list. The vendor string stays.
    pub fn remove_tag(&mut self) {
        self.comment = VorbisComment::new(self.comment.vendor());
    }

    /// Rewrite the comment and setup headers.
    pub fn save_to(&mut self, file: &mut File) -> Result<()> {
        let mut comment_packet = vec![COMMENT_HEADER];
        comment_packet.extend(VORBIS_MAGIC);
        comment_packet.extend(self.comment.to_bytes(Framing::Required)?);

        let setup = self.stream.packets()[2].clone();
        self.stream.write_to(file, &[comment_packet, setup])
    }
}
