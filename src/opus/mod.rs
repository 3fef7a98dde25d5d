// OPUS format support (in OGG container)
//
// OPUS File Structure (RFC 7845):
// - Identification header: "OpusHead" alone on the first page
// - Comment header: "OpusTags" followed by a Vorbis comment list without a
//   framing bit, optionally followed by binary data
// - Audio data pages, granule positions counted at 48 kHz

use std::fs::File;
use std::io::{BufReader, Read, Seek};

use log::debug;

use crate::error::{Error, Result};
use crate::flac::vorbis::{Framing, VorbisComment};
use crate::ogg::stream::OggStream;
use crate::utils::io;

pub const OPUS_SIGNATURE: &[u8; 8] = b"OpusHead";
pub const OPUS_TAGS: &[u8; 8] = b"OpusTags";

/// Identification and comment.
pub const HEADER_PACKETS: usize = 2;

/// Opus granule positions always count 48 kHz samples.
const GRANULE_RATE: f64 = 48_000.0;

/// Fields of the OpusHead packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpusInfo {
    pub version: u8,
    pub channels: u8,
    pub pre_skip: u16,
    pub input_sample_rate: u32,
}

impl OpusInfo {
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if packet.len() < 19 || &packet[..8] != OPUS_SIGNATURE {
            return Err(Error::invalid("Ogg Opus", "bad OpusHead packet"));
        }
        Ok(OpusInfo {
            version: packet[8],
            channels: packet[9],
            pre_skip: io::le_u16([packet[10], packet[11]]),
            input_sample_rate: io::le_u32([packet[12], packet[13], packet[14], packet[15]]),
        })
    }
}

/// An Ogg Opus file's comment header.
#[derive(Debug, Clone)]
pub struct OpusFile {
    stream: OggStream,
    info: OpusInfo,
    comment: VorbisComment,
    /// Binary data after the comment list, kept when its first byte has the
    /// low bit set.
    trailer: Vec<u8>,
}

impl OpusFile {
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let mut reader = BufReader::new(reader);
        let stream = OggStream::read_from(&mut reader, HEADER_PACKETS)?;
        let packets = stream.packets();

        let info = OpusInfo::parse(&packets[0])?;
        let tags = &packets[1];
        if tags.len() < OPUS_TAGS.len() || &tags[..8] != OPUS_TAGS {
            return Err(Error::invalid("Ogg Opus", "second packet is not OpusTags"));
        }
        let (comment, rest) = VorbisComment::parse_with_trailer(&tags[8..], Framing::Absent)?;
        let trailer = match rest.first() {
            Some(&first) if first & 0x01 != 0 => rest.to_vec(),
            Some(_) => {
                debug!("dropping {} bytes of padding after OpusTags", rest.len());
                Vec::new()
            }
            None => Vec::new(),
        };

        Ok(OpusFile {
            stream,
            info,
            comment,
            trailer,
        })
    }

    pub fn info(&self) -> &OpusInfo {
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

    /// Duration in seconds, pre-skip excluded.
    pub fn duration(&self) -> Option<f64> {
        let samples = self.stream.last_granule() - i64::from(self.info.pre_skip);
        (samples > 0).then(|| samples as f64 / GRANULE_RATE)
    }

    /// Empty the comment list. The vendor string stays.
    pub fn remove_tag(&mut self) {
        self.comment = VorbisComment::new(self.comment.vendor());
    }

    /// Rewrite the OpusTags packet.
    pub fn save_to(&mut self, file: &mut File) -> Result<()> {
        let mut packet = OPUS_TAGS.to_vec();
        packet.extend(self.comment.to_bytes(Framing::Absent)?);
        packet.extend(&self.trailer);
        self.stream.write_to(file, &[packet])
    }
}
