// FLAC STREAMINFO block

use crate::error::{Error, Result};
use crate::utils::io;

pub const STREAMINFO_LEN: usize = 34;

/// Decoded STREAMINFO fields. The raw block is kept and written back as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    raw: [u8; STREAMINFO_LEN],
    pub min_block_size: u16,
    pub max_block_size: u16,
    pub min_frame_size: u32,
    pub max_frame_size: u32,
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    pub total_samples: u64,
    pub md5: [u8; 16],
    /// Average bitrate in bits per second, derived from the audio size.
    pub bitrate: Option<u32>,
}

impl StreamInfo {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let raw: [u8; STREAMINFO_LEN] = data.try_into().map_err(|_| {
            Error::invalid(
                "FLAC",
                format!("STREAMINFO is {} bytes, expected {}", data.len(), STREAMINFO_LEN),
            )
        })?;

        // 20 bits sample rate, 3 bits channels - 1, 5 bits bits per sample - 1,
        // 36 bits total samples
        let sample_rate =
            (u32::from(raw[10]) << 12) | (u32::from(raw[11]) << 4) | (u32::from(raw[12]) >> 4);
        let channels = ((raw[12] >> 1) & 0x07) + 1;
        let bits_per_sample = (((raw[12] & 0x01) << 4) | (raw[13] >> 4)) + 1;
        let total_samples = (u64::from(raw[13] & 0x0F) << 32)
            | u64::from(io::be_u32([raw[14], raw[15], raw[16], raw[17]]));

        let mut md5 = [0u8; 16];
        md5.copy_from_slice(&raw[18..34]);

        Ok(StreamInfo {
            raw,
            min_block_size: io::be_u16([raw[0], raw[1]]),
            max_block_size: io::be_u16([raw[2], raw[3]]),
            min_frame_size: io::be_u24([raw[4], raw[5], raw[6]]),
            max_frame_size: io::be_u24([raw[7], raw[8], raw[9]]),
            sample_rate,
            channels,
            bits_per_sample,
            total_samples,
            md5,
            bitrate: None,
        })
    }

    pub fn as_bytes(&self) -> &[u8; STREAMINFO_LEN] {
        &self.raw
    }

    /// Duration in seconds, when the sample count is known.
    pub fn duration(&self) -> Option<f64> {
        if self.sample_rate == 0 || self.total_samples == 0 {
            None
        } else {
            Some(self.total_samples as f64 / f64::from(self.sample_rate))
        }
    }

    pub(crate) fn derive_bitrate(&mut self, audio_len: u64) {
        self.bitrate = self
            .duration()
            .map(|secs| (audio_len as f64 * 8.0 / secs).round() as u32);
    }
}
