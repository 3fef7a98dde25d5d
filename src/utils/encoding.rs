// ID3v2 text encodings

use encoding_rs::{UTF_16BE, UTF_16LE, UTF_8};

use crate::error::{Error, Result};

/// Text encoding types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    Latin1 = 0,
    Utf16 = 1,
    Utf16Be = 2,
    Utf8 = 3,
}

impl TextEncoding {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(TextEncoding::Latin1),
            1 => Ok(TextEncoding::Utf16),
            2 => Ok(TextEncoding::Utf16Be),
            3 => Ok(TextEncoding::Utf8),
            other => Err(Error::invalid(
                "ID3v2",
                format!("unknown text encoding {other:#04x}"),
            )),
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Width of the NUL terminator, which is also the scanning unit.
    pub fn terminator_len(self) -> usize {
        match self {
            TextEncoding::Latin1 | TextEncoding::Utf8 => 1,
            TextEncoding::Utf16 | TextEncoding::Utf16Be => 2,
        }
    }

    /// ID3v2.3 only knows Latin-1 and UTF-16 with BOM.
    pub fn is_v23_compatible(self) -> bool {
        matches!(self, TextEncoding::Latin1 | TextEncoding::Utf16)
    }

    /// Cheapest encoding that can represent `text` for the given ID3v2 major version.
    pub fn preferred_for(text: &str, major_version: u8) -> Self {
        if major_version >= 4 {
            TextEncoding::Utf8
        } else if text.chars().all(|c| u32::from(c) <= 0xFF) {
            TextEncoding::Latin1
        } else {
            TextEncoding::Utf16
        }
    }
}

/// Decode text with specified encoding. Trailing terminators are dropped.
pub fn decode_text(data: &[u8], encoding: TextEncoding) -> String {
    let data = trim_terminators(data, encoding);
    match encoding {
        // ISO-8859-1 maps byte values straight onto U+0000..U+00FF
        TextEncoding::Latin1 => data.iter().map(|&b| char::from(b)).collect(),
        TextEncoding::Utf16 => {
            if data.len() >= 2 && data[0..2] == [0xFE, 0xFF] {
                UTF_16BE.decode_without_bom_handling(&data[2..]).0.into_owned()
            } else if data.len() >= 2 && data[0..2] == [0xFF, 0xFE] {
                UTF_16LE.decode_without_bom_handling(&data[2..]).0.into_owned()
            } else {
                UTF_16LE.decode_without_bom_handling(data).0.into_owned()
            }
        }
        TextEncoding::Utf16Be => UTF_16BE.decode_without_bom_handling(data).0.into_owned(),
        TextEncoding::Utf8 => UTF_8.decode_without_bom_handling(data).0.into_owned(),
    }
}

/// Encode text with specified encoding, without a terminator.
///
/// Latin-1 replaces characters above U+00FF with `?`. UTF-16 is written
/// little-endian behind a byte order mark.
pub fn encode_text(text: &str, encoding: TextEncoding) -> Vec<u8> {
    match encoding {
        TextEncoding::Latin1 => text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect(),
        TextEncoding::Utf16 => {
            let mut out = vec![0xFF, 0xFE];
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
            out
        }
        TextEncoding::Utf16Be => text
            .encode_utf16()
            .flat_map(|unit| unit.to_be_bytes())
            .collect(),
        TextEncoding::Utf8 => text.as_bytes().to_vec(),
    }
}

/// Encode text followed by the encoding's terminator.
pub fn encode_terminated(text: &str, encoding: TextEncoding) -> Vec<u8> {
    let mut out = encode_text(text, encoding);
    out.extend(std::iter::repeat(0).take(encoding.terminator_len()));
    out
}

fn trim_terminators(mut data: &[u8], encoding: TextEncoding) -> &[u8] {
    match encoding.terminator_len() {
        1 => {
            while let [rest @ .., 0] = data {
                data = rest;
            }
        }
        _ => {
            while data.len() % 2 == 0 && data.ends_with(&[0, 0]) {
                data = &data[..data.len() - 2];
            }
        }
    }
    data
}
