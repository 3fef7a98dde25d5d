// Fixed-width and synch-safe integer conversions

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};

/// Largest value a 4-byte synch-safe integer can hold (28 usable bits).
pub const SYNCHSAFE_MAX: u32 = (1 << 28) - 1;

pub fn be_u16(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

pub fn be_u24(bytes: [u8; 3]) -> u32 {
    (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2])
}

pub fn be_u32(bytes: [u8; 4]) -> u32 {
    u32::from_be_bytes(bytes)
}

pub fn le_u16(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

pub fn le_u24(bytes: [u8; 3]) -> u32 {
    u32::from(bytes[0]) | (u32::from(bytes[1]) << 8) | (u32::from(bytes[2]) << 16)
}

pub fn le_u32(bytes: [u8; 4]) -> u32 {
    u32::from_le_bytes(bytes)
}

pub fn le_u64(bytes: [u8; 8]) -> u64 {
    u64::from_le_bytes(bytes)
}

/// Encode the low 24 bits of `value` big-endian. Fails if the value does not fit.
pub fn be_u24_bytes(value: u32) -> Result<[u8; 3]> {
    if value > 0x00FF_FFFF {
        return Err(Error::TooLarge {
            what: "24-bit field",
            size: u64::from(value),
            limit: 0x00FF_FFFF,
        });
    }
    let b = value.to_be_bytes();
    Ok([b[1], b[2], b[3]])
}

/// Encode the low 24 bits of `value` little-endian. Fails if the value does not fit.
pub fn le_u24_bytes(value: u32) -> Result<[u8; 3]> {
    if value > 0x00FF_FFFF {
        return Err(Error::TooLarge {
            what: "24-bit field",
            size: u64::from(value),
            limit: 0x00FF_FFFF,
        });
    }
    let b = value.to_le_bytes();
    Ok([b[0], b[1], b[2]])
}

/// Decode a synch-safe integer (7 bits per byte). High bits are ignored.
pub fn synchsafe_to_u32(bytes: [u8; 4]) -> u32 {
    (u32::from(bytes[0] & 0x7F) << 21)
        | (u32::from(bytes[1] & 0x7F) << 14)
        | (u32::from(bytes[2] & 0x7F) << 7)
        | u32::from(bytes[3] & 0x7F)
}

/// Encode `value` as a synch-safe integer, every output byte has its high bit clear.
pub fn u32_to_synchsafe(value: u32) -> Result<[u8; 4]> {
    if value > SYNCHSAFE_MAX {
        return Err(Error::TooLarge {
            what: "synch-safe integer",
            size: u64::from(value),
            limit: u64::from(SYNCHSAFE_MAX),
        });
    }
    Ok([
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ])
}

/// True if no byte has its high bit set, i.e. the bytes are a valid synch-safe integer.
pub fn is_synchsafe(bytes: [u8; 4]) -> bool {
    bytes.iter().all(|b| b & 0x80 == 0)
}

pub fn read_array<R: Read, const N: usize>(reader: &mut R) -> std::io::Result<[u8; N]> {
    let mut buffer = [0u8; N];
    reader.read_exact(&mut buffer)?;
    Ok(buffer)
}

/// Read big-endian 24-bit integer
pub fn read_be_u24<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    Ok(be_u24(read_array(reader)?))
}

/// Read big-endian 32-bit integer
pub fn read_be_u32<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    Ok(be_u32(read_array(reader)?))
}

/// Read little-endian 32-bit integer
pub fn read_le_u32<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    Ok(le_u32(read_array(reader)?))
}

/// Read synchsafe 32-bit integer (7 bits per byte)
pub fn read_synchsafe_u32<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    Ok(synchsafe_to_u32(read_array(reader)?))
}

/// Check if file has signature at current position, without moving it
pub fn check_signature<R: Read + Seek>(reader: &mut R, signature: &[u8]) -> std::io::Result<bool> {
    let pos = reader.stream_position()?;
    let mut buffer = vec![0u8; signature.len()];
    let matched = match reader.read_exact(&mut buffer) {
        Ok(()) => buffer == signature,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(e),
    };
    reader.seek(SeekFrom::Start(pos))?;
    Ok(matched)
}
