// Ogg page framing
//
// Page header (27 bytes, little-endian):
// - Capture pattern "OggS" (4)
// - Version, always 0 (1)
// - Header type: 1 = continuation, 2 = beginning of stream, 4 = end of stream (1)
// - Granule position (8, signed)
// - Bitstream serial number (4)
// - Page sequence number (4)
// - CRC checksum (4)
// - Number of segments (1)
// followed by the segment table and the payload.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};
use crate::utils::io;

pub const OGG_SIGNATURE: &[u8; 4] = b"OggS";
pub const PAGE_HEADER_LEN: usize = 27;
pub const MAX_SEGMENTS: usize = 255;
/// 255 segments of 255 bytes.
pub const MAX_PAGE_PAYLOAD: usize = MAX_SEGMENTS * 255;

pub const FLAG_CONTINUATION: u8 = 0x01;
pub const FLAG_FIRST: u8 = 0x02;
pub const FLAG_LAST: u8 = 0x04;

/// Granule position of a page on which no packet ends.
pub const NO_GRANULE: i64 = -1;

const CRC_TABLE: [u32; 256] = crc_table();

const fn crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ 0x04C1_1DB7
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Ogg CRC-32: polynomial 0x04C11DB7, zero initial value, no reflection.
pub fn crc32(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |crc, &byte| {
        (crc << 8) ^ CRC_TABLE[(((crc >> 24) as u8) ^ byte) as usize]
    })
}

/// Ogg page header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub flags: u8,
    pub granule: i64,
    pub serial: u32,
    pub sequence: u32,
    pub checksum: u32,
    pub segments: Vec<u8>,
}

impl PageHeader {
    /// Read a page header. `Ok(None)` means the reader was already at the
    /// end of the data.
    pub fn read<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        let mut buffer = [0u8; PAGE_HEADER_LEN];
        let filled = read_up_to(reader, &mut buffer)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < PAGE_HEADER_LEN {
            return Err(Error::Truncated {
                needed: PAGE_HEADER_LEN - filled,
            });
        }

        if &buffer[0..4] != OGG_SIGNATURE {
            return Err(Error::invalid("Ogg", "missing OggS capture pattern"));
        }
        if buffer[4] != 0 {
            return Err(Error::invalid(
                "Ogg",
                format!("unsupported stream structure version {}", buffer[4]),
            ));
        }

        let mut granule = [0u8; 8];
        granule.copy_from_slice(&buffer[6..14]);
        let segment_count = usize::from(buffer[26]);
        let mut segments = vec![0u8; segment_count];
        reader.read_exact(&mut segments)?;

        Ok(Some(PageHeader {
            flags: buffer[5],
            granule: io::le_u64(granule) as i64,
            serial: io::le_u32([buffer[14], buffer[15], buffer[16], buffer[17]]),
            sequence: io::le_u32([buffer[18], buffer[19], buffer[20], buffer[21]]),
            checksum: io::le_u32([buffer[22], buffer[23], buffer[24], buffer[25]]),
            segments,
        }))
    }

    pub fn payload_len(&self) -> usize {
        self.segments.iter().map(|&s| usize::from(s)).sum()
    }

    /// Header length including the segment table.
    pub fn header_len(&self) -> usize {
        PAGE_HEADER_LEN + self.segments.len()
    }

    pub fn is_continuation(&self) -> bool {
        self.flags & FLAG_CONTINUATION != 0
    }

    pub fn is_first(&self) -> bool {
        self.flags & FLAG_FIRST != 0
    }

    pub fn is_last(&self) -> bool {
        self.flags & FLAG_LAST != 0
    }

    /// Pages carrying stream headers have a granule position of zero or less.
    pub fn is_header_page(&self) -> bool {
        self.granule <= 0
    }
}

/// Ogg page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub header: PageHeader,
    pub payload: Vec<u8>,
}

impl Page {
    pub fn read<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        let Some(header) = PageHeader::read(reader)? else {
            return Ok(None);
        };
        let mut payload = vec![0u8; header.payload_len()];
        reader.read_exact(&mut payload)?;
        Ok(Some(Page { header, payload }))
    }

    /// Size of the page on disk.
    pub fn encoded_len(&self) -> usize {
        self.header.header_len() + self.payload.len()
    }

    /// Serialise the page with a freshly computed checksum.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let header = &self.header;
        if header.segments.len() > MAX_SEGMENTS {
            return Err(Error::TooLarge {
                what: "Ogg segment table",
                size: header.segments.len() as u64,
                limit: MAX_SEGMENTS as u64,
            });
        }
        if header.payload_len() != self.payload.len() {
            return Err(Error::invalid(
                "Ogg",
                "segment table does not match the page payload",
            ));
        }

        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend(OGG_SIGNATURE);
        out.push(0);
        out.push(header.flags);
        out.extend(header.granule.to_le_bytes());
        out.extend(header.serial.to_le_bytes());
        out.extend(header.sequence.to_le_bytes());
        out.extend([0u8; 4]);
        out.push(header.segments.len() as u8);
        out.extend(&header.segments);
        out.extend(&self.payload);

        let crc = crc32(&out);
        out[22..26].copy_from_slice(&crc.to_le_bytes());
        Ok(out)
    }

    /// True if the stored checksum matches the page contents.
    pub fn verify_checksum(&self) -> Result<bool> {
        let bytes = self.to_bytes()?;
        Ok(io::le_u32([bytes[22], bytes[23], bytes[24], bytes[25]]) == self.header.checksum)
    }
}

/// Result of [`read_pages`].
#[derive(Debug, Clone, Default)]
pub struct PageScan {
    /// Pages accepted by the predicate, in file order.
    pub pages: Vec<Page>,
    /// Pages rejected by the predicate; only their headers were read.
    pub skipped_pages: usize,
    /// Bytes covered by the skipped pages, headers included.
    pub skipped_bytes: u64,
    /// Largest granule position seen on any page.
    pub last_granule: i64,
}

/// Read pages until the end of the data. Pages for which `keep` returns
/// false are skipped without reading their payload.
pub fn read_pages<R, F>(reader: &mut R, mut keep: F) -> Result<PageScan>
where
    R: Read + Seek,
    F: FnMut(&PageHeader) -> bool,
{
    let mut scan = PageScan {
        last_granule: NO_GRANULE,
        ..PageScan::default()
    };

    while let Some(header) = PageHeader::read(reader)? {
        scan.last_granule = scan.last_granule.max(header.granule);
        if keep(&header) {
            let mut payload = vec![0u8; header.payload_len()];
            reader.read_exact(&mut payload)?;
            scan.pages.push(Page { header, payload });
        } else {
            reader.seek(SeekFrom::Current(header.payload_len() as i64))?;
            scan.skipped_pages += 1;
            scan.skipped_bytes += (header.header_len() + header.payload_len()) as u64;
        }
    }

    Ok(scan)
}

fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn page(flags: u8, granule: i64, sequence: u32, payload: &[u8]) -> Page {
        Page {
            header: PageHeader {
                flags,
                granule,
                serial: 0x1234,
                sequence,
                checksum: 0,
                segments: vec![payload.len() as u8],
            },
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn crc_reference_values() {
        assert_eq!(crc32(b""), 0);
        // CRC-32/CKSUM check value without its final xor
        assert_eq!(crc32(b"123456789"), 0x89A1_897F);
    }

    #[test]
    fn page_round_trip() {
        let original = page(FLAG_FIRST, 0, 0, b"hello");
        let bytes = original.to_bytes().unwrap();
        assert_eq!(&bytes[..4], OGG_SIGNATURE);
        assert_eq!(bytes.len(), PAGE_HEADER_LEN + 1 + 5);

        let parsed = Page::read(&mut Cursor::new(&bytes)).unwrap().unwrap();
        assert_eq!(parsed.payload, b"hello");
        assert!(parsed.header.is_first());
        assert!(parsed.verify_checksum().unwrap());
        assert_eq!(parsed.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn clean_eof_and_truncation() {
        assert!(Page::read(&mut Cursor::new(Vec::new())).unwrap().is_none());

        let bytes = page(0, 5, 1, b"abc").to_bytes().unwrap();
        assert!(Page::read(&mut Cursor::new(&bytes[..10])).is_err());
        assert!(Page::read(&mut Cursor::new(&bytes[..bytes.len() - 1])).is_err());
    }

    #[test]
    fn rejects_bad_capture_pattern() {
        let mut bytes = page(0, 0, 0, b"x").to_bytes().unwrap();
        bytes[0] = b'X';
        assert!(Page::read(&mut Cursor::new(bytes)).unwrap_err().is_format_error());
    }

    #[test]
    fn scan_skips_audio_pages() {
        let mut data = Vec::new();
        data.extend(page(FLAG_FIRST, 0, 0, b"head").to_bytes().unwrap());
        data.extend(page(0, 0, 1, b"tags").to_bytes().unwrap());
        data.extend(page(0, 1000, 2, b"audio-1").to_bytes().unwrap());
        data.extend(page(FLAG_LAST, 2000, 3, b"audio-2").to_bytes().unwrap());

        let scan = read_pages(&mut Cursor::new(&data), PageHeader::is_header_page).unwrap();
        assert_eq!(scan.pages.len(), 2);
        assert_eq!(scan.pages[1].payload, b"tags");
        assert_eq!(scan.skipped_pages, 2);
        assert_eq!(scan.skipped_bytes, (2 * (PAGE_HEADER_LEN + 1) + 14) as u64);
        assert_eq!(scan.last_granule, 2000);
    }
}
