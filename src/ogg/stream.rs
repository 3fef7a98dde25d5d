// Reading and rewriting the header packets of a logical Ogg stream

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

use log::debug;

use super::packet::{paginate, PacketAssembler};
use super::page::{read_pages, Page, PageHeader};
use crate::commit;
use crate::error::{Error, Result};

/// Header packets of the first logical stream in an Ogg file, plus the
/// layout needed to splice replacement packets back in.
#[derive(Debug, Clone)]
pub struct OggStream {
    serial: u32,
    first_sequence: u32,
    packets: Vec<Vec<u8>>,
    /// Length of the first page, which holds only the identification packet.
    first_page_len: u64,
    /// Offset of the first page after the header packets.
    header_end: u64,
    header_pages: usize,
    audio_pages: usize,
    audio_bytes: u64,
    last_granule: i64,
}

impl OggStream {
    /// Read the first `header_packets` packets of the stream starting at
    /// offset 0 and count the pages that follow.
    pub fn read_from<R: Read + Seek>(reader: &mut R, header_packets: usize) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;

        let first = Page::read(reader)?
            .ok_or_else(|| Error::invalid("Ogg", "empty stream"))?;
        if !first.header.is_first() {
            return Err(Error::invalid("Ogg", "first page is not marked as stream start"));
        }
        let serial = first.header.serial;

        let mut assembler = PacketAssembler::new();
        assembler.push_page(&first);
        if assembler.len() != 1 || assembler.has_partial() {
            return Err(Error::Unsupported(
                "identification packet does not fill the first Ogg page".to_string(),
            ));
        }
        let first_page_len = first.encoded_len() as u64;

        let mut header_pages = 1;
        while assembler.len() < header_packets {
            let page = Page::read(reader)?
                .ok_or_else(|| Error::invalid("Ogg", "stream ends inside the header packets"))?;
            if page.header.serial != serial {
                return Err(Error::Unsupported(
                    "multiplexed Ogg streams are not supported".to_string(),
                ));
            }
            assembler.push_page(&page);
            header_pages += 1;
        }
        if assembler.len() > header_packets || assembler.has_partial() {
            return Err(Error::Unsupported(
                "audio data shares a page with the Ogg header packets".to_string(),
            ));
        }
        let header_end = reader.stream_position()?;

        let scan = read_pages(reader, |_: &PageHeader| false)?;
        debug!(
            "Ogg stream {:08x}: {} header pages, {} audio pages ({} bytes), granule {}",
            serial, header_pages, scan.skipped_pages, scan.skipped_bytes, scan.last_granule
        );

        Ok(OggStream {
            serial,
            first_sequence: first.header.sequence,
            packets: assembler.into_packets(),
            first_page_len,
            header_end,
            header_pages,
            audio_pages: scan.skipped_pages,
            audio_bytes: scan.skipped_bytes,
            last_granule: scan.last_granule,
        })
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// The header packets, identification packet first.
    pub fn packets(&self) -> &[Vec<u8>] {
        &self.packets
    }

    pub fn header_pages(&self) -> usize {
        self.header_pages
    }

    pub fn audio_pages(&self) -> usize {
        self.audio_pages
    }

    pub fn audio_bytes(&self) -> u64 {
        self.audio_bytes
    }

    /// Granule position of the last page, or -1 if no page carried one.
    pub fn last_granule(&self) -> i64 {
        self.last_granule
    }

    /// Replace every header packet after the identification packet and
    /// rewrite the file. Pages of this stream after the headers keep their
    /// contents but are renumbered; pages of other streams are copied as is.
    pub fn write_to(&mut self, file: &mut File, replacement: &[Vec<u8>]) -> Result<()> {
        let new_pages = paginate(replacement, self.serial, self.first_sequence.wrapping_add(1));
        let mut header_bytes = Vec::new();
        for page in &new_pages {
            header_bytes.extend(page.to_bytes()?);
        }

        let serial = self.serial;
        let first_page_len = self.first_page_len;
        let old_header_end = self.header_end;
        let mut sequence = self
            .first_sequence
            .wrapping_add(1)
            .wrapping_add(new_pages.len() as u32);

        commit::rewrite(file, |src, dst| {
            commit::copy_range(src, 0, Some(first_page_len), dst)?;
            dst.write_all(&header_bytes)?;

            src.seek(SeekFrom::Start(old_header_end))?;
            let mut reader = BufReader::new(src);
            while let Some(mut page) = Page::read(&mut reader)? {
                if page.header.serial == serial {
                    page.header.sequence = sequence;
                    sequence = sequence.wrapping_add(1);
                } else {
                    debug!("copying page of foreign stream {:08x}", page.header.serial);
                }
                dst.write_all(&page.to_bytes()?)?;
            }
            Ok(())
        })?;

        self.packets.truncate(1);
        self.packets.extend(replacement.iter().cloned());
        self.header_pages = 1 + new_pages.len();
        self.header_end = first_page_len + header_bytes.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::{Cursor, Write};

    use super::*;
    use crate::ogg::page::{FLAG_FIRST, FLAG_LAST};

    /// An Ogg file with the given header packets followed by two audio pages.
    pub(crate) fn build_stream(serial: u32, headers: &[Vec<u8>]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut pages = paginate(headers, serial, 0);
        pages[0].header.flags |= FLAG_FIRST;
        let next = pages.len() as u32;
        for (i, payload) in [b"audio-one".as_slice(), b"audio-two"].iter().enumerate() {
            pages.push(Page {
                header: PageHeader {
                    flags: if i == 1 { FLAG_LAST } else { 0 },
                    granule: 48_000 * (i as i64 + 1),
                    serial,
                    sequence: next + i as u32,
                    checksum: 0,
                    segments: vec![payload.len() as u8],
                },
                payload: payload.to_vec(),
            });
        }
        for page in pages {
            out.extend(page.to_bytes().unwrap());
        }
        out
    }

    fn headers() -> Vec<Vec<u8>> {
        vec![b"ident".to_vec(), b"comment".to_vec(), b"setup".to_vec()]
    }

    #[test]
    fn reads_header_packets() {
        let data = build_stream(7, &headers());
        let stream = OggStream::read_from(&mut Cursor::new(&data), 3).unwrap();
        assert_eq!(stream.serial(), 7);
        assert_eq!(stream.packets(), headers().as_slice());
        assert_eq!(stream.header_pages(), 3);
        assert_eq!(stream.audio_pages(), 2);
        assert_eq!(stream.last_granule(), 96_000);
    }

    #[test]
    fn stream_ending_inside_headers() {
        let only_ident = {
            let mut pages = paginate(&headers()[..1], 7, 0);
            pages[0].header.flags |= FLAG_FIRST;
            pages[0].to_bytes().unwrap()
        };
        assert!(OggStream::read_from(&mut Cursor::new(only_ident), 2)
            .unwrap_err()
            .is_format_error());
    }

    #[test]
    fn first_page_must_start_the_stream() {
        let pages = paginate(&headers(), 7, 0);
        let data = pages[0].to_bytes().unwrap();
        assert!(OggStream::read_from(&mut Cursor::new(data), 3).is_err());
    }

    #[test]
    fn rewrite_renumbers_pages() {
        let data = build_stream(9, &headers());
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&data).unwrap();

        let mut stream = OggStream::read_from(&mut file, 3).unwrap();
        let big_comment = vec![b'c'; 70_000];
        stream
            .write_to(&mut file, &[big_comment.clone(), b"setup".to_vec()])
            .unwrap();

        let reread = OggStream::read_from(&mut file, 3).unwrap();
        assert_eq!(reread.packets()[1], big_comment);
        assert_eq!(reread.packets()[2], b"setup");
        // 70000 bytes need 275 lacing values, so two pages
        assert_eq!(reread.header_pages(), 1 + 2 + 1);
        assert_eq!(reread.audio_pages(), 2);
        assert_eq!(reread.last_granule(), 96_000);

        file.seek(SeekFrom::Start(0)).unwrap();
        let mut reader = BufReader::new(&mut file);
        let mut expected_sequence = 0;
        while let Some(page) = Page::read(&mut reader).unwrap() {
            assert_eq!(page.header.sequence, expected_sequence);
            assert!(page.verify_checksum().unwrap());
            expected_sequence += 1;
        }
        assert_eq!(expected_sequence, 6);
    }
}
