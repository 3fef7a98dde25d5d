// Packet reconstruction and re-pagination

use super::page::{Page, PageHeader, FLAG_CONTINUATION, MAX_SEGMENTS, NO_GRANULE};

/// Joins page segments back into packets.
///
/// A lacing value below 255 ends a packet; a page whose table ends in 255
/// leaves the packet open for the next page.
#[derive(Debug, Default)]
pub struct PacketAssembler {
    partial: Vec<u8>,
    packets: Vec<Vec<u8>>,
}

impl PacketAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&mut self, page: &Page) {
        let mut offset = 0;
        for &lacing in &page.header.segments {
            let len = usize::from(lacing);
            let end = (offset + len).min(page.payload.len());
            self.partial.extend_from_slice(&page.payload[offset..end]);
            offset = end;
            if lacing < 255 {
                self.packets.push(std::mem::take(&mut self.partial));
            }
        }
    }

    /// Number of complete packets so far.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// True while a packet is still waiting for its final segment.
    pub fn has_partial(&self) -> bool {
        !self.partial.is_empty()
    }

    pub fn packets(&self) -> &[Vec<u8>] {
        &self.packets
    }

    pub fn into_packets(self) -> Vec<Vec<u8>> {
        self.packets
    }
}

/// Lacing values for one packet: full 255 segments and a final shorter one,
/// which is zero when the length is a multiple of 255.
fn lacing(len: usize) -> Vec<u8> {
    let mut values = vec![255u8; len / 255];
    values.push((len % 255) as u8);
    values
}

/// Split `packets` into pages of `serial`, numbered from `first_sequence`.
///
/// Every packet starts on a fresh page. Pages on which a packet ends get a
/// granule position of 0, the others -1.
pub fn paginate(packets: &[Vec<u8>], serial: u32, first_sequence: u32) -> Vec<Page> {
    let mut pages = Vec::new();
    let mut sequence = first_sequence;

    for packet in packets {
        let values = lacing(packet.len());
        let mut offset = 0;
        for (idx, chunk) in values.chunks(MAX_SEGMENTS).enumerate() {
            let payload_len: usize = chunk.iter().map(|&v| usize::from(v)).sum();
            let ends_packet = chunk.last().is_some_and(|&v| v < 255);

            pages.push(Page {
                header: PageHeader {
                    flags: if idx > 0 { FLAG_CONTINUATION } else { 0 },
                    granule: if ends_packet { 0 } else { NO_GRANULE },
                    serial,
                    sequence,
                    checksum: 0,
                    segments: chunk.to_vec(),
                },
                payload: packet[offset..offset + payload_len].to_vec(),
            });
            offset += payload_len;
            sequence = sequence.wrapping_add(1);
        }
    }

    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ogg::page::MAX_PAGE_PAYLOAD;

    fn page(segments: Vec<u8>, payload: Vec<u8>, sequence: u32) -> Page {
        Page {
            header: PageHeader {
                flags: 0,
                granule: 0,
                serial: 1,
                sequence,
                checksum: 0,
                segments,
            },
            payload,
        }
    }

    #[test]
    fn packet_split_across_three_pages() {
        let packet: Vec<u8> = (0..(255 * 2 + 255 + 100)).map(|i| i as u8).collect();
        let pages = vec![
            page(vec![255, 255], packet[..510].to_vec(), 0),
            page(vec![255], packet[510..765].to_vec(), 1),
            page(vec![100], packet[765..].to_vec(), 2),
        ];

        let mut assembler = PacketAssembler::new();
        for (idx, page) in pages.iter().enumerate() {
            assembler.push_page(page);
            if idx < 2 {
                assert!(assembler.is_empty());
                assert!(assembler.has_partial());
            }
        }
        assert!(!assembler.has_partial());
        assert_eq!(assembler.into_packets(), vec![packet]);
    }

    #[test]
    fn several_packets_on_one_page() {
        let page = page(vec![3, 0, 2], b"abcde".to_vec(), 0);
        let mut assembler = PacketAssembler::new();
        assembler.push_page(&page);
        assert_eq!(
            assembler.packets(),
            &[b"abc".to_vec(), Vec::new(), b"de".to_vec()]
        );
    }

    #[test]
    fn lacing_values() {
        assert_eq!(lacing(0), vec![0]);
        assert_eq!(lacing(254), vec![254]);
        assert_eq!(lacing(255), vec![255, 0]);
        assert_eq!(lacing(600), vec![255, 255, 90]);
    }

    #[test]
    fn paginate_large_packet() {
        // 300 lacing values: one full page and one continuation page
        let big = vec![7u8; MAX_PAGE_PAYLOAD + 45 * 255 - 1];
        let small = b"setup".to_vec();
        let pages = paginate(&[big.clone(), small.clone()], 42, 1);

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].header.segments.len(), MAX_SEGMENTS);
        assert_eq!(pages[0].header.granule, NO_GRANULE);
        assert!(!pages[0].header.is_continuation());
        assert!(pages[1].header.is_continuation());
        assert_eq!(pages[1].header.granule, 0);
        assert!(!pages[2].header.is_continuation());
        assert_eq!(
            pages.iter().map(|p| p.header.sequence).collect::<Vec<_>>(),
            [1, 2, 3]
        );
        assert!(pages.iter().all(|p| p.header.serial == 42));

        let mut assembler = PacketAssembler::new();
        for page in &pages {
            assembler.push_page(page);
        }
        assert_eq!(assembler.into_packets(), vec![big, small]);
    }
}
