// ID3v2 unsynchronisation scheme
//
// An 0xFF followed by 0x00 or by a byte >= 0xE0 looks like an MPEG sync word.
// Encoding inserts a 0x00 after such an 0xFF (and after a trailing 0xFF so the
// padding or audio that follows cannot complete a sync word); decoding drops
// every 0x00 that directly follows an 0xFF.

pub fn encode(src: &[u8]) -> Vec<u8> {
    let mut dest = Vec::with_capacity(src.len() + src.len() / 64);

    for (pos, &byte) in src.iter().enumerate() {
        dest.push(byte);
        if byte == 0xFF {
            match src.get(pos + 1) {
                Some(&next) if next == 0x00 || next >= 0xE0 => dest.push(0),
                None => dest.push(0),
                _ => {}
            }
        }
    }

    dest
}

pub fn decode(src: &[u8]) -> Vec<u8> {
    let mut dest = Vec::with_capacity(src.len());
    let mut prev_ff = false;

    for &byte in src {
        if prev_ff && byte == 0x00 {
            prev_ff = false;
            continue;
        }
        dest.push(byte);
        prev_ff = byte == 0xFF;
    }

    dest
}

/// True if the data contains a byte pair that encoding would have to break.
pub fn needs_encoding(src: &[u8]) -> bool {
    src.windows(2)
        .any(|pair| pair[0] == 0xFF && (pair[1] == 0x00 || pair[1] >= 0xE0))
        || src.last() == Some(&0xFF)
}
