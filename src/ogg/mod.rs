// Ogg transport layer
//
// An Ogg file is a sequence of pages. Each page carries a segment table whose
// lacing values split the payload into packets; a packet may continue over
// several pages. Codecs put their header packets first (Vorbis: 3, Opus: 2)
// and the comment header is always the second packet.

pub mod packet;
pub mod page;
pub mod stream;
pub mod vorbis;

pub use packet::{paginate, PacketAssembler};
pub use page::{read_pages, Page, PageHeader, PageScan, OGG_SIGNATURE};
pub use stream::OggStream;
pub use vorbis::OggVorbisFile;
