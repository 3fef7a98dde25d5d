// Byte-level helpers shared by every format
pub mod cursor;
pub mod encoding;
pub mod io;
