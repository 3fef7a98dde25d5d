// FLAC PICTURE block implementation
//
// The same layout is stored base64-encoded in Ogg streams under
// METADATA_BLOCK_PICTURE.

use crate::error::{Error, Result};
use crate::picture::{AttachedPicture, PictureType};
use crate::utils::cursor::ByteCursor;

/// Read a PICTURE block body.
pub fn read_picture(data: &[u8]) -> Result<AttachedPicture> {
    let mut cursor = ByteCursor::new(data);

    let picture_type = PictureType::from_code_lossy(cursor.read_be_u32()?);
    let mime_type = String::from_utf8_lossy(cursor.read_be_prefixed()?).into_owned();
    let description = String::from_utf8_lossy(cursor.read_be_prefixed()?).into_owned();
    let width = cursor.read_be_u32()?;
    let height = cursor.read_be_u32()?;
    let color_depth = cursor.read_be_u32()?;
    let indexed_colors = cursor.read_be_u32()?;
    let data = cursor.read_be_prefixed()?.to_vec();

    Ok(AttachedPicture {
        picture_type,
        mime_type,
        description,
        width,
        height,
        color_depth,
        indexed_colors,
        data,
    })
}

/// Encode a picture as a PICTURE block body.
pub fn write_picture(picture: &AttachedPicture) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(32 + picture.mime_type.len() + picture.data.len());

    out.extend(u32::from(picture.picture_type.code()).to_be_bytes());
    out.extend(length_of(picture.mime_type.len())?.to_be_bytes());
    out.extend(picture.mime_type.as_bytes());
    out.extend(length_of(picture.description.len())?.to_be_bytes());
    out.extend(picture.description.as_bytes());
    out.extend(picture.width.to_be_bytes());
    out.extend(picture.height.to_be_bytes());
    out.extend(picture.color_depth.to_be_bytes());
    out.extend(picture.indexed_colors.to_be_bytes());
    out.extend(length_of(picture.data.len())?.to_be_bytes());
    out.extend_from_slice(&picture.data);

    Ok(out)
}

fn length_of(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::TooLarge {
        what: "picture field",
        size: len as u64,
        limit: u64::from(u32::MAX),
    })
}
