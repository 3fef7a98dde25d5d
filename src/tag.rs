//! The format-agnostic tag interface.
//!
//! Each container keeps its metadata in a native structure (ID3v2 frames,
//! FLAC blocks, a Vorbis comment list). [`Tag`] exposes all of them through
//! the same [`StandardField`] keys, so callers can read, edit and convert tags
//! without knowing the container.

use log::warn;

use crate::error::{ArgumentError, Result};
use crate::field_mapping::StandardField;
use crate::picture::AttachedPicture;

pub trait Tag {
    /// Short name of the concrete tag format, e.g. `"ID3v2.4"`.
    fn format_name(&self) -> String;

    /// Text value of a field. Always `None` for [`StandardField::Picture`].
    fn field(&self, key: StandardField) -> Option<String>;

    /// Replace a text field. Setting [`StandardField::Picture`] is an error.
    fn set_field(&mut self, key: StandardField, value: &str) -> Result<()>;

    fn remove_field(&mut self, key: StandardField);

    /// The tag's primary picture, if any.
    fn picture(&self) -> Option<AttachedPicture>;

    /// Replace the tag's picture. The picture is validated first; on error the
    /// tag is unchanged.
    fn set_picture(&mut self, picture: AttachedPicture) -> Result<()>;

    fn remove_picture(&mut self);

    /// Copy every present, non-empty field and the picture from `other`.
    ///
    /// Fields absent from `other` are left untouched. A value this tag
    /// cannot store (a free-text date in ID3v2.4, say) is skipped with a
    /// warning and the copy goes on; the skipped keys are returned.
    fn copy_from(&mut self, other: &dyn Tag) -> Vec<StandardField> {
        let mut skipped = Vec::new();
        for key in StandardField::text_fields() {
            if let Some(value) = other.field(key).filter(|v| !v.is_empty()) {
                if let Err(err) = self.set_field(key, &value) {
                    warn!("not copying {} from {}: {}", key.as_str(), other.format_name(), err);
                    skipped.push(key);
                }
            }
        }
        if let Some(picture) = other.picture() {
            if let Err(err) = self.set_picture(picture) {
                warn!("not copying picture from {}: {}", other.format_name(), err);
                skipped.push(StandardField::Picture);
            }
        }
        skipped
    }

    fn is_empty(&self) -> bool {
        StandardField::text_fields().all(|key| self.field(key).is_none()) && self.picture().is_none()
    }

    /// Remove every field and the picture.
    fn clear(&mut self) {
        for key in StandardField::text_fields() {
            self.remove_field(key);
        }
        self.remove_picture();
    }
}

/// Guard used by [`Tag::set_field`] implementations.
pub(crate) fn require_text(key: StandardField) -> Result<()> {
    if key.is_text() {
        Ok(())
    } else {
        Err(ArgumentError::NotText(key.as_str()).into())
    }
}
