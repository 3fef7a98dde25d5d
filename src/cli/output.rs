// Output formatting for CLI

use std::io::Write;

use anyhow::Result;
use oxitag::{AudioFile, StandardField};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::cli::config::OutputFormat;

/// Picture summary included in reports; the image bytes are left out.
#[derive(Debug, Serialize)]
pub struct PictureReport {
    pub picture_type: &'static str,
    pub mime_type: String,
    pub description: String,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Build the flat JSON object printed by `read`.
///
/// With `filter`, only the listed fields are included; absent fields then
/// show up as null so the output shape is predictable.
pub fn tag_report(audio: &AudioFile, filter: Option<&[StandardField]>) -> Result<Value> {
    let mut report = Map::new();
    report.insert("file".into(), Value::from(audio.path().display().to_string()));
    report.insert("mime_type".into(), Value::from(audio.file_type().mime_type()));

    let tag = audio.tag();
    report.insert(
        "tag".into(),
        tag.map_or(Value::Null, |t| Value::from(t.format_name())),
    );

    let wanted: Vec<StandardField> = match filter {
        Some(fields) => fields.to_vec(),
        None => StandardField::ALL.to_vec(),
    };

    for key in wanted {
        let value = match (key, tag) {
            (StandardField::Picture, Some(tag)) => match tag.picture() {
                Some(picture) => serde_json::to_value(PictureReport {
                    picture_type: picture.picture_type().name(),
                    mime_type: picture.mime_type().to_string(),
                    description: picture.description().to_string(),
                    size: picture.data().len(),
                    url: picture.url().map(str::to_string),
                })?,
                None => Value::Null,
            },
            (_, Some(tag)) => tag.field(key).map_or(Value::Null, Value::from),
            (_, None) => Value::Null,
        };
        if filter.is_some() || !value.is_null() {
            report.insert(key.as_str().into(), value);
        }
    }

    Ok(Value::Object(report))
}

/// Format and output data
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Output metadata
    pub fn output_metadata(&self, metadata: &Value, writer: &mut dyn Write) -> Result<()> {
        match self.format {
            OutputFormat::Pretty => {
                writeln!(writer, "{}", serde_json::to_string_pretty(metadata)?)?;
            }
            OutputFormat::Json => {
                writeln!(writer, "{}", serde_json::to_string(metadata)?)?;
            }
            OutputFormat::KeyValue => {
                self.output_key_value(metadata, writer)?;
            }
            OutputFormat::Table => {
                self.output_table(metadata, writer)?;
            }
        }
        Ok(())
    }

    /// Output as key-value pairs
    fn output_key_value(&self, metadata: &Value, writer: &mut dyn Write) -> Result<()> {
        if let Some(obj) = metadata.as_object() {
            let mut items: Vec<_> = obj.iter().collect();
            items.sort_by(|a, b| a.0.cmp(b.0));

            for (key, value) in items {
                writeln!(writer, "{}={}", key, format_value(value))?;
            }
        }
        Ok(())
    }

    /// Output as table
    fn output_table(&self, metadata: &Value, writer: &mut dyn Write) -> Result<()> {
        if let Some(obj) = metadata.as_object() {
            let max_key_len = obj.keys().map(|k| k.len()).max().unwrap_or(0);

            writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;
            for (key, value) in obj {
                writeln!(
                    writer,
                    "{:<width$} {}",
                    format!("{}:", key),
                    format_value(value),
                    width = max_key_len + 2
                )?;
            }
            writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;
        }
        Ok(())
    }

    /// Print success message
    pub fn print_success(&self, message: &str) {
        if !self.quiet {
            println!("✓ {}", message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if !self.quiet {
            println!("  {}", message);
        }
    }
}

/// Format a JSON value for display
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "(none)".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => obj
            .iter()
            .map(|(k, v)| format!("{}: {}", k, format_value(v)))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(format: OutputFormat, value: &Value) -> String {
        let mut out = Vec::new();
        OutputFormatter::new(format, false)
            .output_metadata(value, &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn key_value_is_sorted() {
        let value = json!({"title": "Song", "artist": "Band", "date": null});
        assert_eq!(
            render(OutputFormat::KeyValue, &value),
            "artist=Band\ndate=(none)\ntitle=Song\n"
        );
    }

    #[test]
    fn compact_json() {
        let value = json!({"title": "Song"});
        assert_eq!(render(OutputFormat::Json, &value), "{\"title\":\"Song\"}\n");
    }

    #[test]
    fn nested_objects_are_flattened() {
        let value = json!({"picture": {"mime_type": "image/png", "size": 3}});
        let table = render(OutputFormat::Table, &value);
        assert!(table.contains("picture:"));
        assert!(table.contains("mime_type: image/png, size: 3"));
    }
}
