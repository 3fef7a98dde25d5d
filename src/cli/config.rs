// CLI configuration
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Oxitag - Audio metadata CLI tool
#[derive(Parser, Debug)]
#[command(name = "oxitag")]
#[command(about = "Read and edit tags of MP3, FLAC, Ogg Vorbis and Opus files", long_about = None)]
#[command(version)]
#[command(author = "xwsjjctz <xwsjjctz@icloud.com>")]
pub struct Config {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub format: OutputFormat,

    /// Quiet mode (suppress progress messages)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (log debug messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Pretty,
    /// Compact JSON
    Json,
    /// Key-value pairs
    KeyValue,
    /// Table format
    Table,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read metadata from audio file(s)
    Read {
        /// Audio file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Metadata fields to display (comma-separated)
        #[arg(long)]
        fields: Option<String>,

        /// Output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write metadata to an audio file
    Write {
        /// Audio file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Set a field, e.g. --set title="Song" (repeatable)
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Remove a field (repeatable)
        #[arg(short, long = "remove", value_name = "KEY")]
        remove: Vec<String>,

        /// Metadata JSON object; null values remove the field
        #[arg(short, long)]
        metadata: Option<String>,

        /// Read the metadata JSON from a file
        #[arg(long)]
        from_file: Option<PathBuf>,

        /// Padding to reserve when the tag has to be rewritten
        #[arg(long)]
        padding: Option<u32>,
    },

    /// Copy metadata between files
    Copy {
        /// Source audio file
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Target audio file(s)
        #[arg(value_name = "TARGET", required = true)]
        targets: Vec<PathBuf>,
    },

    /// Batch process multiple files
    Batch {
        /// Directory path
        #[arg(short, long)]
        directory: PathBuf,

        /// File pattern (e.g., "*.mp3", "*.flac")
        #[arg(short, long)]
        pattern: String,

        /// Operation to run on every file
        #[arg(value_enum)]
        operation: BatchOperation,
    },

    /// Detect file format
    Detect {
        /// Audio file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Export cover art
    ExportCover {
        /// Audio file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output directory for the cover image
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Set cover art
    SetCover {
        /// Audio file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Image file path
        #[arg(short, long, conflicts_with = "url", required_unless_present = "url")]
        image: Option<PathBuf>,

        /// Store a link to the image instead of the image itself
        #[arg(long)]
        url: Option<String>,

        /// MIME type (detected from the image if not specified)
        #[arg(short, long)]
        mime_type: Option<String>,

        /// Description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Picture type code (3 = front cover)
        #[arg(short = 't', long, default_value_t = 3)]
        picture_type: u32,
    },

    /// Remove cover art
    RemoveCover {
        /// Audio file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Remove the whole tag
    RemoveTag {
        /// Audio file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Show file information
    Info {
        /// Audio file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
}

/// Batch operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BatchOperation {
    Read,
    RemoveTags,
}

impl std::fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchOperation::Read => write!(f, "read"),
            BatchOperation::RemoveTags => write!(f, "remove-tags"),
        }
    }
}

/// Split a `--fields` list into its entries.
pub fn parse_fields(fields: &str) -> Vec<&str> {
    fields
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_write_arguments() {
        let config = Config::try_parse_from([
            "oxitag",
            "--format",
            "key-value",
            "write",
            "song.mp3",
            "--set",
            "title=Song",
            "--set",
            "artist=Band",
            "--remove",
            "comment",
            "--padding",
            "2048",
        ])
        .unwrap();

        assert_eq!(config.format, OutputFormat::KeyValue);
        match config.command {
            Commands::Write {
                set,
                remove,
                padding,
                ..
            } => {
                assert_eq!(set, ["title=Song", "artist=Band"]);
                assert_eq!(remove, ["comment"]);
                assert_eq!(padding, Some(2048));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn set_cover_needs_a_source() {
        assert!(Config::try_parse_from(["oxitag", "set-cover", "a.flac"]).is_err());
        assert!(Config::try_parse_from(["oxitag", "set-cover", "a.flac", "--url", "http://x/y.jpg"]).is_ok());
    }

    #[test]
    fn field_lists() {
        assert_eq!(parse_fields("title, artist,,album"), ["title", "artist", "album"]);
    }
}
