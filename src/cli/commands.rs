// CLI command implementations
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use glob::glob;
use oxitag::{AttachedPicture, AudioFile, PictureType, StandardField};
use serde_json::Value;

use crate::cli::config::{parse_fields, BatchOperation, Commands, Config};
use crate::cli::output::{tag_report, OutputFormatter};

/// Run the parsed command line.
pub fn run(config: Config) -> Result<()> {
    let formatter = OutputFormatter::new(config.format, config.quiet);

    match config.command {
        Commands::Read {
            files,
            fields,
            output,
        } => command_read(&files, fields.as_deref(), output.as_deref(), &formatter),
        Commands::Write {
            file,
            set,
            remove,
            metadata,
            from_file,
            padding,
        } => {
            let edits = collect_edits(&set, &remove, metadata.as_deref(), from_file.as_deref())?;
            command_write(&file, &edits, padding, &formatter)
        }
        Commands::Copy { source, targets } => command_copy(&source, &targets, &formatter),
        Commands::Batch {
            directory,
            pattern,
            operation,
        } => command_batch(&directory, &pattern, operation, &formatter),
        Commands::Detect { files } => command_detect(&files, &formatter),
        Commands::ExportCover { file, output } => command_export_cover(&file, &output, &formatter),
        Commands::SetCover {
            file,
            image,
            url,
            mime_type,
            description,
            picture_type,
        } => {
            let picture_type = PictureType::try_from(picture_type)?;
            let picture = match (image, url) {
                (_, Some(url)) => AttachedPicture::from_url(picture_type, &url, description)?,
                (Some(image), None) => load_picture(&image, picture_type, mime_type, description)?,
                (None, None) => bail!("either --image or --url is required"),
            };
            command_set_cover(&file, picture, &formatter)
        }
        Commands::RemoveCover { files } => command_remove_cover(&files, &formatter),
        Commands::RemoveTag { files } => command_remove_tag(&files, &formatter),
        Commands::Info { files } => command_info(&files, &formatter),
    }
}

/// A single field change requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    Set(StandardField, String),
    Remove(StandardField),
}

fn parse_field(name: &str) -> Result<StandardField> {
    let field: StandardField = name.parse().map_err(|e: String| anyhow!(e))?;
    if !field.is_text() {
        bail!("{} cannot be edited as text, use set-cover", field);
    }
    Ok(field)
}

/// Merge `--set`, `--remove` and JSON metadata into one edit list.
pub fn collect_edits(
    set: &[String],
    remove: &[String],
    metadata: Option<&str>,
    from_file: Option<&Path>,
) -> Result<Vec<FieldEdit>> {
    let mut edits = Vec::new();

    let json = match (from_file, metadata) {
        (Some(path), _) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
        ),
        (None, Some(json)) => Some(json.to_string()),
        (None, None) => None,
    };
    if let Some(json) = json {
        let value: Value = serde_json::from_str(&json).context("invalid metadata JSON")?;
        let object = value
            .as_object()
            .ok_or_else(|| anyhow!("metadata JSON must be an object"))?;
        for (key, value) in object {
            let field = parse_field(key)?;
            match value {
                Value::Null => edits.push(FieldEdit::Remove(field)),
                Value::String(s) => edits.push(FieldEdit::Set(field, s.clone())),
                Value::Number(n) => edits.push(FieldEdit::Set(field, n.to_string())),
                other => bail!("unsupported value for {}: {}", key, other),
            }
        }
    }

    for assignment in set {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got {:?}", assignment))?;
        edits.push(FieldEdit::Set(parse_field(key)?, value.to_string()));
    }
    for key in remove {
        edits.push(FieldEdit::Remove(parse_field(key)?));
    }

    if edits.is_empty() {
        bail!("nothing to write: use --set, --remove or --metadata");
    }
    Ok(edits)
}

fn open(path: &Path) -> Result<AudioFile> {
    AudioFile::open(path).with_context(|| format!("failed to open {}", path.display()))
}

fn save(audio: &mut AudioFile) -> Result<()> {
    let path = audio.path().display().to_string();
    audio
        .save()
        .with_context(|| format!("failed to save {}", path))
}

fn load_picture(
    image: &Path,
    picture_type: PictureType,
    mime_type: Option<String>,
    description: String,
) -> Result<AttachedPicture> {
    let picture = match mime_type {
        Some(mime) => {
            let data = std::fs::read(image)
                .with_context(|| format!("failed to read {}", image.display()))?;
            AttachedPicture::new(picture_type, mime, description, data)?
        }
        None => AttachedPicture::from_file(picture_type, image, description)
            .with_context(|| format!("failed to load {}", image.display()))?,
    };
    Ok(picture)
}

/// Read metadata from files
fn command_read(
    files: &[PathBuf],
    fields: Option<&str>,
    output: Option<&Path>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let filter = fields
        .map(|list| {
            parse_fields(list)
                .into_iter()
                .map(|name| name.parse::<StandardField>().map_err(|e| anyhow!(e)))
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?;

    let mut writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout()),
    };

    let mut failures = 0;
    for path in files {
        match open(path) {
            Ok(audio) => {
                let report = tag_report(&audio, filter.as_deref())?;
                formatter.output_metadata(&report, &mut *writer)?;
            }
            Err(e) => {
                formatter.print_error(&format!("{:#}", e));
                failures += 1;
            }
        }
    }
    writer.flush()?;

    if failures > 0 {
        bail!("{} of {} files could not be read", failures, files.len());
    }
    Ok(())
}

/// Apply field edits to one file.
pub fn apply_edits(audio: &mut AudioFile, edits: &[FieldEdit]) -> Result<()> {
    let tag = audio.tag_mut();
    for edit in edits {
        match edit {
            FieldEdit::Set(field, value) => tag
                .set_field(*field, value)
                .with_context(|| format!("cannot set {}", field))?,
            FieldEdit::Remove(field) => tag.remove_field(*field),
        }
    }
    Ok(())
}

/// Write metadata to file
fn command_write(
    file: &Path,
    edits: &[FieldEdit],
    padding: Option<u32>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut audio = open(file)?;
    if let Some(padding) = padding {
        audio.set_padding(padding)?;
    }
    apply_edits(&mut audio, edits)?;
    save(&mut audio)?;
    formatter.print_success(&format!("Updated metadata for {}", file.display()));
    Ok(())
}

/// Copy metadata between files
fn command_copy(source: &Path, targets: &[PathBuf], formatter: &OutputFormatter) -> Result<()> {
    let source_audio = open(source)?;
    let source_tag = source_audio
        .tag()
        .ok_or_else(|| anyhow!("{} has no tag", source.display()))?;

    let mut failures = 0;
    for target in targets {
        let result = open(target).and_then(|mut audio| {
            let skipped = audio.tag_mut().copy_from(source_tag);
            save(&mut audio)?;
            Ok(skipped)
        });
        match result {
            Ok(skipped) => {
                formatter.print_success(&format!("Copied metadata to {}", target.display()));
                if !skipped.is_empty() {
                    let names: Vec<_> = skipped.iter().map(|f| f.as_str()).collect();
                    formatter.print_info(&format!("Skipped: {}", names.join(", ")));
                }
            }
            Err(e) => {
                formatter.print_error(&format!("{:#}", e));
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} targets failed", failures, targets.len());
    }
    Ok(())
}

/// Batch process directory
fn command_batch(
    directory: &Path,
    pattern: &str,
    operation: BatchOperation,
    formatter: &OutputFormatter,
) -> Result<()> {
    // Patterns without wildcards match the file name at any depth
    let glob_pattern = if pattern.contains('*') || pattern.contains('?') {
        format!("{}/{}", directory.display(), pattern)
    } else {
        format!("{}/**/{}", directory.display(), pattern)
    };

    let mut files = Vec::new();
    for entry in glob(&glob_pattern).context("invalid glob pattern")? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => formatter.print_error(&format!("Error reading path: {}", e)),
        }
    }

    let total = files.len();
    if total == 0 {
        formatter.print_info("No files found matching pattern");
        return Ok(());
    }
    formatter.print_info(&format!("Processing {} files ({})...", total, operation));

    let mut stdout = io::stdout();
    let mut success_count = 0;
    let mut error_count = 0;
    for path in &files {
        let result = open(path).and_then(|mut audio| match operation {
            BatchOperation::Read => {
                let report = tag_report(&audio, None)?;
                formatter.output_metadata(&report, &mut stdout)
            }
            BatchOperation::RemoveTags => {
                audio.remove_tag()?;
                save(&mut audio)
            }
        });
        match result {
            Ok(()) => {
                formatter.print_success(&path.display().to_string());
                success_count += 1;
            }
            Err(e) => {
                formatter.print_error(&format!("{:#}", e));
                error_count += 1;
            }
        }
    }

    formatter.print_info(&format!(
        "Completed: {} successful, {} errors",
        success_count, error_count
    ));
    Ok(())
}

/// Detect file format
fn command_detect(files: &[PathBuf], formatter: &OutputFormatter) -> Result<()> {
    for path in files {
        let mut file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        match oxitag::detect::detect(&mut file)? {
            Some(file_type) => println!("{}: {} ({})", path.display(), file_type.mime_type(), file_type),
            None => formatter.print_error(&format!("{}: unrecognized format", path.display())),
        }
    }
    Ok(())
}

/// Export cover art
fn command_export_cover(file: &Path, output_dir: &Path, formatter: &OutputFormatter) -> Result<()> {
    let audio = open(file)?;
    let picture = audio
        .tag()
        .and_then(|tag| tag.picture())
        .ok_or_else(|| anyhow!("{} has no cover", file.display()))?;
    if let Some(url) = picture.url() {
        bail!("the cover of {} is a link: {}", file.display(), url);
    }

    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cover".to_string());
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let target = output_dir.join(format!("{}.{}", stem, picture.extension()));
    std::fs::write(&target, picture.data())
        .with_context(|| format!("failed to write {}", target.display()))?;

    formatter.print_success(&format!(
        "Exported {} ({}, {} bytes) to {}",
        picture.picture_type(),
        picture.mime_type(),
        picture.data().len(),
        target.display()
    ));
    Ok(())
}

/// Set cover art
fn command_set_cover(file: &Path, picture: AttachedPicture, formatter: &OutputFormatter) -> Result<()> {
    let mut audio = open(file)?;
    audio.tag_mut().set_picture(picture)?;
    save(&mut audio)?;
    formatter.print_success(&format!("Set cover for {}", file.display()));
    Ok(())
}

/// Remove cover art
fn command_remove_cover(files: &[PathBuf], formatter: &OutputFormatter) -> Result<()> {
    for path in files {
        let mut audio = open(path)?;
        audio.tag_mut().remove_picture();
        save(&mut audio)?;
        formatter.print_success(&format!("Removed cover from {}", path.display()));
    }
    Ok(())
}

/// Remove the whole tag
fn command_remove_tag(files: &[PathBuf], formatter: &OutputFormatter) -> Result<()> {
    for path in files {
        let mut audio = open(path)?;
        audio.remove_tag()?;
        save(&mut audio)?;
        formatter.print_success(&format!("Removed tag from {}", path.display()));
    }
    Ok(())
}

/// Show file information
fn command_info(files: &[PathBuf], formatter: &OutputFormatter) -> Result<()> {
    for path in files {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("failed to stat {}", path.display()))?;

        println!("\n{}", path.display());
        println!("{}", "─".repeat(60));
        println!("Size: {} bytes", metadata.len());
        if let Ok(modified) = metadata.modified() {
            let date: chrono::DateTime<chrono::Utc> = modified.into();
            println!("Modified: {}", date.format("%Y-%m-%d %H:%M:%S UTC"));
        }

        match open(path) {
            Ok(audio) => {
                println!("Format: {} ({})", audio.file_type(), audio.file_type().mime_type());
                match audio.tag() {
                    Some(tag) => {
                        let fields = StandardField::text_fields()
                            .filter(|&key| tag.field(key).is_some())
                            .count();
                        println!("Tag: {} with {} fields", tag.format_name(), fields);
                        if let Some(picture) = tag.picture() {
                            println!(
                                "Cover: {} {} ({} bytes)",
                                picture.picture_type(),
                                picture.mime_type(),
                                picture.data().len()
                            );
                        }
                    }
                    None => println!("Tag: none"),
                }
            }
            Err(e) => formatter.print_error(&format!("{:#}", e)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_from_flags_and_json() {
        let edits = collect_edits(
            &["title=A=B".to_string()],
            &["comment".to_string()],
            Some(r#"{"artist": "Band", "bpm": 120, "genre": null}"#),
            None,
        )
        .unwrap();

        assert_eq!(
            edits,
            [
                FieldEdit::Set(StandardField::Artist, "Band".to_string()),
                FieldEdit::Set(StandardField::Bpm, "120".to_string()),
                FieldEdit::Remove(StandardField::Genre),
                FieldEdit::Set(StandardField::Title, "A=B".to_string()),
                FieldEdit::Remove(StandardField::Comment),
            ]
        );
    }

    #[test]
    fn rejects_bad_edits() {
        assert!(collect_edits(&[], &[], None, None).is_err());
        assert!(collect_edits(&["title".to_string()], &[], None, None).is_err());
        assert!(collect_edits(&["nope=x".to_string()], &[], None, None).is_err());
        assert!(collect_edits(&["picture=x".to_string()], &[], None, None).is_err());
        assert!(collect_edits(&[], &[], Some("[1, 2]"), None).is_err());
    }
}
