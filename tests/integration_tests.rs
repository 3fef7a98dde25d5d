//! Integration tests for oxitag
//!
//! Every fixture is assembled in memory and written to a temporary directory,
//! then edited through the public [`AudioFile`] API and read back from disk.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use oxitag::flac::{Framing, FLAC_SIGNATURE};
use oxitag::ogg::page::FLAG_FIRST;
use oxitag::ogg::{paginate, Page, PageHeader};
use oxitag::{
    AttachedPicture, AudioFile, Container, Error, FileType, PictureType, StandardField,
    VorbisComment,
};
use tempfile::TempDir;

const MPEG_AUDIO: &[u8] = b"\xFF\xFB\x90\x64mpeg-frame-data-mpeg-frame-data";
const FLAC_AUDIO: &[u8] = b"\xFF\xF8\x69\x08flac-frame-data";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR";

// ============================================================================
// Fixtures
// ============================================================================

fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn streaminfo() -> Vec<u8> {
    let mut raw = Vec::with_capacity(34);
    raw.extend(4096u16.to_be_bytes());
    raw.extend(4096u16.to_be_bytes());
    raw.extend([0, 0, 0, 0, 0, 0]);
    // 44100 Hz, 2 channels, 16 bits, 441000 samples
    let packed: u64 = (44_100u64 << 44) | (1 << 41) | (15 << 36) | 441_000;
    raw.extend(packed.to_be_bytes());
    raw.extend([0u8; 16]);
    raw
}

/// `fLaC`, STREAMINFO, an optional PADDING block, then the audio frames.
fn flac_file(padding: Option<u32>) -> Vec<u8> {
    let mut out = FLAC_SIGNATURE.to_vec();
    let last = if padding.is_some() { 0x00 } else { 0x80 };
    out.extend([last, 0, 0, 34]);
    out.extend(streaminfo());
    if let Some(padding) = padding {
        out.push(0x81);
        out.extend(&padding.to_be_bytes()[1..]);
        out.extend(vec![0u8; padding as usize]);
    }
    out.extend(FLAC_AUDIO);
    out
}

fn ogg_file(serial: u32, headers: &[Vec<u8>]) -> Vec<u8> {
    let mut pages = paginate(headers, serial, 0);
    pages[0].header.flags |= FLAG_FIRST;
    let next = pages.len() as u32;
    for i in 0..2u32 {
        pages.push(Page {
            header: PageHeader {
                flags: if i == 1 { 0x04 } else { 0 },
                granule: 48_000 * (i64::from(i) + 1),
                serial,
                sequence: next + i,
                checksum: 0,
                segments: vec![10],
            },
            payload: format!("audio-{:04}", i).into_bytes(),
        });
    }
    pages
        .iter()
        .flat_map(|page| page.to_bytes().unwrap())
        .collect()
}

fn opus_file(comment: &VorbisComment) -> Vec<u8> {
    let mut head = b"OpusHead".to_vec();
    head.push(1);
    head.push(2);
    head.extend(312u16.to_le_bytes());
    head.extend(48_000u32.to_le_bytes());
    head.extend(0i16.to_le_bytes());
    head.push(0);

    let mut tags = b"OpusTags".to_vec();
    tags.extend(comment.to_bytes(Framing::Absent).unwrap());
    ogg_file(0x4F50, &[head, tags])
}

fn vorbis_file(comment: &VorbisComment) -> Vec<u8> {
    let mut ident = b"\x01vorbis".to_vec();
    ident.extend(0u32.to_le_bytes());
    ident.push(2);
    ident.extend(44_100u32.to_le_bytes());
    ident.extend(0i32.to_le_bytes());
    ident.extend(160_000i32.to_le_bytes());
    ident.extend(0i32.to_le_bytes());
    ident.extend([0xB8, 0x01]);

    let mut comment_packet = b"\x03vorbis".to_vec();
    comment_packet.extend(comment.to_bytes(Framing::Required).unwrap());
    let mut setup = b"\x05vorbis".to_vec();
    setup.extend([0x5A; 64]);
    ogg_file(0x564F, &[ident, comment_packet, setup])
}

/// Every page of an Ogg file, checking that the data ends on a page boundary.
fn read_all_pages(path: &Path) -> Vec<Page> {
    let mut cursor = Cursor::new(fs::read(path).unwrap());
    let mut pages = Vec::new();
    while let Some(page) = Page::read(&mut cursor).unwrap() {
        pages.push(page);
    }
    pages
}

// ============================================================================
// MPEG / ID3v2
// ============================================================================

#[test]
fn mpeg_tag_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "song.mp3", MPEG_AUDIO);

    let mut audio = AudioFile::open(&path).unwrap();
    assert_eq!(audio.file_type(), FileType::Mpeg);
    assert!(audio.tag().is_none());

    let tag = audio.tag_mut();
    tag.set_field(StandardField::Title, "Song").unwrap();
    tag.set_field(StandardField::Artist, "Band").unwrap();
    tag.set_field(StandardField::TrackNumber, "3/12").unwrap();
    audio.save().unwrap();

    let data = fs::read(&path).unwrap();
    assert!(data.starts_with(b"ID3\x04\x00"));
    assert!(data.ends_with(MPEG_AUDIO));

    let reopened = AudioFile::open(&path).unwrap();
    let tag = reopened.tag().unwrap();
    assert_eq!(tag.format_name(), "ID3v2.4");
    assert_eq!(tag.field(StandardField::Title).as_deref(), Some("Song"));
    assert_eq!(tag.field(StandardField::Artist).as_deref(), Some("Band"));
    assert_eq!(tag.field(StandardField::TrackNumber).as_deref(), Some("3/12"));
}

#[test]
fn mpeg_edit_reuses_padding() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "song.mp3", MPEG_AUDIO);

    let mut audio = AudioFile::open(&path).unwrap();
    audio.tag_mut().set_field(StandardField::Title, "First").unwrap();
    audio.save().unwrap();
    let len = fs::metadata(&path).unwrap().len();

    let mut audio = AudioFile::open(&path).unwrap();
    audio.tag_mut().set_field(StandardField::Album, "Record").unwrap();
    audio.save().unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), len);
    let tag = AudioFile::open(&path).unwrap();
    let tag = tag.tag().unwrap();
    assert_eq!(tag.field(StandardField::Title).as_deref(), Some("First"));
    assert_eq!(tag.field(StandardField::Album).as_deref(), Some("Record"));
}

#[test]
fn mpeg_remove_tag_restores_audio() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "song.mp3", MPEG_AUDIO);

    let mut audio = AudioFile::open(&path).unwrap();
    audio.tag_mut().set_field(StandardField::Genre, "Jazz").unwrap();
    audio.save().unwrap();

    let mut audio = AudioFile::open(&path).unwrap();
    audio.remove_tag().unwrap();
    audio.save().unwrap();

    assert_eq!(fs::read(&path).unwrap(), MPEG_AUDIO);
}

#[test]
fn unsupported_id3v2_version_falls_back_to_id3v1() {
    let dir = TempDir::new().unwrap();
    let mut data = b"ID3\x02\x00\x00\x00\x00\x00\x0A".to_vec();
    data.extend(b"TT2\x00\x00\x04\x00Old");
    data.extend(MPEG_AUDIO);
    let mut legacy = b"TAG".to_vec();
    let mut title = b"Legacy".to_vec();
    title.resize(30, 0);
    legacy.extend(title);
    legacy.resize(127, 0);
    legacy.push(255);
    data.extend(&legacy);
    let path = write_file(&dir, "old.mp3", &data);

    let mut audio = AudioFile::open(&path).unwrap();
    assert_eq!(audio.file_type(), FileType::Mpeg);
    let tag = audio.tag().unwrap();
    assert_eq!(tag.format_name(), "ID3v1");
    assert_eq!(tag.field(StandardField::Title).as_deref(), Some("Legacy"));

    audio.tag_mut().set_field(StandardField::Artist, "Band").unwrap();
    audio.save().unwrap();

    let data = fs::read(&path).unwrap();
    assert!(data.starts_with(b"ID3\x04"));
    assert!(!data.windows(3).any(|w| w == b"TT2"));
    assert!(data.ends_with(&legacy));

    let reopened = AudioFile::open(&path).unwrap();
    let tag = reopened.tag().unwrap();
    assert_eq!(tag.field(StandardField::Title).as_deref(), Some("Legacy"));
    assert_eq!(tag.field(StandardField::Artist).as_deref(), Some("Band"));
}

// ============================================================================
// FLAC
// ============================================================================

#[test]
fn flac_edit_fits_in_padding() {
    let dir = TempDir::new().unwrap();
    let original = flac_file(Some(100));
    let path = write_file(&dir, "song.flac", &original);

    let mut audio = AudioFile::open(&path).unwrap();
    assert_eq!(audio.file_type(), FileType::Flac);
    audio.tag_mut().set_field(StandardField::Title, "A").unwrap();
    audio.save().unwrap();

    let data = fs::read(&path).unwrap();
    assert_eq!(data.len(), original.len());
    assert!(data.ends_with(FLAC_AUDIO));

    let reopened = AudioFile::open(&path).unwrap();
    let Container::Flac(flac) = reopened.container() else {
        panic!("expected a FLAC container");
    };
    let comment_len = flac
        .tag()
        .vorbis_comment()
        .unwrap()
        .to_bytes(Framing::Absent)
        .unwrap()
        .len() as u32;
    // STREAMINFO and the metadata region keep their size; the comment block
    // and its header come out of the old padding.
    assert_eq!(flac.tag().padding(), 100 - (4 + comment_len));
    assert_eq!(flac.metadata_len(), 4 + 34 + 4 + 100);
    assert_eq!(
        reopened.tag().unwrap().field(StandardField::Title).as_deref(),
        Some("A")
    );
}

#[test]
fn flac_grows_when_there_is_no_padding() {
    let dir = TempDir::new().unwrap();
    let original = flac_file(None);
    let path = write_file(&dir, "song.flac", &original);

    let mut audio = AudioFile::open(&path).unwrap();
    audio.tag_mut().set_field(StandardField::Artist, "Band").unwrap();
    audio
        .tag_mut()
        .set_picture(AttachedPicture::new(PictureType::CoverFront, "image/png", "front", PNG.to_vec()).unwrap())
        .unwrap();
    audio.save().unwrap();

    let data = fs::read(&path).unwrap();
    assert!(data.len() > original.len());
    assert!(data.starts_with(FLAC_SIGNATURE));
    assert!(data.ends_with(FLAC_AUDIO));

    let reopened = AudioFile::open(&path).unwrap();
    let tag = reopened.tag().unwrap();
    assert_eq!(tag.field(StandardField::Artist).as_deref(), Some("Band"));
    let picture = tag.picture().unwrap();
    assert_eq!(picture.mime_type(), "image/png");
    assert_eq!(picture.data(), PNG);
}

#[test]
fn flac_remove_tag_keeps_stream_info() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "song.flac", &flac_file(Some(64)));

    let mut audio = AudioFile::open(&path).unwrap();
    audio.tag_mut().set_field(StandardField::Comment, "note").unwrap();
    audio.save().unwrap();

    let mut audio = AudioFile::open(&path).unwrap();
    audio.remove_tag().unwrap();
    audio.save().unwrap();

    let reopened = AudioFile::open(&path).unwrap();
    let Container::Flac(flac) = reopened.container() else {
        panic!("expected a FLAC container");
    };
    assert!(flac.tag().vorbis_comment().is_none());
    assert_eq!(flac.tag().stream_info().unwrap().sample_rate, 44_100);
    assert!(fs::read(&path).unwrap().ends_with(FLAC_AUDIO));
}

#[test]
fn flac_rejects_out_of_range_padding() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "song.flac", &flac_file(Some(16)));

    let mut audio = AudioFile::open(&path).unwrap();
    assert!(matches!(audio.set_padding(4), Err(Error::InvalidArgument(_))));
    audio.set_padding(4096).unwrap();
}

// ============================================================================
// Ogg Vorbis and Opus
// ============================================================================

#[test]
fn opus_edit_rewrites_header_pages() {
    let dir = TempDir::new().unwrap();
    let mut comment = VorbisComment::new("libopus 1.4");
    comment.set("TITLE", "Old").unwrap();
    let path = write_file(&dir, "song.opus", &opus_file(&comment));

    let mut audio = AudioFile::open(&path).unwrap();
    assert_eq!(audio.file_type(), FileType::OggOpus);
    audio.tag_mut().set_field(StandardField::Title, "New title").unwrap();
    audio.save().unwrap();

    let pages = read_all_pages(&path);
    for (i, page) in pages.iter().enumerate() {
        assert!(page.verify_checksum().unwrap(), "bad CRC on page {}", i);
        assert_eq!(page.header.sequence, i as u32);
    }
    assert_eq!(pages.last().unwrap().payload, b"audio-0001");

    let reopened = AudioFile::open(&path).unwrap();
    let Container::OggOpus(opus) = reopened.container() else {
        panic!("expected an Opus container");
    };
    assert_eq!(opus.tag().vendor(), "libopus 1.4");
    assert_eq!(opus.stream().audio_pages(), 2);
    assert_eq!(
        reopened.tag().unwrap().field(StandardField::Title).as_deref(),
        Some("New title")
    );
}

#[test]
fn vorbis_remove_tag_keeps_vendor_and_setup() {
    let dir = TempDir::new().unwrap();
    let mut comment = VorbisComment::new("Xiph.Org libVorbis I 20200704");
    comment.set("ARTIST", "Band").unwrap();
    comment.set("ALBUM", "Record").unwrap();
    let path = write_file(&dir, "song.ogg", &vorbis_file(&comment));

    let mut audio = AudioFile::open(&path).unwrap();
    assert_eq!(audio.file_type(), FileType::OggVorbis);
    audio.remove_tag().unwrap();
    audio.save().unwrap();

    let reopened = AudioFile::open(&path).unwrap();
    let Container::OggVorbis(vorbis) = reopened.container() else {
        panic!("expected a Vorbis container");
    };
    assert!(vorbis.tag().is_empty());
    assert_eq!(vorbis.tag().vendor(), "Xiph.Org libVorbis I 20200704");
    assert_eq!(vorbis.info().sample_rate, 44_100);

    let setup = &vorbis.stream().packets()[2];
    assert!(setup.starts_with(b"\x05vorbis"));
    assert_eq!(setup.len(), 7 + 64);
}

#[test]
fn ogg_streams_have_no_padding() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "song.opus", &opus_file(&VorbisComment::new("v")));

    let mut audio = AudioFile::open(&path).unwrap();
    assert!(matches!(audio.set_padding(1024), Err(Error::Unsupported(_))));
}

// ============================================================================
// Cross-format
// ============================================================================

#[test]
fn copy_mpeg_tag_into_opus() {
    let dir = TempDir::new().unwrap();
    let mp3 = write_file(&dir, "source.mp3", MPEG_AUDIO);
    let opus = write_file(&dir, "target.opus", &opus_file(&VorbisComment::new("libopus")));

    let mut source = AudioFile::open(&mp3).unwrap();
    {
        let tag = source.tag_mut();
        tag.set_field(StandardField::Title, "Song").unwrap();
        tag.set_field(StandardField::AlbumArtist, "Various").unwrap();
        tag.set_field(StandardField::Lyrics, "la la la").unwrap();
        tag.set_picture(
            AttachedPicture::new(PictureType::CoverFront, "image/png", "", PNG.to_vec()).unwrap(),
        )
        .unwrap();
    }
    source.save().unwrap();

    let source = AudioFile::open(&mp3).unwrap();
    let mut target = AudioFile::open(&opus).unwrap();
    let skipped = target.tag_mut().copy_from(source.tag().unwrap());
    assert!(skipped.is_empty());
    target.save().unwrap();

    let target = AudioFile::open(&opus).unwrap();
    let tag = target.tag().unwrap();
    assert_eq!(tag.field(StandardField::Title).as_deref(), Some("Song"));
    assert_eq!(tag.field(StandardField::AlbumArtist).as_deref(), Some("Various"));
    assert_eq!(tag.field(StandardField::Lyrics).as_deref(), Some("la la la"));
    let picture = tag.picture().unwrap();
    assert_eq!(picture.picture_type(), PictureType::CoverFront);
    assert_eq!(picture.data(), PNG);
}

#[test]
fn copy_flac_tag_into_mpeg() {
    let dir = TempDir::new().unwrap();
    let flac = write_file(&dir, "source.flac", &flac_file(Some(512)));
    let mp3 = write_file(&dir, "target.mp3", MPEG_AUDIO);

    let mut source = AudioFile::open(&flac).unwrap();
    source.tag_mut().set_field(StandardField::Composer, "Someone").unwrap();
    source.tag_mut().set_field(StandardField::Bpm, "120").unwrap();
    source.save().unwrap();

    let source = AudioFile::open(&flac).unwrap();
    let mut target = AudioFile::open(&mp3).unwrap();
    let skipped = target.tag_mut().copy_from(source.tag().unwrap());
    assert!(skipped.is_empty());
    target.save().unwrap();

    let target = AudioFile::open(&mp3).unwrap();
    let tag = target.tag().unwrap();
    assert_eq!(tag.field(StandardField::Composer).as_deref(), Some("Someone"));
    assert_eq!(tag.field(StandardField::Bpm).as_deref(), Some("120"));
    assert!(tag.picture().is_none());
}

/// A value for every text field that each format can store.
const FULL_TAG: [(StandardField, &str); 15] = [
    (StandardField::Title, "Song"),
    (StandardField::Artist, "Band"),
    (StandardField::Album, "Record"),
    (StandardField::AlbumArtist, "Various"),
    (StandardField::Composer, "Someone"),
    (StandardField::Genre, "Rock"),
    (StandardField::Date, "2024-03-15"),
    (StandardField::TrackNumber, "3/12"),
    (StandardField::DiscNumber, "1/2"),
    (StandardField::Comment, "a comment"),
    (StandardField::Lyrics, "la la la"),
    (StandardField::Copyright, "2024 Label"),
    (StandardField::Publisher, "Label"),
    (StandardField::EncodedBy, "encoder"),
    (StandardField::Bpm, "120"),
];

#[derive(Clone, Copy, Debug, PartialEq)]
enum Format {
    Mpeg,
    Flac,
    Vorbis,
    Opus,
}

const FORMATS: [Format; 4] = [Format::Mpeg, Format::Flac, Format::Vorbis, Format::Opus];

fn empty_file(dir: &TempDir, format: Format, name: &str) -> PathBuf {
    match format {
        Format::Mpeg => write_file(dir, &format!("{name}.mp3"), MPEG_AUDIO),
        Format::Flac => write_file(dir, &format!("{name}.flac"), &flac_file(Some(256))),
        Format::Vorbis => write_file(
            dir,
            &format!("{name}.ogg"),
            &vorbis_file(&VorbisComment::new("Xiph.Org libVorbis I 20200704")),
        ),
        Format::Opus => write_file(
            dir,
            &format!("{name}.opus"),
            &opus_file(&VorbisComment::new("libopus 1.4")),
        ),
    }
}

fn cover() -> AttachedPicture {
    AttachedPicture::new(PictureType::CoverFront, "image/png", "Cover", PNG.to_vec()).unwrap()
}

/// Copy the tag of `source` into `target`, save it, and reopen the target.
fn copy_tag(source: &Path, target: &Path) -> AudioFile {
    let source = AudioFile::open(source).unwrap();
    let mut audio = AudioFile::open(target).unwrap();
    let skipped = audio.tag_mut().copy_from(source.tag().unwrap());
    assert!(skipped.is_empty(), "skipped {:?}", skipped);
    audio.save().unwrap();
    AudioFile::open(target).unwrap()
}

fn assert_full_tag(audio: &AudioFile, route: &str) {
    let tag = audio.tag().unwrap();
    for (key, value) in FULL_TAG {
        assert_eq!(
            tag.field(key).as_deref(),
            Some(value),
            "{} lost on {}",
            key.as_str(),
            route
        );
    }
    let picture = tag.picture().unwrap();
    assert_eq!(picture.picture_type(), PictureType::CoverFront, "{}", route);
    assert_eq!(picture.mime_type(), "image/png", "{}", route);
    assert_eq!(picture.description(), "Cover", "{}", route);
    assert_eq!(picture.data(), PNG, "{}", route);
}

#[test]
fn every_field_survives_a_round_trip_between_formats() {
    assert_eq!(StandardField::text_fields().count(), FULL_TAG.len());

    for from in FORMATS {
        for via in FORMATS {
            if from == via {
                continue;
            }
            let route = format!("{:?} -> {:?} -> {:?}", from, via, from);
            let dir = TempDir::new().unwrap();

            let source = empty_file(&dir, from, "source");
            let mut audio = AudioFile::open(&source).unwrap();
            {
                let tag = audio.tag_mut();
                for (key, value) in FULL_TAG {
                    tag.set_field(key, value).unwrap();
                }
                tag.set_picture(cover()).unwrap();
            }
            audio.save().unwrap();
            assert_full_tag(&AudioFile::open(&source).unwrap(), &route);

            let middle = empty_file(&dir, via, "middle");
            assert_full_tag(&copy_tag(&source, &middle), &route);

            let back = empty_file(&dir, from, "back");
            assert_full_tag(&copy_tag(&middle, &back), &route);
        }
    }
}

#[test]
fn free_text_date_is_skipped_when_copying_into_id3v2() {
    let dir = TempDir::new().unwrap();
    let flac = write_file(&dir, "source.flac", &flac_file(Some(256)));
    let mp3 = write_file(&dir, "target.mp3", MPEG_AUDIO);

    let mut source = AudioFile::open(&flac).unwrap();
    {
        let tag = source.tag_mut();
        tag.set_field(StandardField::Title, "Song").unwrap();
        tag.set_field(StandardField::Date, "1970s").unwrap();
        tag.set_field(StandardField::Comment, "kept").unwrap();
    }
    source.save().unwrap();

    let source = AudioFile::open(&flac).unwrap();
    let mut target = AudioFile::open(&mp3).unwrap();
    let skipped = target.tag_mut().copy_from(source.tag().unwrap());
    assert_eq!(skipped, vec![StandardField::Date]);
    target.save().unwrap();

    let target = AudioFile::open(&mp3).unwrap();
    let tag = target.tag().unwrap();
    assert_eq!(tag.field(StandardField::Title).as_deref(), Some("Song"));
    assert_eq!(tag.field(StandardField::Comment).as_deref(), Some("kept"));
    assert!(tag.field(StandardField::Date).is_none());
}

#[test]
fn picture_is_not_a_text_field() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "song.flac", &flac_file(Some(64)));

    let mut audio = AudioFile::open(&path).unwrap();
    let err = audio
        .tag_mut()
        .set_field(StandardField::Picture, "cover.jpg")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

// ============================================================================
// Detection
// ============================================================================

#[test]
fn m4a_is_detected_but_not_editable() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "song.m4a", b"\x00\x00\x00\x18ftypM4A \x00\x00\x00\x00M4A mp42");

    let mut file = fs::File::open(&path).unwrap();
    assert_eq!(oxitag::detect::detect(&mut file).unwrap(), Some(FileType::M4a));
    assert!(matches!(AudioFile::open(&path), Err(Error::Unsupported(_))));
}

#[test]
fn unknown_data_is_unsupported() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "notes.txt", b"just some text, not audio");

    assert!(matches!(AudioFile::open(&path), Err(Error::Unsupported(_))));
}
