//! Derivation of a track's save location from its merged record.
//!
//! ```text
//! {artist}/{album title} ({album type})/[Disc {disc}/]{track} - {title}.{ext}
//! ```
//!
//! The disc directory is only present when the album has more than one disc.
//! Free-text components are stripped of characters that are illegal in file
//! names on common filesystems, and numbers are zero-padded to two digits.

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex_lite::Regex;

use crate::track::{FieldError, TrackRecord};

/// Title used for albums without one.
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Width that disc and track numbers are padded to.
const NUMBER_WIDTH: usize = 2;

static ILLEGAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F\x7F]"#).expect("invalid regex"));

/// Device names that Windows reserves in any case and with any extension.
const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Length of the stem if `component` would name a device on Windows, like
/// `con` or `NUL.txt`.
fn reserved_stem(component: &str) -> Option<usize> {
    let stem = component.split('.').next().unwrap_or_default().trim_end();
    RESERVED_NAMES
        .iter()
        .any(|name| stem.eq_ignore_ascii_case(name))
        .then_some(stem.len())
}

/// Removes characters that cannot appear in a path component, then
/// surrounding whitespace and trailing dots. Reserved device names get an
/// underscore after their stem.
#[must_use]
pub fn sanitize(component: &str) -> String {
    let cleaned = ILLEGAL_CHARS.replace_all(component, "");
    let mut sanitized = cleaned
        .trim()
        .trim_end_matches('.')
        .trim_end()
        .to_owned();

    if let Some(stem) = reserved_stem(&sanitized) {
        sanitized.insert(stem, '_');
    }

    sanitized
}

/// Renders a record type for directory names: `ep` in any case becomes `EP`,
/// anything else gets an uppercase first letter.
#[must_use]
pub fn album_type_label(album_type: &str) -> String {
    if album_type.eq_ignore_ascii_case("ep") {
        return "EP".to_owned();
    }

    let mut chars = album_type.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Zero-pads a number to two digits.
#[must_use]
pub fn pad(number: u32) -> String {
    format!("{number:0NUMBER_WIDTH$}")
}

/// A required free-text field, sanitized and non-empty.
fn component(field: &'static str, value: Option<&String>) -> Result<String, FieldError> {
    let value = value.ok_or(FieldError::Missing(field))?;
    let sanitized = sanitize(value);
    if sanitized.is_empty() {
        return Err(FieldError::Invalid {
            field,
            value: value.clone(),
        });
    }

    Ok(sanitized)
}

/// Derives the save location of `record` relative to the download root.
///
/// # Errors
///
/// Fails when a field the path is built from is absent, or sanitizes to
/// nothing. The album title is the one exception and falls back to
/// [`UNKNOWN_ALBUM`].
pub fn derive(record: &TrackRecord) -> Result<PathBuf, FieldError> {
    let artist = component("artist", record.artist.as_ref())?;
    let title = component("title", record.title.as_ref())?;
    let album_type = album_type_label(&component("album type", record.album_type.as_ref())?);

    let album_title = record
        .album_title
        .as_deref()
        .map(sanitize)
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| UNKNOWN_ALBUM.to_owned());

    let track_number = record
        .track_number
        .ok_or(FieldError::Missing("track number"))?;
    let disc_count = record.disc_count.ok_or(FieldError::Missing("disc count"))?;
    let extension = record
        .quality
        .ok_or(FieldError::Missing("quality"))?
        .extension();

    let mut path = PathBuf::from(artist);
    path.push(format!("{album_title} ({album_type})"));

    if disc_count > 1 {
        let disc_number = record
            .disc_number
            .ok_or(FieldError::Missing("disc number"))?;
        path.push(format!("Disc {}", pad(disc_number)));
    }

    path.push(format!("{} - {title}.{extension}", pad(track_number)));

    Ok(path)
}

/// Joins the derived path of `record` to `root`.
///
/// # Errors
///
/// See [`derive`].
pub fn save_location(root: &Path, record: &TrackRecord) -> Result<PathBuf, FieldError> {
    Ok(root.join(derive(record)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::{EncodingOption, Tier};
    use serde_json::{json, Value};

    fn record(disc_count: u32) -> TrackRecord {
        let Value::Object(data) = json!({
            "SNG_ID": 1,
            "SNG_TITLE": "Song",
            "ART_NAME": "Artist",
            "ALB_TITLE": "Album",
            "DISK_NUMBER": 2,
            "TRACK_NUMBER": "3"
        }) else {
            unreachable!("fixture must be an object");
        };

        let mut record = TrackRecord::from_data(&data)
            .unwrap()
            .with_quality(EncodingOption { tier: Tier::Mp3_320, size: 1 });
        record.disc_count = Some(disc_count);
        record.album_type = Some("album".to_owned());
        record
    }

    #[test]
    fn single_disc_has_no_disc_directory() {
        let path = derive(&record(1)).unwrap();
        assert_eq!(path, PathBuf::from("Artist/Album (Album)/03 - Song.mp3"));
        assert_eq!(path.file_name().unwrap(), "03 - Song.mp3");
    }

    #[test]
    fn multi_disc_has_disc_directory() {
        let path = derive(&record(2)).unwrap();
        assert_eq!(path, PathBuf::from("Artist/Album (Album)/Disc 02/03 - Song.mp3"));
    }

    #[test]
    fn ep_is_uppercase_in_any_case() {
        for raw in ["ep", "Ep", "eP", "EP"] {
            assert_eq!(album_type_label(raw), "EP");
        }
        assert_eq!(album_type_label("single"), "Single");
        assert_eq!(album_type_label("compile"), "Compile");
        assert_eq!(album_type_label(""), "");
    }

    #[test]
    fn illegal_characters_never_appear() {
        let mut record = record(1);
        record.artist = Some("AC/DC".to_owned());
        record.title = Some("What? <Live> | \"Encore\"*".to_owned());
        record.album_title = Some("Back: In\\Black...".to_owned());

        let path = derive(&record).unwrap();
        assert_eq!(
            path,
            PathBuf::from("ACDC/Back InBlack (Album)/03 - What Live  Encore.mp3")
        );
    }

    #[test]
    fn reserved_device_names_are_escaped() {
        assert_eq!(sanitize("CON"), "CON_");
        assert_eq!(sanitize("nul"), "nul_");
        assert_eq!(sanitize("Com1."), "Com1_");
        assert_eq!(sanitize("aux.live"), "aux_.live");
        assert_eq!(sanitize("Console"), "Console");
        assert_eq!(sanitize("COM10"), "COM10");

        let mut record = record(1);
        record.artist = Some("Prn".to_owned());
        assert!(derive(&record).unwrap().starts_with("Prn_/Album (Album)"));
    }

    #[test]
    fn album_title_defaults() {
        let mut record = record(1);
        record.album_title = Some("???".to_owned());
        let path = derive(&record).unwrap();
        assert!(path.starts_with("Artist/Unknown Album (Album)"));

        record.album_title = None;
        assert!(derive(&record).unwrap().starts_with("Artist/Unknown Album (Album)"));
    }

    #[test]
    fn required_fields_fail_loudly() {
        let mut missing_artist = record(1);
        missing_artist.artist = None;
        assert_eq!(derive(&missing_artist), Err(FieldError::Missing("artist")));

        let mut empty_title = record(1);
        empty_title.title = Some("***".to_owned());
        assert!(matches!(
            derive(&empty_title),
            Err(FieldError::Invalid { field: "title", .. })
        ));

        let mut no_quality = record(1);
        no_quality.quality = None;
        assert_eq!(derive(&no_quality), Err(FieldError::Missing("quality")));

        let mut no_type = record(1);
        no_type.album_type = None;
        assert_eq!(derive(&no_type), Err(FieldError::Missing("album type")));
    }

    #[test]
    fn derivation_is_deterministic() {
        let record = record(3);
        assert_eq!(derive(&record), derive(&record));
        assert_eq!(
            save_location(Path::new("/music"), &record).unwrap(),
            PathBuf::from("/music/Artist/Album (Album)/Disc 02/03 - Song.mp3")
        );
    }

    #[test]
    fn pads_to_two_digits() {
        assert_eq!(pad(3), "03");
        assert_eq!(pad(12), "12");
        assert_eq!(pad(101), "101");
    }
}
