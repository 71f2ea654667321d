//! The canonical record of one track and how it is assembled.
//!
//! A [`TrackRecord`] starts out from the track document of the internal API
//! and is then enriched by three passes, each consuming the record and
//! returning the updated one:
//!
//! 1. [`TrackRecord::with_album`] from the internal album page
//! 2. [`TrackRecord::with_public_album`] from the public album resource
//! 3. [`TrackRecord::with_public_track`] from the public track resource
//!
//! Some fields are only filled in when still absent (UPC, release date,
//! artist). Others are always replaced when the source has them (label,
//! track count, disc count, record type, genres, BPM). Running a pass twice
//! with the same source therefore gives the same record as running it once.

use serde::Deserialize;
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnError, DisplayFromStr, NoneAsEmptyString, PickFirst};
use thiserror::Error;
use veil::Redact;

use crate::{
    protocol::{self, gateway::AlbumPage, public},
    quality::EncodingOption,
};

/// A field needed to process a track is absent or unusable.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid {field}: {value:?}")]
    Invalid { field: &'static str, value: String },
}

/// Everything known about one track.
#[derive(Clone, PartialEq, Redact)]
pub struct TrackRecord {
    pub id: u64,
    pub title: Option<String>,
    pub artist: Option<String>,

    pub album_id: Option<u64>,
    pub album_title: Option<String>,
    pub album_picture: Option<String>,

    /// Record type such as `album`, `ep` or `single`
    pub album_type: Option<String>,

    pub disc_number: Option<u32>,
    pub disc_count: Option<u32>,
    pub track_number: Option<u32>,
    pub track_count: Option<u32>,

    pub release_date: Option<String>,
    pub genres: Vec<String>,
    pub bpm: Option<f64>,
    pub upc: Option<String>,
    pub label: Option<String>,

    /// Encoding selected for download
    pub quality: Option<EncodingOption>,

    /// Per-track token for media URL requests
    #[redact]
    pub track_token: Option<String>,
}

/// Fields read from a track document. Unusable values read as absent.
#[serde_as]
#[derive(Default, Deserialize)]
struct Document {
    #[serde(default, rename = "SNG_TITLE")]
    #[serde_as(as = "DefaultOnError<NoneAsEmptyString>")]
    title: Option<String>,

    #[serde(default, rename = "ART_NAME")]
    #[serde_as(as = "DefaultOnError<NoneAsEmptyString>")]
    artist: Option<String>,

    #[serde(default, rename = "ALB_ID")]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    album_id: Option<u64>,

    #[serde(default, rename = "ALB_TITLE")]
    #[serde_as(as = "DefaultOnError<Option<_>>")]
    album_title: Option<String>,

    #[serde(default, rename = "ALB_PICTURE")]
    #[serde_as(as = "DefaultOnError<NoneAsEmptyString>")]
    album_picture: Option<String>,

    #[serde(default, rename = "DISK_NUMBER")]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    disc_number: Option<u32>,

    #[serde(default, rename = "TRACK_NUMBER")]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    track_number: Option<u32>,

    #[serde(default, rename = "PHYSICAL_RELEASE_DATE")]
    #[serde_as(as = "DefaultOnError<NoneAsEmptyString>")]
    release_date: Option<String>,

    #[serde(default, rename = "UPC")]
    #[serde_as(as = "DefaultOnError<NoneAsEmptyString>")]
    upc: Option<String>,

    #[serde(default, rename = "TRACK_TOKEN")]
    #[serde_as(as = "DefaultOnError<NoneAsEmptyString>")]
    track_token: Option<String>,
}

impl TrackRecord {
    /// Builds a record from an internal API track document.
    ///
    /// # Errors
    ///
    /// Fails if `SNG_ID` is absent or not a number. Every other field is
    /// optional at this point and checked where it is used.
    pub fn from_data(data: &Map<String, Value>) -> Result<Self, FieldError> {
        let raw_id = data.get("SNG_ID").ok_or(FieldError::Missing("SNG_ID"))?;
        let id = protocol::lenient_u64(raw_id).ok_or_else(|| FieldError::Invalid {
            field: "SNG_ID",
            value: raw_id.to_string(),
        })?;

        let document = Document::deserialize(Value::Object(data.clone())).unwrap_or_else(|e| {
            debug!("track {id}: unreadable document ({e})");
            Document::default()
        });

        Ok(Self {
            id,
            title: document.title,
            artist: document.artist,
            album_id: document.album_id,
            album_title: document.album_title,
            album_picture: document.album_picture,
            album_type: None,
            disc_number: document.disc_number,
            disc_count: None,
            track_number: document.track_number,
            track_count: None,
            release_date: document.release_date,
            genres: Vec::new(),
            bpm: None,
            upc: document.upc,
            label: None,
            quality: None,
            track_token: document.track_token,
        })
    }

    /// Merges the internal album page.
    #[must_use]
    pub fn with_album(mut self, album: &AlbumPage) -> Self {
        let header = &album.data;

        if self.upc.is_none() {
            self.upc.clone_from(&header.upc);
        }
        if self.release_date.is_none() {
            self.release_date.clone_from(&header.release_date);
        }
        if self.artist.is_none() {
            self.artist.clone_from(&header.artist);
        }

        if let Some(discs) = album.last_disc_number() {
            self.disc_count = u32::try_from(discs).ok();
        }
        if let Some(label) = &header.label {
            self.label = Some(label.clone());
        }
        if let Some(count) = album.track_count() {
            self.track_count = u32::try_from(count).ok();
        }

        self
    }

    /// Merges the public album resource.
    #[must_use]
    pub fn with_public_album(mut self, album: &public::Album) -> Self {
        if let Some(record_type) = &album.record_type {
            self.album_type = Some(record_type.clone());
        }

        let genres = album.genre_names();
        if !genres.is_empty() {
            self.genres = genres;
        }

        self
    }

    /// Merges the public track resource.
    #[must_use]
    pub fn with_public_track(mut self, track: &public::Track) -> Self {
        if let Some(bpm) = track.bpm {
            self.bpm = Some(bpm);
        }

        self
    }

    /// Records the encoding selected for download.
    #[must_use]
    pub fn with_quality(mut self, quality: EncodingOption) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Title for progress labels and logs.
    #[must_use]
    pub fn display_title(&self) -> String {
        match (&self.artist, &self.title) {
            (Some(artist), Some(title)) => format!("{artist} - {title}"),
            (None, Some(title)) => title.clone(),
            _ => format!("track {}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::Tier;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("fixture must be an object"),
        }
    }

    fn record() -> TrackRecord {
        TrackRecord::from_data(&data(json!({
            "SNG_ID": "3135553",
            "SNG_TITLE": "One More Time",
            "ART_NAME": "Daft Punk",
            "ALB_ID": "302127",
            "ALB_TITLE": "Discovery",
            "ALB_PICTURE": "2e018122cb56986277102d2041a592c8",
            "DISK_NUMBER": "1",
            "TRACK_NUMBER": 1,
            "TRACK_TOKEN": "token",
            "UPC": ""
        })))
        .unwrap()
    }

    fn album() -> AlbumPage {
        serde_json::from_value(json!({
            "DATA": {
                "ART_NAME": "Someone Else",
                "UPC": "724384960650",
                "PHYSICAL_RELEASE_DATE": "2001-03-07",
                "LABEL_NAME": "Parlophone"
            },
            "SONGS": {
                "data": [{ "DISK_NUMBER": "1" }, { "DISK_NUMBER": "2" }],
                "count": 14
            }
        }))
        .unwrap()
    }

    #[test]
    fn reads_track_document() {
        let record = record();
        assert_eq!(record.id, 3_135_553);
        assert_eq!(record.title.as_deref(), Some("One More Time"));
        assert_eq!(record.album_id, Some(302_127));
        assert_eq!(record.disc_number, Some(1));
        assert_eq!(record.track_number, Some(1));
        assert_eq!(record.upc, None);
        assert_eq!(record.display_title(), "Daft Punk - One More Time");
    }

    #[test]
    fn track_id_is_required() {
        let missing = TrackRecord::from_data(&data(json!({ "SNG_TITLE": "x" })));
        assert_eq!(missing, Err(FieldError::Missing("SNG_ID")));

        let invalid = TrackRecord::from_data(&data(json!({ "SNG_ID": "abc" })));
        assert!(matches!(invalid, Err(FieldError::Invalid { field: "SNG_ID", .. })));
    }

    #[test]
    fn unusable_fields_read_as_absent() {
        let record = TrackRecord::from_data(&data(json!({
            "SNG_ID": 1,
            "DISK_NUMBER": "one",
            "SNG_TITLE": 5
        })))
        .unwrap();

        assert_eq!(record.disc_number, None);
        assert_eq!(record.title, None);
    }

    #[test]
    fn album_merge_respects_conditional_fields() {
        let merged = record().with_album(&album());

        assert_eq!(merged.artist.as_deref(), Some("Daft Punk"));
        assert_eq!(merged.upc.as_deref(), Some("724384960650"));
        assert_eq!(merged.release_date.as_deref(), Some("2001-03-07"));
        assert_eq!(merged.label.as_deref(), Some("Parlophone"));
        assert_eq!(merged.disc_count, Some(2));
        assert_eq!(merged.track_count, Some(14));
    }

    #[test]
    fn album_merge_overwrites_unconditional_fields() {
        let mut record = record();
        record.label = Some("Virgin".to_owned());
        record.disc_count = Some(5);
        record.upc = Some("000".to_owned());

        let merged = record.with_album(&album());
        assert_eq!(merged.label.as_deref(), Some("Parlophone"));
        assert_eq!(merged.disc_count, Some(2));
        assert_eq!(merged.upc.as_deref(), Some("000"));
    }

    #[test]
    fn merges_are_idempotent() {
        let album = album();
        let public_album: public::Album = serde_json::from_value(json!({
            "record_type": "ep",
            "genres": { "data": [{ "name": "Dance" }] }
        }))
        .unwrap();
        let public_track = public::Track { bpm: Some(123.0) };

        let once = record()
            .with_album(&album)
            .with_public_album(&public_album)
            .with_public_track(&public_track);
        let twice = once
            .clone()
            .with_album(&album)
            .with_public_album(&public_album)
            .with_public_track(&public_track);

        assert_eq!(once, twice);
        assert_eq!(once.album_type.as_deref(), Some("ep"));
        assert_eq!(once.genres, vec!["Dance".to_owned()]);
        assert_eq!(once.bpm, Some(123.0));
    }

    #[test]
    fn empty_public_sources_keep_values() {
        let mut record = record();
        record.genres = vec!["House".to_owned()];
        record.album_type = Some("album".to_owned());
        record.bpm = Some(100.0);

        let merged = record
            .with_public_album(&public::Album::default())
            .with_public_track(&public::Track::default());

        assert_eq!(merged.genres, vec!["House".to_owned()]);
        assert_eq!(merged.album_type.as_deref(), Some("album"));
        assert_eq!(merged.bpm, Some(100.0));
    }

    #[test]
    fn records_quality() {
        let option = EncodingOption { tier: Tier::Flac, size: 1 };
        assert_eq!(record().with_quality(option).quality, Some(option));
    }
}
