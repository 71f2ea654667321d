//! Types for Deezer's public REST API at `api.deezer.com`.
//!
//! The public API needs no session and is only used to fill in metadata the
//! gateway does not return: album record types, genres and track tempo.
//! Errors come back with a success status and an `error` object in place of
//! the resource, which [`ApiError`] captures.

use serde::Deserialize;
use serde_with::{serde_as, DefaultOnError};

/// Base URL of the public API.
pub const BASE_URL: &str = "https://api.deezer.com";

/// Error object returned in place of a resource.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Debug)]
pub struct ApiError {
    #[serde(default, rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub code: i64,
}

/// Body of a failed public API call.
#[derive(Clone, PartialEq, Eq, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: ApiError,
}

/// An album resource (`/album/{id}`).
#[serde_as]
#[derive(Clone, Default, PartialEq, Deserialize, Debug)]
pub struct Album {
    /// `album`, `ep`, `single` or `compile`
    #[serde(default)]
    pub record_type: Option<String>,

    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub genres: Option<Genres>,
}

impl Album {
    /// Genre names in the order listed.
    #[must_use]
    pub fn genre_names(&self) -> Vec<String> {
        self.genres
            .iter()
            .flat_map(|genres| genres.data.iter())
            .map(|genre| genre.name.clone())
            .filter(|name| !name.is_empty())
            .collect()
    }
}

#[derive(Clone, Default, PartialEq, Eq, Deserialize, Debug)]
pub struct Genres {
    #[serde(default)]
    pub data: Vec<Genre>,
}

#[derive(Clone, Default, PartialEq, Eq, Deserialize, Debug)]
pub struct Genre {
    #[serde(default)]
    pub name: String,
}

/// A track resource (`/track/{id}`).
#[serde_as]
#[derive(Copy, Clone, Default, PartialEq, Deserialize, Debug)]
pub struct Track {
    /// Beats per minute, 0 when unknown
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub bpm: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn album_genres() {
        let album: Album = serde_json::from_value(json!({
            "id": 302_127,
            "record_type": "album",
            "genres": { "data": [{ "id": 113, "name": "Dance" }, { "name": "" }] }
        }))
        .unwrap();

        assert_eq!(album.record_type.as_deref(), Some("album"));
        assert_eq!(album.genre_names(), vec!["Dance".to_owned()]);
    }

    #[test]
    fn error_body() {
        let body: ErrorBody = serde_json::from_value(json!({
            "error": { "type": "DataException", "message": "no data", "code": 800 }
        }))
        .unwrap();
        assert_eq!(body.error.code, 800);

        assert!(serde_json::from_value::<ErrorBody>(json!({ "bpm": 120 })).is_err());
    }

    #[test]
    fn track_bpm() {
        let track: Track = serde_json::from_value(json!({ "bpm": 123.4 })).unwrap();
        assert_eq!(track.bpm, Some(123.4));

        let track: Track = serde_json::from_value(json!({ "bpm": "fast" })).unwrap();
        assert_eq!(track.bpm, None);
    }
}
