//! Media URL resolution at `media.deezer.com`.
//!
//! A track's download URL is obtained by presenting the session's license
//! token together with the track's own `TRACK_TOKEN`, asking for exactly one
//! format.
//!
//! # Wire Format
//!
//! Request:
//! ```json
//! {
//!     "license_token": "secret",
//!     "media": [{
//!         "type": "FULL",
//!         "formats": [{ "cipher": "BF_CBC_STRIPE", "format": "FLAC" }]
//!     }],
//!     "track_tokens": ["token"]
//! }
//! ```
//!
//! Response:
//! ```json
//! {
//!     "data": [{
//!         "media": [{
//!             "media_type": "FULL",
//!             "cipher": { "type": "BF_CBC_STRIPE" },
//!             "format": "FLAC",
//!             "sources": [{ "url": "https://...", "provider": "ak" }],
//!             "nbf": 1234567890,
//!             "exp": 1234599999
//!         }]
//!     }]
//! }
//! ```

use std::{fmt, time::SystemTime};

use serde::{Deserialize, Serialize};
use serde_with::{formats::Flexible, serde_as, TimestampSeconds};
use url::Url;
use veil::Redact;

use crate::{
    error::{self, Result},
    quality::Tier,
};

/// Endpoint for media URL requests.
pub const URL: &str = "https://media.deezer.com/v1/get_url";

/// Media URL request for a single track.
#[derive(Clone, Eq, PartialEq, Serialize, Redact, Hash)]
pub struct Request {
    #[redact]
    pub license_token: String,

    pub media: Vec<Media>,

    #[redact]
    pub track_tokens: Vec<String>,
}

impl Request {
    /// Requests the full, encrypted track at `tier`.
    #[must_use]
    pub fn new(license_token: &str, track_token: &str, tier: Tier) -> Self {
        Self {
            license_token: license_token.to_owned(),
            media: vec![Media {
                typ: Type::FULL,
                cipher_formats: vec![CipherFormat {
                    cipher: Cipher::BF_CBC_STRIPE,
                    format: tier.into(),
                }],
            }],
            track_tokens: vec![track_token.to_owned()],
        }
    }
}

/// Requested media type with acceptable format and cipher combinations.
#[derive(Clone, Default, Eq, PartialEq, Serialize, Debug, Hash)]
pub struct Media {
    #[serde(rename = "type")]
    pub typ: Type,

    #[serde(rename = "formats")]
    pub cipher_formats: Vec<CipherFormat>,
}

/// Full track or preview clip.
#[derive(Copy, Clone, Default, Eq, PartialEq, Deserialize, Serialize, Debug, Hash)]
pub enum Type {
    #[default]
    FULL,
    PREVIEW,
}

#[derive(Copy, Clone, Default, Eq, PartialEq, Deserialize, Serialize, Debug, Hash)]
pub struct CipherFormat {
    pub cipher: Cipher,
    pub format: Format,
}

/// Content encryption method.
#[derive(Copy, Clone, Default, Eq, PartialEq, Deserialize, Serialize, Debug, Hash)]
#[expect(non_camel_case_types)]
pub enum Cipher {
    /// Blowfish CBC on every third 2048-byte block
    #[default]
    BF_CBC_STRIPE,
    NONE,
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Audio format names as used by the media service.
#[derive(Copy, Clone, Default, Eq, PartialEq, Deserialize, Serialize, Debug, Hash)]
#[expect(non_camel_case_types)]
pub enum Format {
    #[default]
    MP3_128,
    MP3_256,
    MP3_320,
    FLAC,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<Tier> for Format {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Mp3_128 => Format::MP3_128,
            Tier::Mp3_256 => Format::MP3_256,
            Tier::Mp3_320 => Format::MP3_320,
            Tier::Flac => Format::FLAC,
        }
    }
}

/// Media URL response.
#[derive(Clone, Default, Eq, PartialEq, Deserialize, Debug, Hash)]
pub struct Response {
    #[serde(default)]
    pub data: Vec<Data>,
}

impl Response {
    /// The first medium of the response.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the service reported errors for the track or
    /// returned no media at all.
    pub fn into_medium(self) -> Result<Medium> {
        match self.data.into_iter().next() {
            Some(Data::Media { media }) => media
                .into_iter()
                .next()
                .ok_or_else(|| error::Error::not_found("no media for track")),
            Some(Data::Errors { errors }) => {
                let errors: Vec<_> = errors.iter().map(ToString::to_string).collect();
                Err(error::Error::not_found(errors.join(", ")))
            }
            None => Err(error::Error::not_found("empty media response")),
        }
    }
}

/// Either media for a track or the reasons none is available.
#[derive(Clone, Eq, PartialEq, Deserialize, Debug, Hash)]
#[serde(untagged)]
pub enum Data {
    Media { media: Vec<Medium> },
    Errors { errors: Vec<Error> },
}

/// Media service error.
#[derive(Clone, Eq, Default, PartialEq, Deserialize, Debug, Hash)]
pub struct Error {
    #[serde(default)]
    pub code: i64,

    #[serde(default)]
    pub message: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// A downloadable encoding of a track and where to get it.
#[serde_as]
#[derive(Clone, Eq, PartialEq, Deserialize, Debug, Hash)]
pub struct Medium {
    #[serde(default)]
    pub media_type: Type,

    #[serde(default)]
    pub cipher: CipherType,

    #[serde(default)]
    pub format: Format,

    #[serde(default)]
    pub sources: Vec<Source>,

    /// Start of validity period
    #[serde(rename = "nbf")]
    #[serde_as(as = "TimestampSeconds<i64, Flexible>")]
    pub not_before: SystemTime,

    /// End of validity period
    #[serde(rename = "exp")]
    #[serde_as(as = "TimestampSeconds<i64, Flexible>")]
    pub expiry: SystemTime,
}

impl Medium {
    /// Whether the URLs may be used at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: SystemTime) -> bool {
        self.not_before <= now && now < self.expiry
    }

    /// URL of the first listed source.
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        self.sources.first().map(|source| &source.url)
    }
}

#[derive(Copy, Clone, Default, Eq, PartialEq, Deserialize, Debug, Hash)]
pub struct CipherType {
    #[serde(rename = "type")]
    pub typ: Cipher,
}

/// Download location of a medium.
#[derive(Clone, Eq, PartialEq, Deserialize, Redact, Hash)]
pub struct Source {
    #[redact]
    pub url: Url,

    #[serde(default)]
    pub provider: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn request_asks_for_one_format() {
        let request = Request::new("license", "track", Tier::Mp3_256);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "license_token": "license",
                "media": [{
                    "type": "FULL",
                    "formats": [{ "cipher": "BF_CBC_STRIPE", "format": "MP3_256" }]
                }],
                "track_tokens": ["track"]
            })
        );
    }

    #[test]
    fn response_yields_first_medium() {
        let response: Response = serde_json::from_value(json!({
            "data": [{
                "media": [{
                    "media_type": "FULL",
                    "cipher": { "type": "BF_CBC_STRIPE" },
                    "format": "FLAC",
                    "sources": [{ "url": "https://cdn.example/a", "provider": "ak" }],
                    "nbf": 100,
                    "exp": "200"
                }]
            }]
        }))
        .unwrap();

        let medium = response.into_medium().unwrap();
        assert_eq!(medium.format, Format::FLAC);
        assert_eq!(medium.url().map(Url::as_str), Some("https://cdn.example/a"));

        let at = |secs| SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
        assert!(medium.is_valid_at(at(150)));
        assert!(!medium.is_valid_at(at(99)));
        assert!(!medium.is_valid_at(at(200)));
    }

    #[test]
    fn response_errors_are_not_found() {
        let response: Response = serde_json::from_value(json!({
            "data": [{ "errors": [{ "code": 2002, "message": "Track token has no sufficient rights" }] }]
        }))
        .unwrap();

        let error = response.into_medium().unwrap_err();
        assert_eq!(error.kind, crate::error::ErrorKind::NotFound);
        assert!(error.to_string().contains("(2002)"));
    }
}
