//! Gateway API types for Deezer's internal web services.
//!
//! The gateway is a JSON-RPC-like endpoint (`gw-light.php`) where the method
//! name travels in the query string and the parameters in the body. Each
//! type implementing [`Method`] is the `results` payload of one method:
//!
//! * [`UserData`] - session bootstrap (`deezer.getUserData`)
//! * [`TrackPage`] - one track (`deezer.pageTrack`)
//! * [`AlbumPage`] - one album and its songs (`deezer.pageAlbum`)
//! * [`PlaylistPage`] - one playlist and its songs (`deezer.pagePlaylist`)
//! * [`AlbumData`] - an artist's albums (`album.getDiscography`)
//! * [`SearchPage`] - search results (`deezer.pageSearch`)
//!
//! # Response envelope
//!
//! ```json
//! {
//!     "error": {},
//!     "results": { ... }
//! }
//! ```
//!
//! `error` is an empty array on success and a map of error codes to
//! messages on failure. `results` is either a single object, an array, or a
//! paginated set of items.

pub mod page;
pub mod user_data;

pub use page::{AlbumData, AlbumPage, PlaylistPage, SearchPage, SongList, TrackPage};
pub use user_data::UserData;

use std::collections::HashMap;

use serde::Deserialize;
use serde_with::{serde_as, PickFirst};

/// Defines a gateway API method identifier.
///
/// # Examples
///
/// ```rust
/// use deezload::protocol::gateway::{Method, UserData};
///
/// assert_eq!(UserData::METHOD, "deezer.getUserData");
/// ```
pub trait Method {
    /// The gateway API method name, in Deezer's dot-notation.
    const METHOD: &'static str;
}

/// Response from a Deezer gateway API endpoint.
#[serde_as]
#[derive(Clone, PartialEq, Deserialize, Debug)]
#[serde(untagged)]
pub enum Response<T> {
    /// Paginated response with result counts
    Paginated {
        /// API status information
        #[serde(default)]
        #[serde_as(as = "PickFirst<(_, serde_with::Seq<(_, _)>)>")]
        error: HashMap<String, serde_json::Value>,
        /// Paginated result set
        results: Paginated<T>,
    },

    /// Direct response with results array
    Unpaginated {
        /// API status information
        #[serde(default)]
        #[serde_as(as = "PickFirst<(_, serde_with::Seq<(_, _)>)>")]
        error: HashMap<String, serde_json::Value>,
        /// Result items (single item or array)
        #[serde_as(as = "serde_with::OneOrMany<_>")]
        results: Vec<T>,
    },
}

impl<T> Response<T> {
    /// Returns the first result item, if any.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.all().first()
    }

    /// Consumes the response and returns its first result item, if any.
    #[must_use]
    pub fn into_first(self) -> Option<T> {
        let results = match self {
            Self::Paginated { results, .. } => results.data,
            Self::Unpaginated { results, .. } => results,
        };
        results.into_iter().next()
    }

    /// Returns all result items as a slice.
    #[must_use]
    pub fn all(&self) -> &[T] {
        match self {
            Self::Paginated { results, .. } => &results.data,
            Self::Unpaginated { results, .. } => results,
        }
    }

    /// Error codes and messages reported by the gateway.
    #[must_use]
    pub fn errors(&self) -> &HashMap<String, serde_json::Value> {
        match self {
            Self::Paginated { error, .. } | Self::Unpaginated { error, .. } => error,
        }
    }
}

/// Paginated result set from the Deezer gateway API.
#[derive(Clone, PartialEq, Deserialize, Debug)]
pub struct Paginated<T> {
    /// Items in this page of results
    pub data: Vec<T>,
    /// Number of items in this page
    pub count: u64,
    /// Total number of items available
    pub total: u64,
    /// Number of items matching applied filters
    pub filtered_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn accepts_empty_error_array() {
        let response: Response<Value> =
            serde_json::from_value(json!({ "error": [], "results": { "DATA": {} } })).unwrap();
        assert!(response.errors().is_empty());
        assert_eq!(response.first(), Some(&json!({ "DATA": {} })));
    }

    #[test]
    fn keeps_error_map() {
        let response: Response<TrackPage> = serde_json::from_value(json!({
            "error": { "DATA_ERROR": "song_id" },
            "results": []
        }))
        .unwrap();
        assert_eq!(response.errors()["DATA_ERROR"], json!("song_id"));
        assert!(response.into_first().is_none());
    }
}
