//! Catalog search results.
//!
//! The search page groups results by kind, each as `{ "count", "data" }`:
//!
//! ```json
//! {
//!     "TRACK": { "count": 1, "data": [{ "SNG_ID": "3135553", "SNG_TITLE": "...", "ARTISTS": [...] }] },
//!     "ALBUM": { "count": 0, "data": [] },
//!     "ARTIST": { "count": 0, "data": [] }
//! }
//! ```
//!
//! Results keep their raw JSON so a track result can be fed straight into
//! the download pipeline without fetching it again.

use std::{fmt, str::FromStr};

use serde_json::{Map, Value};

use crate::{error::Error, protocol};

/// Maximum number of results returned per search.
pub const MAX_RESULTS: usize = 10;

/// Kind of catalog item to search for.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "binary", derive(clap::ValueEnum))]
pub enum SearchKind {
    Track,
    Album,
    Artist,
}

impl SearchKind {
    /// Key of this kind's section in the search page.
    #[must_use]
    pub fn section(self) -> &'static str {
        match self {
            Self::Track => "TRACK",
            Self::Album => "ALBUM",
            Self::Artist => "ARTIST",
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Track => write!(f, "track"),
            Self::Album => write!(f, "album"),
            Self::Artist => write!(f, "artist"),
        }
    }
}

impl FromStr for SearchKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "track" => Ok(Self::Track),
            "album" => Ok(Self::Album),
            "artist" => Ok(Self::Artist),
            _ => Err(Error::invalid_argument(format!("unknown search kind: {s}"))),
        }
    }
}

/// One search hit.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchResult {
    Track {
        id: u64,
        title: String,
        artists: Vec<String>,
        raw: Value,
    },
    Album {
        id: u64,
        title: String,
        artists: Vec<String>,
        raw: Value,
    },
    Artist {
        id: u64,
        name: String,
        raw: Value,
    },
}

impl SearchResult {
    #[must_use]
    pub fn id(&self) -> u64 {
        match self {
            Self::Track { id, .. } | Self::Album { id, .. } | Self::Artist { id, .. } => *id,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Track { title, .. } | Self::Album { title, .. } => title,
            Self::Artist { name, .. } => name,
        }
    }

    /// Credited artists; `None` for artist results.
    #[must_use]
    pub fn artists(&self) -> Option<&[String]> {
        match self {
            Self::Track { artists, .. } | Self::Album { artists, .. } => Some(artists),
            Self::Artist { .. } => None,
        }
    }

    /// The JSON fragment this result was parsed from.
    #[must_use]
    pub fn raw(&self) -> &Value {
        match self {
            Self::Track { raw, .. } | Self::Album { raw, .. } | Self::Artist { raw, .. } => raw,
        }
    }

    #[must_use]
    pub fn kind(&self) -> SearchKind {
        match self {
            Self::Track { .. } => SearchKind::Track,
            Self::Album { .. } => SearchKind::Album,
            Self::Artist { .. } => SearchKind::Artist,
        }
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id(), self.title())?;
        if let Some(artists) = self.artists().filter(|artists| !artists.is_empty()) {
            write!(f, " - {}", artists.join(", "))?;
        }
        Ok(())
    }
}

fn string(item: &Value, key: &str) -> Option<String> {
    item.get(key)?.as_str().map(ToOwned::to_owned)
}

fn artists(item: &Value) -> Vec<String> {
    item.get("ARTISTS")
        .and_then(Value::as_array)
        .map(|artists| {
            artists
                .iter()
                .filter_map(|artist| string(artist, "ART_NAME"))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_item(item: &Value, kind: SearchKind) -> Option<SearchResult> {
    let result = match kind {
        SearchKind::Track => SearchResult::Track {
            id: item.get("SNG_ID").and_then(protocol::lenient_u64)?,
            title: string(item, "SNG_TITLE")?,
            artists: artists(item),
            raw: item.clone(),
        },
        SearchKind::Album => SearchResult::Album {
            id: item.get("ALB_ID").and_then(protocol::lenient_u64)?,
            title: string(item, "ALB_TITLE")?,
            artists: artists(item),
            raw: item.clone(),
        },
        SearchKind::Artist => SearchResult::Artist {
            id: item.get("ART_ID").and_then(protocol::lenient_u64)?,
            name: string(item, "ART_NAME")?,
            raw: item.clone(),
        },
    };

    Some(result)
}

/// Reads up to [`MAX_RESULTS`] results of `kind` from a search page.
///
/// A missing section, a zero count and items without an id or title all
/// yield fewer (or no) results rather than an error.
#[must_use]
pub fn parse(page: &Map<String, Value>, kind: SearchKind) -> Vec<SearchResult> {
    let Some(section) = page.get(kind.section()) else {
        return Vec::new();
    };

    let count = section.get("count").and_then(protocol::lenient_u64).unwrap_or_default();
    if count == 0 {
        return Vec::new();
    }

    section
        .get("data")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .take(MAX_RESULTS)
        .filter_map(|item| {
            let result = parse_item(item, kind);
            if result.is_none() {
                trace!("skipping unreadable {kind} result: {item}");
            }
            result
        })
        .collect()
}
