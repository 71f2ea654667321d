//! Track, album and search pages from Deezer's gateway API.
//!
//! Page methods return the same documents the web player renders from. Track
//! documents are kept as raw JSON maps: their set of fields varies between
//! tracks and releases, and quality negotiation scans them for `FILESIZE_*`
//! keys. Album and playlist headers are typed, as only a handful of their
//! fields are used.
//!
//! # Wire Format
//!
//! `deezer.pageAlbum`:
//! ```json
//! {
//!     "DATA": {
//!         "ALB_ID": "302127",
//!         "ALB_TITLE": "Discovery",
//!         "ART_NAME": "Daft Punk",
//!         "UPC": "724384960650",
//!         "PHYSICAL_RELEASE_DATE": "2001-03-07",
//!         "LABEL_NAME": "Parlophone (France)"
//!     },
//!     "SONGS": {
//!         "data": [{ "SNG_ID": "3135553", "DISK_NUMBER": "1", ... }],
//!         "count": 14
//!     }
//! }
//! ```
//!
//! `deezer.pagePlaylist` has the same shape with a playlist header in `DATA`.
//! `album.getDiscography` answers with a paginated list of album headers.

use serde::Deserialize;
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnError, DisplayFromStr, NoneAsEmptyString, PickFirst};

use super::Method;
use crate::protocol;

impl Method for TrackPage {
    const METHOD: &'static str = "deezer.pageTrack";
}

impl Method for AlbumPage {
    const METHOD: &'static str = "deezer.pageAlbum";
}

impl Method for PlaylistPage {
    const METHOD: &'static str = "deezer.pagePlaylist";
}

impl Method for AlbumData {
    const METHOD: &'static str = "album.getDiscography";
}

impl Method for SearchPage {
    const METHOD: &'static str = "deezer.pageSearch";
}

/// Song ids of a listing in order. Songs without a readable id are skipped.
fn song_ids(songs: Option<&SongList>) -> Vec<u64> {
    songs
        .iter()
        .flat_map(|songs| songs.data.iter())
        .filter_map(|song| song.get("SNG_ID").and_then(protocol::lenient_u64))
        .collect()
}

/// A track page: the raw track document.
#[derive(Clone, PartialEq, Deserialize, Debug)]
pub struct TrackPage {
    /// Track document with `SNG_*`, `ALB_*`, `ART_*` and `FILESIZE_*` fields
    #[serde(rename = "DATA")]
    pub data: Map<String, Value>,
}

/// An album page: header and song listing.
#[derive(Clone, PartialEq, Deserialize, Debug)]
pub struct AlbumPage {
    /// Album header
    #[serde(rename = "DATA")]
    pub data: AlbumData,

    /// Songs on the album, in disc and track order
    #[serde(default, rename = "SONGS")]
    pub songs: Option<SongList>,
}

impl AlbumPage {
    /// Disc number of the last song listed, if it has one.
    #[must_use]
    pub fn last_disc_number(&self) -> Option<u64> {
        self.songs
            .as_ref()?
            .data
            .last()?
            .get("DISK_NUMBER")
            .and_then(protocol::lenient_u64)
    }

    /// Number of songs reported for the album.
    #[must_use]
    pub fn track_count(&self) -> Option<u64> {
        self.songs.as_ref()?.count
    }

    /// Song ids in listing order. Songs without a readable id are skipped.
    #[must_use]
    pub fn song_ids(&self) -> Vec<u64> {
        song_ids(self.songs.as_ref())
    }
}

/// A playlist page: header and song listing.
#[derive(Clone, PartialEq, Deserialize, Debug)]
pub struct PlaylistPage {
    #[serde(rename = "DATA")]
    pub data: PlaylistData,

    /// Songs in playlist order
    #[serde(default, rename = "SONGS")]
    pub songs: Option<SongList>,
}

impl PlaylistPage {
    #[must_use]
    pub fn song_ids(&self) -> Vec<u64> {
        song_ids(self.songs.as_ref())
    }
}

/// Playlist header fields.
#[serde_as]
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Debug)]
pub struct PlaylistData {
    #[serde(default, rename = "PLAYLIST_ID")]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub id: Option<u64>,

    #[serde(default, rename = "TITLE")]
    #[serde_as(as = "DefaultOnError<NoneAsEmptyString>")]
    pub title: Option<String>,
}

/// Album header fields, as found on album pages and in discographies.
#[serde_as]
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Debug)]
pub struct AlbumData {
    #[serde(default, rename = "ALB_ID")]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub id: Option<u64>,

    #[serde(default, rename = "ALB_TITLE")]
    #[serde_as(as = "DefaultOnError<NoneAsEmptyString>")]
    pub title: Option<String>,

    #[serde(default, rename = "ART_NAME")]
    #[serde_as(as = "DefaultOnError<NoneAsEmptyString>")]
    pub artist: Option<String>,

    #[serde(default, rename = "UPC")]
    #[serde_as(as = "DefaultOnError<NoneAsEmptyString>")]
    pub upc: Option<String>,

    #[serde(default, rename = "PHYSICAL_RELEASE_DATE")]
    #[serde_as(as = "DefaultOnError<NoneAsEmptyString>")]
    pub release_date: Option<String>,

    #[serde(default, rename = "LABEL_NAME")]
    #[serde_as(as = "DefaultOnError<NoneAsEmptyString>")]
    pub label: Option<String>,

    #[serde(default, rename = "ALB_PICTURE")]
    #[serde_as(as = "DefaultOnError<NoneAsEmptyString>")]
    pub picture: Option<String>,
}

/// Song listing of an album or playlist page.
#[serde_as]
#[derive(Clone, Default, PartialEq, Deserialize, Debug)]
pub struct SongList {
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,

    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub count: Option<u64>,
}

/// A search page: one `{ "count", "data" }` section per result kind, keyed
/// `TRACK`, `ALBUM`, `ARTIST` and so on.
#[derive(Clone, PartialEq, Deserialize, Debug)]
#[serde(transparent)]
pub struct SearchPage(pub Map<String, Value>);
