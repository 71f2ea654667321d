//! Orchestration of track and album downloads.
//!
//! For each track the steps run strictly in order, never overlapping:
//!
//! 1. fetch the track document
//! 2. negotiate the encoding to download
//! 3. merge album and public metadata into the record
//! 4. derive the save location
//! 5. resolve the media URL and download the payload
//! 6. decrypt the payload and fetch cover art
//!
//! Any step that comes up empty skips the track with a log message. Only a
//! failed bootstrap ends the run.
//!
//! Albums, playlists and artists expand into tracks that go through the
//! same pipeline one after the other. An artist expands into the albums of
//! its discography.

use std::{
    fmt,
    path::PathBuf,
    str::FromStr,
    sync::LazyLock,
    time::SystemTime,
};

use regex_lite::Regex;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::{
    client::{AuthError, Client},
    config::Config,
    decrypt::{self, Key},
    error::{Error, Result},
    path,
    progress::ProgressSink,
    protocol::media::Cipher,
    quality::{self, Tier},
    search::SearchResult,
    track::TrackRecord,
};

/// A catalog item to download.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Link {
    Track(u64),
    Album(u64),
    Playlist(u64),
    Artist(u64),
}

static LINK_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?deezer\.[a-z.]+/(?:[a-z]{2}(?:-[a-z]{2})?/)?(\w+)/(\d+)")
        .expect("invalid regex")
});

impl Link {
    /// Parses a catalog URL such as `https://www.deezer.com/en/album/302127`,
    /// or a bare number, which is taken as a track id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for anything else, including URLs of
    /// unsupported item types such as podcast episodes.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Ok(id) = s.parse::<u64>() {
            return Ok(Self::Track(id));
        }

        let captures = LINK_URL
            .captures(s)
            .ok_or_else(|| Error::invalid_argument(format!("not a deezer link: {s}")))?;

        let id = captures[2].parse()?;
        match &captures[1] {
            "track" => Ok(Self::Track(id)),
            "album" => Ok(Self::Album(id)),
            "playlist" => Ok(Self::Playlist(id)),
            "artist" => Ok(Self::Artist(id)),
            other => Err(Error::invalid_argument(format!(
                "{other} links are not supported"
            ))),
        }
    }
}

impl FromStr for Link {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Track(id) => write!(f, "track {id}"),
            Self::Album(id) => write!(f, "album {id}"),
            Self::Playlist(id) => write!(f, "playlist {id}"),
            Self::Artist(id) => write!(f, "artist {id}"),
        }
    }
}

/// A downloaded track, ready to be written out.
pub struct Download {
    pub record: TrackRecord,

    /// Save location under the download root
    pub path: PathBuf,

    /// Decrypted audio payload
    pub audio: Vec<u8>,

    /// Album cover, empty when disabled or unavailable
    pub cover: Vec<u8>,
}

pub struct Downloader {
    client: Client,
    download_root: PathBuf,
    quality: Tier,
    bf_secret: Option<Key>,
    cover_art: bool,
}

impl Downloader {
    /// Creates a downloader with an unauthenticated client.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: Client::new(config)?,
            download_root: config.download_root.clone(),
            quality: config.quality,
            bf_secret: config.bf_secret,
            cover_art: config.cover_art,
        })
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Authenticates the session. Must succeed before anything is fetched.
    ///
    /// # Errors
    ///
    /// See [`Client::bootstrap`].
    pub async fn login(&mut self) -> std::result::Result<(), AuthError> {
        self.client.bootstrap().await
    }

    /// Downloads one track by id.
    ///
    /// Returns `None` if the track was skipped; the reason is logged.
    pub async fn track(&self, id: u64, sink: &mut dyn ProgressSink) -> Option<Download> {
        let Some(page) = self.client.track_page(id).await else {
            warn!("track {id}: metadata unavailable, skipping");
            return None;
        };

        self.process(&page.data, sink).await
    }

    /// Downloads everything `link` points to, handing off each track before
    /// fetching the next.
    ///
    /// Returns the number of tracks handed off, or `None` if `link` itself
    /// could not be resolved.
    pub async fn download<F>(
        &self,
        link: Link,
        sink: &mut dyn ProgressSink,
        mut handoff: F,
    ) -> Option<usize>
    where
        F: AsyncFnMut(Download),
    {
        match link {
            Link::Track(id) => {
                let download = self.track(id, sink).await?;
                handoff(download).await;
                Some(1)
            }
            Link::Album(id) => self.album_with(id, sink, &mut handoff).await,
            Link::Playlist(id) => self.playlist(id, sink, handoff).await,
            Link::Artist(id) => self.artist(id, sink, handoff).await,
        }
    }

    /// Downloads a search hit. Track hits go through the pipeline with the
    /// document they were found with, without fetching it again.
    pub async fn search_result<F>(
        &self,
        result: &SearchResult,
        sink: &mut dyn ProgressSink,
        mut handoff: F,
    ) -> Option<usize>
    where
        F: AsyncFnMut(Download),
    {
        match result {
            SearchResult::Track { raw, .. } => {
                let Some(data) = raw.as_object() else {
                    warn!("search result {}: not a track document", result.id());
                    return None;
                };
                let download = self.process(data, sink).await?;
                handoff(download).await;
                Some(1)
            }
            SearchResult::Album { id, .. } => self.album_with(*id, sink, &mut handoff).await,
            SearchResult::Artist { id, .. } => self.artist(*id, sink, handoff).await,
        }
    }

    /// Downloads every song of an album in listing order, handing each one
    /// off before fetching the next.
    ///
    /// Returns the number of tracks handed off, or `None` if the album page
    /// itself was unavailable.
    pub async fn album<F>(
        &self,
        id: u64,
        sink: &mut dyn ProgressSink,
        mut handoff: F,
    ) -> Option<usize>
    where
        F: AsyncFnMut(Download),
    {
        self.album_with(id, sink, &mut handoff).await
    }

    /// Downloads every song of a playlist in playlist order.
    ///
    /// Returns the number of tracks handed off, or `None` if the playlist
    /// page was unavailable.
    pub async fn playlist<F>(
        &self,
        id: u64,
        sink: &mut dyn ProgressSink,
        mut handoff: F,
    ) -> Option<usize>
    where
        F: AsyncFnMut(Download),
    {
        let Some(playlist) = self.client.playlist_page(id).await else {
            warn!("playlist {id}: metadata unavailable, skipping");
            return None;
        };

        let ids = playlist.song_ids();
        let title = playlist.data.title.as_deref().unwrap_or_default();
        info!("playlist {id}: {title} ({} tracks)", ids.len());

        Some(self.tracks(&ids, sink, &mut handoff).await)
    }

    /// Downloads every album of an artist's discography.
    ///
    /// Returns the number of tracks handed off over all albums, or `None` if
    /// the discography was unavailable.
    pub async fn artist<F>(
        &self,
        id: u64,
        sink: &mut dyn ProgressSink,
        mut handoff: F,
    ) -> Option<usize>
    where
        F: AsyncFnMut(Download),
    {
        let Some(albums) = self.client.discography(id).await else {
            warn!("artist {id}: discography unavailable, skipping");
            return None;
        };
        info!("artist {id}: {} albums", albums.len());

        let mut downloaded = 0;
        for album_id in albums.iter().filter_map(|album| album.id) {
            downloaded += self
                .album_with(album_id, sink, &mut handoff)
                .await
                .unwrap_or_default();
        }

        Some(downloaded)
    }

    async fn album_with<F>(
        &self,
        id: u64,
        sink: &mut dyn ProgressSink,
        handoff: &mut F,
    ) -> Option<usize>
    where
        F: AsyncFnMut(Download),
    {
        let Some(album) = self.client.album_page(id).await else {
            warn!("album {id}: metadata unavailable, skipping");
            return None;
        };

        let ids = album.song_ids();
        let title = album.data.title.as_deref().unwrap_or(path::UNKNOWN_ALBUM);
        info!("album {id}: {title} ({} tracks)", ids.len());

        Some(self.tracks(&ids, sink, handoff).await)
    }

    /// Downloads `ids` in order and returns how many were handed off.
    async fn tracks<F>(&self, ids: &[u64], sink: &mut dyn ProgressSink, handoff: &mut F) -> usize
    where
        F: AsyncFnMut(Download),
    {
        let mut downloaded = 0;
        for &track_id in ids {
            if let Some(download) = self.track(track_id, sink).await {
                handoff(download).await;
                downloaded += 1;
            }
        }

        downloaded
    }

    /// Runs the pipeline on a track document, such as one kept from a
    /// search result.
    pub async fn process(
        &self,
        data: &Map<String, Value>,
        sink: &mut dyn ProgressSink,
    ) -> Option<Download> {
        let record = match TrackRecord::from_data(data) {
            Ok(record) => record,
            Err(e) => {
                warn!("unreadable track document: {e}");
                return None;
            }
        };
        let id = record.id;

        let Some(encoding) = quality::negotiate(data, self.quality) else {
            info!("track {id}: not available in {}, skipping", self.quality);
            return None;
        };
        let mut record = record.with_quality(encoding);

        if let Some(album_id) = record.album_id {
            if let Some(album) = self.client.album_page(album_id).await {
                record = record.with_album(&album);
            }
            if let Some(album) = self.client.public_album(album_id).await {
                record = record.with_public_album(&album);
            }
        }
        if let Some(track) = self.client.public_track(id).await {
            record = record.with_public_track(&track);
        }

        let path = match path::save_location(&self.download_root, &record) {
            Ok(path) => path,
            Err(e) => {
                warn!("track {id}: cannot derive path: {e}");
                return None;
            }
        };

        let Some(track_token) = record.track_token.as_deref() else {
            warn!("track {id}: no track token, skipping");
            return None;
        };

        let Some(medium) = self.client.media(track_token, encoding.tier).await else {
            warn!("track {id}: no media available in {}, skipping", encoding.tier);
            return None;
        };

        let now = SystemTime::now();
        if !medium.is_valid_at(now) {
            warn!(
                "track {id}: media only available from {} until {}",
                OffsetDateTime::from(medium.not_before),
                OffsetDateTime::from(medium.expiry)
            );
            return None;
        }

        let Some(url) = medium.url() else {
            warn!("track {id}: no media source, skipping");
            return None;
        };

        let label = record.display_title();
        debug!("track {id}: downloading {} as {}", label, encoding.tier);
        let mut audio = self.client.download_stream(url, sink, &label).await?;

        match medium.cipher.typ {
            Cipher::NONE => {}
            Cipher::BF_CBC_STRIPE => {
                let Some(secret) = self.bf_secret.as_ref() else {
                    warn!("track {id}: payload is encrypted but no decryption secret is configured");
                    return None;
                };
                if let Err(e) = decrypt::decrypt(id, secret, &mut audio) {
                    warn!("track {id}: {e}");
                    return None;
                }
            }
        }

        let cover = match record.album_picture.as_deref() {
            Some(picture) if self.cover_art => self.client.fetch_cover_art(picture).await,
            _ => Vec::new(),
        };

        Some(Download {
            record,
            path,
            audio,
            cover,
        })
    }
}
