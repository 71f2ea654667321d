//! Retrying client for Deezer's internal and public APIs.
//!
//! The client owns the [`Session`] for one run. [`Client::bootstrap`] must
//! succeed once before any internal API call; it is the only operation that
//! fails with an error. Everything else runs under the configured
//! [`Retry`] policy and degrades to an absent value when all attempts fail,
//! leaving it to the caller to skip the affected item.
//!
//! # Example
//!
//! ```rust
//! use deezload::{client::Client, config::Config};
//!
//! let mut client = Client::new(&config)?;
//! client.bootstrap().await?;
//!
//! if let Some(page) = client.track_page(3135553).await {
//!     println!("{:?}", page.data.get("SNG_TITLE"));
//! }
//! ```

use std::{fmt::Debug, io};

use futures_util::TryStreamExt;
use reqwest::{
    header::{HeaderValue, CONTENT_TYPE},
    Url,
};
use reqwest_cookie_store::CookieStoreMutex;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tokio_util::io::StreamReader;

use crate::{
    config::Config,
    error::{Error, Result},
    http,
    progress::{self, ProgressSink},
    protocol::{
        self,
        gateway::{self, AlbumData, AlbumPage, Method, PlaylistPage, SearchPage, TrackPage, UserData},
        media, public,
    },
    quality::Tier,
    retry::Retry,
    search::{self, SearchKind, SearchResult},
    session::Session,
};

/// Failure to establish an authenticated session.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The gateway could not be reached or answered with an error status.
    #[error("gateway unreachable: {0}")]
    Unreachable(#[source] Error),

    /// The gateway answered with something other than user data.
    #[error("malformed bootstrap response: {0}")]
    MalformedResponse(#[source] Error),

    /// The `arl` was not accepted.
    #[error("invalid credentials: please refresh your arl")]
    InvalidCredentials,

    /// The gateway accepted the `arl` but returned no API token.
    #[error("no api token in bootstrap response")]
    TokenMissing,
}

/// Base URLs of the services the client talks to.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Endpoints {
    gateway: String,
    public: String,
    cover: String,
    media: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            gateway: Client::GATEWAY_URL.to_owned(),
            public: public::BASE_URL.to_owned(),
            cover: Client::COVER_URL.to_owned(),
            media: media::URL.to_owned(),
        }
    }
}

pub struct Client {
    http: http::Client,
    session: Session,
    retry: Retry,
    lang: String,
    endpoints: Endpoints,
}

impl Client {
    /// The URL of the Deezer cookie origin.
    ///
    /// What matters is that the domain matches with `deezer.com`.
    const COOKIE_ORIGIN: &'static str = "https://www.deezer.com";

    /// The URL of the Deezer gateway.
    const GATEWAY_URL: &'static str = "https://www.deezer.com/ajax/gw-light.php";

    /// The Deezer gateway version.
    const GATEWAY_VERSION: &'static str = "1.0";

    /// The Deezer gateway input type.
    const GATEWAY_INPUT: &'static str = "3";

    /// Template of album cover URLs at 1400x1400.
    const COVER_URL: &'static str = "https://e-cdns-images.dzcdn.net/images/cover";

    /// Number of items requested from the search page.
    const SEARCH_PAGE_SIZE: u64 = 40;

    /// Number of songs requested from a playlist page.
    const PLAYLIST_PAGE_SIZE: u64 = 2000;

    /// Number of albums requested from a discography.
    const DISCOGRAPHY_PAGE_SIZE: u64 = 500;

    const FORM_CONTENT: HeaderValue = HeaderValue::from_static("application/x-www-form-urlencoded");

    const JSON_CONTENT: HeaderValue = HeaderValue::from_static("application/json");

    /// The cookie origin as a `reqwest::Url`.
    ///
    /// # Panics
    ///
    /// Will panic if the URL is invalid.
    fn cookie_origin() -> Url {
        Url::parse(Self::COOKIE_ORIGIN).expect("invalid cookie origin")
    }

    /// Creates a cookie jar holding the language and `arl` cookies.
    fn cookie_jar(config: &Config) -> Result<CookieStoreMutex> {
        let cookie_origin = Self::cookie_origin();
        let mut store = cookie_store::CookieStore::default();

        let lang_cookie = format!(
            "dz_lang={}; Domain=deezer.com; Path=/; Secure; HttpOnly",
            config.app_lang
        );
        store.parse(&lang_cookie, &cookie_origin)?;

        let arl_cookie = format!(
            "arl={}; Domain=deezer.com; Path=/; Secure; HttpOnly",
            &*config.arl
        );
        store.parse(&arl_cookie, &cookie_origin)?;

        Ok(CookieStoreMutex::new(store))
    }

    /// Creates an unauthenticated client.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookies or the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let cookie_jar = Self::cookie_jar(config)?;
        let http = http::Client::with_cookies(config, cookie_jar)?;

        Ok(Self {
            http,
            session: Session::new(config.arl.clone()),
            retry: config.retry,
            lang: config.app_lang.clone(),
            endpoints: Endpoints::default(),
        })
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn retry(&self) -> Retry {
        self.retry
    }

    /// Replaces the retry policy of all subsequent calls.
    pub fn set_retry(&mut self, retry: Retry) {
        self.retry = retry;
    }

    /// Builds a gateway URL with a fresh call identifier.
    fn gateway_url(base: &str, method: &str, api_token: &str) -> Result<Url> {
        let cid = fastrand::u32(..).to_string();
        let url = Url::parse_with_params(
            base,
            &[
                ("method", method),
                ("input", Self::GATEWAY_INPUT),
                ("api_version", Self::GATEWAY_VERSION),
                ("api_token", api_token),
                ("cid", cid.as_str()),
            ],
        )?;

        Ok(url)
    }

    /// Returns the body of a successful, non-empty response.
    async fn success_body(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        if !status.is_success() {
            return Err(Error::unavailable(format!("HTTP status {status}")));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(Error::data_loss("empty response body"));
        }

        Ok(body)
    }

    /// Obtains the API and license tokens for the `arl` cookie.
    ///
    /// This is a single attempt: no failure here is retried. Calling it on a
    /// session that is already authorized does nothing.
    ///
    /// # Errors
    ///
    /// * [`AuthError::Unreachable`] if the request fails or returns an error
    ///   status
    /// * [`AuthError::MalformedResponse`] if the body is not user data
    /// * [`AuthError::InvalidCredentials`] if the `arl` was not accepted
    /// * [`AuthError::TokenMissing`] if no API token was returned
    pub async fn bootstrap(&mut self) -> std::result::Result<(), AuthError> {
        if self.session.is_authorized() {
            debug!("session already bootstrapped");
            return Ok(());
        }

        let url = Self::gateway_url(&self.endpoints.gateway, UserData::METHOD, "")
            .map_err(AuthError::Unreachable)?;
        let mut request = self.http.post(url, "");
        request
            .headers_mut()
            .insert(CONTENT_TYPE, Self::FORM_CONTENT);

        let response = self
            .http
            .execute(request)
            .await
            .map_err(AuthError::Unreachable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Unreachable(Error::unavailable(format!(
                "HTTP status {status}"
            ))));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Unreachable(e.into()))?;

        Self::authorize(&mut self.session, &body)
    }

    /// Stores the tokens of a bootstrap response `body` in `session`.
    fn authorize(session: &mut Session, body: &str) -> std::result::Result<(), AuthError> {
        let response: gateway::Response<UserData> =
            protocol::json(body, UserData::METHOD).map_err(AuthError::MalformedResponse)?;
        if !response.errors().is_empty() {
            debug!("{}: {:?}", UserData::METHOD, response.errors());
        }

        let user_data = response.into_first().ok_or_else(|| {
            AuthError::MalformedResponse(Error::data_loss("no user data in response"))
        })?;

        if !user_data.is_logged_in() {
            return Err(AuthError::InvalidCredentials);
        }

        let api_token = user_data
            .api_token
            .clone()
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::TokenMissing)?;

        if user_data.user.options.license_token.is_none() {
            warn!("no license token for this account: downloads will not be available");
        }

        info!("logged in as user {}", user_data.user.id);
        session.authorize(user_data, api_token);

        Ok(())
    }

    /// Calls an internal API `method` with a JSON `payload`.
    ///
    /// Transport failures, error statuses and empty or unparseable bodies are
    /// retried. Returns the parsed body, or `None` when all attempts failed or
    /// the session has not been bootstrapped.
    pub async fn call_internal_api(&self, method: &str, payload: &Value) -> Option<Value> {
        let Some(api_token) = self.session.api_token() else {
            error!("{method}: session is not bootstrapped");
            return None;
        };

        let body = payload.to_string();
        self.retry
            .run(method, async || {
                let url = Self::gateway_url(&self.endpoints.gateway, method, api_token)?;
                let mut request = self.http.post(url, body.clone());
                request
                    .headers_mut()
                    .insert(CONTENT_TYPE, Self::JSON_CONTENT);

                let response = self.http.execute(request).await?;
                let body = Self::success_body(response).await?;
                protocol::json::<Value>(&body, method)
            })
            .await
            .ok()
    }

    /// Fetches `resource/id` from the public API.
    pub async fn call_public_api(&self, resource: &str, id: &str) -> Option<Value> {
        let what = format!("{resource}/{id}");
        self.retry
            .run(&what, async || {
                let url: Url = format!("{}/{resource}/{id}", self.endpoints.public).parse()?;
                let response = self.http.execute(self.http.get(url)).await?;
                let body = Self::success_body(response).await?;
                protocol::json::<Value>(&body, &what)
            })
            .await
            .ok()
    }

    /// Downloads `url` into memory, reporting progress to `sink`.
    ///
    /// A response without a success status or without a `Content-Length`
    /// fails the attempt, as does any error while reading the body. Each
    /// retry starts the download over.
    pub async fn download_stream(
        &self,
        url: &Url,
        sink: &mut dyn ProgressSink,
        label: &str,
    ) -> Option<Vec<u8>> {
        self.retry
            .run(label, async || {
                let response = self.http.execute(self.http.get(url.clone())).await?;

                let status = response.status();
                if !status.is_success() {
                    return Err(Error::unavailable(format!("HTTP status {status}")));
                }

                let total = response
                    .content_length()
                    .ok_or_else(|| Error::failed_precondition("no content length"))?;

                let stream = Box::pin(response.bytes_stream().map_err(io::Error::other));
                let reader = StreamReader::new(stream);
                let bytes = progress::read_with_progress(reader, total, &mut *sink, label).await?;

                Ok(bytes)
            })
            .await
            .ok()
    }

    /// Downloads an album cover at 1400x1400.
    ///
    /// Returns an empty buffer when all attempts fail.
    pub async fn fetch_cover_art(&self, picture: &str) -> Vec<u8> {
        let what = format!("cover {picture}");
        self.retry
            .run(&what, async || {
                let url: Url = format!(
                    "{}/{picture}/1400x1400-000000-94-0-0.jpg",
                    self.endpoints.cover
                )
                .parse()?;

                let response = self.http.execute(self.http.get(url)).await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(Error::unavailable(format!("HTTP status {status}")));
                }

                Ok(response.bytes().await?.to_vec())
            })
            .await
            .ok()
            .unwrap_or_default()
    }

    /// Calls a typed gateway method and returns its response envelope.
    async fn gateway_response<T>(&self, payload: &Value) -> Option<gateway::Response<T>>
    where
        T: Method + DeserializeOwned + Debug,
    {
        let value = self.call_internal_api(T::METHOD, payload).await?;
        let response = match serde_json::from_value::<gateway::Response<T>>(value) {
            Ok(response) => response,
            Err(e) => {
                warn!("{}: unexpected response: {e}", T::METHOD);
                return None;
            }
        };

        if !response.errors().is_empty() {
            debug!("{}: {:?}", T::METHOD, response.errors());
        }

        Some(response)
    }

    /// Calls a typed gateway method and returns its first result.
    async fn gateway<T>(&self, payload: &Value) -> Option<T>
    where
        T: Method + DeserializeOwned + Debug,
    {
        let response = self.gateway_response::<T>(payload).await?;

        let errors = response.errors().clone();
        let first = response.into_first();
        if first.is_none() {
            warn!("{}: no results ({errors:?})", T::METHOD);
        }

        first
    }

    /// Calls a typed public API resource. A body with an `error` object
    /// counts as unavailable.
    async fn public<T>(&self, resource: &str, id: u64) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let value = self.call_public_api(resource, &id.to_string()).await?;

        if let Ok(body) = serde_json::from_value::<public::ErrorBody>(value.clone()) {
            warn!(
                "{resource}/{id}: {} ({})",
                body.error.message, body.error.code
            );
            return None;
        }

        serde_json::from_value(value)
            .map_err(|e| warn!("{resource}/{id}: unexpected response: {e}"))
            .ok()
    }

    /// Fetches the track document of `id`.
    pub async fn track_page(&self, id: u64) -> Option<TrackPage> {
        self.gateway(&json!({ "sng_id": id.to_string() })).await
    }

    /// Fetches the album header and song listing of `id`.
    pub async fn album_page(&self, id: u64) -> Option<AlbumPage> {
        self.gateway(&json!({
            "alb_id": id.to_string(),
            "lang": self.lang,
            "header": true,
            "tab": 0,
        }))
        .await
    }

    /// Fetches the header and song listing of playlist `id`.
    pub async fn playlist_page(&self, id: u64) -> Option<PlaylistPage> {
        self.gateway(&json!({
            "playlist_id": id.to_string(),
            "lang": self.lang,
            "nb": Self::PLAYLIST_PAGE_SIZE,
            "start": 0,
            "tab": 0,
            "tags": true,
            "header": true,
        }))
        .await
    }

    /// Lists the albums of artist `id`.
    pub async fn discography(&self, id: u64) -> Option<Vec<AlbumData>> {
        let response = self
            .gateway_response::<AlbumData>(&json!({
                "art_id": id.to_string(),
                "discography_mode": "all",
                "filter_role_id": [0],
                "nb": Self::DISCOGRAPHY_PAGE_SIZE,
                "nb_songs": 0,
                "start": 0,
            }))
            .await?;

        Some(response.all().to_vec())
    }

    pub async fn public_album(&self, id: u64) -> Option<public::Album> {
        self.public("album", id).await
    }

    pub async fn public_track(&self, id: u64) -> Option<public::Track> {
        self.public("track", id).await
    }

    /// Searches the catalog and returns the results of one `kind`.
    pub async fn search(&self, query: &str, kind: SearchKind) -> Option<Vec<SearchResult>> {
        let page: SearchPage = self
            .gateway(&json!({
                "query": query,
                "start": 0,
                "nb": Self::SEARCH_PAGE_SIZE,
                "top_tracks": true,
            }))
            .await?;

        Some(search::parse(&page.0, kind))
    }

    /// Resolves the download location of a track's encoding at `tier`.
    pub async fn media(&self, track_token: &str, tier: Tier) -> Option<media::Medium> {
        let Some(license_token) = self.session.license_token() else {
            warn!("no license token: cannot resolve media");
            return None;
        };

        let request = media::Request::new(license_token, track_token, tier);
        let body = match serde_json::to_string(&request) {
            Ok(body) => body,
            Err(e) => {
                error!("media request: {e}");
                return None;
            }
        };

        let response: media::Response = self
            .retry
            .run("media url", async || {
                let url: Url = self.endpoints.media.parse()?;
                let mut request = self.http.post(url, body.clone());
                request
                    .headers_mut()
                    .insert(CONTENT_TYPE, Self::JSON_CONTENT);

                let response = self.http.execute(request).await?;
                let body = Self::success_body(response).await?;
                protocol::json(&body, "media url")
            })
            .await
            .ok()?;

        response
            .into_medium()
            .map_err(|e| warn!("media url: {e}"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    use crate::progress::Silent;

    const NOT_FOUND: &str = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
    const SERVER_ERROR: &str =
        "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
    const HTML: &str = "HTTP/1.1 200 OK\r\nContent-Length: 13\r\nConnection: close\r\n\r\n<html></html>";
    const CHUNKED: &str = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n5\r\nhello\r\n0\r\n\r\n";
    const HELLO: &str = "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello";
    const HUGE_LENGTH: &str =
        "HTTP/1.1 200 OK\r\nContent-Length: 1099511627776\r\nConnection: close\r\n\r\nhello";
    const ALBUM: &str = "HTTP/1.1 200 OK\r\nContent-Length: 26\r\nConnection: close\r\n\r\n{\"record_type\": \"compile\"}";

    /// Reads one request up to the end of its body.
    async fn read_request(stream: &mut TcpStream) {
        let mut request = Vec::new();
        let mut buf = [0; 1024];
        loop {
            let n = match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            request.extend_from_slice(&buf[..n]);

            let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or_default();
            if request.len() >= end + 4 + length {
                return;
            }
        }
    }

    /// Answers every connection on a loopback port with `response`. Returns
    /// the base URL and the number of connections served.
    async fn serve(response: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    read_request(&mut stream).await;
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        (base, hits)
    }

    /// A bootstrapped client talking to `base` with a quick retry policy.
    fn loopback_client(base: &str) -> Client {
        let arl = "f".repeat(crate::arl::Arl::LENGTH);
        let config = Config::with_arl(arl.parse().unwrap()).unwrap();
        let mut client = Client::new(&config).unwrap();
        client.set_retry(Retry::new(3, Duration::from_millis(10)));
        client.endpoints = Endpoints {
            gateway: format!("{base}/ajax/gw-light.php"),
            public: base.to_owned(),
            cover: format!("{base}/images/cover"),
            media: format!("{base}/v1/get_url"),
        };

        let body = json!({
            "error": [],
            "results": { "USER": { "USER_ID": "5" }, "checkForm": "token" }
        });
        Client::authorize(&mut client.session, &body.to_string()).unwrap();

        client
    }

    fn media_url(base: &str) -> Url {
        format!("{base}/media/track.mp3").parse().unwrap()
    }

    #[tokio::test]
    async fn download_without_content_length_is_retried() {
        let (base, hits) = serve(CHUNKED).await;
        let client = loopback_client(&base);

        let bytes = client.download_stream(&media_url(&base), &mut Silent, "Song").await;
        assert!(bytes.is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn download_with_bogus_content_length_degrades() {
        let (base, hits) = serve(HUGE_LENGTH).await;
        let client = loopback_client(&base);

        let bytes = client.download_stream(&media_url(&base), &mut Silent, "Song").await;
        assert!(bytes.is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn download_succeeds_on_first_attempt() {
        let (base, hits) = serve(HELLO).await;
        let client = loopback_client(&base);

        let mut updates = Vec::new();
        let mut sink = |percent: u8, _: &str| updates.push(percent);
        let bytes = client.download_stream(&media_url(&base), &mut sink, "Song").await;

        assert_eq!(bytes.as_deref(), Some(&b"hello"[..]));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(updates.last(), Some(&100));
    }

    #[tokio::test]
    async fn cover_art_is_empty_after_exhaustion() {
        let (base, hits) = serve(NOT_FOUND).await;
        let client = loopback_client(&base);

        assert!(client.fetch_cover_art("2e018122cb56986277102d2041a592c8").await.is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn internal_api_retries_error_status() {
        let (base, hits) = serve(SERVER_ERROR).await;
        let client = loopback_client(&base);

        assert!(client.call_internal_api("deezer.pageTrack", &json!({})).await.is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn internal_api_retries_unparseable_body() {
        let (base, hits) = serve(HTML).await;
        let client = loopback_client(&base);

        assert!(client.track_page(3_135_553).await.is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn public_api_retries_unparseable_body() {
        let (base, hits) = serve(HTML).await;
        let client = loopback_client(&base);

        assert!(client.call_public_api("album", "302127").await.is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn public_api_reads_first_answer() {
        let (base, hits) = serve(ALBUM).await;
        let client = loopback_client(&base);

        let album = client.public_album(302_127).await.unwrap();
        assert_eq!(album.record_type.as_deref(), Some("compile"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn gateway_url_carries_fresh_cid() {
        let first = Client::gateway_url(Client::GATEWAY_URL, "deezer.pageTrack", "token").unwrap();
        let pairs: Vec<(String, String)> = first
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["method", "input", "api_version", "api_token", "cid"]);
        assert_eq!(pairs[0].1, "deezer.pageTrack");
        assert_eq!(pairs[1].1, "3");
        assert_eq!(pairs[2].1, "1.0");
        assert_eq!(pairs[3].1, "token");
        assert!(pairs[4].1.parse::<u32>().is_ok());
    }

    #[test]
    fn gateway_url_escapes_token() {
        let url = Client::gateway_url(Client::GATEWAY_URL, "deezer.getUserData", "a&b").unwrap();
        assert!(url.as_str().contains("api_token=a%26b"));
    }

    #[test]
    fn cookie_jar_holds_arl() {
        let arl = "c".repeat(crate::arl::Arl::LENGTH);
        let config = Config::with_arl(arl.parse().unwrap()).unwrap();

        let jar = Client::cookie_jar(&config).unwrap();
        let store = jar.lock().unwrap();
        let cookies: Vec<_> = store
            .get_request_values(&Client::cookie_origin())
            .map(|(name, value)| format!("{name}={value}"))
            .collect();

        assert!(cookies.contains(&format!("arl={arl}")));
        assert!(cookies.contains(&"dz_lang=en".to_owned()));
    }

    fn session() -> Session {
        Session::new("e".repeat(crate::arl::Arl::LENGTH).parse().unwrap())
    }

    #[test]
    fn zero_user_id_is_invalid_credentials() {
        let mut session = session();
        let body = json!({
            "error": [],
            "results": { "USER": { "USER_ID": 0 }, "checkForm": "guest" }
        });

        let result = Client::authorize(&mut session, &body.to_string());
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert!(session.api_token().is_none());
    }

    #[test]
    fn missing_check_form_is_token_missing() {
        let mut session = session();
        let body = json!({ "error": [], "results": { "USER": { "USER_ID": "5" } } });

        let result = Client::authorize(&mut session, &body.to_string());
        assert!(matches!(result, Err(AuthError::TokenMissing)));
        assert!(!session.is_authorized());
    }

    #[test]
    fn non_json_is_malformed() {
        let mut session = session();
        let result = Client::authorize(&mut session, "<html>maintenance</html>");
        assert!(matches!(result, Err(AuthError::MalformedResponse(_))));

        let result = Client::authorize(&mut session, r#"{"error": [], "results": "maintenance"}"#);
        assert!(matches!(result, Err(AuthError::MalformedResponse(_))));
    }

    #[test]
    fn valid_user_data_authorizes() {
        let mut session = session();
        let body = json!({
            "error": [],
            "results": {
                "USER": { "USER_ID": "5", "OPTIONS": { "license_token": "license" } },
                "checkForm": "token"
            }
        });

        Client::authorize(&mut session, &body.to_string()).unwrap();
        assert_eq!(session.api_token(), Some("token"));
        assert_eq!(session.license_token(), Some("license"));
    }

    #[tokio::test]
    async fn internal_api_requires_bootstrap() {
        let arl = "d".repeat(crate::arl::Arl::LENGTH);
        let config = Config::with_arl(arl.parse().unwrap()).unwrap();
        let client = Client::new(&config).unwrap();

        assert!(client.call_internal_api("deezer.pageTrack", &json!({})).await.is_none());
        assert!(client.track_page(1).await.is_none());
        assert!(client.media("token", Tier::Flac).await.is_none());
    }
}
