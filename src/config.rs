//! Run configuration and secrets.
//!
//! [`Config`] is built once by the caller and passed by reference into the
//! client and the downloader; nothing in the crate reads global state.
//! Account secrets are kept out of the command line and loaded from a small
//! TOML file instead:
//!
//! ```toml
//! arl = "..."
//! bf_secret = "..."
//! ```

use std::{fs, path::Path, path::PathBuf};

use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use veil::Redact;

use crate::{
    arl::Arl,
    decrypt::Key,
    error::{Error, Result},
    quality::Tier,
    retry::Retry,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,
    pub app_lang: String,

    pub user_agent: String,

    pub arl: Arl,

    /// Root directory that derived track paths are joined to.
    pub download_root: PathBuf,

    /// Tier requested for every track before negotiation.
    pub quality: Tier,

    /// Retry policy shared by all network operations.
    pub retry: Retry,

    /// Secret for decrypting `BF_CBC_STRIPE` payloads.
    pub bf_secret: Option<Key>,

    /// Whether to fetch album cover art with every track.
    pub cover_art: bool,
}

impl Config {
    /// Default directory for downloads, relative to the working directory.
    pub const DEFAULT_DOWNLOAD_ROOT: &'static str = "downloads";

    /// Creates a configuration with defaults for everything but the `arl`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the application or OS identification
    /// cannot be used in a `User-Agent` header.
    pub fn with_arl(arl: Arl) -> Result<Self> {
        let app_name = env!("CARGO_PKG_NAME").to_owned();
        let app_version = env!("CARGO_PKG_VERSION").to_owned();
        let app_lang = "en".to_owned();

        let user_agent = user_agent(&app_name, &app_version, &app_lang)?;
        trace!("user agent: {user_agent}");

        Ok(Self {
            app_name,
            app_version,
            app_lang,

            user_agent,

            arl,

            download_root: PathBuf::from(Self::DEFAULT_DOWNLOAD_ROOT),
            quality: Tier::Mp3_320,
            retry: Retry::default(),
            bf_secret: None,
            cover_art: true,
        })
    }
}

/// Builds a `User-Agent` served like Deezer on desktop.
fn user_agent(app_name: &str, app_version: &str, app_lang: &str) -> Result<String> {
    // Additional checks on top of `reqwest::HeaderValue`.
    let illegal_chars = |chr| chr == '/' || chr == ';';
    if app_name.is_empty()
        || app_name.contains(illegal_chars)
        || app_version.is_empty()
        || app_version.contains(illegal_chars)
        || app_lang.chars().count() != 2
        || app_lang.contains(illegal_chars)
    {
        return Err(Error::invalid_argument(format!(
            "application name, version and/or language invalid (\"{app_name}\"; \"{app_version}\"; \"{app_lang}\")"
        )));
    }

    let os_name = match std::env::consts::OS {
        "macos" => "osx",
        other => other,
    };
    let os_version = sysinfo::System::os_version().unwrap_or_else(|| String::from("0"));
    if os_name.is_empty()
        || os_name.contains(illegal_chars)
        || os_version.is_empty()
        || os_version.contains(illegal_chars)
    {
        return Err(Error::invalid_argument(format!(
            "os name and/or version invalid (\"{os_name}\"; \"{os_version}\")"
        )));
    }

    Ok(format!(
        "{app_name}/{app_version} (Rust; {os_name}/{os_version}; Desktop; {app_lang})"
    ))
}

/// Account secrets loaded from a TOML file.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Deserialize, Redact)]
pub struct Secrets {
    #[serde_as(as = "DisplayFromStr")]
    pub arl: Arl,

    #[serde(default)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[redact]
    pub bf_secret: Option<Key>,
}

impl Secrets {
    /// Largest secrets file that will be read.
    pub const MAX_FILE_SIZE: u64 = 1024;

    /// Reads secrets from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is larger than
    /// [`MAX_FILE_SIZE`](Self::MAX_FILE_SIZE), or does not hold a valid
    /// `arl` (and `bf_secret`, when present).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let size = fs::metadata(path)?.len();
        if size > Self::MAX_FILE_SIZE {
            return Err(Error::out_of_range(format!(
                "{} is {size} bytes but should be at most {} bytes",
                path.display(),
                Self::MAX_FILE_SIZE
            )));
        }

        let contents = fs::read_to_string(path)?;
        contents.parse()
    }
}

impl std::str::FromStr for Secrets {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arl() -> String {
        "x".repeat(Arl::LENGTH)
    }

    #[test]
    fn secrets_with_arl_only() {
        let secrets: Secrets = format!("arl = \"{}\"\n", arl()).parse().unwrap();
        assert_eq!(&*secrets.arl, arl().as_str());
        assert!(secrets.bf_secret.is_none());
    }

    #[test]
    fn secrets_with_decryption_key() {
        let secrets: Secrets = format!("arl = \"{}\"\nbf_secret = \"0123456789abcdef\"\n", arl())
            .parse()
            .unwrap();
        assert_eq!(secrets.bf_secret.map(|key| *key), Some(*b"0123456789abcdef"));
    }

    #[test]
    fn secrets_reject_bad_values() {
        assert!("arl = \"short\"".parse::<Secrets>().is_err());
        assert!(format!("arl = \"{}\"\nbf_secret = \"abc\"", arl())
            .parse::<Secrets>()
            .is_err());
        assert!("".parse::<Secrets>().is_err());
    }

    #[test]
    fn user_agent_rejects_separators() {
        assert!(user_agent("dee/zload", "0.1.0", "en").is_err());
        assert!(user_agent("deezload", "0.1.0", "eng").is_err());

        let agent = user_agent("deezload", "0.1.0", "en").unwrap();
        assert!(agent.starts_with("deezload/0.1.0 (Rust; "));
        assert!(agent.ends_with("; Desktop; en)"));
    }

    #[test]
    fn defaults() {
        let config = Config::with_arl(arl().parse().unwrap()).unwrap();
        assert_eq!(config.retry, Retry::default());
        assert_eq!(config.download_root, PathBuf::from("downloads"));
        assert!(config.bf_secret.is_none());
    }
}
