//! Session bootstrap data from Deezer's gateway API.
//!
//! # Wire Format
//!
//! ```json
//! {
//!     "USER": {
//!         "USER_ID": "123456789",
//!         "BLOG_NAME": "Username",
//!         "OPTIONS": {
//!             "license_token": "secret",
//!             "web_hq": true,
//!             "web_lossless": true
//!         }
//!     },
//!     "checkForm": "api_token"
//! }
//! ```
//!
//! An invalid or expired `arl` cookie does not fail the call: Deezer answers
//! with `USER_ID` 0 and a guest token instead. All fields are therefore
//! optional or defaulted, and callers decide what a usable session is.

use serde::Deserialize;
use serde_with::{serde_as, DefaultOnError, DisplayFromStr, PickFirst};
use veil::Redact;

use super::Method;

impl Method for UserData {
    const METHOD: &'static str = "deezer.getUserData";
}

/// User data returned at session bootstrap.
#[derive(Clone, Default, Eq, PartialEq, Deserialize, Redact, Hash)]
pub struct UserData {
    /// User profile and license options
    #[serde(default, rename = "USER")]
    pub user: User,

    /// API token for authenticated gateway calls
    #[serde(default, rename = "checkForm")]
    #[redact]
    pub api_token: Option<String>,
}

impl UserData {
    /// Whether the gateway recognized the `arl` cookie as a logged-in user.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.user.id != 0
    }
}

/// User profile.
#[serde_as]
#[derive(Clone, Default, Eq, PartialEq, Deserialize, Debug, Hash)]
pub struct User {
    /// Unique user identifier, 0 for guests
    #[serde(default, rename = "USER_ID")]
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub id: u64,

    /// Display name
    #[serde(default, rename = "BLOG_NAME")]
    pub name: String,

    /// License options
    #[serde(default, rename = "OPTIONS")]
    #[serde_as(as = "DefaultOnError")]
    pub options: Options,
}

/// User license options.
#[derive(Clone, Default, Eq, PartialEq, Deserialize, Redact, Hash)]
pub struct Options {
    /// License token for media URL requests
    #[serde(default)]
    #[redact]
    pub license_token: Option<String>,

    /// Whether the subscription allows MP3 320
    #[serde(default)]
    pub web_hq: bool,

    /// Whether the subscription allows FLAC
    #[serde(default)]
    pub web_lossless: bool,
}
