//! Audio quality tiers and the negotiation of an available encoding.
//!
//! Track documents from the internal API advertise one `FILESIZE_*` field per
//! encoding, where a size of zero means the track is not encoded at that
//! tier:
//!
//! ```json
//! {
//!     "FILESIZE": "4000000",
//!     "FILESIZE_MP3_128": "4000000",
//!     "FILESIZE_MP3_256": 0,
//!     "FILESIZE_MP3_320": "0",
//!     "FILESIZE_FLAC": "20000000"
//! }
//! ```
//!
//! # Negotiation
//!
//! [`negotiate`] first checks that the requested tier is available at all.
//! If it is, the tiers of [`Tier::FALLBACK_ORDER`] other than the requested
//! one are tried in that fixed order and the first available one wins; only
//! when none of them is available is the requested tier itself selected.
//!
//! This means a request for MP3 128 on a track that also has FLAC yields
//! FLAC, and a request for FLAC on a track that also has MP3 320 yields
//! MP3 320. This first-match-wins order is long-standing user-visible
//! behavior and is kept as is.

use std::{fmt, str::FromStr};

use serde::Serialize;
use serde_json::{Map, Value};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::{error::Error, protocol};

/// Audio encoding presets, identified by Deezer's format ids.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[cfg_attr(feature = "binary", derive(clap::ValueEnum))]
#[repr(u8)]
pub enum Tier {
    /// 128 kbps MP3
    #[cfg_attr(feature = "binary", value(name = "mp3-128"))]
    Mp3_128 = 1,

    /// 256 kbps MP3
    #[cfg_attr(feature = "binary", value(name = "mp3-256"))]
    Mp3_256 = 5,

    /// 320 kbps MP3
    #[cfg_attr(feature = "binary", value(name = "mp3-320"))]
    Mp3_320 = 3,

    /// Lossless FLAC
    #[cfg_attr(feature = "binary", value(name = "flac"))]
    Flac = 9,
}

impl Tier {
    /// All tiers from lowest to highest bitrate.
    pub const ALL: [Tier; 4] = [Tier::Mp3_128, Tier::Mp3_256, Tier::Mp3_320, Tier::Flac];

    /// Order in which alternatives to a requested tier are tried.
    pub const FALLBACK_ORDER: [Tier; 4] = [Tier::Flac, Tier::Mp3_320, Tier::Mp3_256, Tier::Mp3_128];

    /// Deezer's numeric format id.
    #[must_use]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// File extension of an encoding at this tier.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Tier::Flac => "flac",
            Tier::Mp3_128 | Tier::Mp3_256 | Tier::Mp3_320 => "mp3",
        }
    }

    /// Name of the track document field holding the file size at this tier.
    #[must_use]
    pub fn filesize_key(self) -> &'static str {
        match self {
            Tier::Mp3_128 => "FILESIZE_MP3_128",
            Tier::Mp3_256 => "FILESIZE_MP3_256",
            Tier::Mp3_320 => "FILESIZE_MP3_320",
            Tier::Flac => "FILESIZE_FLAC",
        }
    }

    /// The tier whose file size is held in the field named `key`, if any.
    #[must_use]
    pub fn from_filesize_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.filesize_key() == key)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Mp3_128 => write!(f, "MP3 128"),
            Tier::Mp3_256 => write!(f, "MP3 256"),
            Tier::Mp3_320 => write!(f, "MP3 320"),
            Tier::Flac => write!(f, "FLAC"),
        }
    }
}

impl FromStr for Tier {
    type Err = Error;

    /// Parses `mp3-128`, `mp3-256`, `mp3-320` or `flac`, case-insensitively.
    /// The bare bitrates `128`, `256` and `320` are accepted as well.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tier = match s.trim().to_ascii_lowercase().as_str() {
            "mp3-128" | "mp3_128" | "128" => Tier::Mp3_128,
            "mp3-256" | "mp3_256" | "256" => Tier::Mp3_256,
            "mp3-320" | "mp3_320" | "320" => Tier::Mp3_320,
            "flac" => Tier::Flac,
            _ => return Err(Error::invalid_argument(format!("unknown audio quality: {s}"))),
        };

        Ok(tier)
    }
}

/// An encoding of a track that is available for download.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize)]
pub struct EncodingOption {
    /// Quality tier of the encoding.
    pub tier: Tier,

    /// Size of the encoded file in bytes.
    pub size: u64,
}

impl EncodingOption {
    /// File extension, derived from the tier alone.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        self.tier.extension()
    }
}

/// Encodings with a non-zero file size in a track document.
///
/// Only fields whose name contains `filesize` (in any case) and that map to a
/// known [`Tier`] are considered. Sizes may be numbers or numeric strings.
#[must_use]
pub fn available(data: &Map<String, Value>) -> Vec<EncodingOption> {
    data.iter()
        .filter(|(key, _)| key.to_ascii_lowercase().contains("filesize"))
        .filter_map(|(key, value)| {
            let size = protocol::lenient_u64(value)?;
            if size == 0 {
                return None;
            }

            Tier::from_filesize_key(key).map(|tier| EncodingOption { tier, size })
        })
        .collect()
}

/// Selects the encoding to download for a `requested` tier.
///
/// Returns `None` when the requested tier is not available, regardless of
/// what other tiers are. See the [module documentation](self) for the
/// fallback rule.
#[must_use]
pub fn negotiate(data: &Map<String, Value>, requested: Tier) -> Option<EncodingOption> {
    let available = available(data);
    let find = |tier: Tier| available.iter().find(|option| option.tier == tier).copied();

    let desired = find(requested)?;

    let selected = Tier::FALLBACK_ORDER
        .into_iter()
        .filter(|tier| *tier != requested)
        .find_map(find)
        .unwrap_or(desired);

    if selected.tier != requested {
        debug!("requested {requested} but selected {}", selected.tier);
    }

    Some(selected)
}
