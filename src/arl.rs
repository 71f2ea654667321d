//! The `arl` session cookie that authenticates a Deezer account.
//!
//! The value is opaque to deezload. It is attached as a cookie to every
//! request on the internal API and is never refreshed during a run.

use std::{fmt, ops::Deref, str::FromStr};

use veil::Redact;

use crate::error::Error;

/// Validated `arl` cookie value. Redacted in debug output.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Redact)]
#[redact(all)]
pub struct Arl(String);

impl Arl {
    /// Number of characters in a well-formed `arl`.
    pub const LENGTH: usize = 192;
}

impl FromStr for Arl {
    type Err = Error;

    /// Parses an `arl` from a string slice, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the length is not 192 characters, or
    /// `InvalidArgument` if it holds characters that cannot be in a cookie
    /// value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arl = s.trim();

        let chars = arl.chars().count();
        if chars != Self::LENGTH {
            return Err(Error::out_of_range(format!(
                "arl should be {} characters long but is {chars}",
                Self::LENGTH
            )));
        }

        if let Some(chr) = arl
            .chars()
            .find(|chr| !chr.is_ascii_alphanumeric() && *chr != '_')
        {
            return Err(Error::invalid_argument(format!(
                "arl contains illegal character '{chr}'"
            )));
        }

        Ok(Self(arl.to_owned()))
    }
}

impl Deref for Arl {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Arl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
