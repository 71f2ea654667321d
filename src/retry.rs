//! Fixed-attempt, fixed-delay retry policy.
//!
//! Every network operation against Deezer shares the same retry shape: a
//! fixed number of attempts with a fixed pause between them. The catalog
//! service documents no backoff contract, so there is no exponential growth
//! and no jitter.
//!
//! A failed attempt is logged and retried. When all attempts have failed the
//! policy yields [`Outcome::Exhausted`] instead of an error, and callers
//! degrade that into an absent value.
//!
//! # Example
//!
//! ```rust
//! use deezload::retry::{Outcome, Retry};
//!
//! let outcome = Retry::default()
//!     .run("album 302127", async || fetch_album(302127).await)
//!     .await;
//!
//! if let Outcome::Ok(album) = outcome {
//!     println!("{album:?}");
//! }
//! ```

use std::time::Duration;

use crate::error::Result;

/// Result of running an operation under a [`Retry`] policy.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T> {
    /// One of the attempts succeeded.
    Ok(T),

    /// All attempts failed.
    Exhausted,
}

impl<T> Outcome<T> {
    /// Converts into an `Option`, mapping `Exhausted` to `None`.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Exhausted => None,
        }
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// Retry policy with a fixed attempt count and a fixed delay.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Retry {
    /// Total number of attempts, including the first one.
    pub attempts: u32,

    /// Pause between two consecutive attempts.
    pub delay: Duration,
}

impl Retry {
    /// Number of attempts when none is configured.
    pub const DEFAULT_ATTEMPTS: u32 = 3;

    /// Delay between attempts when none is configured.
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

    #[must_use]
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Runs `attempt` until it succeeds or the attempts are used up.
    ///
    /// The delay is awaited between attempts, not after the last one. A
    /// policy with zero attempts returns [`Outcome::Exhausted`] without
    /// running `attempt` at all.
    ///
    /// `what` describes the operation in log messages.
    pub async fn run<T, F>(&self, what: &str, mut attempt: F) -> Outcome<T>
    where
        F: AsyncFnMut() -> Result<T>,
    {
        for n in 1..=self.attempts {
            match attempt().await {
                Ok(value) => {
                    if n > 1 {
                        debug!("{what} succeeded on attempt {n}/{}", self.attempts);
                    }
                    return Outcome::Ok(value);
                }
                Err(e) => {
                    if n < self.attempts {
                        warn!(
                            "{what} failed (attempt {n}/{}): {e}; retrying in {:.0}s",
                            self.attempts,
                            self.delay.as_secs_f32()
                        );
                        tokio::time::sleep(self.delay).await;
                    } else {
                        warn!(
                            "{what} failed (attempt {n}/{}): {e}; giving up",
                            self.attempts
                        );
                    }
                }
            }
        }

        Outcome::Exhausted
    }
}

impl Default for Retry {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ATTEMPTS, Self::DEFAULT_DELAY)
    }
}
