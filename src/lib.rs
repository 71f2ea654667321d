//! Downloader for the Deezer catalog.
//!
//! deezload authenticates with an `arl` session cookie, fetches track and
//! album metadata from Deezer's internal and public APIs, negotiates an
//! available encoding, derives a save location from the merged metadata and
//! downloads the audio payload.
//!
//! The [`downloader`] module ties the pipeline together; [`client`] holds
//! the retrying network layer it is built on.
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[macro_use]
extern crate log;

pub mod arl;
pub mod client;
pub mod config;
pub mod decrypt;
pub mod downloader;
pub mod error;
pub mod http;
pub mod path;
pub mod progress;
pub mod protocol;
pub mod quality;
pub mod retry;
pub mod search;
pub mod session;
pub mod track;
