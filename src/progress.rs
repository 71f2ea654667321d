//! Download progress reporting.
//!
//! Rendering is left to the caller: the downloader only pushes percentages
//! and labels into a [`ProgressSink`] and keeps no progress state beyond the
//! read in progress.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

/// Receiver of download progress updates.
///
/// Implementations must return promptly; they are called after every chunk.
pub trait ProgressSink: Send {
    /// Reports `percent` (0 to 100) completion with a human-readable `label`.
    fn report(&mut self, percent: u8, label: &str);
}

impl<F> ProgressSink for F
where
    F: FnMut(u8, &str) + Send,
{
    fn report(&mut self, percent: u8, label: &str) {
        self(percent, label);
    }
}

/// A sink that discards all updates.
#[derive(Copy, Clone, Debug, Default)]
pub struct Silent;

impl ProgressSink for Silent {
    fn report(&mut self, _percent: u8, _label: &str) {}
}

/// Size of each read from the response body.
pub const CHUNK_SIZE: usize = 4096;

/// Largest buffer allocated up front, whatever length the server advertises.
/// Longer payloads grow the buffer as they arrive.
pub const MAX_PREALLOCATION: usize = 64 * 1024 * 1024;

/// Bytes per megabyte, as shown in progress labels.
const MEGABYTE: f64 = 1_000_000.0;

/// Reads `reader` to its end in [`CHUNK_SIZE`] chunks, reporting progress
/// against the advertised `total` after every chunk.
///
/// The returned buffer is pre-sized to `total`, up to [`MAX_PREALLOCATION`].
/// Each update is labelled `"{label} | {read}MB/{total}MB"`; the terminal
/// zero-byte read reports `"{label} | Download Complete"` at 100%.
///
/// # Errors
///
/// Returns the I/O error of the first failing read, `InvalidData` as soon as
/// more than `total` bytes arrive and `UnexpectedEof` when the reader ends
/// short of `total`. Nothing is retried here.
pub async fn read_with_progress<R>(
    mut reader: R,
    total: u64,
    sink: &mut dyn ProgressSink,
    label: &str,
) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let capacity = usize::try_from(total).map_or(MAX_PREALLOCATION, |total| {
        total.min(MAX_PREALLOCATION)
    });
    let mut buffer = Vec::with_capacity(capacity);
    let mut chunk = [0; CHUNK_SIZE];
    let total_mb = megabytes(total);

    loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            if (buffer.len() as u64) < total {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("body ended after {} of {total} bytes", buffer.len()),
                ));
            }

            sink.report(100, &format!("{label} | Download Complete"));
            return Ok(buffer);
        }

        let bytes_read = (buffer.len() + read) as u64;
        if bytes_read > total {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("body exceeds advertised length of {total} bytes"),
            ));
        }

        buffer.extend_from_slice(&chunk[..read]);
        sink.report(
            percent_floor(bytes_read, total),
            &format!("{label} | {:.2}MB/{total_mb:.2}MB", megabytes(bytes_read)),
        );
    }
}

/// Percentage of `total` that `read` represents, rounded down and capped at
/// 100. A zero `total` counts as complete.
#[must_use]
pub fn percent_floor(read: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }

    let percent = u128::from(read) * 100 / u128::from(total);
    u8::try_from(percent.min(100)).unwrap_or(100)
}

#[expect(clippy::cast_precision_loss)]
fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / MEGABYTE
}
