use std::{error::Error, path::PathBuf, process};

use clap::{command, Parser, ValueHint};
use log::{debug, error, info, warn, LevelFilter};

use deezload::{
    config::{Config, Secrets},
    downloader::{Download, Downloader, Link},
    progress::ProgressSink,
    quality::Tier,
    search::SearchKind,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// File name of album covers next to the tracks.
const COVER_FILE_NAME: &str = "cover.jpg";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Track, album, playlist or artist URLs or track ids to download, or
    /// the search query with `--search`
    #[arg(required = true, value_name = "URL|ID")]
    items: Vec<String>,

    /// Secrets file
    ///
    /// Ensure that the this file is kept secure and not shared publicly, as it
    /// contains sensitive information that can grant access to your Deezer
    /// account.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, default_value_t = String::from("secrets.toml"))]
    secrets_file: String,

    /// Download directory
    #[arg(short, long, value_name = "DIR", value_hint = ValueHint::DirPath, default_value = Config::DEFAULT_DOWNLOAD_ROOT)]
    output: PathBuf,

    /// Requested audio quality
    ///
    /// The track is skipped when it is not available in this quality. When it
    /// is, the first available of FLAC, MP3 320, MP3 256 and MP3 128 other
    /// than the requested one is downloaded, or else the requested one.
    #[arg(short = 'f', long, value_enum, default_value_t = Tier::Mp3_320)]
    format: Tier,

    /// Do not download album covers
    #[arg(long, default_value_t = false)]
    no_cover: bool,

    /// List search results of this kind instead of downloading
    #[arg(long, value_enum, value_name = "KIND")]
    search: Option<SearchKind>,

    /// Download the first search result instead of listing them
    #[arg(long, default_value_t = false, requires = "search")]
    download: bool,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        // Note: if you change the default logging level here, then you should
        // probably also change the verbosity levels below.
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            0 => {
                // Quiet and verbose are mutually exclusive, and `verbose` is 0
                // by default. So this arm means: quiet mode.
                LevelFilter::Warn
            }
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module(module_path!(), level);
    }

    logger.init();
}

/// Logs download progress in steps of 10%.
#[derive(Debug, Default)]
struct LogProgress {
    last_step: Option<u8>,
}

impl LogProgress {
    const STEP: u8 = 10;

    /// Whether `percent` enters a new step. Falling below the last step
    /// means a retry or the next download started, and starts over.
    fn advance(&mut self, percent: u8) -> bool {
        let step = percent / Self::STEP;
        if self.last_step == Some(step) {
            return false;
        }

        self.last_step = Some(step);
        true
    }
}

impl ProgressSink for LogProgress {
    fn report(&mut self, percent: u8, label: &str) {
        if self.advance(percent) {
            info!("{percent:>3}% {label}");
        } else if percent == 100 {
            // The final read reports 100% a second time with a completion label.
            info!("{label}");
        }
    }
}

/// Writes a download and its cover below its derived path.
async fn save(download: Download) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = download.path.parent() {
        tokio::fs::create_dir_all(parent).await?;

        if !download.cover.is_empty() {
            let cover = parent.join(COVER_FILE_NAME);
            if !tokio::fs::try_exists(&cover).await? {
                tokio::fs::write(&cover, &download.cover).await?;
            }
        }
    }

    tokio::fs::write(&download.path, &download.audio).await?;
    info!("saved {}", download.path.display());

    Ok(())
}

/// Saves a download, logging rather than returning failures.
async fn handoff(download: Download) {
    let path = download.path.clone();
    if let Err(e) = save(download).await {
        error!("{}: {e}", path.display());
    }
}

/// Loads the secrets file, hinting at the documentation when it is absent.
fn load_secrets(secrets_file: &str) -> Result<Secrets, Box<dyn Error>> {
    Secrets::from_file(secrets_file).map_err(|e| {
        if e.kind == deezload::error::ErrorKind::NotFound {
            info!("read the documentation on how to set your ARL in {secrets_file}");
        }
        e.into()
    })
}

/// Downloads or searches for every item on the command line.
///
/// Per-item failures are logged and skipped. Returns an error when the
/// session cannot be established.
async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let secrets = load_secrets(&args.secrets_file)?;

    let mut config = Config::with_arl(secrets.arl)?;
    config.bf_secret = secrets.bf_secret;
    config.download_root = args.output;
    config.quality = args.format;
    config.cover_art = !args.no_cover;

    let mut downloader = Downloader::new(&config)?;
    downloader.login().await?;

    let mut progress = LogProgress::default();

    if let Some(kind) = args.search {
        let query = args.items.join(" ");
        let results = match downloader.client().search(&query, kind).await {
            Some(results) if !results.is_empty() => results,
            Some(_) => {
                info!("no {kind} results for \"{query}\"");
                return Ok(());
            }
            None => {
                warn!("search for \"{query}\" failed");
                return Ok(());
            }
        };

        if args.download {
            let first = &results[0];
            info!("downloading {kind} {first}");
            if let Some(count) = downloader.search_result(first, &mut progress, handoff).await {
                info!("{count} tracks downloaded");
            }
        } else {
            for result in results {
                println!("{result}");
            }
        }

        return Ok(());
    }

    for item in &args.items {
        let link = match Link::parse(item) {
            Ok(link) => link,
            Err(e) => {
                error!("{item}: {e}");
                continue;
            }
        };

        debug!("processing {link}");
        match downloader.download(link, &mut progress, handoff).await {
            Some(count) => info!("{link}: {count} tracks downloaded"),
            None => warn!("{link}: nothing downloaded"),
        }
    }

    Ok(())
}

/// Main entry point of the application.
///
/// This function initializes the logger facade, parses the command line
/// arguments, and runs until all items are processed or it is interrupted.
#[tokio::main]
async fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {:#?}", args);

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    info!("starting {name}/{version}; {BUILD_PROFILE}");

    // Dropping `run` on interrupt drops the client and its connection pool.
    let result = tokio::select! {
        // Prioritize shutdown signals.
        biased;

        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            Ok(())
        }

        result = run(args) => result,
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_steps_restart_on_retry_and_next_track() {
        let mut progress = LogProgress::default();
        assert!(progress.advance(3));
        assert!(!progress.advance(7));
        assert!(progress.advance(12));
        assert!(progress.advance(55));

        // A retry starts over from zero.
        assert!(progress.advance(4));
        assert!(!progress.advance(9));
        assert!(progress.advance(100));
        assert!(!progress.advance(100));

        // So does the next track, even after an empty download at 100%.
        assert!(progress.advance(0));
        assert!(progress.advance(100));
        assert!(progress.advance(49));
    }
}
