use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};

use crate::config::{Config, DuplicateAction, OutsideTreeAction, PlayerChoice};
use crate::config_persistence::{configured_path, expand_home};
use crate::content_tree::{self, ContentTree};
use crate::daemon::{self, PlayLog, PlaySink, RedisQueue};
use crate::library_update::{update_library, UpdateOptions};
use crate::playback::{PlaybackController, PlayOutcome, VolumeRequest, VOLUME_FADE_STEP_DELAY};
use crate::player::{MusicLibrary, OsascriptBridge, PlayerApp, PlayerControl};
use crate::playlists::{
    create_playlists, list_lines, remove_playlists, ListOptions, TrackFormat,
};
use crate::track_index::{IndexError, ReconcileMode, TrackIndex};

type CliResult = Result<(), Box<dyn Error>>;

/// Control the macOS music player and keep its library and track index in
/// shape.
#[derive(Debug, Parser)]
#[command(name = "tunebridge", version)]
pub struct Cli {
    /// Config file (default: <config dir>/tunebridge/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Player application, overriding the config file
    #[arg(long, global = true, value_enum)]
    pub app: Option<PlayerChoice>,
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the current track
    Info {
        /// Also print the file path
        #[arg(short, long)]
        verbose: bool,
    },
    /// Play a file or directory, or toggle play/pause
    Play { track: Option<PathBuf> },
    /// Stop playback
    Stop,
    /// Jump to the next track
    Next,
    /// Jump to the previous track
    Previous,
    /// Show or set shuffle mode
    Shuffle {
        #[arg(value_enum)]
        mode: Option<ShuffleMode>,
    },
    /// Show, set (N) or fade (+N / -N) the playback volume
    Volume {
        #[arg(allow_hyphen_values = true)]
        value: Option<String>,
    },
    /// Reconcile the track index database with the player library
    UpdateIndex {
        /// Abort on the first entry that fails to index
        #[arg(long)]
        strict: bool,
    },
    /// Look up library identifiers for file paths
    LookupIndex {
        /// Also print the recorded modification and added times
        #[arg(short, long)]
        verbose: bool,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Make the player library mirror the content tree
    UpdateLibrary {
        /// Content tree root
        #[arg(short = 'l', long)]
        music_path: Option<PathBuf>,
        /// Start from this library position; skips adding new files
        #[arg(short, long)]
        position: Option<usize>,
        /// Push changed file tags into the player
        #[arg(short, long)]
        metadata: bool,
        #[arg(long, value_enum)]
        outside_tree: Option<OutsideTreeAction>,
        #[arg(long, value_enum)]
        duplicates: Option<DuplicateAction>,
    },
    /// Log every track that starts playing
    Daemon {
        #[arg(short = 'f', long)]
        log_file: Option<PathBuf>,
        /// Poll interval in seconds
        #[arg(long)]
        interval: Option<u64>,
        /// Also push played tracks to this redis server
        #[arg(long)]
        redis_host: Option<String>,
        #[arg(long)]
        redis_auth: Option<String>,
    },
    /// List, create or remove player playlists
    Playlists {
        #[command(subcommand)]
        command: PlaylistCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum PlaylistCommand {
    /// List playlists, or the tracks of the named ones
    List {
        /// Include smart playlists
        #[arg(short, long)]
        smart_playlists: bool,
        /// Group listed tracks by year
        #[arg(short, long)]
        yearly: bool,
        /// Track line format, e.g. "{artist} - {title}"
        #[arg(short, long)]
        format: Option<String>,
        /// Playlist names or paths; `*` and `?` match any text
        playlists: Vec<String>,
    },
    /// Create playlists
    Create {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Remove every playlist with each name
    Remove {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShuffleMode {
    Enable,
    Disable,
}

struct Context {
    config: Config,
    app: PlayerApp,
    home: PathBuf,
}

impl Context {
    fn bridge(&self) -> OsascriptBridge {
        OsascriptBridge::new(self.app)
    }

    fn index_path(&self) -> PathBuf {
        configured_path(&self.config.library.index_database)
            .unwrap_or_else(|| self.app.default_index_database(&self.home))
    }

    fn content_tree_root(&self, music_path: Option<PathBuf>) -> PathBuf {
        content_tree::resolve_root(
            music_path.or_else(|| configured_path(&self.config.library.content_tree)),
            self.app,
            &self.home,
        )
    }
}

pub fn run(cli: Cli, config: Config) -> CliResult {
    let app = PlayerApp::from_choice(cli.app.unwrap_or(config.player.app))?;
    let home = dirs::home_dir().ok_or("no home directory available")?;
    let context = Context { config, app, home };

    match cli.command {
        Command::Info { verbose } => info_command(&context, verbose),
        Command::Play { track } => play_command(&context, track),
        Command::Stop => {
            let mut bridge = context.bridge();
            PlaybackController::new(&mut bridge, None).stop()?;
            Ok(())
        }
        Command::Next => Ok(context.bridge().next_track()?),
        Command::Previous => Ok(context.bridge().previous_track()?),
        Command::Shuffle { mode } => shuffle_command(&context, mode),
        Command::Volume { value } => volume_command(&context, value),
        Command::UpdateIndex { strict } => update_index_command(&context, strict),
        Command::LookupIndex { verbose, paths } => {
            lookup_index_command(&context, &paths, verbose)
        }
        Command::UpdateLibrary {
            music_path,
            position,
            metadata,
            outside_tree,
            duplicates,
        } => {
            let reconcile = &context.config.reconcile;
            let options = UpdateOptions {
                start_position: position,
                sync_metadata: metadata || reconcile.sync_metadata,
                outside_tree_action: outside_tree.unwrap_or(reconcile.outside_tree_action),
                duplicate_action: duplicates.unwrap_or(reconcile.duplicate_action),
                progress_interval: reconcile.progress_interval,
            };
            update_library_command(&context, music_path, &options)
        }
        Command::Daemon {
            log_file,
            interval,
            redis_host,
            redis_auth,
        } => daemon_command(&context, log_file, interval, redis_host, redis_auth),
        Command::Playlists { command } => playlists_command(&context, command),
    }
}

fn info_command(context: &Context, verbose: bool) -> CliResult {
    match context.bridge().current_track()? {
        Some(track) => {
            if verbose {
                if let Some(path) = &track.path {
                    println!("{}", path.display());
                }
            }
            println!("{}", track.describe());
        }
        None => println!("No song playing"),
    }
    Ok(())
}

fn play_command(context: &Context, track: Option<PathBuf>) -> CliResult {
    let mut bridge = context.bridge();
    let Some(track) = track else {
        PlaybackController::new(&mut bridge, None).toggle()?;
        return Ok(());
    };

    let index = match TrackIndex::open(&context.index_path()) {
        Ok(index) => Some(index),
        Err(err) => {
            warn!("Playing without track index: {}", err);
            None
        }
    };
    match PlaybackController::new(&mut bridge, index.as_ref()).play_path(&track)? {
        PlayOutcome::Jumped(key) => info!("Playing library entry {}", key),
        PlayOutcome::File(path) => info!("Playing {}", path.display()),
    }
    Ok(())
}

fn shuffle_command(context: &Context, mode: Option<ShuffleMode>) -> CliResult {
    let mut bridge = context.bridge();
    if let Some(mode) = mode {
        bridge.set_shuffle(mode == ShuffleMode::Enable)?;
    }
    let enabled = bridge.shuffle()?;
    println!("Shuffle {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

fn volume_command(context: &Context, value: Option<String>) -> CliResult {
    let mut bridge = context.bridge();
    let Some(value) = value else {
        println!("volume {}%", bridge.volume()?);
        return Ok(());
    };
    let request = VolumeRequest::parse(&value)?;
    PlaybackController::new(&mut bridge, None).apply_volume(request, VOLUME_FADE_STEP_DELAY)?;
    Ok(())
}

fn update_index_command(context: &Context, strict: bool) -> CliResult {
    let mut index = TrackIndex::open(&context.index_path())?
        .with_progress_interval(context.config.reconcile.progress_interval);
    println!("Update: {}", index.path().display());
    let mode = if strict || context.config.reconcile.strict {
        ReconcileMode::Strict
    } else {
        ReconcileMode::Lenient
    };

    let mut bridge = context.bridge();
    let summary = index.reconcile(bridge.entries(), mode)?;
    if summary.writes() == 0 {
        println!("Index already up to date");
    }
    println!(
        "Indexed {} entries: {} added, {} updated, {} removed, {} pruned; {} tracks in index",
        summary.processed,
        summary.inserted,
        summary.updated,
        summary.removed,
        summary.pruned,
        index.len()?
    );
    Ok(())
}

/// Looks up a user-supplied path in its canonical form, the form the index
/// stores. A path that does not resolve is reported as not indexed.
fn lookup_resolved(index: &TrackIndex, path: &Path) -> Result<i64, IndexError> {
    let resolved = path
        .canonicalize()
        .map_err(|_| IndexError::NotIndexed(path.to_path_buf()))?;
    index.lookup(&resolved)
}

fn format_unix_ms(ms: Option<i64>) -> String {
    ms.and_then(DateTime::from_timestamp_millis)
        .map(|time| time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn lookup_index_command(context: &Context, paths: &[PathBuf], verbose: bool) -> CliResult {
    let index = TrackIndex::open(&context.index_path())?;
    for path in paths {
        let key = match lookup_resolved(&index, path) {
            Ok(key) => key,
            Err(err @ IndexError::NotIndexed(_)) => {
                eprintln!("{}", err);
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        println!("{:6} {}", key, path.display());
        if verbose {
            if let Some(entry) = index.entry(key)? {
                println!(
                    "       {} modified {} added {}",
                    entry.path.display(),
                    format_unix_ms(entry.mtime),
                    entry.added.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
    }
    Ok(())
}

fn update_library_command(
    context: &Context,
    music_path: Option<PathBuf>,
    options: &UpdateOptions,
) -> CliResult {
    let root = context.content_tree_root(music_path);
    info!("Loading content tree {}", root.display());
    let tree = ContentTree::load(&root)?;
    info!(
        "Content tree {} holds {} audio files",
        tree.root().display(),
        tree.len()
    );

    let mut bridge = context.bridge();
    let summary = update_library(&mut bridge, &tree, options)?;
    println!(
        "Checked {} entries: {} removed, {} outside tree, {} duplicates kept, {} metadata synced, {} added, {} failed",
        summary.processed,
        summary.removed(),
        summary.outside_tree,
        summary.duplicates,
        summary.metadata_synced,
        summary.added,
        summary.failures
    );
    Ok(())
}

fn daemon_command(
    context: &Context,
    log_file: Option<PathBuf>,
    interval: Option<u64>,
    redis_host: Option<String>,
    redis_auth: Option<String>,
) -> CliResult {
    let settings = &context.config.daemon;
    let log_file = log_file.unwrap_or_else(|| expand_home(&settings.log_file));
    let interval = interval.unwrap_or(settings.poll_interval_secs).max(1);

    let log = PlayLog::new(log_file);
    info!("Logging played tracks to {}", log.path().display());
    let mut sinks: Vec<Box<dyn PlaySink>> = vec![Box::new(log)];

    let redis_host = redis_host.unwrap_or_else(|| settings.redis_host.clone());
    if !redis_host.is_empty() {
        let redis_auth = redis_auth
            .or_else(|| Some(settings.redis_auth.clone()))
            .filter(|auth| !auth.is_empty());
        let mut queue = RedisQueue::new(&redis_host, redis_auth, settings.redis_key.clone())?;
        match queue.ping() {
            Ok(()) => info!("Publishing played tracks to redis {}", queue.host()),
            Err(err) => warn!("{}; will retry on the next played track", err),
        }
        sinks.push(Box::new(queue));
    }

    let mut bridge = context.bridge();
    daemon::run(&mut bridge, &mut sinks, Duration::from_secs(interval))
}

fn playlists_command(context: &Context, command: PlaylistCommand) -> CliResult {
    let mut bridge = context.bridge();
    match command {
        PlaylistCommand::List {
            smart_playlists,
            yearly,
            format,
            playlists,
        } => {
            let options = ListOptions {
                include_smart: smart_playlists,
                yearly,
                format: format.as_deref().map(TrackFormat::parse).transpose()?,
            };
            for line in list_lines(&mut bridge, &playlists, &options)? {
                println!("{}", line);
            }
            Ok(())
        }
        PlaylistCommand::Create { names } => Ok(create_playlists(&mut bridge, &names)?),
        PlaylistCommand::Remove { names } => match remove_playlists(&mut bridge, &names) {
            0 => Ok(()),
            failures => Err(format!("{} playlist(s) could not be removed", failures).into()),
        },
    }
}
