//! Playback monitor: polls the player and logs every track that starts.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};
use log::{debug, info, warn};

use crate::player::{BridgeError, PlayerControl, PlayerState, TrackSummary};

const PLAY_LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Longest played-track list kept in redis.
pub const MAX_REDIS_LIST_ITEMS: isize = 8000;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("error writing to {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("redis {host}: {source}")]
    Redis {
        host: String,
        #[source]
        source: redis::RedisError,
    },
}

/// A player state or track transition seen by [`StatusMonitor::poll`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub state: PlayerState,
    /// Present only while playing.
    pub track: Option<TrackSummary>,
    /// Local time the current track started, derived from the play position.
    pub started: Option<DateTime<Local>>,
}

/// Remembers the last reported state and track between polls.
#[derive(Debug, Default)]
pub struct StatusMonitor {
    state: Option<PlayerState>,
    track_id: Option<i64>,
}

impl StatusMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a change when the state or the current track differs from the
    /// previous poll.
    pub fn poll<P: PlayerControl>(
        &mut self,
        player: &mut P,
        now: DateTime<Local>,
    ) -> Result<Option<StatusChange>, BridgeError> {
        let state = player.state()?;
        let current = player.current_track()?;
        let track_id = current.as_ref().map(|track| track.id);

        if self.state == Some(state) && self.track_id == track_id {
            return Ok(None);
        }
        self.state = Some(state);
        self.track_id = track_id;

        if state != PlayerState::Playing {
            return Ok(Some(StatusChange {
                state,
                track: None,
                started: None,
            }));
        }

        let started = match current {
            Some(_) => {
                let position = player.position()?.max(0.0);
                let elapsed = TimeDelta::milliseconds((position * 1_000.0) as i64);
                Some(now - elapsed)
            }
            None => None,
        };
        Ok(Some(StatusChange {
            state,
            track: current,
            started,
        }))
    }
}

/// `"<started> <path>"`, the line format shared by every sink.
fn play_line(started: DateTime<Local>, track: &Path) -> String {
    format!("{} {}", started.format(PLAY_LOG_TIME_FORMAT), track.display())
}

/// Destination for tracks that start playing.
pub trait PlaySink {
    fn publish(&mut self, started: DateTime<Local>, track: &Path) -> Result<(), DaemonError>;
}

/// Append-only log of played tracks.
#[derive(Debug, Clone)]
pub struct PlayLog {
    path: PathBuf,
}

impl PlayLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, started: DateTime<Local>, track: &Path) -> Result<(), DaemonError> {
        let io_error = |source| DaemonError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_error)?;
        writeln!(file, "{}", play_line(started, track)).map_err(io_error)
    }
}

impl PlaySink for PlayLog {
    fn publish(&mut self, started: DateTime<Local>, track: &Path) -> Result<(), DaemonError> {
        self.append(started, track)
    }
}

fn redis_url(host: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("redis://{host}/")
    }
}

/// Redis list of played tracks, newest first, trimmed to
/// [`MAX_REDIS_LIST_ITEMS`].
///
/// The connection is opened on first use and dropped after any failure, so
/// the next publish reconnects.
pub struct RedisQueue {
    host: String,
    auth: Option<String>,
    key: String,
    client: redis::Client,
    connection: Option<redis::Connection>,
}

impl RedisQueue {
    pub fn new(host: &str, auth: Option<String>, key: String) -> Result<Self, DaemonError> {
        let client = redis::Client::open(redis_url(host)).map_err(|source| DaemonError::Redis {
            host: host.to_string(),
            source,
        })?;
        Ok(Self {
            host: host.to_string(),
            auth,
            key,
            client,
            connection: None,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn connection(&mut self) -> redis::RedisResult<&mut redis::Connection> {
        match &mut self.connection {
            Some(connection) => Ok(connection),
            slot @ None => {
                let mut connection = self.client.get_connection()?;
                if let Some(auth) = &self.auth {
                    redis::cmd("AUTH").arg(auth).query::<()>(&mut connection)?;
                }
                Ok(slot.insert(connection))
            }
        }
    }

    fn run_query<T>(
        &mut self,
        query: impl FnOnce(&mut redis::Connection) -> redis::RedisResult<T>,
    ) -> Result<T, DaemonError> {
        let result = self.connection().and_then(query);
        result.map_err(|source| {
            self.connection = None;
            DaemonError::Redis {
                host: self.host.clone(),
                source,
            }
        })
    }

    pub fn ping(&mut self) -> Result<(), DaemonError> {
        self.run_query(|connection| redis::cmd("PING").query::<String>(connection))?;
        Ok(())
    }
}

impl PlaySink for RedisQueue {
    fn publish(&mut self, started: DateTime<Local>, track: &Path) -> Result<(), DaemonError> {
        let key = self.key.clone();
        let item = play_line(started, track);
        self.run_query(|connection| {
            redis::pipe()
                .cmd("LPUSH")
                .arg(&key)
                .arg(&item)
                .ignore()
                .cmd("LTRIM")
                .arg(&key)
                .arg(0)
                .arg(MAX_REDIS_LIST_ITEMS - 1)
                .ignore()
                .query::<()>(connection)
        })
    }
}

/// Start time and file of a change that is a track starting to play.
fn started_track(change: &StatusChange) -> Option<(DateTime<Local>, &Path)> {
    match (&change.track, change.started) {
        (Some(TrackSummary { path: Some(path), .. }), Some(started)) => {
            Some((started, path.as_path()))
        }
        _ => None,
    }
}

/// Hands a started track to every sink. A failing sink is logged and does
/// not keep the track from the others. Returns how many sinks took it.
pub fn publish(change: &StatusChange, sinks: &mut [Box<dyn PlaySink>]) -> usize {
    let Some((started, track)) = started_track(change) else {
        return 0;
    };
    let mut published = 0;
    for sink in sinks.iter_mut() {
        match sink.publish(started, track) {
            Ok(()) => published += 1,
            Err(err) => warn!("Could not record played track: {}", err),
        }
    }
    published
}

/// Polls forever. Player and sink errors are logged and the next tick
/// carries on.
pub fn run<P: PlayerControl>(
    player: &mut P,
    sinks: &mut [Box<dyn PlaySink>],
    interval: Duration,
) -> ! {
    info!(
        "Monitoring player every {:?} with {} play sink(s)",
        interval,
        sinks.len()
    );
    let mut monitor = StatusMonitor::new();
    loop {
        match monitor.poll(player, Local::now()) {
            Ok(Some(change)) => {
                debug!("Player {}", change.state);
                if let Some(track) = &change.track {
                    info!("Playing {} - {}", track.artist, track.name);
                }
                publish(&change, sinks);
            }
            Ok(None) => {}
            Err(err) if err.is_host_unavailable() => debug!("{}", err),
            Err(err) => warn!("Player status poll failed: {}", err),
        }
        std::thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_file_discovery::testing::TempTree;
    use crate::player::control::testing::FakePlayer;
    use chrono::TimeZone;

    fn track(id: i64, path: &str) -> TrackSummary {
        TrackSummary {
            id,
            path: Some(PathBuf::from(path)),
            name: format!("Track {id}"),
            ..TrackSummary::default()
        }
    }

    fn noon() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .expect("unambiguous local time")
    }

    #[test]
    fn test_poll_reports_start_and_derives_started_time() {
        let mut player = FakePlayer {
            state: PlayerState::Playing,
            current: Some(track(1, "/music/a.mp3")),
            position: 90.0,
            ..FakePlayer::default()
        };
        let mut monitor = StatusMonitor::new();

        let change = monitor
            .poll(&mut player, noon())
            .unwrap()
            .expect("first poll should report");
        assert_eq!(change.state, PlayerState::Playing);
        assert_eq!(change.track.map(|track| track.id), Some(1));
        assert_eq!(
            change.started.map(|started| started.format(PLAY_LOG_TIME_FORMAT).to_string()),
            Some("2024-05-01 11:58:30".to_string())
        );
    }

    #[test]
    fn test_poll_is_quiet_until_state_or_track_changes() {
        let mut player = FakePlayer {
            state: PlayerState::Playing,
            current: Some(track(1, "/music/a.mp3")),
            ..FakePlayer::default()
        };
        let mut monitor = StatusMonitor::new();
        assert!(monitor.poll(&mut player, noon()).unwrap().is_some());
        assert!(monitor.poll(&mut player, noon()).unwrap().is_none());

        player.state = PlayerState::Paused;
        let paused = monitor.poll(&mut player, noon()).unwrap().unwrap();
        assert_eq!(paused.state, PlayerState::Paused);
        assert!(paused.track.is_none());

        player.state = PlayerState::Playing;
        assert!(monitor.poll(&mut player, noon()).unwrap().is_some());

        player.current = Some(track(2, "/music/b.mp3"));
        let next = monitor.poll(&mut player, noon()).unwrap().unwrap();
        assert_eq!(next.track.map(|track| track.id), Some(2));
    }

    fn started(id: i64, path: &str) -> StatusChange {
        StatusChange {
            state: PlayerState::Playing,
            track: Some(track(id, path)),
            started: Some(noon()),
        }
    }

    /// Counts publishes and fails every call when `broken`.
    struct CountingSink {
        broken: bool,
        published: std::rc::Rc<std::cell::Cell<usize>>,
    }

    impl PlaySink for CountingSink {
        fn publish(&mut self, _started: DateTime<Local>, track: &Path) -> Result<(), DaemonError> {
            if self.broken {
                return Err(DaemonError::Io {
                    path: track.to_path_buf(),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.published.set(self.published.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn test_play_log_appends_started_and_path() {
        let tree = TempTree::new("play_log");
        let log = PlayLog::new(tree.root.join("Logs/tunebridge.log"));
        let mut sinks: Vec<Box<dyn PlaySink>> = vec![Box::new(log.clone())];

        assert_eq!(publish(&started(3, "/music/c.mp3"), &mut sinks), 1);
        assert_eq!(publish(&started(3, "/music/c.mp3"), &mut sinks), 1);
        let stopped = StatusChange {
            state: PlayerState::Stopped,
            track: None,
            started: None,
        };
        assert_eq!(publish(&stopped, &mut sinks), 0);

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            content,
            "2024-05-01 12:00:00 /music/c.mp3\n2024-05-01 12:00:00 /music/c.mp3\n"
        );
    }

    #[test]
    fn test_publish_skips_tracks_without_path() {
        let tree = TempTree::new("play_log_no_path");
        let log = PlayLog::new(tree.root.join("tunebridge.log"));
        let change = StatusChange {
            state: PlayerState::Playing,
            track: Some(TrackSummary::default()),
            started: Some(noon()),
        };
        let mut sinks: Vec<Box<dyn PlaySink>> = vec![Box::new(log.clone())];
        assert_eq!(publish(&change, &mut sinks), 0);
        assert!(!log.path().exists());
    }

    #[test]
    fn test_failing_sink_does_not_stop_the_others() {
        let published = std::rc::Rc::new(std::cell::Cell::new(0));
        let mut sinks: Vec<Box<dyn PlaySink>> = vec![
            Box::new(CountingSink {
                broken: true,
                published: published.clone(),
            }),
            Box::new(CountingSink {
                broken: false,
                published: published.clone(),
            }),
        ];

        assert_eq!(publish(&started(1, "/music/a.mp3"), &mut sinks), 1);
        assert_eq!(publish(&started(2, "/music/b.mp3"), &mut sinks), 1);
        assert_eq!(published.get(), 2);
    }

    #[test]
    fn test_unwritable_play_log_reports_io_error() {
        let tree = TempTree::new("play_log_blocked");
        let blocker = tree.file("blocker");
        let mut log = PlayLog::new(blocker.join("tunebridge.log"));
        assert!(matches!(
            log.publish(noon(), Path::new("/music/a.mp3")),
            Err(DaemonError::Io { .. })
        ));

        let mut sinks: Vec<Box<dyn PlaySink>> = vec![Box::new(log)];
        assert_eq!(publish(&started(1, "/music/a.mp3"), &mut sinks), 0);
    }

    #[test]
    fn test_redis_url_accepts_host_or_url() {
        assert_eq!(redis_url("localhost"), "redis://localhost/");
        assert_eq!(redis_url("10.0.0.2:6380"), "redis://10.0.0.2:6380/");
        assert_eq!(redis_url("rediss://cache:6380/2"), "rediss://cache:6380/2");
    }

    #[test]
    fn test_redis_queue_unreachable_server_fails_and_reconnects_later() {
        let mut queue = RedisQueue::new("127.0.0.1:1", None, "tunebridge".to_string()).unwrap();
        assert_eq!(queue.host(), "127.0.0.1:1");

        assert!(matches!(
            queue.publish(noon(), Path::new("/music/a.mp3")),
            Err(DaemonError::Redis { .. })
        ));
        assert!(queue.connection.is_none());
        assert!(matches!(queue.ping(), Err(DaemonError::Redis { .. })));
    }
}
