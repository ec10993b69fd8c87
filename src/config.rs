//! Persisted user configuration model.

/// Top-level persisted configuration.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    /// Which host player to drive.
    #[serde(default)]
    pub player: PlayerConfig,
    /// Content tree and index database locations.
    #[serde(default)]
    pub library: LibraryConfig,
    /// Index reconciliation and library maintenance policy.
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    /// Playback monitor daemon settings.
    #[serde(default)]
    pub daemon: DaemonConfig,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub app: PlayerChoice,
}

/// Host player selection as written in config or passed with `--app`.
#[derive(
    Debug,
    Clone,
    Copy,
    serde::Deserialize,
    serde::Serialize,
    PartialEq,
    Eq,
    Default,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum PlayerChoice {
    #[default]
    Auto,
    Music,
    Itunes,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LibraryConfig {
    /// Root of the managed audio files. Empty means "ask the player".
    #[serde(default)]
    pub content_tree: String,
    /// Index database file. Empty means the player data directory default.
    #[serde(default)]
    pub index_database: String,
}

/// What to do with a library entry whose file lives outside the content tree.
#[derive(
    Debug,
    Clone,
    Copy,
    serde::Deserialize,
    serde::Serialize,
    PartialEq,
    Eq,
    Default,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OutsideTreeAction {
    #[default]
    Report,
    Delete,
}

/// What to do with a later library entry resolving to an already seen file.
#[derive(
    Debug,
    Clone,
    Copy,
    serde::Deserialize,
    serde::Serialize,
    PartialEq,
    Eq,
    Default,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateAction {
    #[default]
    Delete,
    Report,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub outside_tree_action: OutsideTreeAction,
    #[serde(default)]
    pub duplicate_action: DuplicateAction,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
    #[serde(default)]
    pub sync_metadata: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct DaemonConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    /// Redis server receiving played tracks. Empty disables publishing.
    #[serde(default)]
    pub redis_host: String,
    #[serde(default)]
    pub redis_auth: String,
    #[serde(default = "default_redis_key")]
    pub redis_key: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            strict: false,
            outside_tree_action: OutsideTreeAction::Report,
            duplicate_action: DuplicateAction::Delete,
            progress_interval: default_progress_interval(),
            sync_metadata: false,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            log_file: default_log_file(),
            redis_host: String::new(),
            redis_auth: String::new(),
            redis_key: default_redis_key(),
        }
    }
}

fn default_progress_interval() -> usize {
    1_000
}

fn default_poll_interval_secs() -> u64 {
    1
}

fn default_log_file() -> String {
    "~/Library/Logs/tunebridge.log".to_string()
}

fn default_redis_key() -> String {
    "tunebridge".to_string()
}

/// Clamps numeric settings into their usable ranges and trims paths.
pub fn sanitize_config(config: Config) -> Config {
    Config {
        player: config.player,
        library: LibraryConfig {
            content_tree: config.library.content_tree.trim().to_string(),
            index_database: config.library.index_database.trim().to_string(),
        },
        reconcile: ReconcileConfig {
            progress_interval: config.reconcile.progress_interval.clamp(1, 1_000_000),
            ..config.reconcile
        },
        daemon: DaemonConfig {
            poll_interval_secs: config.daemon.poll_interval_secs.clamp(1, 3_600),
            log_file: match config.daemon.log_file.trim() {
                "" => default_log_file(),
                trimmed => trimmed.to_string(),
            },
            redis_host: config.daemon.redis_host.trim().to_string(),
            redis_auth: config.daemon.redis_auth,
            redis_key: match config.daemon.redis_key.trim() {
                "" => default_redis_key(),
                trimmed => trimmed.to_string(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{
        sanitize_config, Config, DaemonConfig, DuplicateAction, OutsideTreeAction, PlayerChoice,
        ReconcileConfig,
    };

    #[test]
    fn test_default_config_has_expected_values() {
        let config = Config::default();

        assert_eq!(config.player.app, PlayerChoice::Auto);
        assert!(config.library.content_tree.is_empty());
        assert!(config.library.index_database.is_empty());
        assert!(!config.reconcile.strict);
        assert_eq!(
            config.reconcile.outside_tree_action,
            OutsideTreeAction::Report
        );
        assert_eq!(config.reconcile.duplicate_action, DuplicateAction::Delete);
        assert_eq!(config.reconcile.progress_interval, 1_000);
        assert!(!config.reconcile.sync_metadata);
        assert_eq!(config.daemon.poll_interval_secs, 1);
        assert_eq!(config.daemon.log_file, "~/Library/Logs/tunebridge.log");
        assert!(config.daemon.redis_host.is_empty());
        assert_eq!(config.daemon.redis_key, "tunebridge");
    }

    #[test]
    fn test_partial_config_fills_missing_sections_with_defaults() {
        let partial = r#"
[player]
app = "itunes"

[reconcile]
duplicate_action = "report"
"#;

        let parsed: Config = toml::from_str(partial).expect("config should parse");
        assert_eq!(parsed.player.app, PlayerChoice::Itunes);
        assert_eq!(parsed.reconcile.duplicate_action, DuplicateAction::Report);
        assert_eq!(
            parsed.reconcile.outside_tree_action,
            OutsideTreeAction::Report
        );
        assert_eq!(parsed.reconcile.progress_interval, 1_000);
        assert_eq!(parsed.daemon, DaemonConfig::default());
    }

    #[test]
    fn test_system_config_template_matches_default_values() {
        let parsed: Config = toml::from_str(include_str!("../config/config.system.toml"))
            .expect("system config template should parse");
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_unknown_player_choice_is_rejected() {
        let result = toml::from_str::<Config>("[player]\napp = \"winamp\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_sanitize_config_clamps_intervals_and_trims_paths() {
        let input = Config {
            library: super::LibraryConfig {
                content_tree: "  /Volumes/Music  ".to_string(),
                index_database: " ".to_string(),
            },
            reconcile: ReconcileConfig {
                progress_interval: 0,
                ..ReconcileConfig::default()
            },
            daemon: DaemonConfig {
                poll_interval_secs: 0,
                log_file: "   ".to_string(),
                redis_host: " localhost:6379 ".to_string(),
                redis_auth: String::new(),
                redis_key: "".to_string(),
            },
            ..Config::default()
        };

        let sanitized = sanitize_config(input);
        assert_eq!(sanitized.library.content_tree, "/Volumes/Music");
        assert!(sanitized.library.index_database.is_empty());
        assert_eq!(sanitized.reconcile.progress_interval, 1);
        assert_eq!(sanitized.daemon.poll_interval_secs, 1);
        assert_eq!(sanitized.daemon.log_file, "~/Library/Logs/tunebridge.log");
        assert_eq!(sanitized.daemon.redis_host, "localhost:6379");
        assert_eq!(sanitized.daemon.redis_key, "tunebridge");
    }
}
