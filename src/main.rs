mod cli;
mod config;
mod config_persistence;
mod content_tree;
mod daemon;
mod library_update;
mod media_file_discovery;
mod metadata_tags;
mod playback;
mod playlists;
mod player;
mod tag_sync;
mod track_index;

use clap::Parser;
use log::debug;

use cli::Cli;
use config_persistence::{default_config_path, load_or_create_config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut clog = colog::default_builder();
    let level = if cli.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    clog.filter(None, level);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let config_file = match &cli.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    debug!("Using config file {}", config_file.display());
    let config = load_or_create_config(&config_file)?;

    cli::run(cli, config)
}
