use std::path::PathBuf;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use crate::config::MonitorConfig;

#[derive(Parser)]
#[command(name = "media-monitor")]
#[command(version)]
#[command(about = "Watches media directories and broadcasts file events")]
#[command(long_about = "Media Monitor watches an organize drop directory and any number of store directories. Finished or moved-in media files in the organize directory produce ORGANIZE events; additions and removals in store directories produce NEW and DELETE events. Files with unsupported extensions are ignored.")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE", help = "Configuration file")]
    pub config: Option<PathBuf>,

    /// Drop directory whose finished files should be organized
    #[arg(long, value_name = "DIR", help = "Directory to watch for files to organize")]
    pub organize: Option<PathBuf>,

    /// Library directories to mirror
    #[arg(long, value_name = "DIR", help = "Store directory to watch (repeatable)")]
    pub store: Vec<PathBuf>,

    /// Supported file extensions
    #[arg(long, value_delimiter = ',', help = "File extensions to track (e.g., mp3,ogg)")]
    pub extensions: Option<Vec<String>>,

    #[arg(long, value_name = "NAME", help = "Channel for organize events")]
    pub organize_channel: Option<String>,

    #[arg(long, value_name = "NAME", help = "Channel for store events")]
    pub store_channel: Option<String>,

    /// Output format for delivered events
    #[arg(long, default_value = "text", help = "Output format")]
    pub output: OutputFormat,

    /// Disable colors in output
    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Timestamped, colored lines
    Text,
    /// JSON for scripting
    Json,
    /// Compact single-line format
    Compact,
}

impl Cli {
    /// Resolve the effective configuration: file, then environment, then flags
    pub fn build_config(&self) -> Result<MonitorConfig> {
        let mut config = MonitorConfig::load_or_default(self.config.as_deref())?;
        config.apply_env();
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut MonitorConfig) {
        if let Some(ref extensions) = self.extensions {
            config.extensions.supported = extensions.clone();
        }

        if let Some(ref path) = self.organize {
            config.organize.path = Some(path.clone());
        }

        if !self.store.is_empty() {
            config.store.paths = self.store.clone();
        }

        if let Some(ref channel) = self.organize_channel {
            config.organize.channel = channel.clone();
        }

        if let Some(ref channel) = self.store_channel {
            config.store.channel = channel.clone();
        }
    }

    pub fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(std::io::stderr)
            .init();
    }
}
