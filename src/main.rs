// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::fs::File;
use std::io::BufReader;
use std::io::Write;
use std::path::{Path, PathBuf};

use prawko::app_config::{self, Config};
use prawko::app_controller::Controller;
use prawko::enrichment::ArtifactKind;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for ArtifactKind to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliArtifact {
    /// Language-separated slide text
    Text,
    /// Synthesized narration
    Audio,
}

impl From<CliArtifact> for ArtifactKind {
    fn from(artifact: CliArtifact) -> Self {
        match artifact {
            CliArtifact::Text => ArtifactKind::Text,
            CliArtifact::Audio => ArtifactKind::Audio,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy modules, subjects and slides from the course provider
    Scrape,

    /// Compute a missing artifact for every slide that lacks it
    Enrich {
        #[arg(value_enum)]
        artifact: CliArtifact,
    },

    /// Synthesize one slide's formatted text into an audio file
    Speak {
        /// Slide to narrate
        #[arg(long)]
        slide_id: i64,

        /// Destination audio file
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,
    },

    /// List the voices offered by the speech provider
    Voices,

    /// Run the chat bot until interrupted
    Bot,

    /// Show database row counts
    Stats,

    /// Generate shell completions for prawko
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// prawko - driving-course content toolkit
///
/// Scrapes course content into SQLite, separates bilingual slide text,
/// narrates it and serves it through a chat bot.
#[derive(Parser, Debug)]
#[command(name = "prawko")]
#[command(version)]
#[command(about = "Driving-course content scraper, enricher and chat bot")]
#[command(long_about = "prawko copies driving-course content into a local database and enriches it.

EXAMPLES:
    prawko scrape                               # Copy the course tree
    prawko enrich text                          # Separate slide text by language
    prawko enrich audio                         # Narrate formatted slides
    prawko speak --slide-id 12 -o 12.mp3        # Narrate one slide into a file
    prawko --log-level debug bot                # Run the bot with debug logging
    prawko completions bash > prawko.bash       # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json", env = "PRAWKO_CONFIG")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // the logger itself passes everything, `set_max_level` does the filtering
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (colour, tag) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", colour, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "prawko", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(cmd_log_level) = &cli.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = load_or_create_config(&cli.config_path)?;
    match &cli.log_level {
        Some(log_level) => config.log_level = log_level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    let controller = Controller::with_config(config)?;

    match cli.command {
        Commands::Scrape => {
            let report = controller.scrape().await?;
            info!("Scraped {}", report);
        }
        Commands::Enrich { artifact } => {
            let report = controller.enrich(artifact.into()).await?;
            info!("{}", report);
        }
        Commands::Speak { slide_id, output } => {
            controller.speak(slide_id, &output).await?;
        }
        Commands::Voices => {
            for voice in controller.voices().await? {
                println!(
                    "{}\t{}\t{}",
                    voice.voice_id,
                    voice.name,
                    voice.category.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Bot => controller.run_bot().await?,
        Commands::Stats => println!("{}", controller.stats()?),
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Load the configuration file, writing a default one when it is missing
fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?;

        return Ok(config);
    }

    warn!("Config file not found at '{}', creating default config.", config_path);

    let config = Config::default();
    let config_json = serde_json::to_string_pretty(&config)
        .context("Failed to serialize default config to JSON")?;

    std::fs::write(config_path, config_json)
        .context(format!("Failed to write default config to file: {}", config_path))?;

    Ok(config)
}
