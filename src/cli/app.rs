use crate::chess::Color;
use crate::cli::commands::ConfigCommand;
use crate::cli::display;
use crate::cli::play::{run_game, GameSettings};
use crate::engine::ClientConfig;
use crate::orchestrator::Difficulty;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub game: GameConfig,
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
}

/// How to start and talk to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine binary, looked up on `PATH` when not absolute
    pub path: PathBuf,
    pub args: Vec<String>,
    pub request_timeout_ms: u64,
    pub handshake_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub difficulty: Difficulty,
    /// The side the human plays
    pub player_color: Color,
    /// Pause before a deliberate weak move
    pub mistake_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            game: GameConfig::default(),
            log_level: "warn".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let client = ClientConfig::default();
        Self {
            path: PathBuf::from("stockfish"),
            args: Vec::new(),
            request_timeout_ms: client.request_timeout.as_millis() as u64,
            handshake_timeout_ms: client.handshake_timeout.as_millis() as u64,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            player_color: Color::White,
            mistake_delay_ms: crate::orchestrator::DEFAULT_MISTAKE_DELAY.as_millis() as u64,
        }
    }
}

impl EngineConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            handshake_timeout: Duration::from_millis(self.handshake_timeout_ms),
        }
    }
}

impl Config {
    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        ProjectDirs::from("dev", "knightfall", "knightfall")
            .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    /// Get the default config file path
    pub fn default_config_file() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default() -> Result<Self> {
        Self::load_or_create(&Self::default_config_file()?)
    }

    pub fn load_or_create(config_file: &Path) -> Result<Self> {
        if config_file.exists() {
            Self::load(config_file)
        } else {
            let config = Config::default();
            config.save_to(config_file)?;
            Ok(config)
        }
    }

    pub fn load(config_file: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_file).with_context(|| {
            format!(
                "Failed to read configuration file {}",
                config_file.display()
            )
        })?;
        toml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse configuration file {}",
                config_file.display()
            )
        })
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_file()?)
    }

    pub fn save_to(&self, config_file: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = config_file.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(config_file, content).context("Failed to write configuration file")?;

        Ok(())
    }

    pub fn mistake_delay(&self) -> Duration {
        Duration::from_millis(self.game.mistake_delay_ms)
    }
}

/// Main application state
pub struct App {
    /// Application configuration
    pub config: Config,
}

impl App {
    /// Create a new App instance, loading or creating the configuration
    pub fn new() -> Result<Self> {
        let config =
            Config::load_or_create_default().context("Failed to initialize configuration")?;
        Ok(App { config })
    }

    pub fn with_config(config: Config) -> Self {
        App { config }
    }

    /// Handle the 'play' command. Flags override the configuration for this game.
    pub async fn handle_play(
        &self,
        engine: Option<PathBuf>,
        difficulty: Option<Difficulty>,
        color: Option<Color>,
    ) -> Result<()> {
        let settings = GameSettings {
            engine_path: engine.unwrap_or_else(|| self.config.engine.path.clone()),
            engine_args: self.config.engine.args.clone(),
            client: self.config.engine.client_config(),
            difficulty: difficulty.unwrap_or(self.config.game.difficulty),
            human: color.unwrap_or(self.config.game.player_color),
            mistake_delay: self.config.mistake_delay(),
        };

        run_game(settings).await
    }

    /// Handle the 'config' command
    pub fn handle_config(&self, command: ConfigCommand) -> Result<()> {
        match command {
            ConfigCommand::Path => {
                let path = Config::default_config_file()?;
                println!("{}", path.display());
                if !path.exists() {
                    println!("(not created yet, run 'knightfall config init')");
                }
            }
            ConfigCommand::Show => {
                let content = toml::to_string_pretty(&self.config)
                    .context("Failed to serialize configuration")?;
                print!("{}", content);
            }
            ConfigCommand::Init => {
                let path = Config::default_config_file()?;
                Config::default()
                    .save_to(&path)
                    .context("Failed to save configuration")?;
                println!("Wrote default configuration to {}", path.display());
            }
        }
        Ok(())
    }

    /// Handle the 'difficulties' command
    pub fn handle_difficulties(&self) {
        display::display_difficulties(self.config.game.difficulty);
    }
}
