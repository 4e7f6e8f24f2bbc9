pub mod app;
pub mod commands;
pub mod display;
pub mod error_handler;
pub mod play;
pub mod validation;

pub use app::{App, Config, EngineConfig, GameConfig};
pub use commands::{Cli, Commands, ConfigCommand, DifficultyArg, SideArg};
pub use error_handler::{display_error, CliError};
pub use play::{run_game, GameSettings};
pub use validation::{parse_input, validate_move, InputCommand, ValidationError};
