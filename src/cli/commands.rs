use crate::chess::Color;
use crate::orchestrator::Difficulty;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "knightfall")]
#[command(about = "Play chess in the terminal against a UCI engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a game against the engine
    ///
    /// Options given here override the configuration file for this game only.
    /// Type 'help' once the board is shown to list the in-game commands.
    ///
    /// Examples:
    ///   knightfall play
    ///   knightfall play --engine /usr/bin/stockfish
    ///   knightfall play --difficulty hard --color black
    Play {
        /// Path to the engine binary
        #[arg(short, long)]
        engine: Option<PathBuf>,
        /// Engine strength
        #[arg(short, long, value_enum)]
        difficulty: Option<DifficultyArg>,
        /// Which side you play
        #[arg(short, long, value_enum)]
        color: Option<SideArg>,
    },

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// List difficulty levels and what they mean
    Difficulties,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the configuration file path
    Path,
    /// Print the configuration in effect
    Show,
    /// Write the default configuration (overwrites existing)
    Init,
}

/// Difficulty names accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DifficultyArg {
    Easy,
    Normal,
    Hard,
    Hell,
}

impl From<DifficultyArg> for Difficulty {
    fn from(level: DifficultyArg) -> Self {
        match level {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Normal => Difficulty::Normal,
            DifficultyArg::Hard => Difficulty::Hard,
            DifficultyArg::Hell => Difficulty::Hell,
        }
    }
}

/// Side choice accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SideArg {
    White,
    Black,
}

impl From<SideArg> for Color {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::White => Color::White,
            SideArg::Black => Color::Black,
        }
    }
}
