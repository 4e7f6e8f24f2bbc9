use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Playing strength of the engine side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
    Hell,
}

/// Search policy for one difficulty level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyProfile {
    pub min_depth: u32,
    pub max_depth: u32,
    /// Chance that a turn skips the engine and plays a random legal move
    pub mistake_probability: f64,
}

impl DifficultyProfile {
    /// Uniform in `min_depth..=max_depth`
    pub fn pick_depth<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.min_depth..=self.max_depth)
    }

    pub fn roll_mistake<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        self.mistake_probability > 0.0 && rng.gen_bool(self.mistake_probability)
    }
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Normal,
        Difficulty::Hard,
        Difficulty::Hell,
    ];

    pub fn profile(&self) -> DifficultyProfile {
        let (min_depth, max_depth, mistake_probability) = match self {
            Difficulty::Easy => (1, 2, 0.3),
            Difficulty::Normal => (5, 8, 0.0),
            Difficulty::Hard => (12, 15, 0.0),
            Difficulty::Hell => (20, 22, 0.0),
        };
        DifficultyProfile {
            min_depth,
            max_depth,
            mistake_probability,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
            Difficulty::Hell => "hell",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown difficulty '{0}' (expected easy, normal, hard or hell)")]
pub struct UnknownDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownDifficulty(s.to_string()))
    }
}
