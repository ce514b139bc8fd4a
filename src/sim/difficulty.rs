//! Difficulty tiers and the tuning tables that depend on them

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Difficulty tier selected before a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Nightmare,
}

/// Pipe obstacle tuning for one difficulty tier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipeSettings {
    /// Chance per round that pipes appear at all
    pub spawn_chance: f32,
    /// Earliest round pipes may appear
    pub min_round: u32,
    /// Delay range between pipe spawns (ms)
    pub min_spawn_delay_ms: u64,
    pub max_spawn_delay_ms: u64,
    pub max_pipes_per_round: u32,
    /// Gap height at reference resolution
    pub gap_height: f32,
    pub speed_multiplier: f32,
    /// Range for the gap's vertical drift speed
    pub vertical_speed: (f32, f32),
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Nightmare,
    ];

    /// Display name ("Easy", "Medium", ...)
    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Nightmare => "Nightmare",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Difficulty::Easy => "Slow and steady",
            Difficulty::Medium => "Balanced challenge",
            Difficulty::Hard => "Fast and furious",
            Difficulty::Nightmare => "Insane speed!",
        }
    }

    /// Parse a display name, case-insensitive
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(name))
    }

    /// Index into the 4-entry per-difficulty tables
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Cycle to the previous tier (wraps)
    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// Cycle to the next tier (wraps)
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Pick the value for this tier from a per-difficulty table
    #[inline]
    pub fn pick<T: Copy>(self, table: [T; 4]) -> T {
        table[self.index()]
    }

    pub fn base_speed_multiplier(self) -> f32 {
        self.pick([0.3, 0.4, 0.6, 0.8])
    }

    pub fn speed_increase_per_round(self) -> f32 {
        self.pick([0.01, 0.015, 0.02, 0.025])
    }

    pub fn max_speed_multiplier(self) -> f32 {
        self.pick([1.5, 2.0, 2.5, 3.0])
    }

    /// Speed multiplier for a round: grows linearly, capped per tier
    pub fn speed_multiplier(self, round: u32) -> f32 {
        let bonus = round.saturating_sub(1) as f32 * self.speed_increase_per_round();
        (self.base_speed_multiplier() + bonus).min(self.max_speed_multiplier())
    }

    pub fn pipe_settings(self) -> PipeSettings {
        match self {
            Difficulty::Easy => PipeSettings {
                spawn_chance: 0.15,
                min_round: 8,
                min_spawn_delay_ms: 5000,
                max_spawn_delay_ms: 15000,
                max_pipes_per_round: 2,
                gap_height: 200.0,
                speed_multiplier: 0.8,
                vertical_speed: (0.3, 1.0),
            },
            Difficulty::Medium => PipeSettings {
                spawn_chance: 0.25,
                min_round: 6,
                min_spawn_delay_ms: 4000,
                max_spawn_delay_ms: 12000,
                max_pipes_per_round: 3,
                gap_height: 180.0,
                speed_multiplier: 1.0,
                vertical_speed: (0.4, 1.2),
            },
            Difficulty::Hard => PipeSettings {
                spawn_chance: 0.45,
                min_round: 4,
                min_spawn_delay_ms: 3000,
                max_spawn_delay_ms: 10000,
                max_pipes_per_round: 4,
                gap_height: 160.0,
                speed_multiplier: 1.2,
                vertical_speed: (0.5, 1.5),
            },
            Difficulty::Nightmare => PipeSettings {
                spawn_chance: 0.55,
                min_round: 1,
                min_spawn_delay_ms: 2000,
                max_spawn_delay_ms: 8000,
                max_pipes_per_round: 5,
                gap_height: 140.0,
                speed_multiplier: 1.5,
                vertical_speed: (0.6, 2.0),
            },
        }
    }

    /// Maximum spinners allowed in a round
    pub fn max_spinners(self, round: u32) -> u32 {
        let thresholds: [(u32, u32); 3] = match self {
            Difficulty::Easy => [(5, 1), (10, 2), (17, 3)],
            Difficulty::Medium => [(4, 1), (8, 2), (14, 3)],
            Difficulty::Hard => [(3, 1), (6, 2), (10, 3)],
            Difficulty::Nightmare => [(2, 1), (4, 2), (7, 3)],
        };
        thresholds
            .iter()
            .filter(|(min_round, _)| round >= *min_round)
            .map(|(_, max)| *max)
            .last()
            .unwrap_or(0)
    }

    /// Probability of 0, 1, 2 or 3 spinners in a round
    pub fn spinner_chances(self) -> [f32; 4] {
        match self {
            Difficulty::Easy => [0.80, 0.15, 0.04, 0.01],
            Difficulty::Medium => [0.65, 0.25, 0.08, 0.02],
            Difficulty::Hard => [0.45, 0.35, 0.15, 0.05],
            Difficulty::Nightmare => [0.30, 0.40, 0.20, 0.10],
        }
    }

    /// Roll how many spinners this round gets (capped at the round's max)
    pub fn roll_spinner_count(self, round: u32, rng: &mut impl Rng) -> u32 {
        let roll: f32 = rng.random();
        let mut cumulative = 0.0;
        for (count, chance) in self.spinner_chances().iter().enumerate() {
            cumulative += chance;
            if roll < cumulative {
                return (count as u32).min(self.max_spinners(round));
            }
        }
        0
    }

    /// Circles per round once past round 20
    pub fn late_round_circle_cap(self) -> u32 {
        self.pick([20, 23, 27, 35])
    }

    /// Largest pipe burst this tier allows
    pub fn max_burst(self) -> u32 {
        self.pick([3, 3, 5, 5])
    }
}
