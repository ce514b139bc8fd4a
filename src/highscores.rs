//! High score leaderboard
//!
//! One entry per player per difficulty/mode label, best 15 kept, sorted by
//! score. Persisted as a JSON array under [`HighScores::STORAGE_KEY`].

use serde::{Deserialize, Serialize};

use crate::persistence::{self, Store};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 15;
/// Longest name the game over screen accepts
pub const MAX_NAME_LEN: usize = 20;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub name: String,
    pub score: u32,
    pub round_reached: u32,
    /// Mode label, e.g. "Hard (Timed) 90s"
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default)]
    pub click_radius_helper: bool,
    #[serde(default)]
    pub pipes_disabled: bool,
    #[serde(default)]
    pub spinners_disabled: bool,
}

fn default_difficulty() -> String {
    "Medium".to_string()
}

/// Accessibility flags recorded with a score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreFlags {
    pub click_radius_helper: bool,
    pub pipes_disabled: bool,
    pub spinners_disabled: bool,
}

/// What [`HighScores::add_score`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// New player/label pair
    Added,
    /// Beat this player's previous entry for the label
    Replaced { previous: u32 },
    /// Previous entry was as good or better
    Kept { best: u32 },
}

/// High score leaderboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "high_scores.json";

    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record a finished run
    ///
    /// Names match case-insensitively within the same label. An existing
    /// entry is replaced only by a higher score, or an equal score reached
    /// in a later round.
    pub fn add_score(
        &mut self,
        name: &str,
        score: u32,
        round_reached: u32,
        label: &str,
        flags: ScoreFlags,
    ) -> Submission {
        let entry = HighScoreEntry {
            name: name.to_string(),
            score,
            round_reached,
            difficulty: label.to_string(),
            click_radius_helper: flags.click_radius_helper,
            pipes_disabled: flags.pipes_disabled,
            spinners_disabled: flags.spinners_disabled,
        };

        let lowered = name.to_lowercase();
        let existing = self
            .entries
            .iter()
            .position(|e| e.difficulty == label && e.name.to_lowercase() == lowered);

        let result = match existing {
            Some(i) => {
                let old = &self.entries[i];
                let better = score > old.score
                    || (score == old.score && round_reached > old.round_reached);
                if !better {
                    log::info!("{name} already has a better score ({}) in {label}", old.score);
                    return Submission::Kept { best: old.score };
                }
                let previous = old.score;
                self.entries[i] = entry;
                Submission::Replaced { previous }
            }
            None => {
                self.entries.push(entry);
                Submission::Added
            }
        };

        // Stable sort keeps older entries ahead on ties
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries.truncate(MAX_HIGH_SCORES);
        log::info!("High score for {name}: {score} ({label})");
        result
    }

    /// Check if the leaderboard is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<u32> {
        self.entries.first().map(|e| e.score)
    }

    /// Load high scores, starting fresh on any failure
    pub fn load(store: &dyn Store) -> Self {
        match persistence::load_json::<HighScores>(store, Self::STORAGE_KEY) {
            Ok(Some(mut scores)) => {
                scores.entries.sort_by(|a, b| b.score.cmp(&a.score));
                scores.entries.truncate(MAX_HIGH_SCORES);
                log::info!("Loaded {} high scores", scores.entries.len());
                scores
            }
            Ok(None) => {
                log::info!("No high scores found, starting fresh");
                Self::new()
            }
            Err(e) => {
                log::warn!("Failed to load high scores: {e}");
                Self::new()
            }
        }
    }

    /// Save high scores; failures are logged and otherwise ignored
    pub fn save(&self, store: &mut dyn Store) {
        match persistence::save_json(store, Self::STORAGE_KEY, self) {
            Ok(()) => log::info!("High scores saved ({} entries)", self.entries.len()),
            Err(e) => log::warn!("Failed to save high scores: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use proptest::prelude::*;

    const LABEL: &str = "Medium (Endless)";

    fn add(hs: &mut HighScores, name: &str, score: u32, round: u32) -> Submission {
        hs.add_score(name, score, round, LABEL, ScoreFlags::default())
    }

    #[test]
    fn test_sorted_descending() {
        let mut hs = HighScores::new();
        add(&mut hs, "a", 100, 3);
        add(&mut hs, "b", 300, 5);
        add(&mut hs, "c", 200, 4);
        let scores: Vec<u32> = hs.entries.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![300, 200, 100]);
        assert_eq!(hs.top_score(), Some(300));
    }

    #[test]
    fn test_same_player_replaced_only_when_better() {
        let mut hs = HighScores::new();
        assert_eq!(add(&mut hs, "Ann", 100, 3), Submission::Added);
        assert_eq!(add(&mut hs, "ann", 90, 9), Submission::Kept { best: 100 });
        assert_eq!(add(&mut hs, "ANN", 100, 2), Submission::Kept { best: 100 });
        assert_eq!(
            add(&mut hs, "ann", 100, 4),
            Submission::Replaced { previous: 100 }
        );
        assert_eq!(hs.entries.len(), 1);
        assert_eq!(hs.entries[0].round_reached, 4);
        assert_eq!(
            add(&mut hs, "Ann", 150, 1),
            Submission::Replaced { previous: 100 }
        );
        assert_eq!(hs.entries[0].score, 150);
        assert_eq!(hs.entries[0].name, "Ann");
    }

    #[test]
    fn test_same_player_other_label_is_new_entry() {
        let mut hs = HighScores::new();
        add(&mut hs, "Ann", 100, 3);
        let r = hs.add_score("Ann", 50, 2, "Hard (Timed) 60s", ScoreFlags::default());
        assert_eq!(r, Submission::Added);
        assert_eq!(hs.entries.len(), 2);
    }

    #[test]
    fn test_keeps_top_fifteen() {
        let mut hs = HighScores::new();
        for i in 0..20 {
            add(&mut hs, &format!("p{i}"), i * 10, 1);
        }
        assert_eq!(hs.entries.len(), MAX_HIGH_SCORES);
        assert_eq!(hs.entries.last().map(|e| e.score), Some(50));
    }

    #[test]
    fn test_old_entries_default_missing_fields() {
        let mut store = MemoryStore::new();
        store
            .save(
                HighScores::STORAGE_KEY,
                r#"[{"name": "Old", "score": 42, "round_reached": 3}]"#,
            )
            .unwrap();
        let hs = HighScores::load(&store);
        assert_eq!(hs.entries.len(), 1);
        assert_eq!(hs.entries[0].difficulty, "Medium");
        assert!(!hs.entries[0].click_radius_helper);
        assert!(!hs.entries[0].pipes_disabled);
    }

    #[test]
    fn test_save_load_roundtrip_as_array() {
        let mut store = MemoryStore::new();
        let mut hs = HighScores::new();
        hs.add_score(
            "Zed",
            77,
            6,
            "Nightmare (Timed) 120s",
            ScoreFlags {
                click_radius_helper: true,
                pipes_disabled: false,
                spinners_disabled: true,
            },
        );
        hs.save(&mut store);
        assert!(store.get(HighScores::STORAGE_KEY).unwrap().starts_with('['));
        assert_eq!(HighScores::load(&store), hs);
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let mut store = MemoryStore::new();
        store.save(HighScores::STORAGE_KEY, "{{{").unwrap();
        assert!(HighScores::load(&store).is_empty());
    }

    proptest! {
        #[test]
        fn prop_always_sorted_and_bounded(
            runs in prop::collection::vec((0u8..6, 0u32..1000, 0u32..30), 0..60)
        ) {
            let mut hs = HighScores::new();
            for (who, score, round) in runs {
                add(&mut hs, &format!("player{who}"), score, round);
            }
            prop_assert!(hs.entries.len() <= MAX_HIGH_SCORES);
            prop_assert!(hs.entries.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }
}
