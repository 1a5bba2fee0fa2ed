//! Fastest-finish leaderboard
//!
//! Persisted as JSON, keeps the top 10 times (lowest first).

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Maximum number of times to keep
pub const MAX_BEST_TIMES: usize = 10;

/// A single finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestTimeEntry {
    /// Finish time in seconds
    pub time: f64,
    /// Course length the run was on
    pub segment_count: u32,
    /// Course seed, enough to regenerate the same layout
    pub seed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestTimes {
    pub entries: Vec<BestTimeEntry>,
}

impl BestTimes {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a time makes the board
    pub fn qualifies(&self, time: f64) -> bool {
        if !time.is_finite() || time <= 0.0 {
            return false;
        }
        if self.entries.len() < MAX_BEST_TIMES {
            return true;
        }
        self.entries.last().map(|e| time < e.time).unwrap_or(true)
    }

    /// Rank a time would achieve (1-indexed), None if it doesn't qualify
    pub fn potential_rank(&self, time: f64) -> Option<usize> {
        if !self.qualifies(time) {
            return None;
        }
        let rank = self.entries.iter().position(|e| time < e.time);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Record a finished run. Returns the rank achieved, or None.
    pub fn add_time(&mut self, time: f64, segment_count: u32, seed: u64) -> Option<usize> {
        let rank = self.potential_rank(time)?;
        self.entries.insert(
            rank - 1,
            BestTimeEntry {
                time,
                segment_count,
                seed,
            },
        );
        self.entries.truncate(MAX_BEST_TIMES);
        log::info!("New best time #{}: {:.3}s", rank, time);
        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn best(&self) -> Option<f64> {
        self.entries.first().map(|e| e.time)
    }

    /// Load from `path`. Missing or unreadable files start a fresh board.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str::<BestTimes>(&json) {
                Ok(times) => {
                    log::info!("Loaded {} best times", times.entries.len());
                    times
                }
                Err(e) => {
                    log::warn!("Ignoring corrupt best times at {}: {}", path.display(), e);
                    Self::new()
                }
            },
            Err(_) => {
                log::info!("No best times found, starting fresh");
                Self::new()
            }
        }
    }

    /// Write to `path`
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Best times saved ({} entries)", self.entries.len());
        Ok(())
    }
}

/// Format seconds as `m:ss.mmm`
pub fn format_time(seconds: f64) -> String {
    let millis = (seconds.max(0.0) * 1000.0).round() as u64;
    format!("{}:{:02}.{:03}", millis / 60_000, (millis / 1000) % 60, millis % 1000)
}
