//! Session leaderboard
//!
//! Tracks the top 10 rounds of the running process. Nothing is written to
//! disk.

use serde::{Deserialize, Serialize};

use crate::sim::{EndReason, RoundEnd};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// Final score
    pub score: u32,
    pub deliveries: u32,
    /// How the round ended
    pub reason: EndReason,
    /// 1-based round number within the session
    pub round: u32,
}

/// High score leaderboard, sorted by descending score
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    /// Create empty leaderboard
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u32) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        // Has to beat the lowest entry
        self.entries.last().is_none_or(|e| score > e.score)
    }

    /// Rank a score would achieve (1-indexed, None if it doesn't qualify)
    pub fn potential_rank(&self, score: u32) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Record a finished round. Returns the rank achieved (1-indexed) or
    /// None if it didn't qualify.
    pub fn record(&mut self, end: &RoundEnd, round: u32) -> Option<usize> {
        let rank = self.potential_rank(end.final_score)?;
        self.entries.insert(
            rank - 1,
            HighScoreEntry {
                score: end.final_score,
                deliveries: end.deliveries,
                reason: end.reason,
                round,
            },
        );
        self.entries.truncate(MAX_HIGH_SCORES);
        log::info!("Round {round} placed #{rank} with {} points", end.final_score);
        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<u32> {
        self.entries.first().map(|e| e.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end(score: u32) -> RoundEnd {
        RoundEnd {
            final_score: score,
            reason: EndReason::Timeout,
            deliveries: score,
        }
    }

    #[test]
    fn test_zero_never_qualifies() {
        let mut scores = HighScores::new();
        assert_eq!(scores.record(&end(0), 1), None);
        assert!(scores.is_empty());
    }

    #[test]
    fn test_sorted_descending() {
        let mut scores = HighScores::new();
        assert_eq!(scores.record(&end(5), 1), Some(1));
        assert_eq!(scores.record(&end(9), 2), Some(1));
        assert_eq!(scores.record(&end(7), 3), Some(2));
        // Ties rank below the existing entry
        assert_eq!(scores.record(&end(7), 4), Some(3));
        let order: Vec<u32> = scores.entries.iter().map(|e| e.round).collect();
        assert_eq!(order, vec![2, 3, 4, 1]);
        assert_eq!(scores.top_score(), Some(9));
    }

    #[test]
    fn test_keeps_top_ten() {
        let mut scores = HighScores::new();
        for i in 1..=12 {
            scores.record(&end(i), i);
        }
        assert_eq!(scores.entries.len(), MAX_HIGH_SCORES);
        assert_eq!(scores.entries.last().map(|e| e.score), Some(3));
        assert!(!scores.qualifies(3));
        assert_eq!(scores.potential_rank(4), Some(10));
    }
}
