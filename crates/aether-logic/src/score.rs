//! End-of-match score and star rating.

use serde::{Deserialize, Serialize};

use crate::constants::scoring::{POINTS_PER_FIX, STAR_LADDER};
use crate::runtime::MatchRuntime;
use crate::state::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCard {
    pub score: i64,
    pub stars: u8,
    pub time_survived: u32,
}

pub fn stars_for_score(score: i64) -> u8 {
    STAR_LADDER
        .iter()
        .find(|(min, _)| score >= *min)
        .map(|(_, stars)| *stars)
        .unwrap_or(1)
}

/// Fixes times two, plus seconds survived, plus final stability rounded.
pub fn calculate_score(state: &GameState, duration_secs: u32) -> ScoreCard {
    let time_survived = duration_secs.saturating_sub(state.time_remaining_sec);
    let score = state.issues_fixed as i64 * POINTS_PER_FIX
        + time_survived as i64
        + state.stability.round() as i64;
    ScoreCard {
        score,
        stars: stars_for_score(score),
        time_survived,
    }
}

impl MatchRuntime {
    pub fn score(&self) -> ScoreCard {
        calculate_score(&self.state, self.config.duration_secs)
    }
}
