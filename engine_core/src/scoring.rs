// padel score validation

use crate::{MatchRules, SetScore, utils::validation::FieldError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Why a reported score is not a legal padel result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ScoreFault {
    /// the games of one set do not form a legal set score
    #[error("set {set}: not a legal set score")]
    SetInvalid { set: u32 },

    /// a set went to games_per_set + 1 against games_per_set without a tiebreak
    #[error("set {set}: this score requires a recorded tiebreak")]
    TiebreakMissing { set: u32 },

    /// tiebreak points do not reach 7 with a margin of 2
    #[error("set {set}: tiebreak must reach at least 7 points with a margin of 2")]
    TiebreakInvalid { set: u32 },

    /// tiebreak winner differs from the set winner
    #[error("set {set}: tiebreak winner does not match the set winner")]
    TiebreakMismatch { set: u32 },

    /// no team reached the required number of sets
    #[error("no team reached the required number of sets")]
    InsufficientSets,

    /// declared winner does not match the reported sets
    #[error("declared winner does not match the reported sets")]
    WinnerMismatch,
}

impl ScoreFault {
    /// stable machine readable code, surfaced as a validation failure
    pub fn code(&self) -> &'static str {
        match self {
            ScoreFault::SetInvalid { .. } => "set_invalid",
            ScoreFault::TiebreakMissing { .. } => "tiebreak_missing",
            ScoreFault::TiebreakInvalid { .. } => "tiebreak_invalid",
            ScoreFault::TiebreakMismatch { .. } => "tiebreak_mismatch",
            ScoreFault::InsufficientSets => "insufficient_sets",
            ScoreFault::WinnerMismatch => "winner_mismatch",
        }
    }
}

impl From<ScoreFault> for FieldError {
    fn from(fault: ScoreFault) -> Self {
        let err = FieldError::new("sets", fault.code()).with_message(fault.to_string());
        match fault {
            ScoreFault::SetInvalid { set }
            | ScoreFault::TiebreakMissing { set }
            | ScoreFault::TiebreakInvalid { set }
            | ScoreFault::TiebreakMismatch { set } => err.with_param("set", set.to_string()),
            _ => err,
        }
    }
}

/// Outcome of a valid score sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreOutcome {
    pub winner_id: Uuid,
    pub loser_id: Uuid,
    pub sets_team1: u32,
    pub sets_team2: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Team1,
    Team2,
}

/// Validate an ordered score sheet against the tournament rules and the
/// declared winner. Pure: no side effects, no I/O.
///
/// A set is won by reaching `games_per_set` games with a margin of at least
/// two, or by one game beyond it against `games_per_set - 1` (the extended
/// set), or by one game beyond it against `games_per_set` itself, which is
/// only legal with a recorded tiebreak won by the same team.
pub fn validate_score(
    sets: &[SetScore],
    declared_winner: Uuid,
    team1_id: Uuid,
    team2_id: Uuid,
    rules: MatchRules,
) -> Result<ScoreOutcome, ScoreFault> {
    if sets.is_empty() {
        return Err(ScoreFault::InsufficientSets);
    }

    let mut sets_team1 = 0u32;
    let mut sets_team2 = 0u32;
    for set in sets {
        if sets_team1 >= rules.sets_to_win || sets_team2 >= rules.sets_to_win {
            // the match was already decided before this set
            return Err(ScoreFault::SetInvalid {
                set: set.set_number,
            });
        }
        match set_winner(set, rules.games_per_set)? {
            Side::Team1 => sets_team1 += 1,
            Side::Team2 => sets_team2 += 1,
        }
    }

    let winner_id = if sets_team1 >= rules.sets_to_win {
        team1_id
    } else if sets_team2 >= rules.sets_to_win {
        team2_id
    } else {
        return Err(ScoreFault::InsufficientSets);
    };
    if winner_id != declared_winner {
        return Err(ScoreFault::WinnerMismatch);
    }

    let loser_id = if winner_id == team1_id {
        team2_id
    } else {
        team1_id
    };
    Ok(ScoreOutcome {
        winner_id,
        loser_id,
        sets_team1,
        sets_team2,
    })
}

fn set_winner(set: &SetScore, games_per_set: u32) -> Result<Side, ScoreFault> {
    let (t1, t2) = (set.team1_games, set.team2_games);
    if t1 == t2 {
        return Err(ScoreFault::SetInvalid {
            set: set.set_number,
        });
    }
    let side = if t1 > t2 { Side::Team1 } else { Side::Team2 };
    let (hi, lo) = (t1.max(t2), t1.min(t2));

    if hi == games_per_set && hi - lo >= 2 {
        return Ok(side);
    }
    // the extended set, e.g. 7-5 with games_per_set 6
    if hi == games_per_set + 1 && lo + 2 == hi {
        return Ok(side);
    }
    // the tiebreak set, e.g. 7-6 with games_per_set 6
    if hi == games_per_set + 1 && lo == games_per_set {
        let (Some(tb1), Some(tb2)) = (set.tiebreak_team1, set.tiebreak_team2) else {
            return Err(ScoreFault::TiebreakMissing {
                set: set.set_number,
            });
        };
        if tb1 == tb2 {
            return Err(ScoreFault::TiebreakInvalid {
                set: set.set_number,
            });
        }
        let (tb_hi, tb_lo) = (tb1.max(tb2), tb1.min(tb2));
        if tb_hi < 7 || tb_hi - tb_lo < 2 {
            return Err(ScoreFault::TiebreakInvalid {
                set: set.set_number,
            });
        }
        let tb_side = if tb1 > tb2 { Side::Team1 } else { Side::Team2 };
        if tb_side != side {
            return Err(ScoreFault::TiebreakMismatch {
                set: set.set_number,
            });
        }
        return Ok(side);
    }
    Err(ScoreFault::SetInvalid {
        set: set.set_number,
    })
}
