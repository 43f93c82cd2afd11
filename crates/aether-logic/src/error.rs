//! Why an intent was rejected.
//!
//! Every intent validates fully before it writes, so an `Err` always means
//! the match is untouched.

use thiserror::Error;

use crate::state::ToolKind;

/// Rejections from the fix coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixError {
    #[error("match is over")]
    MatchOver,
    #[error("unknown player {0}")]
    UnknownPlayer(String),
    #[error("player {0} is already fixing an issue")]
    AlreadyFixing(String),
    #[error("issue {0} is not fixable")]
    NotFixable(String),
    #[error("player is out of range of issue {0}")]
    OutOfRange(String),
    #[error("player is not on the same layer as issue {0}")]
    WrongLayer(String),
    #[error("team inventory holds no {0:?}")]
    ToolNotOwned(ToolKind),
    #[error("{given:?} does not fit, issue needs {required:?}")]
    WrongTool { given: ToolKind, required: ToolKind },
    #[error("player {0} is not fixing anything")]
    NotFixing(String),
    #[error("fix time has already elapsed")]
    AlreadyElapsed,
}

/// Rejections from the remaining player intents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentError {
    #[error(transparent)]
    Fix(#[from] FixError),
    #[error("match is over")]
    MatchOver,
    #[error("unknown player {0}")]
    UnknownPlayer(String),
    #[error("unknown instrument {0}")]
    UnknownInstrument(String),
    #[error("unknown hatch {0}")]
    UnknownHatch(String),
    #[error("player is out of range of {0}")]
    OutOfRange(String),
    #[error("player is not on the same layer as {0}")]
    WrongLayer(String),
    #[error("{0} is locked")]
    Locked(String),
}
