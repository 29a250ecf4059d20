use thiserror::Error;

use crate::motion::{ObjectId, PatternKind};

/// Result type alias for motion operations
pub type Result<T> = std::result::Result<T, MotionError>;

/// Conditions the motion core reports instead of acting on.
///
/// None of these are fatal: the operation that produced one was skipped and
/// the world is left exactly as it was.
#[derive(Error, Debug)]
pub enum MotionError {
    #[error("object {0} no longer exists")]
    StaleObject(ObjectId),

    #[error("cannot parent {child} to {parent}: {parent} is {child} or one of its descendants")]
    CyclicParent { child: ObjectId, parent: ObjectId },

    #[error("command tag {tag} is not valid for {kind:?} patterns")]
    InvalidCommand { kind: PatternKind, tag: u8 },

    #[error("invalid scenario: {0}")]
    Scenario(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
