use thiserror::Error;

/// Invalid input rejected at the resolution boundary.
///
/// These are never folded into an empty result: an empty window means
/// "no games played", which is a different answer from "bad request".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid game date: {0:?}")]
    InvalidDate(String),
    #[error("missing player identifier")]
    MissingPlayerId,
    #[error("invalid player identifier: {0:?}")]
    InvalidPlayerId(String),
}

pub type ResolveResult<T> = Result<T, ResolveError>;
