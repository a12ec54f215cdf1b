use thiserror::Error;

use crate::models::UserId;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Stable classification the transport layer maps to status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    PermissionDenied,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("unauthenticated for this endpoint")]
    Unauthenticated,

    #[error("incomplete profile")]
    IncompleteProfile,

    #[error("no candidates available, try again later")]
    NoCandidates,

    #[error("no pending pair attempt between {user_id} and {candidate_id}")]
    NoPendingAttempt { user_id: UserId, candidate_id: UserId },

    #[error("request timed out")]
    TimedOut,

    #[error("{context}: {source}")]
    Internal {
        context: &'static str,
        #[source]
        source: BoxError,
    },
}

impl MatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MatchError::Unauthenticated => ErrorKind::PermissionDenied,
            MatchError::IncompleteProfile => ErrorKind::InvalidInput,
            MatchError::NoCandidates | MatchError::NoPendingAttempt { .. } => ErrorKind::NotFound,
            MatchError::TimedOut | MatchError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn internal<E>(context: &'static str, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        MatchError::Internal {
            context,
            source: source.into(),
        }
    }
}

/// Wrap a collaborator failure with the step that issued the call
pub(crate) trait Context<T> {
    fn context(self, context: &'static str) -> Result<T, MatchError>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: Into<BoxError>,
{
    fn context(self, context: &'static str) -> Result<T, MatchError> {
        self.map_err(|e| MatchError::internal(context, e))
    }
}
