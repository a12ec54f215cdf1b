//! Collaborator interfaces the matching engine reads from and writes to.
//!
//! Implementations live in `services` (Postgres, HTTP notifier, photo
//! linker); tests provide in-memory versions.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Chat, PairAttempt, PairEvent, PairEventType, PairState, ParseEnumError, PartnerNotice,
    Preferences, Profile, UserId,
};

/// Errors surfaced by persistence collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another pending attempt already exists for this unordered pair
    #[error("pending pair attempt already exists for users {0} and {1}")]
    PendingConflict(UserId, UserId),

    /// The attempt was already finished by another request
    #[error("pair attempt {0} is no longer pending")]
    NotPending(u64),

    #[error("malformed stored value: {0}")]
    Malformed(String),

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<ParseEnumError> for StoreError {
    fn from(value: ParseEnumError) -> Self {
        StoreError::Malformed(value.to_string())
    }
}

/// Errors surfaced by the notification collaborator
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("notification service rejected the request: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StoreError>;

    async fn get_preferences(&self, user_id: UserId) -> Result<Option<Preferences>, StoreError>;

    /// Users that have both a profile and a preferences record
    async fn get_all_valid_user_ids(&self) -> Result<Vec<UserId>, StoreError>;
}

#[async_trait]
pub trait PairAttemptStore: Send + Sync {
    /// New pending attempt with `user1` as the first to be shown
    async fn create_pair_attempt(
        &self,
        user1: UserId,
        user2: UserId,
    ) -> Result<PairAttempt, StoreError>;

    /// Pending attempt for the unordered pair `{a, b}`
    async fn get_pending_pair_attempt_by_user_pair(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<PairAttempt>, StoreError>;

    /// Most recent attempt in any state for the unordered pair `{a, b}`
    async fn get_latest_pair_attempt_by_user_pair(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<PairAttempt>, StoreError>;

    /// Move a pending attempt to `state`; `NotPending` when it already left
    /// the pending state
    async fn finish_pair_attempt(&self, attempt_id: u64, state: PairState)
        -> Result<(), StoreError>;

    /// Pending attempts where `user_id` is user 1
    async fn get_pending_pair_attempts(&self, user_id: UserId)
        -> Result<Vec<PairAttempt>, StoreError>;

    /// Oldest pending attempt where `user_id` is user 2 and user 1 has
    /// already liked (last event `user_1_liked` or `sent_to_user_2`).
    /// The liker is the attempt's `user1`.
    async fn get_who_liked_me(&self, user_id: UserId) -> Result<Option<PairAttempt>, StoreError>;
}

/// Append-only log of pair lifecycle events
#[async_trait]
pub trait PairEventLog: Send + Sync {
    async fn create_event(
        &self,
        attempt_id: u64,
        event_type: PairEventType,
    ) -> Result<PairEvent, StoreError>;

    async fn get_last_event(&self, attempt_id: u64) -> Result<Option<PairEvent>, StoreError>;
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Photo keys in display order, primary photo first
    async fn get_user_photos(&self, user_id: UserId) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
pub trait PhotoLinker: Send + Sync {
    /// Shareable link for a stored profile photo
    async fn profile_photo_link(&self, photo_key: &str) -> Result<String, StoreError>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn create_chat(&self, user1: UserId, user2: UserId) -> Result<Chat, StoreError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// "Someone liked you", sent to the liked user
    async fn notify_liked(&self, user_id: UserId, notice: PartnerNotice)
        -> Result<(), NotifyError>;

    /// "It's a match", describing the other participant
    async fn notify_match(&self, user_id: UserId, notice: PartnerNotice)
        -> Result<(), NotifyError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn health_check(&self) -> bool;
}
