use crate::models::{PairAttempt, PairEventType, PairState, SwipeVerdict, UserId};

/// Which side of a pair attempt a user is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairRole {
    /// Shown the candidate first
    User1,
    /// Shown the candidate only after user 1 liked
    User2,
}

impl PairRole {
    pub fn of(attempt: &PairAttempt, user_id: UserId) -> Option<PairRole> {
        if attempt.user1 == user_id {
            Some(PairRole::User1)
        } else if attempt.user2 == user_id {
            Some(PairRole::User2)
        } else {
            None
        }
    }
}

/// Where a pending attempt stands, replayed from its latest event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStage {
    AwaitingUser1,
    AwaitingUser2,
    Resolved,
}

/// Replay the stage of an attempt from its last logged event.
///
/// An attempt without any event is treated as freshly created.
pub fn resolve(last_event: Option<PairEventType>) -> AttemptStage {
    match last_event {
        None | Some(PairEventType::PaCreated) | Some(PairEventType::SentToUser1) => {
            AttemptStage::AwaitingUser1
        }
        Some(PairEventType::User1Liked) | Some(PairEventType::SentToUser2) => {
            AttemptStage::AwaitingUser2
        }
        Some(PairEventType::User1Disliked)
        | Some(PairEventType::User2Liked)
        | Some(PairEventType::User2Disliked)
        | Some(PairEventType::PairCreated)
        | Some(PairEventType::PairAttemptFailed) => AttemptStage::Resolved,
    }
}

impl AttemptStage {
    /// The role whose swipe the attempt is waiting for
    pub fn awaiting(&self) -> Option<PairRole> {
        match self {
            AttemptStage::AwaitingUser1 => Some(PairRole::User1),
            AttemptStage::AwaitingUser2 => Some(PairRole::User2),
            AttemptStage::Resolved => None,
        }
    }
}

impl PairEventType {
    /// Swipe event for a role and verdict
    pub fn swipe(role: PairRole, verdict: SwipeVerdict) -> PairEventType {
        match (role, verdict) {
            (PairRole::User1, SwipeVerdict::Like) => PairEventType::User1Liked,
            (PairRole::User1, SwipeVerdict::Dislike) => PairEventType::User1Disliked,
            (PairRole::User2, SwipeVerdict::Like) => PairEventType::User2Liked,
            (PairRole::User2, SwipeVerdict::Dislike) => PairEventType::User2Disliked,
        }
    }

    /// Closing event logged right before an attempt is finished with `state`
    pub fn closing(state: PairState) -> Option<PairEventType> {
        match state {
            PairState::Pending => None,
            PairState::Match => Some(PairEventType::PairCreated),
            PairState::Mismatch => Some(PairEventType::PairAttemptFailed),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PairEventType::PairCreated | PairEventType::PairAttemptFailed
        )
    }
}

/// Whether `next` may be appended after `prev` in one attempt's log
///
/// `pa_created -> sent_to_user_1 -> user_1_(dis)liked ->
/// [sent_to_user_2 -> user_2_(dis)liked] -> pair_created | pair_attempt_failed`.
/// `sent_to_user_2` may be skipped when user 2 swipes without asking for the
/// next partner first.
pub fn is_valid_successor(prev: Option<PairEventType>, next: PairEventType) -> bool {
    use PairEventType::*;

    if prev.is_some_and(|event| event.is_terminal()) {
        return false;
    }

    match (prev, next) {
        (None, PaCreated) => true,
        (Some(PaCreated), SentToUser1) => true,
        (Some(PaCreated), User1Liked | User1Disliked) => true,
        (Some(SentToUser1), User1Liked | User1Disliked) => true,
        (Some(User1Liked), SentToUser2 | User2Liked | User2Disliked) => true,
        (Some(SentToUser2), User2Liked | User2Disliked) => true,
        (Some(User1Disliked | User2Disliked), PairAttemptFailed) => true,
        (Some(User2Liked), PairCreated) => true,
        _ => false,
    }
}
