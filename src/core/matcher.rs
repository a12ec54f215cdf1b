use std::sync::Arc;

use crate::core::error::{Context, MatchError};
use crate::core::lifecycle::{resolve, AttemptStage, PairRole};
use crate::core::ports::{
    ChatStore, Notifier, PairAttemptStore, PairEventLog, PhotoLinker, PhotoStore, ProfileStore,
    StoreError,
};
use crate::core::selector::{CandidateSelector, RandomIndex};
use crate::models::{
    PairAttempt, PairEventType, PairState, PartnerNotice, PhotoShowcase, Preferences, Profile,
    ProfileShowcase, SwipeVerdict, UserId,
};

/// Authenticated caller of an engine entry point. Id 0 means nobody.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal(pub UserId);

impl Principal {
    pub fn user_id(&self) -> Result<UserId, MatchError> {
        match self.0 {
            0 => Err(MatchError::Unauthenticated),
            id => Ok(id),
        }
    }
}

/// Everything the engine talks to
#[derive(Clone)]
pub struct Collaborators {
    pub profiles: Arc<dyn ProfileStore>,
    pub attempts: Arc<dyn PairAttemptStore>,
    pub events: Arc<dyn PairEventLog>,
    pub photos: Arc<dyn PhotoStore>,
    pub photo_links: Arc<dyn PhotoLinker>,
    pub chats: Arc<dyn ChatStore>,
    pub notifier: Arc<dyn Notifier>,
    pub random: Arc<dyn RandomIndex>,
}

/// Matching orchestrator
///
/// Decides which partner to show next and processes swipes. Holds no
/// per-user state: every decision is rebuilt from the attempt store and
/// the event log, so calls can be resumed across requests and restarts.
/// Writes within one call are strictly sequential; dropping the returned
/// future stops further writes without undoing committed ones.
#[derive(Clone)]
pub struct Matcher {
    deps: Collaborators,
    max_selection_retries: u32,
}

impl Matcher {
    pub const DEFAULT_SELECTION_RETRIES: u32 = 3;

    pub fn new(deps: Collaborators) -> Self {
        Self {
            deps,
            max_selection_retries: Self::DEFAULT_SELECTION_RETRIES,
        }
    }

    /// How many times a fresh pick is retried after losing a race for the
    /// pending slot of a pair
    pub fn with_selection_retries(mut self, retries: u32) -> Self {
        self.max_selection_retries = retries;
        self
    }

    /// Next partner to show to the principal
    ///
    /// 1. Incomplete profile or preferences fail with no side effects.
    /// 2. A candidate already shown but not swiped is returned again.
    /// 3. Someone who liked the principal is shown next.
    /// 4. Otherwise a fresh candidate is selected and a pair attempt opened.
    pub async fn next_partner(&self, principal: Principal) -> Result<ProfileShowcase, MatchError> {
        let user_id = principal.user_id()?;
        let (profile, preferences) = self.complete_records(user_id).await?;

        if let Some(partner) = self.submit_hanging_partner(user_id).await? {
            tracing::info!("Returning hanging partner {} to user {}", partner.profile.user_id, user_id);
            return Ok(partner);
        }

        if let Some(partner) = self.submit_who_liked_me(user_id).await? {
            tracing::info!("Returning liker {} to user {}", partner.profile.user_id, user_id);
            return Ok(partner);
        }

        match self.choose_candidate_and_create_pair(&profile, &preferences).await? {
            Some(partner) => {
                tracing::info!("Paired user {} with new candidate {}", user_id, partner.profile.user_id);
                Ok(partner)
            }
            None => {
                tracing::info!("No candidates available for user {}", user_id);
                Err(MatchError::NoCandidates)
            }
        }
    }

    /// Record the principal's verdict on a shown candidate
    pub async fn swipe(
        &self,
        principal: Principal,
        candidate_id: UserId,
        verdict: SwipeVerdict,
    ) -> Result<(), MatchError> {
        let user_id = principal.user_id()?;

        let not_found = MatchError::NoPendingAttempt {
            user_id,
            candidate_id,
        };

        let Some(attempt) = self
            .deps
            .attempts
            .get_pending_pair_attempt_by_user_pair(user_id, candidate_id)
            .await
            .context("can't get pending pair attempt by user pair")?
        else {
            tracing::info!("Stale swipe from {} on {}: no pending attempt", user_id, candidate_id);
            return Err(not_found);
        };

        let Some(role) = PairRole::of(&attempt, user_id) else {
            return Err(not_found);
        };

        // A second swipe from the same side, or user 2 answering before
        // user 1, is a duplicate or stale request
        if self.stage_of(attempt.id).await?.awaiting() != Some(role) {
            tracing::info!(
                "Out of turn swipe from {} on attempt {} ({:?})",
                user_id,
                attempt.id,
                role
            );
            return Err(not_found);
        }

        self.append(attempt.id, PairEventType::swipe(role, verdict)).await?;

        match (verdict, role) {
            (SwipeVerdict::Dislike, _) => {
                self.finish(&attempt, user_id, PairState::Mismatch).await?;
                tracing::info!("Attempt {} ended in mismatch", attempt.id);
            }
            (SwipeVerdict::Like, PairRole::User1) => {
                let notice = self.partner_notice(user_id).await?;
                if let Err(e) = self.deps.notifier.notify_liked(attempt.user2, notice).await {
                    tracing::warn!("Failed to notify {} about a like: {}", attempt.user2, e);
                }
                tracing::info!("User {} liked {}, waiting for reply", user_id, attempt.user2);
            }
            (SwipeVerdict::Like, PairRole::User2) => {
                self.finish(&attempt, user_id, PairState::Match).await?;
                self.deps
                    .chats
                    .create_chat(attempt.user1, attempt.user2)
                    .await
                    .context("can't create chat")?;
                self.notify_match(attempt.user1, attempt.user2).await?;
                tracing::info!("Attempt {} ended in match", attempt.id);
            }
        }

        Ok(())
    }

    async fn complete_records(&self, user_id: UserId) -> Result<(Profile, Preferences), MatchError> {
        let profile = self
            .deps
            .profiles
            .get_profile(user_id)
            .await
            .context("can't get profile")?;
        let preferences = self
            .deps
            .profiles
            .get_preferences(user_id)
            .await
            .context("can't get preferences")?;

        match (profile, preferences) {
            (Some(profile), Some(preferences))
                if profile.is_complete() && preferences.is_complete() =>
            {
                Ok((profile, preferences))
            }
            _ => {
                tracing::debug!("User {} has an incomplete profile or preferences", user_id);
                Err(MatchError::IncompleteProfile)
            }
        }
    }

    async fn stage_of(&self, attempt_id: u64) -> Result<AttemptStage, MatchError> {
        let last = self
            .deps
            .events
            .get_last_event(attempt_id)
            .await
            .context("can't get last pair event")?;
        Ok(resolve(last.map(|event| event.event_type)))
    }

    async fn append(&self, attempt_id: u64, event_type: PairEventType) -> Result<(), MatchError> {
        self.deps
            .events
            .create_event(attempt_id, event_type)
            .await
            .context("can't create pair event")?;
        tracing::debug!("Attempt {}: {}", attempt_id, event_type);
        Ok(())
    }

    /// Log the closing event, then move the attempt to its terminal state
    async fn finish(
        &self,
        attempt: &PairAttempt,
        swiper: UserId,
        state: PairState,
    ) -> Result<(), MatchError> {
        if let Some(closing) = PairEventType::closing(state) {
            self.append(attempt.id, closing).await?;
        }
        match self.deps.attempts.finish_pair_attempt(attempt.id, state).await {
            Ok(()) => Ok(()),
            // A concurrent swipe finished it first; stop before chats and notifications
            Err(StoreError::NotPending(_)) => {
                tracing::info!("Attempt {} was finished by a concurrent swipe", attempt.id);
                let candidate_id = if attempt.user1 == swiper {
                    attempt.user2
                } else {
                    attempt.user1
                };
                Err(MatchError::NoPendingAttempt {
                    user_id: swiper,
                    candidate_id,
                })
            }
            Err(e) => Err(MatchError::internal("can't finish pair attempt", e)),
        }
    }

    /// A candidate shown to the user (as user 1) who has not been swiped yet
    async fn submit_hanging_partner(
        &self,
        user_id: UserId,
    ) -> Result<Option<ProfileShowcase>, MatchError> {
        let attempts = self
            .deps
            .attempts
            .get_pending_pair_attempts(user_id)
            .await
            .context("can't get pending pair attempts")?;

        for attempt in attempts {
            let last = self
                .deps
                .events
                .get_last_event(attempt.id)
                .await
                .context("can't get last pair event")?
                .map(|event| event.event_type);

            if resolve(last) != AttemptStage::AwaitingUser1 {
                continue;
            }

            // Finish a sequence interrupted before the candidate was shown
            if last.is_none() {
                self.append(attempt.id, PairEventType::PaCreated).await?;
            }
            if last != Some(PairEventType::SentToUser1) {
                self.append(attempt.id, PairEventType::SentToUser1).await?;
            }

            return self.showcase(attempt.user2).await.map(Some);
        }

        Ok(None)
    }

    /// A user who liked the requester and is waiting for an answer
    async fn submit_who_liked_me(
        &self,
        user_id: UserId,
    ) -> Result<Option<ProfileShowcase>, MatchError> {
        let Some(attempt) = self
            .deps
            .attempts
            .get_who_liked_me(user_id)
            .await
            .context("can't get who liked me")?
        else {
            return Ok(None);
        };

        let last = self
            .deps
            .events
            .get_last_event(attempt.id)
            .await
            .context("can't get last pair event")?
            .map(|event| event.event_type);

        if last == Some(PairEventType::User1Liked) {
            self.append(attempt.id, PairEventType::SentToUser2).await?;
        }

        self.showcase(attempt.user1).await.map(Some)
    }

    async fn choose_candidate_and_create_pair(
        &self,
        profile: &Profile,
        preferences: &Preferences,
    ) -> Result<Option<ProfileShowcase>, MatchError> {
        let user_id = profile.user_id;
        let selector = CandidateSelector::new(
            self.deps.profiles.as_ref(),
            self.deps.attempts.as_ref(),
            self.deps.random.as_ref(),
        );

        for round in 0..=self.max_selection_retries {
            let Some(candidate) = selector.choose_candidate(profile, preferences).await? else {
                return Ok(None);
            };

            let attempt = match self.deps.attempts.create_pair_attempt(user_id, candidate).await {
                Ok(attempt) => attempt,
                Err(StoreError::PendingConflict(a, b)) => {
                    tracing::warn!(
                        "Pending attempt for {} and {} created concurrently, reselecting (round {})",
                        a,
                        b,
                        round
                    );
                    continue;
                }
                Err(e) => return Err(MatchError::internal("can't create pair attempt", e)),
            };

            self.append(attempt.id, PairEventType::PaCreated).await?;
            self.append(attempt.id, PairEventType::SentToUser1).await?;

            return self.showcase(candidate).await.map(Some);
        }

        Ok(None)
    }

    async fn showcase(&self, user_id: UserId) -> Result<ProfileShowcase, MatchError> {
        let profile = self
            .deps
            .profiles
            .get_profile(user_id)
            .await
            .context("can't get profile")?
            .ok_or_else(|| {
                MatchError::internal("can't get profile", format!("profile {} is missing", user_id))
            })?;

        let keys = self
            .deps
            .photos
            .get_user_photos(user_id)
            .await
            .context("can't get user photos")?;

        let mut photos = Vec::with_capacity(keys.len());
        for key in keys {
            let link = self
                .deps
                .photo_links
                .profile_photo_link(&key)
                .await
                .context("can't make profile photo link")?;
            photos.push(PhotoShowcase { key, link });
        }

        Ok(ProfileShowcase { profile, photos })
    }

    /// Name and primary photo of `user_id`, for notifications sent to others
    async fn partner_notice(&self, user_id: UserId) -> Result<PartnerNotice, MatchError> {
        let profile = self
            .deps
            .profiles
            .get_profile(user_id)
            .await
            .context("can't get profile")?;
        let name = profile.map(|p| p.name).unwrap_or_default();

        let photos = self
            .deps
            .photos
            .get_user_photos(user_id)
            .await
            .context("can't get user photos")?;

        let photo = match photos.first() {
            Some(key) => self
                .deps
                .photo_links
                .profile_photo_link(key)
                .await
                .context("can't make profile photo link")?,
            None => String::new(),
        };

        Ok(PartnerNotice { name, photo })
    }

    /// Each participant is told about the other one. Delivery failures are
    /// logged; the match itself is already committed.
    async fn notify_match(&self, user1: UserId, user2: UserId) -> Result<(), MatchError> {
        let about_user1 = self.partner_notice(user1).await?;
        let about_user2 = self.partner_notice(user2).await?;

        for (receiver, notice) in [(user2, about_user1), (user1, about_user2)] {
            if let Err(e) = self.deps.notifier.notify_match(receiver, notice).await {
                tracing::warn!("Failed to notify {} about a match: {}", receiver, e);
            }
        }

        Ok(())
    }
}
