use chrono::{DateTime, Utc};
use rand::Rng;

use crate::core::error::{Context, MatchError};
use crate::core::filters::symmetric_match;
use crate::core::ports::{PairAttemptStore, ProfileStore};
use crate::models::{PairAttempt, PairState, Preferences, Profile, UserId};

/// Source of the random pick among never-paired candidates
pub trait RandomIndex: Send + Sync {
    /// Index in `0..len`; only called with `len > 0`
    fn pick(&self, len: usize) -> usize;
}

/// `RandomIndex` backed by the thread-local generator
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomIndex for ThreadRandom {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Eligible candidates partitioned by their history with the requester
///
/// Priority: never paired (random pick) > last attempt ended in mismatch
/// (oldest attempt first) > last attempt ended in match (oldest first).
#[derive(Debug, Default, Clone)]
pub struct CandidateBuckets {
    no_history: Vec<UserId>,
    with_dislike: Vec<(DateTime<Utc>, UserId)>,
    with_like: Vec<(DateTime<Utc>, UserId)>,
}

impl CandidateBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a candidate under the bucket its latest attempt points to.
    /// Returns false for a still pending attempt, which is never eligible.
    pub fn insert(&mut self, candidate: UserId, latest: Option<&PairAttempt>) -> bool {
        match latest {
            None => self.no_history.push(candidate),
            Some(attempt) => match attempt.state {
                PairState::Pending => return false,
                PairState::Mismatch => self.with_dislike.push((attempt.created_at, candidate)),
                PairState::Match => self.with_like.push((attempt.created_at, candidate)),
            },
        }
        true
    }

    pub fn len(&self) -> usize {
        self.no_history.len() + self.with_dislike.len() + self.with_like.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pick(self, random: &dyn RandomIndex) -> Option<UserId> {
        if !self.no_history.is_empty() {
            let idx = random.pick(self.no_history.len()).min(self.no_history.len() - 1);
            return Some(self.no_history[idx]);
        }

        oldest(self.with_dislike).or_else(|| oldest(self.with_like))
    }
}

/// Ties on the attempt time fall back to the lower user id
fn oldest(bucket: Vec<(DateTime<Utc>, UserId)>) -> Option<UserId> {
    bucket.into_iter().min().map(|(_, candidate)| candidate)
}

/// Picks the next fresh candidate for a user
pub struct CandidateSelector<'a> {
    profiles: &'a dyn ProfileStore,
    attempts: &'a dyn PairAttemptStore,
    random: &'a dyn RandomIndex,
}

impl<'a> CandidateSelector<'a> {
    pub fn new(
        profiles: &'a dyn ProfileStore,
        attempts: &'a dyn PairAttemptStore,
        random: &'a dyn RandomIndex,
    ) -> Self {
        Self {
            profiles,
            attempts,
            random,
        }
    }

    /// Choose one candidate for `profile.user_id`, or `None` when nobody is
    /// eligible. The requester's profile and preferences must be complete.
    pub async fn choose_candidate(
        &self,
        profile: &Profile,
        preferences: &Preferences,
    ) -> Result<Option<UserId>, MatchError> {
        let user_id = profile.user_id;
        let buckets = self.collect_buckets(profile, preferences).await?;

        tracing::debug!(
            "Candidate buckets for {}: {} no-history, {} with-dislike, {} with-like",
            user_id,
            buckets.no_history.len(),
            buckets.with_dislike.len(),
            buckets.with_like.len()
        );

        Ok(buckets.pick(self.random))
    }

    async fn collect_buckets(
        &self,
        profile: &Profile,
        preferences: &Preferences,
    ) -> Result<CandidateBuckets, MatchError> {
        let user_id = profile.user_id;
        let ids = self
            .profiles
            .get_all_valid_user_ids()
            .await
            .context("can't get valid users")?;

        let mut buckets = CandidateBuckets::new();

        for id in ids {
            if id == user_id {
                continue;
            }

            let Some(candidate_prefs) = self
                .profiles
                .get_preferences(id)
                .await
                .context("can't get candidate preferences")?
            else {
                continue;
            };
            let Some(candidate_profile) = self
                .profiles
                .get_profile(id)
                .await
                .context("can't get candidate profile")?
            else {
                continue;
            };

            if !candidate_profile.is_complete() || !candidate_prefs.is_complete() {
                continue;
            }

            if !symmetric_match(preferences, profile, &candidate_prefs, &candidate_profile) {
                continue;
            }

            let pending = self
                .attempts
                .get_pending_pair_attempt_by_user_pair(user_id, id)
                .await
                .context("can't get pending pair attempt")?;
            if pending.is_some() {
                continue;
            }

            let latest = self
                .attempts
                .get_latest_pair_attempt_by_user_pair(user_id, id)
                .await
                .context("can't get latest pair attempt")?;

            if !buckets.insert(id, latest.as_ref()) {
                tracing::debug!("Candidate {} has a pending attempt with {}, skipped", id, user_id);
            }
        }

        Ok(buckets)
    }
}
