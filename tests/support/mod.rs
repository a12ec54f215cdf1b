// Shared in-memory collaborators for the engine tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use spark_match::core::ports::{
    ChatStore, NotifyError, Notifier, PairAttemptStore, PairEventLog, PhotoStore, ProfileStore,
    StoreError, StoreHealth,
};
use spark_match::core::{is_valid_successor, Collaborators, Matcher, RandomIndex};
use spark_match::models::{
    Chat, Gender, PairAttempt, PairEvent, PairEventType, PairState, PartnerNotice, Preferences,
    Profile, UserId,
};
use spark_match::services::CdnPhotoLinker;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub const BERLIN: (f64, f64) = (52.5200, 13.4050);
pub const POTSDAM: (f64, f64) = (52.3906, 13.0645);
pub const MUNICH: (f64, f64) = (48.1351, 11.5820);

pub const PHOTO_BASE: &str = "https://cdn.test/photos";

pub fn profile(user_id: UserId, gender: Gender, age: u32, at: (f64, f64)) -> Profile {
    Profile {
        user_id,
        name: format!("User {}", user_id),
        gender: Some(gender),
        age,
        bio: String::new(),
        latitude: Some(at.0),
        longitude: Some(at.1),
        location_name: "Berlin".to_string(),
    }
}

pub fn preferences(user_id: UserId, gender: Option<Gender>, at: (f64, f64), radius_km: f64) -> Preferences {
    Preferences {
        user_id,
        gender,
        min_age: 18,
        max_age: 99,
        latitude: Some(at.0),
        longitude: Some(at.1),
        radius_km,
    }
}

#[derive(Default)]
struct Inner {
    profiles: HashMap<UserId, Profile>,
    preferences: HashMap<UserId, Preferences>,
    photos: HashMap<UserId, Vec<String>>,
    attempts: Vec<PairAttempt>,
    events: Vec<PairEvent>,
    chats: Vec<Chat>,
    ticks: i64,
    /// Candidates another request grabs just before we insert our attempt
    racers: HashSet<UserId>,
    failing: HashSet<&'static str>,
    event_delay: Option<std::time::Duration>,
    /// Append like a plain SQL insert, without the ordering assertion
    unordered_log: bool,
}

impl Inner {
    fn now(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        epoch() + Duration::seconds(self.ticks)
    }

    fn last_event(&self, attempt_id: u64) -> Option<PairEvent> {
        self.events
            .iter()
            .filter(|e| e.attempt_id == attempt_id)
            .max_by_key(|e| (e.created_at, e.id))
            .cloned()
    }

    fn pending_for(&self, a: UserId, b: UserId) -> Option<&PairAttempt> {
        self.attempts
            .iter()
            .find(|pa| pa.state == PairState::Pending && same_pair(pa, a, b))
    }

    fn push_attempt(&mut self, user1: UserId, user2: UserId, state: PairState, created_at: DateTime<Utc>) -> PairAttempt {
        let attempt = PairAttempt {
            id: self.attempts.len() as u64 + 1,
            user1,
            user2,
            state,
            created_at,
        };
        self.attempts.push(attempt.clone());
        attempt
    }

    fn push_event(&mut self, attempt_id: u64, event_type: PairEventType) -> PairEvent {
        let prev = self.last_event(attempt_id).map(|e| e.event_type);
        assert!(
            self.unordered_log || is_valid_successor(prev, event_type),
            "event {} may not follow {:?} on attempt {}",
            event_type,
            prev,
            attempt_id
        );

        let event = PairEvent {
            id: self.events.len() as u64 + 1,
            attempt_id,
            created_at: self.now(),
            event_type,
        };
        self.events.push(event.clone());
        event
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn same_pair(attempt: &PairAttempt, a: UserId, b: UserId) -> bool {
    (attempt.user1 == a && attempt.user2 == b) || (attempt.user1 == b && attempt.user2 == a)
}

/// Single in-memory backend for every store trait, enforcing one pending
/// attempt per unordered pair and a well-ordered event log
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, profile: Profile, preferences: Preferences) {
        let mut inner = self.inner.lock().unwrap();
        inner.preferences.insert(preferences.user_id, preferences);
        inner.profiles.insert(profile.user_id, profile);
    }

    pub fn add_profile(&self, profile: Profile) {
        self.inner.lock().unwrap().profiles.insert(profile.user_id, profile);
    }

    pub fn add_photos(&self, user_id: UserId, keys: &[&str]) {
        self.inner
            .lock()
            .unwrap()
            .photos
            .insert(user_id, keys.iter().map(|k| k.to_string()).collect());
    }

    /// Finished attempt from the past, with its full event trail
    pub fn add_history(&self, user1: UserId, user2: UserId, state: PairState, minutes_ago: i64) {
        let mut inner = self.inner.lock().unwrap();
        let created_at = epoch() - Duration::minutes(minutes_ago);
        let attempt = inner.push_attempt(user1, user2, state, created_at);

        let trail: &[PairEventType] = match state {
            PairState::Pending => &[PairEventType::PaCreated, PairEventType::SentToUser1],
            PairState::Mismatch => &[
                PairEventType::PaCreated,
                PairEventType::SentToUser1,
                PairEventType::User1Disliked,
                PairEventType::PairAttemptFailed,
            ],
            PairState::Match => &[
                PairEventType::PaCreated,
                PairEventType::SentToUser1,
                PairEventType::User1Liked,
                PairEventType::SentToUser2,
                PairEventType::User2Liked,
                PairEventType::PairCreated,
            ],
        };
        for event in trail {
            inner.push_event(attempt.id, *event);
        }
    }

    /// Pending attempt with no events, as left by a call dropped right
    /// after the insert
    pub fn add_bare_attempt(&self, user1: UserId, user2: UserId) -> PairAttempt {
        let mut inner = self.inner.lock().unwrap();
        let now = inner.now();
        inner.push_attempt(user1, user2, PairState::Pending, now)
    }

    pub fn race_for(&self, candidate: UserId) {
        self.inner.lock().unwrap().racers.insert(candidate);
    }

    pub fn fail(&self, operation: &'static str) {
        self.inner.lock().unwrap().failing.insert(operation);
    }

    pub fn delay_events(&self, delay: std::time::Duration) {
        self.inner.lock().unwrap().event_delay = Some(delay);
    }

    pub fn allow_unordered_log(&self) {
        self.inner.lock().unwrap().unordered_log = true;
    }

    pub fn clear_delay(&self) {
        self.inner.lock().unwrap().event_delay = None;
    }

    pub fn attempts(&self) -> Vec<PairAttempt> {
        self.inner.lock().unwrap().attempts.clone()
    }

    pub fn attempts_between(&self, a: UserId, b: UserId) -> Vec<PairAttempt> {
        self.attempts().into_iter().filter(|pa| same_pair(pa, a, b)).collect()
    }

    pub fn events_of(&self, attempt_id: u64) -> Vec<PairEventType> {
        self.inner
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.attempt_id == attempt_id)
            .map(|e| e.event_type)
            .collect()
    }

    pub fn chats(&self) -> Vec<Chat> {
        self.inner.lock().unwrap().chats.clone()
    }

    /// Counts of every stored row, for "no side effects" checks
    pub fn write_count(&self) -> (usize, usize, usize) {
        let inner = self.inner.lock().unwrap();
        (inner.attempts.len(), inner.events.len(), inner.chats.len())
    }

    fn check(&self, operation: &'static str) -> Result<(), StoreError> {
        if self.inner.lock().unwrap().failing.contains(operation) {
            return Err(StoreError::Backend(format!("{} unavailable", operation).into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StoreError> {
        self.check("get_profile")?;
        Ok(self.inner.lock().unwrap().profiles.get(&user_id).cloned())
    }

    async fn get_preferences(&self, user_id: UserId) -> Result<Option<Preferences>, StoreError> {
        self.check("get_preferences")?;
        Ok(self.inner.lock().unwrap().preferences.get(&user_id).cloned())
    }

    async fn get_all_valid_user_ids(&self) -> Result<Vec<UserId>, StoreError> {
        self.check("get_all_valid_user_ids")?;
        let inner = self.inner.lock().unwrap();
        let mut ids: Vec<UserId> = inner
            .profiles
            .keys()
            .filter(|id| inner.preferences.contains_key(id))
            .copied()
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

#[async_trait]
impl PairAttemptStore for MemoryStore {
    async fn create_pair_attempt(&self, user1: UserId, user2: UserId) -> Result<PairAttempt, StoreError> {
        self.check("create_pair_attempt")?;
        let mut inner = self.inner.lock().unwrap();

        if inner.racers.remove(&user2) {
            // The candidate's own request wins the slot first
            let now = inner.now();
            let theirs = inner.push_attempt(user2, user1, PairState::Pending, now);
            inner.push_event(theirs.id, PairEventType::PaCreated);
            inner.push_event(theirs.id, PairEventType::SentToUser1);
        }

        if inner.pending_for(user1, user2).is_some() {
            return Err(StoreError::PendingConflict(user1, user2));
        }

        let now = inner.now();
        Ok(inner.push_attempt(user1, user2, PairState::Pending, now))
    }

    async fn get_pending_pair_attempt_by_user_pair(&self, a: UserId, b: UserId) -> Result<Option<PairAttempt>, StoreError> {
        self.check("get_pending_pair_attempt_by_user_pair")?;
        Ok(self.inner.lock().unwrap().pending_for(a, b).cloned())
    }

    async fn get_latest_pair_attempt_by_user_pair(&self, a: UserId, b: UserId) -> Result<Option<PairAttempt>, StoreError> {
        self.check("get_latest_pair_attempt_by_user_pair")?;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .attempts
            .iter()
            .filter(|pa| same_pair(pa, a, b))
            .max_by_key(|pa| (pa.created_at, pa.id))
            .cloned())
    }

    async fn finish_pair_attempt(&self, attempt_id: u64, state: PairState) -> Result<(), StoreError> {
        self.check("finish_pair_attempt")?;
        let mut inner = self.inner.lock().unwrap();
        match inner
            .attempts
            .iter_mut()
            .find(|pa| pa.id == attempt_id && pa.state == PairState::Pending)
        {
            Some(attempt) => {
                attempt.state = state;
                Ok(())
            }
            None => Err(StoreError::NotPending(attempt_id)),
        }
    }

    async fn get_pending_pair_attempts(&self, user_id: UserId) -> Result<Vec<PairAttempt>, StoreError> {
        self.check("get_pending_pair_attempts")?;
        let mut pending: Vec<PairAttempt> = self
            .inner
            .lock()
            .unwrap()
            .attempts
            .iter()
            .filter(|pa| pa.user1 == user_id && pa.state == PairState::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|pa| (pa.created_at, pa.id));
        Ok(pending)
    }

    async fn get_who_liked_me(&self, user_id: UserId) -> Result<Option<PairAttempt>, StoreError> {
        self.check("get_who_liked_me")?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .attempts
            .iter()
            .filter(|pa| pa.user2 == user_id && pa.state == PairState::Pending)
            .filter(|pa| {
                matches!(
                    inner.last_event(pa.id).map(|e| e.event_type),
                    Some(PairEventType::User1Liked | PairEventType::SentToUser2)
                )
            })
            .min_by_key(|pa| (pa.created_at, pa.id))
            .cloned())
    }
}

#[async_trait]
impl PairEventLog for MemoryStore {
    async fn create_event(&self, attempt_id: u64, event_type: PairEventType) -> Result<PairEvent, StoreError> {
        self.check("create_event")?;

        let delay = self.inner.lock().unwrap().event_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(self.inner.lock().unwrap().push_event(attempt_id, event_type))
    }

    async fn get_last_event(&self, attempt_id: u64) -> Result<Option<PairEvent>, StoreError> {
        self.check("get_last_event")?;
        Ok(self.inner.lock().unwrap().last_event(attempt_id))
    }
}

#[async_trait]
impl PhotoStore for MemoryStore {
    async fn get_user_photos(&self, user_id: UserId) -> Result<Vec<String>, StoreError> {
        self.check("get_user_photos")?;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .photos
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn create_chat(&self, user1: UserId, user2: UserId) -> Result<Chat, StoreError> {
        self.check("create_chat")?;
        let mut inner = self.inner.lock().unwrap();
        let chat = Chat {
            id: inner.chats.len() as u64 + 1,
            user1,
            user2,
        };
        inner.chats.push(chat.clone());
        Ok(chat)
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn health_check(&self) -> bool {
        self.check("health_check").is_ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Liked(UserId, PartnerNotice),
    Match(UserId, PartnerNotice),
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    down: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn go_down(&self) {
        *self.down.lock().unwrap() = true;
    }

    fn record(&self, sent: Sent) -> Result<(), NotifyError> {
        if *self.down.lock().unwrap() {
            return Err(NotifyError::Rejected("503 Service Unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(sent);
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_liked(&self, user_id: UserId, notice: PartnerNotice) -> Result<(), NotifyError> {
        self.record(Sent::Liked(user_id, notice))
    }

    async fn notify_match(&self, user_id: UserId, notice: PartnerNotice) -> Result<(), NotifyError> {
        self.record(Sent::Match(user_id, notice))
    }
}

/// Always picks the same index
pub struct FixedRandom(pub usize);

impl RandomIndex for FixedRandom {
    fn pick(&self, _len: usize) -> usize {
        self.0
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub matcher: Matcher,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_random(FixedRandom(0))
    }

    pub fn with_random(random: impl RandomIndex + 'static) -> Self {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());

        let matcher = Matcher::new(Collaborators {
            profiles: store.clone(),
            attempts: store.clone(),
            events: store.clone(),
            photos: store.clone(),
            photo_links: Arc::new(CdnPhotoLinker::new(PHOTO_BASE)),
            chats: store.clone(),
            notifier: notifier.clone(),
            random: Arc::new(random),
        });

        Self {
            store,
            notifier,
            matcher,
        }
    }

    /// A user in Berlin looking for `seeking` within 50 km
    pub fn add_user(&self, user_id: UserId, gender: Gender, seeking: Gender) {
        self.store.add_user(
            profile(user_id, gender, 30, BERLIN),
            preferences(user_id, Some(seeking), BERLIN, 50.0),
        );
    }
}
