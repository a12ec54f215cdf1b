use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier shared by users, pair attempts, events and chats
pub type UserId = u64;

/// Error returned when a stored enum value is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(ParseEnumError::new("gender", other)),
        }
    }
}

/// A point on the globe, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// User profile as shown to other users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(rename = "locationName", default)]
    pub location_name: String,
}

impl Profile {
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        }
    }

    /// Gender, age, location and location name must all be set before
    /// the user can take part in matching.
    pub fn is_complete(&self) -> bool {
        self.gender.is_some()
            && self.age > 0
            && self.location().is_some()
            && !self.location_name.trim().is_empty()
    }
}

/// What a user is looking for in a partner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    /// `None` accepts any gender
    #[serde(default)]
    pub gender: Option<Gender>,
    /// 0 = unbounded
    #[serde(rename = "minAge", default)]
    pub min_age: u32,
    /// 0 = unbounded
    #[serde(rename = "maxAge", default)]
    pub max_age: u32,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(rename = "radiusKm", default)]
    pub radius_km: f64,
}

impl Preferences {
    pub fn center(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.center().is_some() && self.radius_km > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairState {
    Pending,
    Match,
    Mismatch,
}

impl PairState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PairState::Pending => "pending",
            PairState::Match => "match",
            PairState::Mismatch => "mismatch",
        }
    }
}

impl FromStr for PairState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PairState::Pending),
            "match" => Ok(PairState::Match),
            "mismatch" => Ok(PairState::Mismatch),
            other => Err(ParseEnumError::new("pair state", other)),
        }
    }
}

/// Lifecycle steps recorded in the pair event log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairEventType {
    PaCreated,
    #[serde(rename = "sent_to_user_1")]
    SentToUser1,
    #[serde(rename = "user_1_liked")]
    User1Liked,
    #[serde(rename = "user_1_disliked")]
    User1Disliked,
    #[serde(rename = "sent_to_user_2")]
    SentToUser2,
    #[serde(rename = "user_2_liked")]
    User2Liked,
    #[serde(rename = "user_2_disliked")]
    User2Disliked,
    PairCreated,
    PairAttemptFailed,
}

impl PairEventType {
    pub const ALL: [PairEventType; 9] = [
        PairEventType::PaCreated,
        PairEventType::SentToUser1,
        PairEventType::User1Liked,
        PairEventType::User1Disliked,
        PairEventType::SentToUser2,
        PairEventType::User2Liked,
        PairEventType::User2Disliked,
        PairEventType::PairCreated,
        PairEventType::PairAttemptFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PairEventType::PaCreated => "pa_created",
            PairEventType::SentToUser1 => "sent_to_user_1",
            PairEventType::User1Liked => "user_1_liked",
            PairEventType::User1Disliked => "user_1_disliked",
            PairEventType::SentToUser2 => "sent_to_user_2",
            PairEventType::User2Liked => "user_2_liked",
            PairEventType::User2Disliked => "user_2_disliked",
            PairEventType::PairCreated => "pair_created",
            PairEventType::PairAttemptFailed => "pair_attempt_failed",
        }
    }
}

impl FromStr for PairEventType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PairEventType::ALL
            .iter()
            .copied()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("pair event", s))
    }
}

impl fmt::Display for PairEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One matchmaking round between two users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairAttempt {
    pub id: u64,
    /// The user the attempt was first shown to
    pub user1: UserId,
    pub user2: UserId,
    pub state: PairState,
    pub created_at: DateTime<Utc>,
}

/// Immutable entry of the pair event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairEvent {
    pub id: u64,
    pub attempt_id: u64,
    pub created_at: DateTime<Utc>,
    pub event_type: PairEventType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: u64,
    pub user1: UserId,
    pub user2: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeVerdict {
    Like,
    Dislike,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoShowcase {
    pub key: String,
    pub link: String,
}

/// A profile enriched with shareable photo links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileShowcase {
    pub profile: Profile,
    pub photos: Vec<PhotoShowcase>,
}

/// Payload of "someone liked you" and "it's a match" notifications.
/// Always describes the *other* party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerNotice {
    pub name: String,
    /// Primary photo link, empty when the partner has no photos
    pub photo: String,
}
