// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Chat, Gender, GeoPoint, PairAttempt, PairEvent, PairEventType, PairState, ParseEnumError,
    PartnerNotice, PhotoShowcase, Preferences, Profile, ProfileShowcase, SwipeVerdict, UserId,
};
pub use requests::SwipeRequest;
pub use responses::{ErrorResponse, HealthResponse, SwipeResponse};
