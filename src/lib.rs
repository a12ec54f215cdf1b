//! Spark Match - matching and pairing engine for the Spark dating backend
//!
//! Decides which partner a user sees next, records swipes as an event log
//! per pair attempt, and turns reciprocal likes into matches.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{
    profile_matches, resolve, vincenty_distance_km, Collaborators, MatchError, Matcher, Principal,
};
pub use models::{PairEventType, PairState, Preferences, Profile, ProfileShowcase, SwipeVerdict};
