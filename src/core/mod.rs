// Core algorithm exports
pub mod distance;
pub mod error;
pub mod filters;
pub mod lifecycle;
pub mod matcher;
pub mod ports;
pub mod selector;

pub use distance::{vincenty_distance_km, DistanceError};
pub use error::{ErrorKind, MatchError};
pub use filters::{profile_matches, symmetric_match};
pub use lifecycle::{is_valid_successor, resolve, AttemptStage, PairRole};
pub use matcher::{Collaborators, Matcher, Principal};
pub use ports::{
    ChatStore, Notifier, NotifyError, PairAttemptStore, PairEventLog, PhotoLinker, PhotoStore,
    ProfileStore, StoreError, StoreHealth,
};
pub use selector::{CandidateBuckets, CandidateSelector, RandomIndex, ThreadRandom};
