// Service exports
pub mod notifier;
pub mod photos;
pub mod postgres;

pub use notifier::HttpNotifier;
pub use photos::CdnPhotoLinker;
pub use postgres::{PostgresClient, PostgresError};
