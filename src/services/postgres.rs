use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;

use crate::core::ports::{
    ChatStore, PairAttemptStore, PairEventLog, PhotoStore, ProfileStore, StoreError, StoreHealth,
};
use crate::models::{
    Chat, Gender, PairAttempt, PairEvent, PairEventType, PairState, Preferences, Profile, UserId,
};

/// Errors that can occur when connecting to PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        StoreError::Backend(Box::new(value))
    }
}

const ATTEMPT_COLUMNS: &str = "id, user1, user2, state, created_at";
const EVENT_COLUMNS: &str = "id, pair_attempt_id, event_type, created_at";

/// PostgreSQL store for profiles, pair attempts, the pair event log,
/// photos and chats
///
/// Pending-attempt uniqueness per unordered pair is enforced by a partial
/// unique index; a violation surfaces as `StoreError::PendingConflict`.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client and run pending migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn to_db_id(id: u64) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(|_| StoreError::Malformed(format!("id {} out of range", id)))
}

fn from_db_id(id: i64) -> Result<u64, StoreError> {
    u64::try_from(id).map_err(|_| StoreError::Malformed(format!("negative id {}", id)))
}

fn age_from_db(column: &str, value: i32) -> Result<u32, StoreError> {
    u32::try_from(value)
        .map_err(|_| StoreError::Malformed(format!("negative {} {}", column, value)))
}

fn parse_gender(value: Option<String>) -> Result<Option<Gender>, StoreError> {
    value
        .as_deref()
        .map(|g| g.parse::<Gender>())
        .transpose()
        .map_err(StoreError::from)
}

fn profile_from_row(row: &PgRow) -> Result<Profile, StoreError> {
    let age: i32 = row.try_get("age")?;

    Ok(Profile {
        user_id: from_db_id(row.try_get("user_id")?)?,
        name: row.try_get("name")?,
        gender: parse_gender(row.try_get("gender")?)?,
        age: age_from_db("age", age)?,
        bio: row.try_get("bio")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        location_name: row.try_get("location_name")?,
    })
}

fn preferences_from_row(row: &PgRow) -> Result<Preferences, StoreError> {
    let min_age: i32 = row.try_get("min_age")?;
    let max_age: i32 = row.try_get("max_age")?;

    Ok(Preferences {
        user_id: from_db_id(row.try_get("user_id")?)?,
        gender: parse_gender(row.try_get("gender")?)?,
        min_age: age_from_db("min_age", min_age)?,
        max_age: age_from_db("max_age", max_age)?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        radius_km: row.try_get("radius_km")?,
    })
}

fn attempt_from_row(row: &PgRow) -> Result<PairAttempt, StoreError> {
    let state: String = row.try_get("state")?;

    Ok(PairAttempt {
        id: from_db_id(row.try_get("id")?)?,
        user1: from_db_id(row.try_get("user1")?)?,
        user2: from_db_id(row.try_get("user2")?)?,
        state: state.parse::<PairState>()?,
        created_at: row.try_get("created_at")?,
    })
}

fn event_from_row(row: &PgRow) -> Result<PairEvent, StoreError> {
    let event_type: String = row.try_get("event_type")?;

    Ok(PairEvent {
        id: from_db_id(row.try_get("id")?)?,
        attempt_id: from_db_id(row.try_get("pair_attempt_id")?)?,
        created_at: row.try_get("created_at")?,
        event_type: event_type.parse::<PairEventType>()?,
    })
}

#[async_trait]
impl ProfileStore for PostgresClient {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StoreError> {
        let query = r#"
            SELECT user_id, name, gender, age, bio, latitude, longitude, location_name
            FROM profiles
            WHERE user_id = $1
        "#;

        let row = sqlx::query(query)
            .bind(to_db_id(user_id)?)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    async fn get_preferences(&self, user_id: UserId) -> Result<Option<Preferences>, StoreError> {
        let query = r#"
            SELECT user_id, gender, min_age, max_age, latitude, longitude, radius_km
            FROM preferences
            WHERE user_id = $1
        "#;

        let row = sqlx::query(query)
            .bind(to_db_id(user_id)?)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(preferences_from_row).transpose()
    }

    async fn get_all_valid_user_ids(&self) -> Result<Vec<UserId>, StoreError> {
        let query = r#"
            SELECT p.user_id
            FROM profiles p
            JOIN preferences pr ON pr.user_id = p.user_id
            ORDER BY p.user_id
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let ids = rows
            .iter()
            .map(|row| from_db_id(row.try_get("user_id")?))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Found {} valid users", ids.len());

        Ok(ids)
    }
}

#[async_trait]
impl PairAttemptStore for PostgresClient {
    async fn create_pair_attempt(
        &self,
        user1: UserId,
        user2: UserId,
    ) -> Result<PairAttempt, StoreError> {
        let query = format!(
            "INSERT INTO pair_attempts (user1, user2, state) VALUES ($1, $2, 'pending') RETURNING {}",
            ATTEMPT_COLUMNS
        );

        let result = sqlx::query(&query)
            .bind(to_db_id(user1)?)
            .bind(to_db_id(user2)?)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => {
                let attempt = attempt_from_row(&row)?;
                tracing::debug!("Created pair attempt {}: {} -> {}", attempt.id, user1, user2);
                Ok(attempt)
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::PendingConflict(user1, user2))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_pending_pair_attempt_by_user_pair(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<PairAttempt>, StoreError> {
        let query = format!(
            r#"
            SELECT {}
            FROM pair_attempts
            WHERE ((user1 = $1 AND user2 = $2) OR (user1 = $2 AND user2 = $1))
              AND state = 'pending'
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
            ATTEMPT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(to_db_id(a)?)
            .bind(to_db_id(b)?)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(attempt_from_row).transpose()
    }

    async fn get_latest_pair_attempt_by_user_pair(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<PairAttempt>, StoreError> {
        let query = format!(
            r#"
            SELECT {}
            FROM pair_attempts
            WHERE (user1 = $1 AND user2 = $2) OR (user1 = $2 AND user2 = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
            ATTEMPT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(to_db_id(a)?)
            .bind(to_db_id(b)?)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(attempt_from_row).transpose()
    }

    async fn finish_pair_attempt(
        &self,
        attempt_id: u64,
        state: PairState,
    ) -> Result<(), StoreError> {
        // Terminal attempts are never rewritten
        let query = r#"
            UPDATE pair_attempts
            SET state = $2
            WHERE id = $1 AND state = 'pending'
        "#;

        let result = sqlx::query(query)
            .bind(to_db_id(attempt_id)?)
            .bind(state.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(
                "Pair attempt {} was not pending, state {} not applied",
                attempt_id,
                state.as_str()
            );
            return Err(StoreError::NotPending(attempt_id));
        }

        Ok(())
    }

    async fn get_pending_pair_attempts(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PairAttempt>, StoreError> {
        let query = format!(
            r#"
            SELECT {}
            FROM pair_attempts
            WHERE user1 = $1 AND state = 'pending'
            ORDER BY created_at, id
            "#,
            ATTEMPT_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(to_db_id(user_id)?)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(attempt_from_row).collect()
    }

    async fn get_who_liked_me(&self, user_id: UserId) -> Result<Option<PairAttempt>, StoreError> {
        let query = r#"
            SELECT pa.id, pa.user1, pa.user2, pa.state, pa.created_at
            FROM pair_attempts pa
            JOIN LATERAL (
                SELECT pe.event_type
                FROM pair_events pe
                WHERE pe.pair_attempt_id = pa.id
                ORDER BY pe.created_at DESC, pe.id DESC
                LIMIT 1
            ) last_event ON TRUE
            WHERE pa.user2 = $1
              AND pa.state = 'pending'
              AND last_event.event_type IN ('user_1_liked', 'sent_to_user_2')
            ORDER BY pa.created_at, pa.id
            LIMIT 1
        "#;

        let row = sqlx::query(query)
            .bind(to_db_id(user_id)?)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(attempt_from_row).transpose()
    }
}

#[async_trait]
impl PairEventLog for PostgresClient {
    async fn create_event(
        &self,
        attempt_id: u64,
        event_type: PairEventType,
    ) -> Result<PairEvent, StoreError> {
        let query = format!(
            "INSERT INTO pair_events (pair_attempt_id, event_type) VALUES ($1, $2) RETURNING {}",
            EVENT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(to_db_id(attempt_id)?)
            .bind(event_type.as_str())
            .fetch_one(&self.pool)
            .await?;

        event_from_row(&row)
    }

    async fn get_last_event(&self, attempt_id: u64) -> Result<Option<PairEvent>, StoreError> {
        let query = format!(
            r#"
            SELECT {}
            FROM pair_events
            WHERE pair_attempt_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
            EVENT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(to_db_id(attempt_id)?)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(event_from_row).transpose()
    }
}

#[async_trait]
impl PhotoStore for PostgresClient {
    async fn get_user_photos(&self, user_id: UserId) -> Result<Vec<String>, StoreError> {
        let query = r#"
            SELECT photo_key
            FROM photos
            WHERE user_id = $1
            ORDER BY position, id
        "#;

        let rows = sqlx::query(query)
            .bind(to_db_id(user_id)?)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get("photo_key").map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl ChatStore for PostgresClient {
    async fn create_chat(&self, user1: UserId, user2: UserId) -> Result<Chat, StoreError> {
        let query = r#"
            INSERT INTO chats (user1, user2)
            VALUES ($1, $2)
            RETURNING id, user1, user2
        "#;

        let row = sqlx::query(query)
            .bind(to_db_id(user1)?)
            .bind(to_db_id(user2)?)
            .fetch_one(&self.pool)
            .await?;

        let chat = Chat {
            id: from_db_id(row.try_get("id")?)?,
            user1: from_db_id(row.try_get("user1")?)?,
            user2: from_db_id(row.try_get("user2")?)?,
        };

        tracing::info!("Created chat {} for users {} and {}", chat.id, user1, user2);

        Ok(chat)
    }
}

#[async_trait]
impl StoreHealth for PostgresClient {
    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}
