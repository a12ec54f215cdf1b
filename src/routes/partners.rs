use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder, ResponseError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

use crate::core::{ErrorKind, MatchError, Matcher, StoreHealth};
use crate::models::{ErrorResponse, HealthResponse, SwipeRequest, SwipeResponse};
use crate::routes::auth::principal_from_request;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matcher: Arc<Matcher>,
    pub store_health: Arc<dyn StoreHealth>,
    pub jwt_secret: Arc<str>,
    pub request_timeout: Duration,
}

/// Configure partner discovery and swipe routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/partners/next", web::get().to(next_partner))
        .route("/swipes", web::post().to(swipe));
}

impl ResponseError for MatchError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Collaborator details stay in the logs
        let message = match self {
            MatchError::Internal { .. } => "internal error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().as_str().to_string(),
            message,
            status_code: status.as_u16(),
        })
    }
}

/// Run an engine call under the request deadline. On expiry the call is
/// dropped at its current await point.
async fn with_deadline<T, F>(
    timeout: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, MatchError>
where
    F: Future<Output = Result<T, MatchError>>,
{
    let result = match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(MatchError::TimedOut),
    };

    if let Err(e) = &result {
        match e.kind() {
            ErrorKind::Internal => tracing::error!("{} failed: {:?}", operation, e),
            ErrorKind::PermissionDenied => tracing::warn!("{} denied: {}", operation, e),
            ErrorKind::InvalidInput | ErrorKind::NotFound => {
                tracing::info!("{}: {}", operation, e)
            }
        }
    }

    result
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let db_healthy = state.store_health.health_check().await;

    let status = if db_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Next partner endpoint
///
/// GET /api/v1/partners/next
///
/// Returns the profile and photo links of the partner to show next.
async fn next_partner(
    state: web::Data<AppState>,
    http_req: HttpRequest,
) -> Result<HttpResponse, MatchError> {
    let principal = principal_from_request(&http_req, &state.jwt_secret)?;

    tracing::info!("Next partner requested by user {}", principal.0);

    let showcase = with_deadline(
        state.request_timeout,
        "next_partner",
        state.matcher.next_partner(principal),
    )
    .await?;

    Ok(HttpResponse::Ok().json(showcase))
}

/// Swipe endpoint
///
/// POST /api/v1/swipes
///
/// Request body:
/// ```json
/// {
///   "candidateId": 42,
///   "verdict": "like|dislike"
/// }
/// ```
async fn swipe(
    state: web::Data<AppState>,
    req: web::Json<SwipeRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, MatchError> {
    let principal = principal_from_request(&http_req, &state.jwt_secret)?;

    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for swipe request: {:?}", errors);
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: ErrorKind::InvalidInput.as_str().to_string(),
            message: errors.to_string(),
            status_code: 400,
        }));
    }

    let SwipeRequest {
        candidate_id,
        verdict,
    } = req.into_inner();

    tracing::info!(
        "User {} swiped {:?} on {}",
        principal.0,
        verdict,
        candidate_id
    );

    with_deadline(
        state.request_timeout,
        "swipe",
        state.matcher.swipe(principal, candidate_id, verdict),
    )
    .await?;

    Ok(HttpResponse::Ok().json(SwipeResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ports::StoreError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(MatchError::IncompleteProfile.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(MatchError::NoCandidates.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(MatchError::Unauthenticated.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            MatchError::TimedOut.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let err = MatchError::internal("can't get profile", StoreError::Malformed("x".into()));
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        let parsed: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.error, "internal");
        assert_eq!(parsed.message, "internal error");
    }

    #[tokio::test]
    async fn test_deadline_expiry_is_internal() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, MatchError>(())
        };

        let result = with_deadline(Duration::from_millis(10), "slow", slow).await;
        assert!(matches!(result, Err(MatchError::TimedOut)));
    }
}
