use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{SwipeVerdict, UserId};

/// Request to swipe a shown candidate
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SwipeRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "candidate_id", rename = "candidateId")]
    pub candidate_id: UserId,
    pub verdict: SwipeVerdict,
}
