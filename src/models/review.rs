//! Room reviews

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::display_name;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomReview {
    pub id: Uuid,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    /// Uppercased first letter of the reviewer's name, for avatars
    pub user_initial: String,
    pub rating: i64,
    pub comment: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomReview {
    /// Fill the reviewer fields from the joined user columns
    pub fn reviewer(full_name: &str, username: &str) -> (String, String) {
        let name = display_name(full_name, username).to_string();
        let initial = name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default();
        (name, initial)
    }
}

/// Visible reviews of a room with its cached aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomReviews {
    pub room_id: Uuid,
    pub average_rating: f64,
    pub total_reviews: i64,
    pub reviews: Vec<RoomReview>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitReviewRequest {
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: i64,
    #[serde(default)]
    #[validate(length(max = 2000, message = "comment must be at most 2000 characters"))]
    pub comment: String,
}

impl SubmitReviewRequest {
    /// Comment with surrounding whitespace removed; `None` when nothing is left
    pub fn trimmed_comment(&self) -> Option<&str> {
        Some(self.comment.trim()).filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModerateReviewRequest {
    pub is_approved: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ReviewListQuery {
    pub room_id: Option<Uuid>,
    pub approved: Option<bool>,
}
