//! Room review repository
//!
//! Every write recomputes the room's cached `average_rating` and
//! `total_reviews` in the same transaction, counting visible reviews only.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use super::{parse_db_timestamp, parse_db_uuid, to_db};
use crate::models::{ReviewListQuery, RoomReview};

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: String,
    room_id: String,
    user_id: String,
    full_name: String,
    username: String,
    rating: i64,
    comment: String,
    is_approved: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ReviewRow> for RoomReview {
    type Error = anyhow::Error;

    fn try_from(row: ReviewRow) -> Result<Self> {
        let (user_name, user_initial) = RoomReview::reviewer(&row.full_name, &row.username);
        Ok(RoomReview {
            id: parse_db_uuid(&row.id)?,
            room_id: parse_db_uuid(&row.room_id)?,
            user_id: parse_db_uuid(&row.user_id)?,
            user_name,
            user_initial,
            rating: row.rating,
            comment: row.comment,
            is_approved: row.is_approved,
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
        })
    }
}

const SELECT_REVIEW: &str = r#"
    SELECT r.id, r.room_id, r.user_id, u.full_name, u.username, r.rating, r.comment,
           r.is_approved, r.created_at, r.updated_at
    FROM room_reviews r
    JOIN users u ON u.id = r.user_id
"#;

pub struct ReviewRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ReviewRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<RoomReview>> {
        let sql = format!("{SELECT_REVIEW} WHERE r.id = ?");
        let row = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await
            .context("Failed to fetch review")?;

        row.map(RoomReview::try_from).transpose()
    }

    async fn get_for(&self, room_id: Uuid, user_id: Uuid) -> Result<Option<RoomReview>> {
        let sql = format!("{SELECT_REVIEW} WHERE r.room_id = ? AND r.user_id = ?");
        let row = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(room_id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(self.pool)
            .await
            .context("Failed to fetch review")?;

        row.map(RoomReview::try_from).transpose()
    }

    /// Create or replace the user's review of a room
    ///
    /// Returns the stored review and whether it is new. A replaced review
    /// keeps its moderation state.
    pub async fn upsert(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        rating: i64,
        comment: &str,
    ) -> Result<(RoomReview, bool)> {
        let existed = self.get_for(room_id, user_id).await?.is_some();
        let now = to_db(Utc::now());

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query(
            r#"
            INSERT INTO room_reviews (id, room_id, user_id, rating, comment, is_approved,
                                      created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            ON CONFLICT (room_id, user_id)
            DO UPDATE SET rating = excluded.rating, comment = excluded.comment,
                          updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(room_id.to_string())
        .bind(user_id.to_string())
        .bind(rating)
        .bind(comment)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Failed to save review")?;

        refresh_room_rating(&mut tx, room_id).await?;
        tx.commit().await.context("Failed to commit review")?;

        let review = self
            .get_for(room_id, user_id)
            .await?
            .context("Review not found after save")?;
        Ok((review, !existed))
    }

    /// Visible reviews of a room, newest first
    pub async fn list_approved(&self, room_id: Uuid) -> Result<Vec<RoomReview>> {
        let sql = format!(
            "{SELECT_REVIEW} WHERE r.room_id = ? AND r.is_approved = 1 ORDER BY r.created_at DESC"
        );
        let rows = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(room_id.to_string())
            .fetch_all(self.pool)
            .await
            .context("Failed to list reviews")?;

        rows.into_iter().map(RoomReview::try_from).collect()
    }

    /// Moderation view; hidden reviews included
    pub async fn list(&self, query: &ReviewListQuery) -> Result<Vec<RoomReview>> {
        let mut sql = format!("{SELECT_REVIEW} WHERE 1 = 1");
        if query.room_id.is_some() {
            sql.push_str(" AND r.room_id = ?");
        }
        if query.approved.is_some() {
            sql.push_str(" AND r.is_approved = ?");
        }
        sql.push_str(" ORDER BY r.created_at DESC");

        let mut q = sqlx::query_as::<_, ReviewRow>(&sql);
        if let Some(room_id) = query.room_id {
            q = q.bind(room_id.to_string());
        }
        if let Some(approved) = query.approved {
            q = q.bind(approved);
        }

        let rows = q.fetch_all(self.pool).await.context("Failed to list reviews")?;
        rows.into_iter().map(RoomReview::try_from).collect()
    }

    /// Show or hide a review; `None` when it does not exist
    pub async fn set_approved(&self, id: Uuid, approved: bool) -> Result<Option<RoomReview>> {
        let Some(review) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query("UPDATE room_reviews SET is_approved = ?, updated_at = ? WHERE id = ?")
            .bind(approved)
            .bind(to_db(Utc::now()))
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to moderate review")?;

        refresh_room_rating(&mut tx, review.room_id).await?;
        tx.commit().await.context("Failed to commit moderation")?;

        self.get_by_id(id).await
    }
}

/// Recompute the cached rating of a room from its visible reviews
async fn refresh_room_rating(tx: &mut Transaction<'_, Sqlite>, room_id: Uuid) -> Result<()> {
    let room_id = room_id.to_string();
    sqlx::query(
        r#"
        UPDATE rooms
        SET average_rating = COALESCE(
                (SELECT ROUND(AVG(rating), 1) FROM room_reviews
                 WHERE room_id = ? AND is_approved = 1), 0),
            total_reviews = (SELECT COUNT(*) FROM room_reviews
                             WHERE room_id = ? AND is_approved = 1)
        WHERE id = ?
        "#,
    )
    .bind(&room_id)
    .bind(&room_id)
    .bind(&room_id)
    .execute(&mut **tx)
    .await
    .context("Failed to refresh room rating")?;
    Ok(())
}
