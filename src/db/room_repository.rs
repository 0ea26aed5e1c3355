//! Room repository

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_db_timestamp, parse_db_uuid, to_db};
use crate::models::{CreateRoomRequest, Room, RoomStatus, RoomType, UpdateRoomRequest};

#[derive(Debug, sqlx::FromRow)]
struct RoomRow {
    id: String,
    name: String,
    room_type: String,
    capacity: i64,
    facilities: String,
    description: String,
    is_active: bool,
    status: String,
    maintenance_note: Option<String>,
    average_rating: f64,
    total_reviews: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<RoomRow> for Room {
    type Error = anyhow::Error;

    fn try_from(row: RoomRow) -> Result<Self> {
        Ok(Room {
            id: parse_db_uuid(&row.id)?,
            name: row.name,
            room_type: row.room_type.parse::<RoomType>().map_err(anyhow::Error::msg)?,
            capacity: row.capacity,
            facilities: serde_json::from_str(&row.facilities)
                .context("Invalid facilities JSON in database")?,
            description: row.description,
            is_active: row.is_active,
            status: row.status.parse::<RoomStatus>().map_err(anyhow::Error::msg)?,
            maintenance_note: row.maintenance_note,
            average_rating: row.average_rating,
            total_reviews: row.total_reviews,
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
        })
    }
}

const SELECT_ROOM: &str = "SELECT id, name, room_type, capacity, facilities, description, \
                           is_active, status, maintenance_note, average_rating, total_reviews, \
                           created_at, updated_at FROM rooms";

pub struct RoomRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RoomRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Rooms ordered by name; inactive rooms only when asked for
    pub async fn list(&self, include_inactive: bool) -> Result<Vec<Room>> {
        let sql = if include_inactive {
            format!("{SELECT_ROOM} ORDER BY name")
        } else {
            format!("{SELECT_ROOM} WHERE is_active = 1 ORDER BY name")
        };

        let rows = sqlx::query_as::<_, RoomRow>(&sql)
            .fetch_all(self.pool)
            .await
            .context("Failed to list rooms")?;

        rows.into_iter().map(Room::try_from).collect()
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Room>> {
        let sql = format!("{SELECT_ROOM} WHERE id = ?");
        let row = sqlx::query_as::<_, RoomRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await
            .context("Failed to fetch room")?;

        row.map(Room::try_from).transpose()
    }

    pub async fn create(&self, req: &CreateRoomRequest) -> Result<Room> {
        let id = Uuid::new_v4();
        let now = to_db(Utc::now());
        let facilities = serde_json::to_string(&req.facilities)?;

        sqlx::query(
            r#"
            INSERT INTO rooms (id, name, room_type, capacity, facilities, description,
                               is_active, status, maintenance_note, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(req.name.trim())
        .bind(req.room_type.as_str())
        .bind(req.capacity)
        .bind(&facilities)
        .bind(&req.description)
        .bind(req.is_active)
        .bind(req.status.as_str())
        .bind(req.maintenance_note.as_deref())
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .context("Failed to create room")?;

        self.get_by_id(id)
            .await?
            .context("Room not found after insert")
    }

    /// Apply a partial update; `None` when the room does not exist
    pub async fn update(&self, id: Uuid, req: &UpdateRoomRequest) -> Result<Option<Room>> {
        let Some(existing) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let name = req.name.as_deref().map(str::trim).unwrap_or(&existing.name);
        let room_type = req.room_type.unwrap_or(existing.room_type);
        let capacity = req.capacity.unwrap_or(existing.capacity);
        let facilities = serde_json::to_string(req.facilities.as_ref().unwrap_or(&existing.facilities))?;
        let description = req.description.as_ref().unwrap_or(&existing.description);
        let is_active = req.is_active.unwrap_or(existing.is_active);
        let status = req.status.unwrap_or(existing.status);
        let maintenance_note = req
            .maintenance_note
            .as_ref()
            .or(existing.maintenance_note.as_ref());

        sqlx::query(
            r#"
            UPDATE rooms
            SET name = ?, room_type = ?, capacity = ?, facilities = ?, description = ?,
                is_active = ?, status = ?, maintenance_note = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(room_type.as_str())
        .bind(capacity)
        .bind(&facilities)
        .bind(description)
        .bind(is_active)
        .bind(status.as_str())
        .bind(maintenance_note)
        .bind(to_db(Utc::now()))
        .bind(id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to update room")?;

        self.get_by_id(id).await
    }

    /// Delete a room and, through the foreign key, its bookings
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = ?")
            .bind(id.to_string())
            .execute(self.pool)
            .await
            .context("Failed to delete room")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rooms")
            .fetch_one(self.pool)
            .await
            .context("Failed to count rooms")?;
        Ok(count)
    }

    pub async fn count_active(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rooms WHERE is_active = 1")
            .fetch_one(self.pool)
            .await
            .context("Failed to count active rooms")?;
        Ok(count)
    }
}
