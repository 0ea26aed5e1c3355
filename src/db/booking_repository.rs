//! Booking repository
//!
//! Query functions are generic over the executor so the same SQL runs on
//! the pool for reads and inside a transaction for check-then-insert.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

use super::{parse_db_timestamp, parse_db_uuid, to_db};
use crate::models::{
    display_name, Booking, BookingListQuery, BookingStatus, NewBooking, StatusCounts, TimeSpan,
};

const SELECT_BOOKING: &str = r#"
    SELECT b.id, b.room_id, r.name AS room_name, b.user_id,
           u.username, u.full_name, u.email,
           b.starts_at, b.ends_at, b.guest_count, b.purpose,
           b.document_name, b.document_ref, b.document_size,
           b.status, b.created_at, b.updated_at
    FROM bookings b
    INNER JOIN rooms r ON r.id = b.room_id
    INNER JOIN users u ON u.id = b.user_id
"#;

/// Statuses that hold a slot, as an SQL list
const RESERVING_STATUSES: &str = "('Pending', 'Approved')";

#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: String,
    room_id: String,
    room_name: String,
    user_id: String,
    username: String,
    full_name: String,
    email: String,
    starts_at: String,
    ends_at: String,
    guest_count: i64,
    purpose: String,
    document_name: Option<String>,
    document_ref: Option<String>,
    document_size: Option<i64>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<BookingRow> for Booking {
    type Error = anyhow::Error;

    fn try_from(row: BookingRow) -> Result<Self> {
        let status = row
            .status
            .parse::<BookingStatus>()
            .map_err(anyhow::Error::msg)?;

        Ok(Booking {
            id: parse_db_uuid(&row.id)?,
            room_id: parse_db_uuid(&row.room_id)?,
            room_name: row.room_name,
            user_id: parse_db_uuid(&row.user_id)?,
            requester_name: display_name(&row.full_name, &row.username).to_string(),
            requester_email: row.email,
            starts_at: parse_db_timestamp(&row.starts_at)?,
            ends_at: parse_db_timestamp(&row.ends_at)?,
            guest_count: row.guest_count,
            purpose: row.purpose,
            document_name: row.document_name,
            document_ref: row.document_ref,
            document_size: row.document_size,
            status,
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
        })
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> Result<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}

fn status_list(statuses: &[BookingStatus]) -> String {
    let quoted: Vec<String> = statuses
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect();
    format!("({})", quoted.join(", "))
}

/// Earliest-starting slot-holding booking of `room_id` that overlaps `span`
pub async fn find_conflict<'e, E>(
    executor: E,
    room_id: Uuid,
    span: &TimeSpan,
    exclude_booking_id: Option<Uuid>,
) -> Result<Option<Booking>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "{SELECT_BOOKING} WHERE b.room_id = ? AND b.status IN {RESERVING_STATUSES} \
         AND b.starts_at < ? AND b.ends_at > ? AND (? IS NULL OR b.id <> ?) \
         ORDER BY b.starts_at ASC LIMIT 1"
    );
    let exclude = exclude_booking_id.map(|id| id.to_string());

    let row = sqlx::query_as::<_, BookingRow>(&sql)
        .bind(room_id.to_string())
        .bind(to_db(span.end()))
        .bind(to_db(span.start()))
        .bind(exclude.as_deref())
        .bind(exclude.as_deref())
        .fetch_optional(executor)
        .await
        .context("Failed to query conflicting bookings")?;

    row.map(Booking::try_from).transpose()
}

/// Bookings of a room in `statuses` intersecting `window`, by start
pub async fn list_in_window<'e, E>(
    executor: E,
    room_id: Uuid,
    window: &TimeSpan,
    statuses: &[BookingStatus],
) -> Result<Vec<Booking>>
where
    E: SqliteExecutor<'e>,
{
    if statuses.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "{SELECT_BOOKING} WHERE b.room_id = ? AND b.status IN {} \
         AND b.starts_at < ? AND b.ends_at > ? ORDER BY b.starts_at ASC",
        status_list(statuses)
    );

    let rows = sqlx::query_as::<_, BookingRow>(&sql)
        .bind(room_id.to_string())
        .bind(to_db(window.end()))
        .bind(to_db(window.start()))
        .fetch_all(executor)
        .await
        .context("Failed to list bookings in window")?;

    into_bookings(rows)
}

pub async fn get_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Booking>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("{SELECT_BOOKING} WHERE b.id = ?");
    let row = sqlx::query_as::<_, BookingRow>(&sql)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await
        .context("Failed to fetch booking")?;

    row.map(Booking::try_from).transpose()
}

/// Insert a new `Pending` booking and return its id
pub async fn insert<'e, E>(executor: E, booking: &NewBooking) -> Result<Uuid>
where
    E: SqliteExecutor<'e>,
{
    let id = Uuid::new_v4();
    let now = to_db(Utc::now());
    let document = booking.document.as_ref();

    sqlx::query(
        r#"
        INSERT INTO bookings (id, room_id, user_id, starts_at, ends_at, guest_count, purpose,
                              document_name, document_ref, document_size, status,
                              created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(booking.room_id.to_string())
    .bind(booking.user_id.to_string())
    .bind(to_db(booking.span.start()))
    .bind(to_db(booking.span.end()))
    .bind(booking.guest_count)
    .bind(&booking.purpose)
    .bind(document.map(|d| d.file_name.as_str()))
    .bind(document.and_then(|d| d.storage_ref.as_deref()))
    .bind(document.map(|d| d.size_bytes as i64))
    .bind(BookingStatus::Pending.as_str())
    .bind(&now)
    .bind(&now)
    .execute(executor)
    .await
    .context("Failed to insert booking")?;

    Ok(id)
}

/// Move a booking from `from` to `to`
///
/// Returns false when the booking is gone or no longer in `from`, so a
/// transition validated against a stale read is never applied.
pub async fn update_status<'e, E>(
    executor: E,
    id: Uuid,
    from: BookingStatus,
    to: BookingStatus,
) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE bookings SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(to.as_str())
    .bind(to_db(Utc::now()))
    .bind(id.to_string())
    .bind(from.as_str())
    .execute(executor)
    .await
    .context("Failed to update booking status")?;

    Ok(result.rows_affected() > 0)
}

pub struct BookingRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BookingRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = ?")
            .bind(id.to_string())
            .execute(self.pool)
            .await
            .context("Failed to delete booking")?;

        Ok(result.rows_affected() > 0)
    }

    /// A user's bookings, newest submission first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>> {
        let sql = format!("{SELECT_BOOKING} WHERE b.user_id = ? ORDER BY b.created_at DESC");
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(user_id.to_string())
            .fetch_all(self.pool)
            .await
            .context("Failed to list user bookings")?;

        into_bookings(rows)
    }

    pub async fn status_counts_for_user(&self, user_id: Uuid) -> Result<StatusCounts> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM bookings WHERE user_id = ? GROUP BY status",
        )
        .bind(user_id.to_string())
        .fetch_all(self.pool)
        .await
        .context("Failed to count user bookings")?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            let status = status.parse::<BookingStatus>().map_err(anyhow::Error::msg)?;
            counts.add(status, count);
        }
        Ok(counts)
    }

    /// Admin listing, newest submission first
    pub async fn list(&self, query: &BookingListQuery) -> Result<Vec<Booking>> {
        let mut sql = format!("{SELECT_BOOKING} WHERE 1 = 1");
        if query.status.is_some() {
            sql.push_str(" AND b.status = ?");
        }
        if query.room_id.is_some() {
            sql.push_str(" AND b.room_id = ?");
        }
        sql.push_str(" ORDER BY b.created_at DESC");

        let mut q = sqlx::query_as::<_, BookingRow>(&sql);
        if let Some(status) = query.status {
            q = q.bind(status.as_str());
        }
        if let Some(room_id) = query.room_id {
            q = q.bind(room_id.to_string());
        }

        let rows = q
            .fetch_all(self.pool)
            .await
            .context("Failed to list bookings")?;

        into_bookings(rows)
    }

    pub async fn count_with_status(&self, status: BookingStatus) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(self.pool)
            .await
            .context("Failed to count bookings")?;

        Ok(count)
    }

    /// Approved bookings whose start lies in `window`
    pub async fn approved_starting_in(&self, window: &TimeSpan) -> Result<Vec<Booking>> {
        let sql = format!(
            "{SELECT_BOOKING} WHERE b.status = ? AND b.starts_at >= ? AND b.starts_at < ? \
             ORDER BY b.starts_at ASC"
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(BookingStatus::Approved.as_str())
            .bind(to_db(window.start()))
            .bind(to_db(window.end()))
            .fetch_all(self.pool)
            .await
            .context("Failed to list bookings starting in window")?;

        into_bookings(rows)
    }
}
