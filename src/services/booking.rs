//! Booking lifecycle
//!
//! Creation runs check-then-insert under the room's write lock inside one
//! transaction. The database trigger backs this up; a trigger abort, a busy
//! database and a lock timeout all surface as the retryable
//! [`BookingError::SlotUnavailable`].

use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::BookingConfig;
use crate::db::{self, booking_repository, AuditRepository, BookingRepository, DbPool, RoomRepository};
use crate::models::{
    ActivityAction, Actor, Booking, BookingStatus, ConflictInfo, CreateBookingRequest, NewBooking,
    Room, TimeSpan, TransitionError, RESOURCE_BOOKING,
};
use crate::services::availability::AvailabilityService;
use crate::services::notification::Notifier;
use crate::services::room_locks::RoomLocks;
use crate::utils::error::validation_messages;
use crate::utils::validation::validate_document_name;
use crate::utils::{AppError, OrgTimezone};

/// Reads and compare-and-set writes tried before a status change gives up
const STATUS_UPDATE_ATTEMPTS: usize = 3;

const SLOT_UNAVAILABLE_MESSAGE: &str =
    "This slot is no longer available. Please refresh availability and try again.";

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Room not found")]
    RoomNotFound,
    #[error("Booking not found")]
    NotFound,
    #[error("Room is not open for booking")]
    RoomClosed,
    #[error("Invalid booking request: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("{}", .0.message())]
    Conflict(ConflictInfo),
    #[error("This slot is no longer available")]
    SlotUnavailable,
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::RoomNotFound => AppError::not_found("Room not found"),
            BookingError::NotFound => AppError::not_found("Booking not found"),
            BookingError::RoomClosed => AppError::bad_request("Room is not open for booking"),
            BookingError::Invalid(errors) => AppError::ValidationError(errors),
            BookingError::Conflict(info) => AppError::BookingConflict {
                message: info.message(),
                details: json!({ "conflict": info }),
            },
            BookingError::SlotUnavailable => {
                AppError::SlotUnavailable(SLOT_UNAVAILABLE_MESSAGE.to_string())
            }
            BookingError::Transition(e) => AppError::InvalidTransition(e.to_string()),
            BookingError::Other(e) => {
                tracing::error!("Booking operation failed: {:#}", e);
                AppError::internal("Booking operation failed")
            }
        }
    }
}

/// Who is acting on a booking, and from where
#[derive(Debug, Clone, Copy)]
pub struct ActingUser<'a> {
    pub id: Uuid,
    pub actor: Actor,
    pub ip_address: Option<&'a str>,
}

#[derive(Clone)]
pub struct BookingService {
    pool: DbPool,
    config: BookingConfig,
    timezone: OrgTimezone,
    locks: Arc<RoomLocks>,
    notifier: Arc<Notifier>,
}

impl BookingService {
    pub fn new(
        pool: DbPool,
        config: BookingConfig,
        timezone: OrgTimezone,
        locks: Arc<RoomLocks>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            pool,
            config,
            timezone,
            locks,
            notifier,
        }
    }

    fn availability(&self) -> AvailabilityService {
        AvailabilityService::new(self.pool.clone(), self.timezone)
    }

    /// Submit a booking request as `Pending`
    #[instrument(skip(self, req), fields(room_id = %req.room_id))]
    pub async fn create(
        &self,
        acting: ActingUser<'_>,
        req: &CreateBookingRequest,
    ) -> Result<Booking, BookingError> {
        let room = RoomRepository::new(&self.pool)
            .get_by_id(req.room_id)
            .await?
            .ok_or(BookingError::RoomNotFound)?;
        if !room.is_bookable() {
            return Err(BookingError::RoomClosed);
        }

        let span = self.validate_request(&room, req)?;
        let new_booking = NewBooking {
            room_id: room.id,
            user_id: acting.id,
            span,
            guest_count: req.guest_count,
            purpose: req.purpose.trim().to_string(),
            document: req.document.clone(),
        };

        let id = {
            let _guard = self
                .locks
                .acquire(room.id)
                .await
                .map_err(|_| BookingError::SlotUnavailable)?;
            self.insert_if_free(&new_booking).await?
        };

        let booking = booking_repository::get_by_id(&self.pool, id)
            .await?
            .context("Booking not found after insert")?;

        info!(booking_id = %booking.id, user_id = %acting.id, "Booking submitted");
        self.log(
            acting,
            ActivityAction::Create,
            booking.id,
            json!({
                "room": booking.room_name,
                "start": booking.starts_at,
                "end": booking.ends_at,
            }),
        )
        .await;
        self.notifier.booking_submitted(&booking).await;

        Ok(booking)
    }

    /// Conflict check and insert in one transaction; the caller holds the room lock
    async fn insert_if_free(&self, new_booking: &NewBooking) -> Result<Uuid, BookingError> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let conflict = booking_repository::find_conflict(
            &mut *tx,
            new_booking.room_id,
            &new_booking.span,
            None,
        )
        .await
        .map_err(slot_error)?;
        if let Some(existing) = conflict {
            return Err(BookingError::Conflict(
                self.availability().conflict_info(&existing),
            ));
        }

        let id = booking_repository::insert(&mut *tx, new_booking)
            .await
            .map_err(slot_error)?;
        tx.commit()
            .await
            .map_err(|e| slot_error(anyhow::Error::new(e)))?;

        Ok(id)
    }

    /// Every rule a request must satisfy, reported together
    fn validate_request(
        &self,
        room: &Room,
        req: &CreateBookingRequest,
    ) -> Result<TimeSpan, BookingError> {
        let mut errors = match req.validate() {
            Ok(()) => Vec::new(),
            Err(e) => validation_messages(&e),
        };

        let start = match self.timezone.parse_timestamp(&req.start_time) {
            Ok(start) => Some(start),
            Err(_) => {
                errors.push("start_time: invalid timestamp".to_string());
                None
            }
        };
        let end = match self.timezone.parse_timestamp(&req.end_time) {
            Ok(end) => Some(end),
            Err(_) => {
                errors.push("end_time: invalid timestamp".to_string());
                None
            }
        };

        let span = match (start, end) {
            (Some(start), Some(end)) => match TimeSpan::new(start, end) {
                Ok(span) => Some(span),
                Err(e) => {
                    errors.push(format!("end_time: {}", e));
                    None
                }
            },
            _ => None,
        };

        if let Some(span) = span {
            let earliest = Utc::now() - Duration::minutes(self.config.past_grace_minutes);
            if span.start() < earliest {
                errors.push("start_time: must not be in the past".to_string());
            }
        }

        if req.guest_count > room.capacity {
            errors.push(format!(
                "guest_count: exceeds room capacity of {}",
                room.capacity
            ));
        }

        match &req.document {
            Some(doc) => {
                if !validate_document_name(&doc.file_name, &self.config.document_extensions) {
                    errors.push(format!(
                        "document: file type must be one of {}",
                        self.config.document_extensions.join(", ")
                    ));
                }
                if doc.size_bytes > self.config.max_document_bytes {
                    errors.push(format!(
                        "document: file exceeds {} bytes",
                        self.config.max_document_bytes
                    ));
                }
            }
            None if self.config.require_document => {
                errors.push("document: a supporting document is required".to_string());
            }
            None => {}
        }

        match span {
            Some(span) if errors.is_empty() => Ok(span),
            _ => Err(BookingError::Invalid(errors)),
        }
    }

    /// Move a booking through the lifecycle
    ///
    /// The transition is validated against the stored status and applied
    /// only if that status is still current. A concurrent change makes the
    /// update miss; the booking is then re-read and validated again.
    #[instrument(skip(self), fields(actor = ?acting.actor))]
    pub async fn change_status(
        &self,
        acting: ActingUser<'_>,
        booking_id: Uuid,
        to: BookingStatus,
    ) -> Result<Booking, BookingError> {
        let mut attempt = 0;
        let from = loop {
            attempt += 1;
            let current = self.get(booking_id).await?;
            let next = current.status.transition(to, acting.actor)?;

            let applied = if next.reserves_slot() && self.config.recheck_on_approval {
                let _guard = self
                    .locks
                    .acquire(current.room_id)
                    .await
                    .map_err(|_| BookingError::SlotUnavailable)?;
                self.update_if_free(&current, next).await?
            } else {
                booking_repository::update_status(&self.pool, booking_id, current.status, next)
                    .await?
            };

            if applied {
                break current.status;
            }
            if attempt >= STATUS_UPDATE_ATTEMPTS {
                warn!(booking_id = %booking_id, "Booking status kept changing underneath the update");
                return Err(BookingError::SlotUnavailable);
            }
            warn!(booking_id = %booking_id, from = %current.status, "Booking status changed concurrently, re-reading");
        };

        let booking = self.get(booking_id).await?;
        info!(booking_id = %booking_id, from = %from, to = %booking.status, "Booking status changed");

        self.log(
            acting,
            ActivityAction::for_status(booking.status),
            booking.id,
            json!({ "status": { "old": from.as_str(), "new": booking.status.as_str() } }),
        )
        .await;

        match booking.status {
            BookingStatus::Approved => self.notifier.booking_approved(&booking).await,
            BookingStatus::Rejected => self.notifier.booking_rejected(&booking).await,
            _ => {}
        }

        Ok(booking)
    }

    /// Overlap recheck and status write in one transaction; the caller holds the room lock
    async fn update_if_free(&self, booking: &Booking, next: BookingStatus) -> Result<bool, BookingError> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let conflict =
            booking_repository::find_conflict(&mut *tx, booking.room_id, &booking.span(), Some(booking.id))
                .await
                .map_err(slot_error)?;
        if let Some(existing) = conflict {
            warn!(booking_id = %booking.id, conflicting = %existing.id, "Status change blocked by overlap");
            return Err(BookingError::Conflict(
                self.availability().conflict_info(&existing),
            ));
        }

        let applied = booking_repository::update_status(&mut *tx, booking.id, booking.status, next)
            .await
            .map_err(slot_error)?;
        if !applied {
            return Ok(false);
        }
        tx.commit()
            .await
            .map_err(|e| slot_error(anyhow::Error::new(e)))?;
        Ok(true)
    }

    /// Owner cancellation; other users' bookings are reported as missing
    pub async fn cancel_own(
        &self,
        acting: ActingUser<'_>,
        booking_id: Uuid,
    ) -> Result<Booking, BookingError> {
        let booking = self.get(booking_id).await?;
        if booking.user_id != acting.id {
            return Err(BookingError::NotFound);
        }

        self.change_status(
            ActingUser {
                actor: Actor::Owner,
                ..acting
            },
            booking_id,
            BookingStatus::Cancelled,
        )
        .await
    }

    /// Hard delete, admin only
    pub async fn delete(&self, acting: ActingUser<'_>, booking_id: Uuid) -> Result<(), BookingError> {
        let booking = self.get(booking_id).await?;
        if !BookingRepository::new(&self.pool).delete(booking_id).await? {
            return Err(BookingError::NotFound);
        }

        info!(booking_id = %booking_id, "Booking deleted");
        self.log(
            acting,
            ActivityAction::Delete,
            booking_id,
            json!({
                "room": booking.room_name,
                "start": booking.starts_at,
                "status": booking.status.as_str(),
            }),
        )
        .await;
        Ok(())
    }

    pub async fn get(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        booking_repository::get_by_id(&self.pool, booking_id)
            .await?
            .ok_or(BookingError::NotFound)
    }

    async fn log(
        &self,
        acting: ActingUser<'_>,
        action: ActivityAction,
        booking_id: Uuid,
        details: serde_json::Value,
    ) {
        let result = AuditRepository::new(&self.pool)
            .insert(
                Some(acting.id),
                action,
                RESOURCE_BOOKING,
                Some(&booking_id.to_string()),
                Some(&details),
                acting.ip_address,
            )
            .await;
        if let Err(e) = result {
            warn!(booking_id = %booking_id, "Failed to write activity log: {:#}", e);
        }
    }
}

/// Map storage contention onto the retryable conflict
fn slot_error(err: anyhow::Error) -> BookingError {
    if db::is_overlap_violation(&err) || db::is_busy(&err) {
        warn!("Slot write rejected by storage: {:#}", err);
        BookingError::SlotUnavailable
    } else {
        BookingError::Other(err)
    }
}
