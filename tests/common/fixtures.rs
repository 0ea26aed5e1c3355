//! Test fixtures for common test data
//!
//! Fixed rooms, dates and request bodies shared across tests. Booking
//! requests through the API must start in the future, so they use
//! [`FUTURE_DAY`]; historical scenarios are inserted through the repository.

use serde_json::{json, Value};
use uuid::Uuid;

use smartspace::models::{CreateRoomRequest, RoomStatus, RoomType};

/// A local date safely ahead of the clock
pub const FUTURE_DAY: &str = "2030-06-10";

/// Offset-less local timestamp on `day`, e.g. `at(FUTURE_DAY, "09:00")`
pub fn at(day: &str, hm: &str) -> String {
    format!("{}T{}", day, hm)
}

/// Test room fixtures
pub struct RoomFixtures;

impl RoomFixtures {
    pub fn lab() -> CreateRoomRequest {
        CreateRoomRequest {
            name: "Lab Komputer 1".to_string(),
            room_type: RoomType::Lab,
            capacity: 40,
            facilities: vec!["Projector".to_string(), "PC".to_string()],
            description: "Computer lab on the second floor".to_string(),
            is_active: true,
            status: RoomStatus::Available,
            maintenance_note: None,
        }
    }

    pub fn hall() -> CreateRoomRequest {
        CreateRoomRequest {
            name: "Aula Utama".to_string(),
            room_type: RoomType::Hall,
            capacity: 300,
            facilities: vec!["Sound System".to_string()],
            description: String::new(),
            is_active: true,
            status: RoomStatus::Available,
            maintenance_note: None,
        }
    }

    pub fn under_maintenance() -> CreateRoomRequest {
        CreateRoomRequest {
            name: "Ruang Kelas B201".to_string(),
            room_type: RoomType::Classroom,
            capacity: 30,
            status: RoomStatus::Maintenance,
            maintenance_note: Some("Projector replacement".to_string()),
            ..Self::lab()
        }
    }
}

/// Body for `POST /bookings`
pub fn booking_request(room_id: Uuid, start: &str, end: &str) -> Value {
    json!({
        "room_id": room_id,
        "start_time": start,
        "end_time": end,
        "guest_count": 10,
        "purpose": "Himpunan weekly meeting",
        "document": {
            "file_name": "proposal.pdf",
            "size_bytes": 120_000,
        },
    })
}

/// Body for `POST /bookings/check-conflict`
pub fn conflict_check(room_id: Uuid, start: &str, end: &str) -> Value {
    json!({
        "room_id": room_id,
        "start_time": start,
        "end_time": end,
    })
}
