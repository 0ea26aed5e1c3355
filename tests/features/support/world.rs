//! Test world for Cucumber scenarios

use std::collections::HashMap;
use std::fmt;

use cucumber::World;
use uuid::Uuid;

use smartspace::models::{CreateRoomRequest, Room, RoomStatus, RoomType, User, UserRole};

use crate::common::{TestApp, TestResponse};

/// Test world that maintains state across scenario steps
///
/// Each scenario gets its own application over a fresh database.
#[derive(Default, World)]
pub struct TestWorld {
    app: Option<TestApp>,

    /// Rooms by name
    pub rooms: HashMap<String, Room>,

    /// Users by name, with their access tokens
    pub users: HashMap<String, (User, String)>,

    /// Most recently seeded booking
    pub last_booking: Option<Uuid>,

    /// Response from last API call
    pub last_response: Option<TestResponse>,

    /// Accepted submissions of the last concurrent burst
    pub concurrent_created: Option<usize>,
}

impl fmt::Debug for TestWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestWorld")
            .field("rooms", &self.rooms.keys().collect::<Vec<_>>())
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .field("last_booking", &self.last_booking)
            .field("last_status", &self.last_response.as_ref().map(|r| r.status))
            .finish()
    }
}

impl TestWorld {
    /// The scenario's application, started on first use
    pub async fn app(&mut self) -> &TestApp {
        if self.app.is_none() {
            self.app = Some(TestApp::new().await);
        }
        self.app.as_ref().expect("application started")
    }

    pub async fn add_room(&mut self, name: &str, capacity: i64) {
        let request = CreateRoomRequest {
            name: name.to_string(),
            room_type: RoomType::Classroom,
            capacity,
            facilities: Vec::new(),
            description: String::new(),
            is_active: true,
            status: RoomStatus::Available,
            maintenance_note: None,
        };
        let room = self.app().await.create_room(request).await;
        self.rooms.insert(name.to_string(), room);
    }

    pub fn room(&self, name: &str) -> Room {
        self.rooms
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("Unknown room {}", name))
    }

    /// Access token of a named user, created on first mention
    pub async fn token_for(&mut self, name: &str) -> String {
        if !self.users.contains_key(name) {
            let user = self.app().await.create_user(UserRole::Student).await;
            self.users.insert(name.to_string(), user);
        }
        self.users[name].1.clone()
    }

    pub async fn user(&mut self, name: &str) -> User {
        self.token_for(name).await;
        self.users[name].0.clone()
    }

    pub fn response(&self) -> &TestResponse {
        self.last_response.as_ref().expect("No response available")
    }

    pub fn response_json(&self) -> serde_json::Value {
        self.response().json()
    }
}
