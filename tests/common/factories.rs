//! Test factories for generating test data
//!
//! Factories create randomized data with unique usernames, for tests that
//! need several distinct accounts.

use std::sync::atomic::{AtomicU64, Ordering};

use fake::faker::name::en::Name;
use fake::Fake;

use smartspace::models::{User, UserRole};

/// Factory for creating test users
pub struct UserFactory {
    counter: AtomicU64,
}

impl Default for UserFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl UserFactory {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// A unique user with a generated display name
    ///
    /// The password hash is a placeholder; such users authenticate with
    /// tokens minted by the test app, never through login.
    pub fn build(&self, role: UserRole) -> User {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let username = format!("{}{}_{}", role.as_str(), n, &uuid::Uuid::new_v4().simple().to_string()[..6]);
        let full_name: String = Name().fake();
        User::new(
            username.clone(),
            format!("{}@example.ac.id", username),
            full_name,
            "not-a-real-hash".to_string(),
            role,
        )
    }
}
