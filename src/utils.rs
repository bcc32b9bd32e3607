//! Utility functions for the matchmaking service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique room ID
pub fn generate_room_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a guest player id for participants without a stored identity
pub fn generate_guest_id() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("Guest{}", &simple[..8])
}

/// Generate a session id for a freshly accepted connection
pub fn generate_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}
