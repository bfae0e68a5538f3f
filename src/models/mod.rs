//! Data models for the DevCamper application.
//!
//! Records serialize with camelCase keys; request bodies carry their own validation rules.

mod bootcamp;
mod course;
mod user;

pub use bootcamp::*;
pub use course::*;
pub use user::*;

use uuid::Uuid;

use crate::errors::AppError;

/// Normalize a resource identifier taken from a path or body.
///
/// Anything that is not a UUID cannot name a stored resource.
pub fn parse_id(raw: &str) -> Result<String, AppError> {
    Uuid::parse_str(raw.trim())
        .map(|id| id.to_string())
        .map_err(|e| AppError::CastError(format!("Malformed id {:?}: {}", raw, e)))
}

/// Create a fresh identifier for a new resource.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_normalizes_case() {
        let id = parse_id("  6F9619FF-8B86-D011-B42D-00C04FC964FF ").unwrap();
        assert_eq!(id, "6f9619ff-8b86-d011-b42d-00c04fc964ff");
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!(matches!(parse_id("5d713995b721c3bb38c1f5d0"), Err(AppError::CastError(_))));
    }
}
