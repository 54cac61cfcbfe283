//! Common type definitions.
//!
//! All entity IDs are UUIDs wrapped in type aliases so signatures say which
//! entity they refer to:
//!
//! - [`ReviewId`]: analyzed comment
//! - [`MetricId`]: per-attempt analysis telemetry row
//! - [`UsageId`]: agent usage record

use uuid::Uuid;

pub type ReviewId = Uuid;
pub type MetricId = Uuid;
pub type UsageId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviates_to_first_segment() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }
}
