//! Point-in-time aggregate snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::error::DomainError;

/// Serialized materialization of an aggregate's full state.
///
/// The payload is opaque to the repository; only the aggregate that produced
/// it knows how to read it back. `version` always equals the aggregate's
/// version at the moment the snapshot was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Aggregate this snapshot belongs to.
    pub aggregate_id: Uuid,
    /// Aggregate type name, recorded for diagnostics and storage routing.
    pub aggregate_type: String,
    /// Aggregate version captured by this snapshot.
    pub version: i64,
    /// Serialized aggregate state.
    pub payload: serde_json::Value,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    /// Builds a snapshot by serializing `state`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidSnapshot` if `state` cannot be serialized.
    pub fn from_state<T: Serialize>(
        aggregate_id: Uuid,
        aggregate_type: &str,
        version: i64,
        state: &T,
        taken_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let payload = serde_json::to_value(state).map_err(|e| {
            DomainError::InvalidSnapshot(format!("{aggregate_type} serialization failed: {e}"))
        })?;
        Ok(Self {
            aggregate_id,
            aggregate_type: aggregate_type.to_owned(),
            version,
            payload,
            taken_at,
        })
    }

    /// Deserializes the payload back into aggregate state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidSnapshot` if the payload does not match
    /// `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DomainError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            DomainError::InvalidSnapshot(format!(
                "{} snapshot {} at version {} could not be decoded: {e}",
                self.aggregate_type, self.aggregate_id, self.version
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        total: u32,
        label: String,
    }

    #[test]
    fn test_decode_reproduces_serialized_state() {
        // Arrange
        let id = Uuid::new_v4();
        let taken_at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let state = Counter {
            total: 7,
            label: "stock".into(),
        };

        // Act
        let snapshot = Snapshot::from_state(id, "counter", 3, &state, taken_at).unwrap();
        let decoded: Counter = snapshot.decode().unwrap();

        // Assert
        assert_eq!(snapshot.version, 3);
        assert_eq!(snapshot.aggregate_type, "counter");
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_decode_rejects_mismatched_payload() {
        // Arrange
        let snapshot = Snapshot {
            aggregate_id: Uuid::new_v4(),
            aggregate_type: "counter".into(),
            version: 1,
            payload: serde_json::json!({ "unexpected": true }),
            taken_at: Utc::now(),
        };

        // Act
        let result = snapshot.decode::<Counter>();

        // Assert
        match result.unwrap_err() {
            DomainError::InvalidSnapshot(msg) => assert!(msg.contains("could not be decoded")),
            other => panic!("expected InvalidSnapshot, got {other:?}"),
        }
    }
}
