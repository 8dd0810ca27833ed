use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::Coordinates;
use crate::error::{invalid_input_error, invalid_invocation_error, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescueState {
    Pending,
    Accepted,
    Ongoing,
    Ended,
    Declined,
}

impl RescueState {
    pub fn name(&self) -> String {
        match self {
            Self::Pending => "pending".into(),
            Self::Accepted => "accepted".into(),
            Self::Ongoing => "ongoing".into(),
            Self::Ended => "ended".into(),
            Self::Declined => "declined".into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Declined)
    }

    pub fn can_transition_to(&self, next: RescueState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted)
                | (Self::Pending, Self::Declined)
                | (Self::Accepted, Self::Ongoing)
                | (Self::Accepted, Self::Ended)
                | (Self::Accepted, Self::Declined)
                | (Self::Ongoing, Self::Ended)
        )
    }
}

/// The service request a rescue session is opened for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescueRequest {
    pub id: String,
    pub user_id: String,
    pub store_id: String,
    /// Where the stranded vehicle is.
    pub location: Coordinates,
}

/// Shared record of one rescue session, keyed externally by request id.
/// Both participants read it; whoever shares location writes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescueRecord {
    pub user_id: String,
    pub store_id: String,
    pub state: RescueState,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    /// Problem category the user asked for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
}

/// A record together with the request id it is stored under.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RescueEntry {
    pub id: String,
    #[serde(flatten)]
    pub record: RescueRecord,
}

/// Partial update of a [`RescueRecord`]. Fields left as `None` are not
/// serialized and are preserved by a merge.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescuePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<RescueState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
}

impl RescuePatch {
    /// Everything needed to create the record when a shop opens the session.
    pub fn opening(user_id: String, store_id: String, coordinates: Coordinates) -> Self {
        Self {
            user_id: Some(user_id),
            store_id: Some(store_id),
            state: Some(RescueState::Ongoing),
            ..Self::location(coordinates)
        }
    }

    /// A user's service request, waiting for the shop.
    pub fn request(
        user_id: String,
        store_id: String,
        coordinates: Coordinates,
        specialty: Option<String>,
    ) -> Self {
        Self {
            user_id: Some(user_id),
            store_id: Some(store_id),
            state: Some(RescueState::Pending),
            specialty,
            ..Self::location(coordinates)
        }
    }

    pub fn location(coordinates: Coordinates) -> Self {
        Self {
            latitude: Some(coordinates.latitude),
            longitude: Some(coordinates.longitude),
            timestamp: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn state(state: RescueState) -> Self {
        Self {
            state: Some(state),
            timestamp: Some(Utc::now()),
            ..Self::default()
        }
    }
}

impl RescueRecord {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Merge-upsert semantics: the patch is applied over `existing`, or must
    /// carry every field when there is no existing record.
    pub fn merged(existing: Option<RescueRecord>, patch: RescuePatch) -> Result<Self, Error> {
        match existing {
            Some(mut record) => {
                record.apply(patch);
                Ok(record)
            }
            None => Ok(Self {
                user_id: patch.user_id.ok_or_else(invalid_input_error)?,
                store_id: patch.store_id.ok_or_else(invalid_input_error)?,
                state: patch.state.unwrap_or(RescueState::Pending),
                latitude: patch.latitude.ok_or_else(invalid_input_error)?,
                longitude: patch.longitude.ok_or_else(invalid_input_error)?,
                timestamp: patch.timestamp.unwrap_or_else(Utc::now),
                specialty: patch.specialty,
            }),
        }
    }

    pub fn apply(&mut self, patch: RescuePatch) {
        if let Some(user_id) = patch.user_id {
            self.user_id = user_id;
        }
        if let Some(store_id) = patch.store_id {
            self.store_id = store_id;
        }
        if let Some(state) = patch.state {
            self.state = state;
        }
        if let Some(latitude) = patch.latitude {
            self.latitude = latitude;
        }
        if let Some(longitude) = patch.longitude {
            self.longitude = longitude;
        }
        if let Some(timestamp) = patch.timestamp {
            self.timestamp = timestamp;
        }
        if let Some(specialty) = patch.specialty {
            self.specialty = Some(specialty);
        }
    }

    #[tracing::instrument]
    pub fn transition(&mut self, next: RescueState) -> Result<(), Error> {
        if !self.state.can_transition_to(next) {
            return Err(invalid_invocation_error());
        }

        self.state = next;
        self.timestamp = Utc::now();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manila() -> Coordinates {
        Coordinates::new(14.5995, 120.9842).unwrap()
    }

    #[test]
    fn opening_patch_creates_ongoing_record() {
        let patch = RescuePatch::opening("user-1".into(), "shop-1".into(), manila());
        let record = RescueRecord::merged(None, patch).unwrap();

        assert_eq!(record.state, RescueState::Ongoing);
        assert_eq!(record.coordinates(), manila());
        assert_eq!(record.user_id, "user-1");
    }

    #[test]
    fn incomplete_patch_cannot_create() {
        let err = RescueRecord::merged(None, RescuePatch::location(manila())).unwrap_err();

        assert!(err.is_invalid_input_error());
    }

    #[test]
    fn location_patch_preserves_other_fields() {
        let opening = RescuePatch::opening("user-1".into(), "shop-1".into(), manila());
        let record = RescueRecord::merged(None, opening).unwrap();

        let moved = Coordinates::new(14.6091, 120.9886).unwrap();
        let record = RescueRecord::merged(Some(record), RescuePatch::location(moved)).unwrap();

        assert_eq!(record.coordinates(), moved);
        assert_eq!(record.store_id, "shop-1");
        assert_eq!(record.state, RescueState::Ongoing);
    }

    #[test]
    fn location_patch_serializes_only_position() {
        let value = serde_json::to_value(RescuePatch::location(manila())).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 3);
        assert_eq!(object["latitude"], json!(14.5995));
        assert!(object.contains_key("timestamp"));
        assert!(!object.contains_key("state"));
    }

    #[test]
    fn record_wire_names() {
        let record = RescueRecord::merged(
            None,
            RescuePatch::opening("user-1".into(), "shop-1".into(), manila()),
        )
        .unwrap();
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["userId"], json!("user-1"));
        assert_eq!(value["storeId"], json!("shop-1"));
        assert_eq!(value["state"], json!("ongoing"));
    }

    #[test]
    fn lifecycle_transitions() {
        let mut record = RescueRecord::merged(
            None,
            RescuePatch {
                state: Some(RescueState::Pending),
                ..RescuePatch::opening("user-1".into(), "shop-1".into(), manila())
            },
        )
        .unwrap();

        record.transition(RescueState::Accepted).unwrap();
        record.transition(RescueState::Ongoing).unwrap();
        assert!(record.transition(RescueState::Declined).is_err());
        record.transition(RescueState::Ended).unwrap();

        assert!(record.state.is_terminal());
        assert!(record
            .transition(RescueState::Ongoing)
            .unwrap_err()
            .is_invalid_invocation_error());
    }

    #[test]
    fn pending_must_be_accepted_first() {
        let request = RescuePatch::request(
            "user-1".into(),
            "shop-1".into(),
            manila(),
            Some("battery".into()),
        );
        let mut record = RescueRecord::merged(None, request).unwrap();

        assert_eq!(record.state, RescueState::Pending);
        assert_eq!(record.specialty.as_deref(), Some("battery"));
        assert!(record.transition(RescueState::Ongoing).is_err());
        assert!(record.transition(RescueState::Ended).is_err());

        record.transition(RescueState::Accepted).unwrap();
        record.transition(RescueState::Ended).unwrap();
        assert_eq!(record.state, RescueState::Ended);
    }
}
