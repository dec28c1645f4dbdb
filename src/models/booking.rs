use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: String,
    pub customer_id: String,
    pub provider_id: String,
    pub service_id: String,
    /// UTC.
    pub start_time: NaiveDateTime,
    pub status: BookingStatus,
    pub special_instructions: Option<String>,
    pub service_notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    EnRoute,
    InProgress,
    Completed,
    Cancelled,
    ReviewNeeded,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::EnRoute => "en_route",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::ReviewNeeded => "review_needed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "en_route" => BookingStatus::EnRoute,
            "in_progress" => BookingStatus::InProgress,
            "completed" => BookingStatus::Completed,
            "cancelled" => BookingStatus::Cancelled,
            "review_needed" => BookingStatus::ReviewNeeded,
            _ => BookingStatus::Confirmed,
        }
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct BookingUpdate {
    pub status: Option<BookingStatus>,
    pub start_time: Option<NaiveDateTime>,
}

/// A caller's booking joined with display names, used both for the model
/// context and for the my-bookings listing.
#[derive(Debug, Clone, Serialize)]
pub struct BookingSummary {
    pub id: String,
    pub service: String,
    pub provider: String,
    pub start_time: NaiveDateTime,
    pub status: BookingStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            BookingStatus::Confirmed,
            BookingStatus::EnRoute,
            BookingStatus::InProgress,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
            BookingStatus::ReviewNeeded,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_unknown_status_defaults_to_confirmed() {
        assert_eq!(BookingStatus::parse("bogus"), BookingStatus::Confirmed);
    }
}
