use serde::{Deserialize, Serialize};

use super::booking::Booking;
use super::chat::ConversationTurn;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingActionType {
    Cancel,
    Uncancel,
    Reschedule,
}

impl BookingActionType {
    /// Past-tense label reported back to the client.
    pub fn past_tense(&self) -> &'static str {
        match self {
            BookingActionType::Cancel => "cancelled",
            BookingActionType::Uncancel => "uncancelled",
            BookingActionType::Reschedule => "rescheduled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingActionIntent {
    pub action_type: BookingActionType,
    pub booking_id: String,
    #[serde(default)]
    pub new_time: Option<String>,
}

/// What the model asked for, after repair.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingReply {
    Execute {
        message: String,
        intent: BookingActionIntent,
    },
    Clarify {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingActionRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingActionDetails {
    pub action: String,
    pub booking: Booking,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingActionResponse {
    /// `booking_action_executed` or `clarify`.
    pub action: String,
    pub message: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BookingActionDetails>,
}
