pub mod booking;
pub mod catalog;
pub mod chat;
pub mod decision;
pub mod intent;
pub mod user;

pub use booking::{Booking, BookingStatus, BookingSummary, BookingUpdate};
pub use catalog::{CatalogEntry, Provider, Review, Service};
pub use chat::{ChatAction, ChatRequest, ChatResponse, ConversationTurn, ServiceRecommendation};
pub use decision::{ModelDecision, ValidatedDecision};
pub use intent::{
    BookingActionDetails, BookingActionIntent, BookingActionRequest, BookingActionResponse,
    BookingActionType, BookingReply,
};
pub use user::{Caller, Customer};
