pub mod booking_ai;
pub mod chat;
pub mod health;
