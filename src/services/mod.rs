pub mod ai;
pub mod booking_actions;
pub mod catalog;
pub mod chat;
pub mod datetime;
pub mod decision;
pub mod prompt;
pub mod recommendations;
