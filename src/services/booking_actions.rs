use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use rusqlite::Connection;
use serde_json::Value;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    Booking, BookingActionDetails, BookingActionIntent, BookingActionRequest,
    BookingActionResponse, BookingActionType, BookingReply, BookingStatus, BookingSummary,
    BookingUpdate, Caller,
};
use crate::services::ai::invoker::{extract_json_object, ModelInvoker};
use crate::services::datetime::{parse_iso_timestamp, parse_natural_datetime};
use crate::services::prompt::PromptCompiler;
use crate::state::AppState;

const DEFAULT_CLARIFY_MESSAGE: &str =
    "Ruff! I couldn't tell which booking you meant. Which booking would you like to change, and how?";

/// Maps an identity-provider user id to the customer, else the provider, it belongs to.
pub fn resolve_caller(conn: &Connection, user_id: &str) -> Result<Caller, AppError> {
    if let Some(customer) = queries::find_customer_by_user_id(conn, user_id).map_err(AppError::storage)? {
        return Ok(Caller::Customer(customer.id));
    }
    if let Some(provider) = queries::find_provider_by_user_id(conn, user_id).map_err(AppError::storage)? {
        return Ok(Caller::Provider(provider.id));
    }
    Err(AppError::NotFound(format!("no customer or provider for user {user_id}")))
}

pub fn list_caller_bookings(conn: &Connection, caller: &Caller) -> Result<Vec<BookingSummary>, AppError> {
    queries::list_booking_summaries(conn, caller).map_err(AppError::storage)
}

/// Renders the caller's bookings as model context, times in `offset`.
pub fn format_bookings_for_ai(bookings: &[BookingSummary], offset: FixedOffset) -> String {
    if bookings.is_empty() {
        return "USER HAS NO BOOKINGS".to_string();
    }

    let blocks: Vec<String> = bookings
        .iter()
        .map(|b| {
            let local = Utc.from_utc_datetime(&b.start_time).with_timezone(&offset);
            format!(
                "Booking ID: {}\nService: {}\nProvider: {}\nDate: {}\nTime: {}\nStart Time (ISO): {}\nStatus: {}",
                b.id,
                b.service,
                b.provider,
                local.format("%A, %B %d, %Y"),
                local.format("%I:%M %p"),
                local.to_rfc3339(),
                b.status.as_str(),
            )
        })
        .collect();

    format!(
        "USER'S BOOKINGS (Total: {}):\n\n{}\n---",
        bookings.len(),
        blocks.join("\n---\n")
    )
}

/// Total: anything that is not a well-formed `execute_booking_action`
/// becomes a clarification.
pub fn parse_booking_reply(raw: &str) -> BookingReply {
    let Some(obj) = extract_json_object(raw) else {
        tracing::warn!("booking reply is not JSON, asking to clarify");
        return BookingReply::Clarify {
            message: DEFAULT_CLARIFY_MESSAGE.to_string(),
        };
    };

    let message = obj
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_CLARIFY_MESSAGE)
        .to_string();

    if obj.get("action").and_then(Value::as_str) != Some("execute_booking_action") {
        return BookingReply::Clarify { message };
    }

    let action_type = match obj
        .get("action_type")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        Some("cancel") => BookingActionType::Cancel,
        Some("uncancel") => BookingActionType::Uncancel,
        Some("reschedule") => BookingActionType::Reschedule,
        other => {
            tracing::warn!(action_type = ?other, "unknown booking action type");
            return BookingReply::Clarify {
                message: DEFAULT_CLARIFY_MESSAGE.to_string(),
            };
        }
    };

    let booking_id = match obj.get("booking_id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            tracing::warn!("booking action without booking_id");
            return BookingReply::Clarify {
                message: DEFAULT_CLARIFY_MESSAGE.to_string(),
            };
        }
    };

    let new_time = obj
        .get("new_time")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    BookingReply::Execute {
        message,
        intent: BookingActionIntent {
            action_type,
            booking_id,
            new_time,
        },
    }
}

pub async fn interpret_booking_request(
    state: &Arc<AppState>,
    caller: &Caller,
    request: BookingActionRequest,
) -> Result<BookingActionResponse, AppError> {
    let request_id = Uuid::new_v4();
    let offset = state.config.reference_offset();
    let now = Utc::now().with_timezone(&offset);

    let (owned, summaries) = {
        let db = state.db()?;
        let owned = queries::list_bookings_by_owner(&db, caller).map_err(AppError::storage)?;
        let summaries = list_caller_bookings(&db, caller)?;
        (owned, summaries)
    };

    tracing::info!(
        %request_id,
        caller = caller.kind(),
        bookings = owned.len(),
        message = %request.message,
        "processing booking action request"
    );

    let hint = parse_natural_datetime(&request.message, now);
    let hint_text = hint.map(|t| t.to_rfc3339());
    if let Some(resolved) = &hint_text {
        tracing::debug!(%request_id, resolved = %resolved, "resolved time phrase");
    }

    let context = format_bookings_for_ai(&summaries, offset);
    let payload = PromptCompiler::new(state.config.prompts.clone()).compile_booking_action(
        &context,
        hint_text.as_deref(),
        &request.conversation_history,
        &request.message,
    );
    let raw = ModelInvoker::new(state.llm.as_ref(), &state.config.llm)
        .complete(&payload)
        .await?;

    match parse_booking_reply(&raw) {
        BookingReply::Clarify { message } => Ok(BookingActionResponse {
            action: "clarify".to_string(),
            message,
            success: false,
            details: None,
        }),
        BookingReply::Execute { intent, .. } => {
            let db = state.db()?;
            apply_booking_action(
                &db,
                &owned,
                &intent,
                hint.map(|t| t.with_timezone(&Utc)),
                offset,
            )
        }
    }
}

/// Executes an intent against one of `owned`. Nothing is written unless the
/// booking belongs to the caller and the new time (if any) parses.
pub fn apply_booking_action(
    conn: &Connection,
    owned: &[Booking],
    intent: &BookingActionIntent,
    resolved_time: Option<DateTime<Utc>>,
    offset: FixedOffset,
) -> Result<BookingActionResponse, AppError> {
    // Unknown ids and other callers' ids are answered alike.
    if !owned.iter().any(|b| b.id == intent.booking_id) {
        tracing::warn!(booking_id = %intent.booking_id, "booking action on booking not owned by caller");
        return Err(AppError::Unauthorized(
            "you can only modify your own bookings".to_string(),
        ));
    }

    let (update, message) = match intent.action_type {
        BookingActionType::Cancel => (
            BookingUpdate {
                status: Some(BookingStatus::Cancelled),
                ..Default::default()
            },
            "Woof! Your booking is now cancelled!".to_string(),
        ),
        BookingActionType::Uncancel => (
            BookingUpdate {
                status: Some(BookingStatus::Confirmed),
                ..Default::default()
            },
            "Yay! Your booking is reactivated!".to_string(),
        ),
        BookingActionType::Reschedule => {
            let new_time = match intent.new_time.as_deref() {
                Some(raw) => parse_iso_timestamp(raw, offset)
                    .ok_or_else(|| AppError::InvalidDateTime(format!("cannot parse '{raw}'")))?,
                None => resolved_time.ok_or_else(|| {
                    AppError::InvalidDateTime("a new time is required to reschedule".to_string())
                })?,
            };
            let local = new_time.with_timezone(&offset);
            (
                BookingUpdate {
                    start_time: Some(new_time.naive_utc()),
                    ..Default::default()
                },
                format!(
                    "Woof! Your booking is now set for {}!",
                    local.format("%B %d, %Y at %I:%M %p")
                ),
            )
        }
    };

    let booking = queries::update_booking(conn, &intent.booking_id, &update)
        .map_err(AppError::storage)?
        .ok_or_else(|| AppError::NotFound(format!("booking {}", intent.booking_id)))?;

    tracing::info!(
        booking_id = %booking.id,
        action = intent.action_type.past_tense(),
        "booking action executed"
    );

    Ok(BookingActionResponse {
        action: "booking_action_executed".to_string(),
        message,
        success: true,
        details: Some(BookingActionDetails {
            action: intent.action_type.past_tense().to_string(),
            booking,
        }),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db;
    use crate::db::queries::fixtures;
    use crate::state::test_support;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn seeded() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        fixtures::provider(&conn, "p1", Some("Drip Fixers"));
        fixtures::customer(&conn, "c1");
        fixtures::customer(&conn, "c2");
        fixtures::service(&conn, "s1", "p1", "Deep Cleaning", "housecleaning");
        fixtures::booking(&conn, "b1", "c1", "p1", "s1");
        fixtures::booking(&conn, "b2", "c2", "p1", "s1");
        conn
    }

    fn intent(action_type: BookingActionType, booking_id: &str, new_time: Option<&str>) -> BookingActionIntent {
        BookingActionIntent {
            action_type,
            booking_id: booking_id.to_string(),
            new_time: new_time.map(str::to_string),
        }
    }

    fn owned(conn: &Connection, customer: &str) -> Vec<Booking> {
        queries::list_bookings_by_owner(conn, &Caller::Customer(customer.to_string())).unwrap()
    }

    #[test]
    fn test_resolve_caller_prefers_customer() {
        let conn = seeded();
        assert_eq!(
            resolve_caller(&conn, "user-c1").unwrap(),
            Caller::Customer("c1".to_string())
        );
        assert_eq!(
            resolve_caller(&conn, "user-p1").unwrap(),
            Caller::Provider("p1".to_string())
        );
        assert!(matches!(
            resolve_caller(&conn, "stranger"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_format_bookings_for_ai() {
        let conn = seeded();
        let summaries = list_caller_bookings(&conn, &Caller::Customer("c1".to_string())).unwrap();
        let text = format_bookings_for_ai(&summaries, utc());

        assert!(text.starts_with("USER'S BOOKINGS (Total: 1)"));
        assert!(text.contains("Booking ID: b1"));
        assert!(text.contains("Service: Deep Cleaning"));
        assert!(text.contains("Provider: Drip Fixers"));
        assert!(text.contains("Date: Monday, June 16, 2025"));
        assert!(text.contains("Time: 10:00 AM"));
        assert!(text.contains("Status: confirmed"));
        assert!(!text.contains("b2"));
    }

    #[test]
    fn test_format_no_bookings() {
        assert_eq!(format_bookings_for_ai(&[], utc()), "USER HAS NO BOOKINGS");
    }

    #[test]
    fn test_parse_execute_reply() {
        let raw = r#"Sure! {"action":"execute_booking_action","message":"Cancelling now","action_type":"cancel","booking_id":"b1","new_time":null,"reason":"user asked"}"#;
        assert_eq!(
            parse_booking_reply(raw),
            BookingReply::Execute {
                message: "Cancelling now".to_string(),
                intent: intent(BookingActionType::Cancel, "b1", None),
            }
        );
    }

    #[test]
    fn test_parse_non_action_replies_clarify() {
        let cases = [
            "no json here",
            r#"{"action":"clarify","message":"Which booking?"}"#,
            r#"{"action":"execute_booking_action","action_type":"delete","booking_id":"b1"}"#,
            r#"{"action":"execute_booking_action","action_type":"cancel"}"#,
        ];
        for raw in cases {
            assert!(
                matches!(parse_booking_reply(raw), BookingReply::Clarify { .. }),
                "raw: {raw}"
            );
        }
        assert_eq!(
            parse_booking_reply(r#"{"action":"clarify","message":"Which booking?"}"#),
            BookingReply::Clarify {
                message: "Which booking?".to_string()
            }
        );
    }

    #[test]
    fn test_cancel_then_uncancel() {
        let conn = seeded();
        let mine = owned(&conn, "c1");

        let cancelled =
            apply_booking_action(&conn, &mine, &intent(BookingActionType::Cancel, "b1", None), None, utc())
                .unwrap();
        assert!(cancelled.success);
        let details = cancelled.details.unwrap();
        assert_eq!(details.action, "cancelled");
        assert_eq!(details.booking.status, BookingStatus::Cancelled);

        let restored =
            apply_booking_action(&conn, &mine, &intent(BookingActionType::Uncancel, "b1", None), None, utc())
                .unwrap();
        assert_eq!(restored.details.unwrap().booking.status, BookingStatus::Confirmed);
    }

    #[test]
    fn test_unowned_booking_is_not_touched() {
        let conn = seeded();
        let mine = owned(&conn, "c1");
        let before = queries::get_booking(&conn, "b2").unwrap().unwrap();

        let result =
            apply_booking_action(&conn, &mine, &intent(BookingActionType::Cancel, "b2", None), None, utc());
        assert!(matches!(result, Err(AppError::Unauthorized(_))));

        let after = queries::get_booking(&conn, "b2").unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_unknown_booking_is_unauthorized() {
        let conn = seeded();
        let mine = owned(&conn, "c1");
        let b1 = queries::get_booking(&conn, "b1").unwrap().unwrap();
        let b2 = queries::get_booking(&conn, "b2").unwrap().unwrap();

        for action in [
            BookingActionType::Cancel,
            BookingActionType::Uncancel,
            BookingActionType::Reschedule,
        ] {
            let result = apply_booking_action(
                &conn,
                &mine,
                &intent(action, "nope", Some("2025-07-01T15:30:00Z")),
                None,
                utc(),
            );
            assert!(matches!(result, Err(AppError::Unauthorized(_))));
        }

        assert_eq!(queries::get_booking(&conn, "b1").unwrap().unwrap(), b1);
        assert_eq!(queries::get_booking(&conn, "b2").unwrap().unwrap(), b2);
        assert!(queries::get_booking(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn test_reschedule_overwrites_only_start_time() {
        let conn = seeded();
        let mine = owned(&conn, "c1");
        let result = apply_booking_action(
            &conn,
            &mine,
            &intent(BookingActionType::Reschedule, "b1", Some("2025-07-01T15:30:00Z")),
            None,
            utc(),
        )
        .unwrap();

        assert_eq!(result.message, "Woof! Your booking is now set for July 01, 2025 at 03:30 PM!");
        let booking = result.details.unwrap().booking;
        assert_eq!(
            booking.start_time,
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap().and_hms_opt(15, 30, 0).unwrap()
        );
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.customer_id, "c1");
    }

    #[test]
    fn test_reschedule_falls_back_to_resolved_time() {
        let conn = seeded();
        let mine = owned(&conn, "c1");
        let resolved = Utc.with_ymd_and_hms(2025, 6, 17, 15, 0, 0).unwrap();
        let result = apply_booking_action(
            &conn,
            &mine,
            &intent(BookingActionType::Reschedule, "b1", None),
            Some(resolved),
            utc(),
        )
        .unwrap();
        assert_eq!(result.details.unwrap().booking.start_time, resolved.naive_utc());
    }

    #[test]
    fn test_reschedule_with_bad_time_leaves_booking_unchanged() {
        let conn = seeded();
        let mine = owned(&conn, "c1");
        let before = queries::get_booking(&conn, "b1").unwrap().unwrap();

        for new_time in [Some("next blursday"), None] {
            let result = apply_booking_action(
                &conn,
                &mine,
                &intent(BookingActionType::Reschedule, "b1", new_time),
                None,
                utc(),
            );
            assert!(matches!(result, Err(AppError::InvalidDateTime(_))));
        }

        assert_eq!(queries::get_booking(&conn, "b1").unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_interpret_passes_resolved_time_hint() {
        let (state, prompts) = test_support::state(
            seeded(),
            r#"{"action":"execute_booking_action","message":"Moving it!","action_type":"reschedule","booking_id":"b1","new_time":null}"#,
        );
        let request = BookingActionRequest {
            message: "move my cleaning to tomorrow at 3pm".to_string(),
            conversation_history: vec![],
        };

        let before = Utc::now().date_naive();
        let response = interpret_booking_request(&state, &Caller::Customer("c1".to_string()), request)
            .await
            .unwrap();
        let after = Utc::now().date_naive();

        assert_eq!(response.action, "booking_action_executed");
        let system = prompts.lock().unwrap()[0].clone();
        assert!(system.contains("RESOLVED TIME"));
        assert!(system.contains("Booking ID: b1"));

        let start = response.details.unwrap().booking.start_time;
        assert_eq!(start.format("%H:%M").to_string(), "15:00");
        // The date may roll over while the request runs.
        let tomorrow = [before.succ_opt().unwrap(), after.succ_opt().unwrap()];
        assert!(tomorrow.contains(&start.date()), "unexpected date {start}");
    }

    #[tokio::test]
    async fn test_interpret_clarify_reply() {
        let (state, _) = test_support::state(
            seeded(),
            r#"{"action":"clarify","message":"Which booking do you mean?"}"#,
        );
        let request = BookingActionRequest {
            message: "change it".to_string(),
            conversation_history: vec![],
        };

        let response = interpret_booking_request(&state, &Caller::Customer("c1".to_string()), request)
            .await
            .unwrap();
        assert_eq!(response.action, "clarify");
        assert_eq!(response.message, "Which booking do you mean?");
        assert!(!response.success);
        assert!(response.details.is_none());
    }
}
