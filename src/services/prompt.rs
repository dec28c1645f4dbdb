use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::config::PromptConfig;
use crate::models::{CatalogEntry, ChatRequest, ConversationTurn};
use crate::services::ai::{ImageAttachment, Message};

pub const MAX_RECOMMENDATIONS: usize = 3;

pub const CHAT_POLICY_HEADER: &str = r#"You are Bumi, a friendly AI assistant for home maintenance, like a smart dog that understands what humans need. Your job is to understand the customer's need and either recommend specific services from the list below or ask one clarifying question.

VISION:
- If the user sends an image, inspect it for visible problems (leaks, damage, dirt, wear).
- Use what you see to pick more accurate services; if several issues show, prioritize the most urgent.
- If the image is unclear, ask for a better photo or more details.

CRITICAL: Respond with ONLY a JSON object. No other text.

Use exactly one of these two formats.

RECOMMEND (you can match specific services):
{
  "action": "recommend",
  "message": "Woof! I found some great options for your plumbing emergency!",
  "service_ids": ["<id from the list>", "<id from the list>"],
  "clarification_question": null
}

CLARIFY (you need more information):
{
  "action": "clarify",
  "message": "Woof! I'd love to help! What issue are you seeing with your plumbing?",
  "service_ids": [],
  "clarification_question": "What issue are you seeing with your plumbing?"
}

DECISION HEURISTICS:
- Recommend immediately for urgent words ("leaking", "broken", "flooding", "not working"), specific problems ("clogged toilet", "AC not cooling") and clear service requests ("house cleaning", "lawn mowing").
- Clarify for vague requests ("help with house"), requests with several interpretations ("bathroom issues") or missing critical details ("cleaning" of what?).
- Do not ask again for details the user already gave earlier in the conversation; build on them.
- Exact service named: recommend it. Clear category: recommend the best 2-3 in that category. Partial details: ask ONE specific follow-up.

AVAILABILITY:
- Emergency-type services (plumbing, electrical, HVAC, repair) are usually available within 2 hours, others within 24 hours. Mention it when relevant.

TONE:
- Enthusiastic and helpful like a friendly dog, with the occasional dog pun ("Let me fetch some help!").
- Keep messages short."#;

pub const CHAT_POLICY_FOOTER: &str = r#"STRICT RULES:
- Maximum 3 service_ids per response.
- "recommend" and "clarify" are mutually exclusive: a recommend response has a null clarification_question, a clarify response has an empty service_ids list.
- NEVER invent a service id. ONLY use ids that appear in AVAILABLE SERVICES, copied exactly.
- NEVER return "recommend" with zero matching services; clarify instead.
- NEVER recommend an unrelated category for an urgent or specific request (do not suggest cleaning for a plumbing leak).

Start your response with { and end it with }. No other text."#;

pub const BOOKING_ACTION_POLICY: &str = r#"You are Bumi, a friendly AI assistant that manages home service bookings. You will be given the user's current bookings; use them to identify which booking the user wants to change.

CAPABILITIES:
- Cancel a booking ("cancel my booking", "cancel the cleaning").
- Uncancel / reactivate a cancelled booking.
- Reschedule a booking to a new date and time.

CRITICAL: Respond with ONLY a JSON object. No other text.

When you can act, respond with:
{
  "action": "execute_booking_action",
  "message": "Woof! I'll take care of that!",
  "action_type": "cancel" | "uncancel" | "reschedule",
  "booking_id": "<id from the user's bookings>",
  "new_time": "2025-01-15T14:00:00Z" | null,
  "reason": "Short explanation of what you are doing"
}

When you cannot tell which booking or what change the user wants, respond with:
{
  "action": "clarify",
  "message": "Which booking would you like to change?"
}

RULES:
- cancel and uncancel: new_time is null.
- reschedule: new_time is an ISO-8601 timestamp. If a RESOLVED TIME is provided below, use it.
- booking_id MUST be one of the ids in the user's bookings. Never invent one.
- Keep the message short and cheerful."#;

/// Role-tagged request ready for an `LlmProvider`.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPayload {
    pub system: String,
    pub messages: Vec<Message>,
}

pub struct PromptCompiler {
    config: PromptConfig,
}

impl PromptCompiler {
    pub fn new(config: PromptConfig) -> Self {
        Self { config }
    }

    pub fn compile(&self, catalog: &[CatalogEntry], request: &ChatRequest) -> PromptPayload {
        let system = [
            self.config.chat_header.trim(),
            format_catalog(catalog).as_str(),
            self.config.chat_footer.trim(),
        ]
        .join("\n\n");

        let mut messages = history_messages(&request.conversation_history);

        let mut current = Message::user(request.message.trim());
        if let Some(image) = request.image.as_deref().and_then(decode_image) {
            current.images.push(image);
        }
        if !current.content.is_empty() || !current.images.is_empty() {
            messages.push(current);
        }

        PromptPayload { system, messages }
    }

    /// Booking-action prompt: policy + the caller's bookings (+ a resolved
    /// time hint), then history and the current message.
    pub fn compile_booking_action(
        &self,
        bookings_context: &str,
        resolved_time: Option<&str>,
        history: &[ConversationTurn],
        message: &str,
    ) -> PromptPayload {
        let mut sections = vec![
            self.config.booking_policy.trim().to_string(),
            bookings_context.to_string(),
        ];
        if let Some(resolved) = resolved_time {
            sections.push(format!("RESOLVED TIME for the user's request: {resolved}"));
        }

        let mut messages = history_messages(history);
        messages.push(Message::user(message.trim()));

        PromptPayload {
            system: sections.join("\n\n"),
            messages,
        }
    }
}

/// One `key: value` block per entry, `---` after each, empty fields omitted.
pub fn format_catalog(catalog: &[CatalogEntry]) -> String {
    if catalog.is_empty() {
        return "AVAILABLE SERVICES:\nNO SERVICES ARE CURRENTLY AVAILABLE.".to_string();
    }

    let blocks: Vec<String> = catalog
        .iter()
        .map(|entry| {
            let fields = [
                ("id", Some(entry.id.clone())),
                ("service_title", Some(entry.title.clone())),
                ("service_description", entry.description.clone()),
                ("pricing", Some(entry.price.to_string())),
                ("duration", Some(entry.duration.to_string())),
                ("category", entry.category.clone()),
                ("subcategory", entry.subcategory.clone()),
                ("provider_name", entry.provider_display_name.clone()),
            ];

            let lines: Vec<String> = fields
                .into_iter()
                .filter_map(|(key, value)| {
                    value
                        .filter(|v| !v.trim().is_empty())
                        .map(|v| format!("{key}: {v}"))
                })
                .collect();

            format!("{}\n---", lines.join("\n"))
        })
        .collect();

    format!("AVAILABLE SERVICES:\n{}", blocks.join("\n"))
}

fn history_messages(history: &[ConversationTurn]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() * 2);
    for turn in history {
        if !turn.user.trim().is_empty() {
            messages.push(Message::user(turn.user.as_str()));
        }
        if !turn.bumi.trim().is_empty() {
            messages.push(Message::assistant(turn.bumi.as_str()));
        }
    }
    messages
}

/// Returns `None` (and logs) when the data is not decodable base64.
pub fn decode_image(encoded: &str) -> Option<ImageAttachment> {
    let encoded = encoded.trim();
    // Accept data URLs as well as bare base64.
    let encoded = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };

    match BASE64.decode(encoded) {
        Ok(bytes) if !bytes.is_empty() => Some(ImageAttachment {
            mime_type: sniff_mime(&bytes).to_string(),
            data: encoded.to_string(),
        }),
        Ok(_) => {
            tracing::warn!("empty image payload, continuing without image");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "invalid base64 image data, continuing without image");
            None
        }
    }
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/jpeg",
    }
}
