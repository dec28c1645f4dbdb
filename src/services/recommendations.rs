use chrono::{DateTime, Duration, DurationRound, FixedOffset, Utc};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{CatalogEntry, Review, ServiceRecommendation};

const URGENT_KEYWORDS: &[&str] = &["emergency", "urgent", "plumbing", "electrical", "hvac", "repair"];
const URGENT_LEAD_HOURS: i64 = 2;
const STANDARD_LEAD_HOURS: i64 = 24;

/// Builds one recommendation per id, in id order. Entries whose provider
/// cannot be resolved are skipped.
pub fn map_recommendations(
    conn: &Connection,
    catalog: &[CatalogEntry],
    service_ids: &[String],
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<Vec<ServiceRecommendation>, AppError> {
    let mut recommendations = Vec::with_capacity(service_ids.len());

    for id in service_ids {
        let Some(entry) = catalog.iter().find(|e| &e.id == id) else {
            tracing::warn!(service_id = %id, "service vanished from catalog, skipping");
            continue;
        };
        let Some(provider_name) = entry.provider_display_name.clone() else {
            tracing::warn!(
                service_id = %entry.id,
                provider_id = %entry.provider_id,
                "provider not found, dropping recommendation"
            );
            continue;
        };

        let reviews =
            queries::list_reviews_by_provider(conn, &entry.provider_id).map_err(AppError::storage)?;
        let available = next_available_time(entry, now);

        recommendations.push(ServiceRecommendation {
            id: entry.id.clone(),
            name: entry.title.clone(),
            provider_name,
            provider_id: entry.provider_id.clone(),
            price: entry.price,
            rating: average_rating(&reviews),
            description: entry.description.clone().unwrap_or_default(),
            category: entry.category.clone().unwrap_or_default(),
            duration: entry.duration,
            estimated_next_available_time: available,
            available_time_label: format_available_time(available, now, offset),
        });
    }

    Ok(recommendations)
}

/// Mean rating rounded to two decimals; 0.0 without reviews.
pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let total: i64 = reviews.iter().map(|r| r.rating as i64).sum();
    let mean = total as f64 / reviews.len() as f64;
    (mean * 100.0).round() / 100.0
}

/// Heuristic, not a schedule lookup: urgent-looking services are offered two
/// hours out, everything else a day out, truncated to the hour.
pub fn next_available_time(entry: &CatalogEntry, now: DateTime<Utc>) -> DateTime<Utc> {
    let haystack = format!(
        "{} {}",
        entry.title,
        entry.description.as_deref().unwrap_or_default()
    )
    .to_lowercase();

    let lead = if URGENT_KEYWORDS.iter().any(|k| haystack.contains(k)) {
        Duration::hours(URGENT_LEAD_HOURS)
    } else {
        Duration::hours(STANDARD_LEAD_HOURS)
    };

    let available = now + lead;
    available
        .duration_trunc(Duration::hours(1))
        .unwrap_or(available)
}

/// "Today at 02:00 PM", "Tomorrow at 09:00 AM", or "Friday, March 07 at 09:00 AM".
pub fn format_available_time(
    available: DateTime<Utc>,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> String {
    let local = available.with_timezone(&offset);
    let today = now.with_timezone(&offset).date_naive();

    if local.date_naive() == today {
        format!("Today at {}", local.format("%I:%M %p"))
    } else if Some(local.date_naive()) == today.succ_opt() {
        format!("Tomorrow at {}", local.format("%I:%M %p"))
    } else {
        local.format("%A, %B %d at %I:%M %p").to_string()
    }
}
