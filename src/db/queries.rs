use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::catalog::display_name;
use crate::models::{
    Booking, BookingStatus, BookingSummary, BookingUpdate, Caller, CatalogEntry, Customer,
    Provider, Review, Service,
};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_ts(dt: &NaiveDateTime) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Catalog ──

pub fn list_services(conn: &Connection) -> anyhow::Result<Vec<CatalogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.title, s.description, s.price, s.duration, s.category, s.subcategory,
                s.provider_id, p.id, p.first_name, p.last_name, p.company_name
         FROM services s
         LEFT JOIN providers p ON p.id = s.provider_id
         ORDER BY s.id ASC",
    )?;

    let rows = stmt.query_map([], |row| {
        let resolved: Option<String> = row.get(8)?;
        let first_name: Option<String> = row.get(9)?;
        let last_name: Option<String> = row.get(10)?;
        let company_name: Option<String> = row.get(11)?;

        let provider_display_name = resolved.map(|_| {
            display_name(
                company_name.as_deref(),
                first_name.as_deref().unwrap_or_default(),
                last_name.as_deref().unwrap_or_default(),
            )
        });

        Ok(CatalogEntry {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            price: row.get(3)?,
            duration: row.get(4)?,
            category: row.get(5)?,
            subcategory: row.get(6)?,
            provider_id: row.get(7)?,
            provider_display_name,
        })
    })?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

pub fn create_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, provider_id, title, description, price, duration, category, subcategory)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            service.id,
            service.provider_id,
            service.title,
            service.description,
            service.price,
            service.duration,
            service.category,
            service.subcategory,
        ],
    )?;
    Ok(())
}

// ── Providers & Customers ──

pub fn create_provider(conn: &Connection, provider: &Provider) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO providers (id, user_id, first_name, last_name, company_name, phone_number)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            provider.id,
            provider.user_id,
            provider.first_name,
            provider.last_name,
            provider.company_name,
            provider.phone_number,
        ],
    )?;
    Ok(())
}

pub fn create_customer(conn: &Connection, customer: &Customer) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO customers (id, user_id, first_name, last_name, phone_number)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            customer.id,
            customer.user_id,
            customer.first_name,
            customer.last_name,
            customer.phone_number,
        ],
    )?;
    Ok(())
}

pub fn find_provider_by_user_id(conn: &Connection, user_id: &str) -> anyhow::Result<Option<Provider>> {
    let result = conn.query_row(
        "SELECT id, user_id, first_name, last_name, company_name, phone_number
         FROM providers WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(Provider {
                id: row.get(0)?,
                user_id: row.get(1)?,
                first_name: row.get(2)?,
                last_name: row.get(3)?,
                company_name: row.get(4)?,
                phone_number: row.get(5)?,
            })
        },
    );

    match result {
        Ok(provider) => Ok(Some(provider)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn find_customer_by_user_id(conn: &Connection, user_id: &str) -> anyhow::Result<Option<Customer>> {
    let result = conn.query_row(
        "SELECT id, user_id, first_name, last_name, phone_number
         FROM customers WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(Customer {
                id: row.get(0)?,
                user_id: row.get(1)?,
                first_name: row.get(2)?,
                last_name: row.get(3)?,
                phone_number: row.get(4)?,
            })
        },
    );

    match result {
        Ok(customer) => Ok(Some(customer)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Reviews ──

pub fn create_review(conn: &Connection, review: &Review) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO reviews (id, customer_id, provider_id, rating, description)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            review.id,
            review.customer_id,
            review.provider_id,
            review.rating,
            review.description,
        ],
    )?;
    Ok(())
}

pub fn list_reviews_by_provider(conn: &Connection, provider_id: &str) -> anyhow::Result<Vec<Review>> {
    let mut stmt = conn.prepare(
        "SELECT id, customer_id, provider_id, rating, description
         FROM reviews WHERE provider_id = ?1 ORDER BY created_at ASC, id ASC",
    )?;

    let rows = stmt.query_map(params![provider_id], |row| {
        Ok(Review {
            id: row.get(0)?,
            customer_id: row.get(1)?,
            provider_id: row.get(2)?,
            rating: row.get(3)?,
            description: row.get(4)?,
        })
    })?;

    let mut reviews = vec![];
    for row in rows {
        reviews.push(row?);
    }
    Ok(reviews)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, customer_id, provider_id, service_id, start_time, status, \
                               special_instructions, service_notes, created_at, updated_at";

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, customer_id, provider_id, service_id, start_time, status, special_instructions, service_notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            booking.id,
            booking.customer_id,
            booking.provider_id,
            booking.service_id,
            format_ts(&booking.start_time),
            booking.status.as_str(),
            booking.special_instructions,
            booking.service_notes,
            format_ts(&booking.created_at),
            format_ts(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Applies the set fields of `update` and returns the updated row, or `None`
/// if no booking has that id.
pub fn update_booking(
    conn: &Connection,
    id: &str,
    update: &BookingUpdate,
) -> anyhow::Result<Option<Booking>> {
    let mut assignments = vec!["updated_at = ?1".to_string()];
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> =
        vec![Box::new(format_ts(&Utc::now().naive_utc()))];

    if let Some(status) = update.status {
        values.push(Box::new(status.as_str()));
        assignments.push(format!("status = ?{}", values.len()));
    }
    if let Some(start_time) = update.start_time {
        values.push(Box::new(format_ts(&start_time)));
        assignments.push(format!("start_time = ?{}", values.len()));
    }

    values.push(Box::new(id.to_string()));
    let sql = format!(
        "UPDATE bookings SET {} WHERE id = ?{}",
        assignments.join(", "),
        values.len()
    );

    let params_refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|p| p.as_ref()).collect();
    let count = conn.execute(&sql, params_refs.as_slice())?;
    if count == 0 {
        return Ok(None);
    }

    get_booking(conn, id)
}

pub fn list_bookings_by_owner(conn: &Connection, owner: &Caller) -> anyhow::Result<Vec<Booking>> {
    let (column, owner_id) = owner_column(owner);
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE {column} = ?1 ORDER BY start_time ASC"
    ))?;

    let rows = stmt.query_map(params![owner_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn list_booking_summaries(conn: &Connection, owner: &Caller) -> anyhow::Result<Vec<BookingSummary>> {
    let (column, owner_id) = owner_column(owner);
    let mut stmt = conn.prepare(&format!(
        "SELECT b.id, s.title, p.first_name, p.last_name, p.company_name, b.start_time, b.status
         FROM bookings b
         LEFT JOIN services s ON s.id = b.service_id
         LEFT JOIN providers p ON p.id = b.provider_id
         WHERE b.{column} = ?1
         ORDER BY b.start_time ASC"
    ))?;

    let rows = stmt.query_map(params![owner_id], |row| {
        let service: Option<String> = row.get(1)?;
        let first_name: Option<String> = row.get(2)?;
        let last_name: Option<String> = row.get(3)?;
        let company_name: Option<String> = row.get(4)?;
        let start_time: String = row.get(5)?;
        let status: String = row.get(6)?;

        let provider = match (&first_name, &last_name) {
            (None, None) => "Unknown Provider".to_string(),
            _ => display_name(
                company_name.as_deref(),
                first_name.as_deref().unwrap_or_default(),
                last_name.as_deref().unwrap_or_default(),
            ),
        };

        Ok(BookingSummary {
            id: row.get(0)?,
            service: service.unwrap_or_else(|| "Unknown Service".to_string()),
            provider,
            start_time: parse_ts(&start_time),
            status: BookingStatus::parse(&status),
        })
    })?;

    let mut summaries = vec![];
    for row in rows {
        summaries.push(row?);
    }
    Ok(summaries)
}

fn owner_column(owner: &Caller) -> (&'static str, &str) {
    match owner {
        Caller::Customer(id) => ("customer_id", id.as_str()),
        Caller::Provider(id) => ("provider_id", id.as_str()),
    }
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let start_time: String = row.get(4)?;
    let status: String = row.get(5)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    Ok(Booking {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        provider_id: row.get(2)?,
        service_id: row.get(3)?,
        start_time: parse_ts(&start_time),
        status: BookingStatus::parse(&status),
        special_instructions: row.get(6)?,
        service_notes: row.get(7)?,
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
    })
}
