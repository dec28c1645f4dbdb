use serde::{Deserialize, Serialize};

/// A bookable service as shown to the model, joined with its provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    /// Minutes.
    pub duration: i32,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub provider_id: String,
    /// `None` when the provider row could not be resolved.
    pub provider_display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: Option<String>,
    pub phone_number: Option<String>,
}

/// Company name when present, otherwise "first last".
pub fn display_name(company_name: Option<&str>, first_name: &str, last_name: &str) -> String {
    match company_name {
        Some(company) if !company.trim().is_empty() => company.to_string(),
        _ => format!("{first_name} {last_name}").trim().to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub provider_id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration: i32,
    pub category: Option<String>,
    pub subcategory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub customer_id: String,
    pub provider_id: String,
    pub rating: i32,
    pub description: Option<String>,
}
