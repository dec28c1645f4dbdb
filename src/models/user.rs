use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
}

/// Whose bookings a request may read and mutate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Customer(String),
    Provider(String),
}

impl Caller {
    pub fn kind(&self) -> &'static str {
        match self {
            Caller::Customer(_) => "customer",
            Caller::Provider(_) => "provider",
        }
    }
}
