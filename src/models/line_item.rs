use serde::{Deserialize, Serialize};

/// A committed invoice line. Never edited in place once created.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LineItem {
    pub id: i64,
    pub name: String,
    pub quantity: f64,
    pub price: f64,
}

impl LineItem {
    pub fn amount(&self) -> f64 {
        self.quantity * self.price
    }
}
