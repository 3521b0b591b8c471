use serde::{Deserialize, Deserializer, Serialize};

use super::LineItem;

/// Display template for the invoice
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Basic,
    Modern,
}

impl Template {
    /// Parse a persisted template name. Anything unrecognized is `Basic`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "modern" => Template::Modern,
            _ => Template::Basic,
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Template::Basic => Template::Modern,
            Template::Modern => Template::Basic,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Template::Basic => "Basic Template",
            Template::Modern => "Modern Template",
        }
    }
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Any JSON value is accepted so a bad template never sinks the whole invoice
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map(Template::from_name).unwrap_or_default())
    }
}

/// The whole editable invoice. Always persisted as one unit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceSnapshot {
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<LineItem>,
    #[serde(deserialize_with = "null_as_default")]
    pub client_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub invoice_number: String,
    #[serde(deserialize_with = "null_as_default")]
    pub due_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: String,
    #[serde(deserialize_with = "null_as_default")]
    pub logo_url: String,
    pub template: Template,
}

impl InvoiceSnapshot {
    /// Sum of quantity × price over all items. Never cached.
    pub fn total(&self) -> f64 {
        self.items.iter().map(LineItem::amount).sum()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, name: &str, quantity: f64, price: f64) -> LineItem {
        LineItem { id, name: name.to_string(), quantity, price }
    }

    #[test]
    fn empty_invoice_totals_zero() {
        assert_eq!(InvoiceSnapshot::default().total(), 0.0);
    }

    #[test]
    fn total_sums_quantity_times_price() {
        let snapshot = InvoiceSnapshot {
            items: vec![item(1, "Consulting", 3.0, 50.0), item(2, "Travel", 1.0, 20.5)],
            ..Default::default()
        };
        assert_eq!(format!("{:.2}", snapshot.total()), "170.50");
    }

    #[test]
    fn unknown_template_falls_back_to_basic() {
        let snapshot: InvoiceSnapshot = serde_json::from_str(r#"{"template":"fancy"}"#).unwrap();
        assert_eq!(snapshot.template, Template::Basic);

        let snapshot: InvoiceSnapshot = serde_json::from_str(r#"{"template":null}"#).unwrap();
        assert_eq!(snapshot.template, Template::Basic);

        let snapshot: InvoiceSnapshot =
            serde_json::from_str(r#"{"template":{"name":"modern"},"notes":"kept"}"#).unwrap();
        assert_eq!(snapshot.template, Template::Basic);
        assert_eq!(snapshot.notes, "kept");
    }

    #[test]
    fn missing_and_null_fields_default() {
        let snapshot: InvoiceSnapshot =
            serde_json::from_str(r#"{"clientName":null,"items":null,"notes":"hi"}"#).unwrap();
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.client_name, "");
        assert_eq!(snapshot.notes, "hi");
        assert_eq!(snapshot.template, Template::Basic);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let snapshot = InvoiceSnapshot {
            items: vec![item(7, "Widget", 2.0, 4.5)],
            client_name: "Acme".to_string(),
            template: Template::Modern,
            ..Default::default()
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["clientName"], "Acme");
        assert_eq!(value["template"], "modern");
        assert_eq!(value["items"][0]["price"], 4.5);
        assert!(value.get("invoiceNumber").is_some());
        assert!(value.get("logoUrl").is_some());
    }
}
