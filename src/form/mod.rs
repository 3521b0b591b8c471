use std::collections::HashSet;

use chrono::Utc;

use crate::models::{InvoiceSnapshot, LineItem, Template};

/// Scalar invoice fields that can be edited directly
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Field {
    ClientName,
    InvoiceNumber,
    DueDate,
    Notes,
    LogoUrl,
}

/// Values typed for the next line item, not yet committed
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub name: String,
    pub quantity: f64,
    pub price: f64,
}

impl Default for ItemDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            quantity: 1.0,
            price: 0.0,
        }
    }
}

/// Issues line item ids from the wall clock in milliseconds. If the clock
/// has not moved past the last id handed out, the next id is `last + 1`.
/// Once that would overflow, the smallest non-negative id not in use is
/// issued instead.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: Option<i64>,
}

impl IdGenerator {
    pub fn seeded(items: &[LineItem]) -> Self {
        Self {
            last: items.iter().map(|item| item.id).max(),
        }
    }

    pub fn next_id(&mut self, items: &[LineItem]) -> i64 {
        self.next_at(Utc::now().timestamp_millis(), items)
    }

    fn next_at(&mut self, now: i64, items: &[LineItem]) -> i64 {
        let candidate = match self.last {
            Some(last) if now <= last => last.checked_add(1),
            _ => Some(now),
        };

        match candidate {
            Some(id) => {
                self.last = Some(id);
                id
            }
            None => {
                let used: HashSet<i64> = items.iter().map(|item| item.id).collect();
                (0..).find(|id| !used.contains(id)).unwrap_or_default()
            }
        }
    }
}

/// Whether a line item with these values may be added.
pub fn can_add(name: &str, quantity: f64, price: f64) -> bool {
    !name.is_empty()
        && quantity.is_finite()
        && price.is_finite()
        && quantity > 0.0
        && price > 0.0
}

/// Draft and committed invoice state.
///
/// Holds no storage handle; see `session::InvoiceSession` for the
/// persisting wrapper.
#[derive(Debug, Default)]
pub struct InvoiceForm {
    invoice: InvoiceSnapshot,
    pub draft: ItemDraft,
    ids: IdGenerator,
}

impl InvoiceForm {
    /// Start from a loaded invoice. Items sharing an id with an earlier
    /// item are given fresh ids.
    pub fn from_snapshot(mut invoice: InvoiceSnapshot) -> Self {
        let mut ids = IdGenerator::seeded(&invoice.items);
        let mut seen = HashSet::new();
        for index in 0..invoice.items.len() {
            if !seen.insert(invoice.items[index].id) {
                let id = ids.next_id(&invoice.items);
                invoice.items[index].id = id;
                seen.insert(id);
            }
        }

        Self {
            invoice,
            draft: ItemDraft::default(),
            ids,
        }
    }

    pub fn snapshot(&self) -> &InvoiceSnapshot {
        &self.invoice
    }

    pub fn items(&self) -> &[LineItem] {
        &self.invoice.items
    }

    pub fn template(&self) -> Template {
        self.invoice.template
    }

    pub fn total(&self) -> f64 {
        self.invoice.total()
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::ClientName => &self.invoice.client_name,
            Field::InvoiceNumber => &self.invoice.invoice_number,
            Field::DueDate => &self.invoice.due_date,
            Field::Notes => &self.invoice.notes,
            Field::LogoUrl => &self.invoice.logo_url,
        }
    }

    /// Append a line item. Invalid input is ignored and returns `false`.
    pub fn add_item(&mut self, name: &str, quantity: f64, price: f64) -> bool {
        if !can_add(name, quantity, price) {
            return false;
        }

        let item = LineItem {
            id: self.ids.next_id(&self.invoice.items),
            name: name.to_string(),
            quantity,
            price,
        };
        self.invoice.items.push(item);
        self.draft = ItemDraft::default();
        true
    }

    /// Remove the item with `id`. Returns `false` if there was none.
    pub fn remove_item(&mut self, id: i64) -> bool {
        let before = self.invoice.items.len();
        self.invoice.items.retain(|item| item.id != id);
        self.invoice.items.len() != before
    }

    pub fn update_field(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::ClientName => self.invoice.client_name = value,
            Field::InvoiceNumber => self.invoice.invoice_number = value,
            Field::DueDate => self.invoice.due_date = value,
            Field::Notes => self.invoice.notes = value,
            Field::LogoUrl => self.invoice.logo_url = value,
        }
    }

    pub fn set_template(&mut self, template: Template) {
        self.invoice.template = template;
    }

    pub fn clear(&mut self) {
        self.invoice = InvoiceSnapshot::default();
        self.draft = ItemDraft::default();
    }
}
