use tracing::{debug, info};

use crate::form::{Field, InvoiceForm, ItemDraft};
use crate::models::Template;
use crate::storage::{InvoiceMirror, KeyValueStore};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Uninitialized,
    Ready,
}

/// The invoice form wired to its persistence mirror. Every committing
/// mutation is followed by a full save.
pub struct InvoiceSession<S> {
    form: InvoiceForm,
    mirror: InvoiceMirror<S>,
    phase: Phase,
}

impl<S: KeyValueStore> InvoiceSession<S> {
    pub fn new(mirror: InvoiceMirror<S>) -> Self {
        Self {
            form: InvoiceForm::default(),
            mirror,
            phase: Phase::Uninitialized,
        }
    }

    /// Load the saved invoice. Only the first call has any effect.
    pub fn hydrate(&mut self) {
        if self.phase == Phase::Ready {
            return;
        }

        let snapshot = self.mirror.load();
        info!(items = snapshot.items.len(), "Invoice loaded");
        self.form = InvoiceForm::from_snapshot(snapshot);
        self.phase = Phase::Ready;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn form(&self) -> &InvoiceForm {
        &self.form
    }

    /// Mutable access to the form for draft edits, which are not persisted.
    pub fn form_mut(&mut self) -> &mut InvoiceForm {
        &mut self.form
    }

    pub fn add_item(&mut self, name: &str, quantity: f64, price: f64) -> bool {
        let added = self.form.add_item(name, quantity, price);
        if added {
            self.persist();
        }
        added
    }

    /// Commit the typed draft as a line item.
    pub fn add_draft_item(&mut self) -> bool {
        let ItemDraft { name, quantity, price } = self.form.draft.clone();
        self.add_item(&name, quantity, price)
    }

    pub fn remove_item(&mut self, id: i64) {
        if !self.form.remove_item(id) {
            debug!(id, "No item to remove");
        }
        self.persist();
    }

    pub fn update_field(&mut self, field: Field, value: impl Into<String>) {
        self.form.update_field(field, value);
        self.persist();
    }

    pub fn set_template(&mut self, template: Template) {
        self.form.set_template(template);
        self.persist();
    }

    pub fn clear(&mut self) {
        self.form.clear();
        self.mirror.clear();
        info!("Invoice cleared");
    }

    fn persist(&mut self) {
        // Saving before hydration would overwrite the stored invoice
        if self.phase != Phase::Ready {
            debug!("Skipping save before hydration");
            return;
        }
        self.mirror.save(self.form.snapshot());
    }

    #[cfg(test)]
    pub fn mirror(&self) -> &InvoiceMirror<S> {
        &self.mirror
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvoiceSnapshot;
    use crate::storage::{MemoryStore, STORAGE_KEY};

    fn ready_session() -> InvoiceSession<MemoryStore> {
        let mut session = InvoiceSession::new(InvoiceMirror::new(MemoryStore::default()));
        session.hydrate();
        session
    }

    #[test]
    fn starts_uninitialized_and_hydrates_once() {
        let mut mirror = InvoiceMirror::new(MemoryStore::default());
        mirror.save(&InvoiceSnapshot {
            client_name: "Acme".into(),
            ..Default::default()
        });

        let mut session = InvoiceSession::new(mirror);
        assert_eq!(session.phase(), Phase::Uninitialized);

        session.hydrate();
        assert_eq!(session.phase(), Phase::Ready);
        assert_eq!(session.form().field(Field::ClientName), "Acme");

        session.form_mut().update_field(Field::ClientName, "Local edit");
        session.hydrate();
        assert_eq!(session.form().field(Field::ClientName), "Local edit");
    }

    #[test]
    fn hydrated_duplicate_ids_become_unique() {
        let mut store = MemoryStore::default();
        store
            .set(
                STORAGE_KEY,
                r#"{"items":[{"id":5,"name":"A","quantity":1,"price":1},{"id":5,"name":"B","quantity":1,"price":2}]}"#,
            )
            .unwrap();
        let mut session = InvoiceSession::new(InvoiceMirror::new(store));
        session.hydrate();

        let ids: Vec<i64> = session.form().items().iter().map(|item| item.id).collect();
        assert_eq!(ids[0], 5);
        assert_ne!(ids[0], ids[1]);

        session.remove_item(5);
        assert_eq!(session.mirror().load().items[0].name, "B");
    }

    #[test]
    fn add_and_remove_persist() {
        let mut session = ready_session();
        assert!(session.add_item("Consulting", 3.0, 50.0));
        assert!(session.add_item("Travel", 1.0, 20.5));
        assert_eq!(session.mirror().load().items.len(), 2);

        let id = session.form().items()[0].id;
        session.remove_item(id);
        let saved = session.mirror().load();
        assert_eq!(saved.items.len(), 1);
        assert_eq!(format!("{:.2}", saved.total()), "20.50");
    }

    #[test]
    fn draft_item_commits_and_resets() {
        let mut session = ready_session();
        session.form_mut().draft = ItemDraft {
            name: "Consulting".into(),
            quantity: 3.0,
            price: 50.0,
        };
        assert!(session.add_draft_item());
        assert_eq!(session.form().draft, ItemDraft::default());
        assert_eq!(session.mirror().load().items[0].name, "Consulting");
    }

    #[test]
    fn rejected_add_does_not_write() {
        let mut session = ready_session();
        assert!(!session.add_item("", 1.0, 10.0));
        assert!(session.mirror().store().get(STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn field_edits_persist() {
        let mut session = ready_session();
        session.update_field(Field::InvoiceNumber, "INV-7");
        session.update_field(Field::LogoUrl, "https://example.com/logo.png");
        let saved = session.mirror().load();
        assert_eq!(saved.invoice_number, "INV-7");
        assert_eq!(saved.logo_url, "https://example.com/logo.png");
    }

    #[test]
    fn template_change_persists() {
        let mut session = ready_session();
        session.set_template(Template::Modern);
        assert_eq!(session.mirror().load().template, Template::Modern);
    }

    #[test]
    fn clear_twice_yields_default_state() {
        let mut session = ready_session();
        session.add_item("Widget", 2.0, 3.0);
        session.update_field(Field::Notes, "thanks");

        session.clear();
        assert_eq!(session.form().snapshot(), &InvoiceSnapshot::default());
        session.clear();
        assert_eq!(session.form().snapshot(), &InvoiceSnapshot::default());
        assert_eq!(session.mirror().load(), InvoiceSnapshot::default());
        assert!(session.mirror().store().get(STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn state_survives_failed_writes() {
        let mut store = MemoryStore::default();
        store.fail_writes = true;
        let mut session = InvoiceSession::new(InvoiceMirror::new(store));
        session.hydrate();

        assert!(session.add_item("Widget", 1.0, 9.99));
        session.update_field(Field::ClientName, "Acme");
        assert_eq!(session.form().items().len(), 1);
        assert_eq!(session.form().field(Field::ClientName), "Acme");
        assert_eq!(session.mirror().load(), InvoiceSnapshot::default());
    }
}
