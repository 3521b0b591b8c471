use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{
        Block, BorderType, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table,
        TableState, Wrap,
    },
    Frame,
};

use crate::form::{Field, InvoiceForm};
use crate::models::Template;
use crate::session::InvoiceSession;
use crate::storage::KeyValueStore;
use crate::ui::components::date_input::DateInputState;

// Represents a field in the invoice form, in navigation order
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FormField {
    ClientName,
    InvoiceNumber,
    DueDate,
    LogoUrl,
    Notes,
    Template,
    ItemName,
    Quantity,
    Price,
    Items,
}

const FIELDS: [FormField; 10] = [
    FormField::ClientName,
    FormField::InvoiceNumber,
    FormField::DueDate,
    FormField::LogoUrl,
    FormField::Notes,
    FormField::Template,
    FormField::ItemName,
    FormField::Quantity,
    FormField::Price,
    FormField::Items,
];

impl FormField {
    fn label(self) -> &'static str {
        match self {
            FormField::ClientName => "Client Name",
            FormField::InvoiceNumber => "Invoice Number",
            FormField::DueDate => "Due Date",
            FormField::LogoUrl => "Logo Image URL",
            FormField::Notes => "Additional Notes",
            FormField::Template => "Template",
            FormField::ItemName => "Item Name",
            FormField::Quantity => "Quantity",
            FormField::Price => "Price",
            FormField::Items => "Items",
        }
    }

    /// The invoice field this form field edits directly, if any
    fn invoice_field(self) -> Option<Field> {
        match self {
            FormField::ClientName => Some(Field::ClientName),
            FormField::InvoiceNumber => Some(Field::InvoiceNumber),
            FormField::DueDate => Some(Field::DueDate),
            FormField::LogoUrl => Some(Field::LogoUrl),
            FormField::Notes => Some(Field::Notes),
            _ => None,
        }
    }
}

pub enum InvoiceFormAction {
    Quit,
    Print,
}

// Represents the screen state
pub struct InvoiceFormState {
    current_field: FormField,
    editing: bool,
    active_input: String,
    due_date_state: DateInputState,
    selected_item: Option<usize>,
    confirm_clear: bool,
    status: Option<String>,
}

impl InvoiceFormState {
    pub fn new(form: &InvoiceForm) -> Self {
        Self {
            current_field: FormField::ClientName,
            editing: false,
            active_input: String::new(),
            due_date_state: DateInputState::new(form.field(Field::DueDate)),
            selected_item: if form.items().is_empty() { None } else { Some(0) },
            confirm_clear: false,
            status: None,
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn next_field(&mut self) {
        let index = FIELDS.iter().position(|f| *f == self.current_field).unwrap_or(0);
        self.current_field = FIELDS[(index + 1) % FIELDS.len()];
    }

    pub fn previous_field(&mut self) {
        let index = FIELDS.iter().position(|f| *f == self.current_field).unwrap_or(0);
        self.current_field = FIELDS[(index + FIELDS.len() - 1) % FIELDS.len()];
    }

    fn start_editing(&mut self, form: &InvoiceForm) {
        self.active_input = match self.current_field {
            FormField::DueDate => {
                self.due_date_state.start_editing();
                String::new()
            }
            FormField::Items => {
                if form.items().is_empty() {
                    return;
                }
                if self.selected_item.is_none() {
                    self.selected_item = Some(0);
                }
                String::new()
            }
            FormField::ItemName => form.draft.name.clone(),
            FormField::Quantity => format_number(form.draft.quantity),
            FormField::Price => format_number(form.draft.price),
            FormField::Template => return,
            other => other
                .invoice_field()
                .map(|field| form.field(field).to_string())
                .unwrap_or_default(),
        };
        self.editing = true;
    }

    fn cancel_editing(&mut self, form: &InvoiceForm) {
        self.editing = false;
        self.active_input.clear();
        self.due_date_state = DateInputState::new(form.field(Field::DueDate));
    }

    fn commit_editing<S: KeyValueStore>(&mut self, session: &mut InvoiceSession<S>) {
        let input = std::mem::take(&mut self.active_input);
        match self.current_field {
            FormField::DueDate => {
                self.due_date_state.stop_editing();
                session.update_field(Field::DueDate, self.due_date_state.value());
            }
            FormField::ItemName => session.form_mut().draft.name = input,
            FormField::Quantity => session.form_mut().draft.quantity = parse_number(&input),
            FormField::Price => session.form_mut().draft.price = parse_number(&input),
            FormField::Items | FormField::Template => {}
            other => {
                if let Some(field) = other.invoice_field() {
                    session.update_field(field, input);
                }
            }
        }
        self.editing = false;
    }

    fn edit_input(&mut self, key: KeyCode) {
        let numeric = matches!(self.current_field, FormField::Quantity | FormField::Price);
        match key {
            KeyCode::Char(c) if !numeric || c.is_ascii_digit() || c == '.' => {
                self.active_input.push(c);
            }
            KeyCode::Backspace => {
                self.active_input.pop();
            }
            _ => {}
        }
    }

    fn select_next(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let i = match self.selected_item {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.selected_item = Some(i);
    }

    fn select_previous(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let i = match self.selected_item {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.selected_item = Some(i);
    }

    fn remove_selected<S: KeyValueStore>(&mut self, session: &mut InvoiceSession<S>) {
        let Some(selected) = self.selected_item else {
            return;
        };
        let Some(id) = session.form().items().get(selected).map(|item| item.id) else {
            return;
        };
        session.remove_item(id);

        // Adjust selection after deletion
        let len = session.form().items().len();
        self.selected_item = if len == 0 {
            self.editing = false;
            None
        } else {
            Some(selected.min(len - 1))
        };
    }

    fn reset(&mut self, form: &InvoiceForm) {
        *self = Self {
            current_field: self.current_field,
            ..Self::new(form)
        };
    }
}

fn format_number(value: f64) -> String {
    if value == 0.0 { String::new() } else { value.to_string() }
}

// An empty or unparsable number counts as zero, which the add check rejects
fn parse_number(input: &str) -> f64 {
    input.trim().parse().unwrap_or(0.0)
}

fn accent_color(template: Template) -> Color {
    match template {
        Template::Basic => Color::Cyan,
        Template::Modern => Color::Magenta,
    }
}

fn framed(template: Template) -> Block<'static> {
    let block = Block::default().borders(Borders::ALL);
    match template {
        Template::Basic => block,
        Template::Modern => block
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(accent_color(template))),
    }
}

pub fn render_invoice_form<B: Backend>(frame: &mut Frame<B>, state: &InvoiceFormState, form: &InvoiceForm) {
    let template = form.template();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),  // Title
                Constraint::Min(12),    // Form and preview
                Constraint::Length(3),  // Help
            ]
            .as_ref(),
        )
        .split(frame.size());

    let mut title = vec![Span::styled(
        "Invoice App",
        Style::default().fg(accent_color(template)).add_modifier(Modifier::BOLD),
    )];
    let logo_url = form.field(Field::LogoUrl);
    if !logo_url.is_empty() {
        title.push(Span::styled(format!("  [logo: {}]", logo_url), Style::default().fg(Color::Gray)));
    }
    frame.render_widget(Paragraph::new(Spans::from(title)).block(framed(template)), chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)].as_ref())
        .split(chunks[1]);
    render_fields(frame, state, form, body[0]);
    render_preview(frame, state, form, body[1]);

    let (help_text, help_style) = if state.confirm_clear {
        ("Clear the whole invoice? y - Yes | any other key - No", Style::default().fg(Color::Red))
    } else {
        let text = match (state.editing, state.current_field) {
            (false, _) => "Enter - Edit | Up/Down - Navigate | A - Add item | T - Template | C - Clear | P - Print | Q - Quit",
            (true, FormField::DueDate) => "Enter - Save | Left/Right - Switch date part | Del - No date | Esc - Cancel",
            (true, FormField::Items) => "Up/Down - Select | D - Remove selected | Enter/Esc - Done",
            (true, FormField::Notes) => "Enter - Save | Alt+Enter/Ctrl+J - New line | Esc - Cancel",
            (true, _) => "Enter - Save field | Tab - Save and next | Esc - Cancel",
        };
        (text, Style::default().fg(Color::Gray))
    };

    let mut help_block = Block::default().borders(Borders::ALL);
    if let Some(status) = &state.status {
        help_block = help_block.title(Span::styled(status.clone(), Style::default().fg(Color::Green)));
    }
    frame.render_widget(Paragraph::new(help_text).style(help_style).block(help_block), chunks[2]);
}

fn render_fields<B: Backend>(frame: &mut Frame<B>, state: &InvoiceFormState, form: &InvoiceForm, area: Rect) {
    let lines = FIELDS
        .iter()
        .map(|&field| {
            let current = field == state.current_field;
            let label_style = if current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let value = if current && state.editing {
                match field {
                    FormField::DueDate => state.due_date_state.get_display_string(),
                    FormField::Items => format!("{} item(s), selecting", form.items().len()),
                    _ => format!("{}|", state.active_input.replace('\n', " / ")),
                }
            } else {
                display_value(field, form)
            };

            Spans::from(vec![
                Span::styled(format!("{}: ", field.label()), label_style),
                Span::raw(value),
            ])
        })
        .collect::<Vec<_>>();

    let fields = Paragraph::new(lines).block(framed(form.template()).title("Details"));
    frame.render_widget(fields, area);
}

fn display_value(field: FormField, form: &InvoiceForm) -> String {
    match field {
        FormField::Template => form.template().label().to_string(),
        FormField::ItemName => form.draft.name.clone(),
        FormField::Quantity => form.draft.quantity.to_string(),
        FormField::Price => format!("{:.2}", form.draft.price),
        FormField::Items => format!("{} item(s)", form.items().len()),
        FormField::Notes => form.field(Field::Notes).replace('\n', " / "),
        other => other
            .invoice_field()
            .map(|f| form.field(f).to_string())
            .unwrap_or_default(),
    }
}

fn render_preview<B: Backend>(frame: &mut Frame<B>, state: &InvoiceFormState, form: &InvoiceForm, area: Rect) {
    let template = form.template();
    let accent = accent_color(template);
    let block = framed(template).title(match template {
        Template::Basic => "Invoice",
        Template::Modern => "Invoice (modern)",
    });
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let header = [
        ("Client", form.field(Field::ClientName)),
        ("Invoice #", form.field(Field::InvoiceNumber)),
        ("Due Date", form.field(Field::DueDate)),
    ]
    .into_iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(label, value)| {
        Spans::from(vec![
            Span::styled(format!("{}: ", label), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(value.to_string()),
        ])
    })
    .collect::<Vec<_>>();

    let notes = form.field(Field::Notes);
    let notes_height = if notes.is_empty() {
        0
    } else {
        (notes.lines().count() as u16 + 1).min(6)
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(header.len() as u16),
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(notes_height),
            ]
            .as_ref(),
        )
        .split(inner);

    frame.render_widget(Paragraph::new(header), chunks[0]);

    let selected = if state.current_field == FormField::Items {
        state.selected_item
    } else {
        None
    };
    let highlight = Style::default().bg(Color::Blue).fg(Color::White);

    match template {
        Template::Basic => {
            let items = if form.items().is_empty() {
                vec![ListItem::new("No line items added yet")]
            } else {
                form.items()
                    .iter()
                    .map(|item| {
                        ListItem::new(format!("{} – {} × ${:.2}", item.name, item.quantity, item.price))
                    })
                    .collect()
            };
            let mut list_state = ListState::default();
            list_state.select(selected);
            let list = List::new(items).highlight_style(highlight);
            frame.render_stateful_widget(list, chunks[1], &mut list_state);
        }
        Template::Modern => {
            let header_row = Row::new(vec!["Item", "Qty", "Price", "Amount"])
                .style(Style::default().fg(accent).add_modifier(Modifier::BOLD));
            let rows = form
                .items()
                .iter()
                .map(|item| {
                    Row::new(vec![
                        Cell::from(item.name.clone()),
                        Cell::from(item.quantity.to_string()),
                        Cell::from(format!("${:.2}", item.price)),
                        Cell::from(format!("${:.2}", item.amount())),
                    ])
                })
                .collect::<Vec<_>>();
            let widths = [
                Constraint::Percentage(40),
                Constraint::Percentage(15),
                Constraint::Percentage(20),
                Constraint::Percentage(25),
            ];
            let mut table_state = TableState::default();
            table_state.select(selected);
            let table = Table::new(rows)
                .header(header_row)
                .widths(&widths)
                .highlight_style(highlight);
            frame.render_stateful_widget(table, chunks[1], &mut table_state);
        }
    }

    let total = Paragraph::new(Spans::from(Span::styled(
        format!("Total: ${:.2}", form.total()),
        Style::default().fg(accent).add_modifier(Modifier::BOLD),
    )))
    .alignment(match template {
        Template::Basic => Alignment::Left,
        Template::Modern => Alignment::Right,
    });
    frame.render_widget(total, chunks[2]);

    if !notes.is_empty() {
        let mut lines = vec![Spans::from(Span::styled("Notes:", Style::default().add_modifier(Modifier::BOLD)))];
        lines.extend(notes.lines().map(|line| Spans::from(line.to_string())));
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), chunks[3]);
    }
}

// Alt+Enter, or Ctrl+J for terminals that swallow Alt
fn is_newline(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Enter => key.modifiers.contains(KeyModifiers::ALT),
        KeyCode::Char('j') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Apply one key press to the form
pub fn handle_key<S: KeyValueStore>(
    state: &mut InvoiceFormState,
    session: &mut InvoiceSession<S>,
    key: impl Into<KeyEvent>,
) -> Option<InvoiceFormAction> {
    let event = key.into();
    let key = event.code;
    state.status = None;

    if state.confirm_clear {
        state.confirm_clear = false;
        if matches!(key, KeyCode::Char('y') | KeyCode::Char('Y')) {
            session.clear();
            state.reset(session.form());
            state.set_status("Invoice cleared");
        }
        return None;
    }

    if state.editing {
        if state.current_field == FormField::Notes && is_newline(&event) {
            state.active_input.push('\n');
            return None;
        }

        match (key, state.current_field) {
            (KeyCode::Enter | KeyCode::Esc, FormField::Items) => state.editing = false,
            (KeyCode::Esc, _) => state.cancel_editing(session.form()),
            (KeyCode::Enter, _) => state.commit_editing(session),
            (KeyCode::Tab, _) => {
                state.commit_editing(session);
                state.next_field();
            }
            (_, FormField::DueDate) => state.due_date_state.handle_input(key),
            (KeyCode::Up, FormField::Items) => state.select_previous(session.form().items().len()),
            (KeyCode::Down, FormField::Items) => state.select_next(session.form().items().len()),
            (KeyCode::Char('d') | KeyCode::Delete, FormField::Items) => state.remove_selected(session),
            (_, FormField::Items) => {}
            _ => state.edit_input(key),
        }
        return None;
    }

    match key {
        KeyCode::Char('q') | KeyCode::Esc => return Some(InvoiceFormAction::Quit),
        KeyCode::Char('p') => return Some(InvoiceFormAction::Print),
        KeyCode::Char('a') => {
            if session.add_draft_item() {
                state.selected_item = Some(session.form().items().len() - 1);
            }
        }
        KeyCode::Char('t') => {
            let template = session.form().template().toggle();
            session.set_template(template);
        }
        KeyCode::Char('c') => state.confirm_clear = true,
        KeyCode::Char('d') | KeyCode::Delete if state.current_field == FormField::Items => {
            state.remove_selected(session);
        }
        KeyCode::Up | KeyCode::BackTab => state.previous_field(),
        KeyCode::Down | KeyCode::Tab => state.next_field(),
        KeyCode::Enter if state.current_field == FormField::Template => {
            let template = session.form().template().toggle();
            session.set_template(template);
        }
        KeyCode::Enter => state.start_editing(session.form()),
        _ => {}
    }

    None
}

pub fn handle_input<S: KeyValueStore>(
    state: &mut InvoiceFormState,
    session: &mut InvoiceSession<S>,
) -> Result<Option<InvoiceFormAction>> {
    if let Event::Key(key) = event::read()? {
        if key.kind == KeyEventKind::Press {
            return Ok(handle_key(state, session, key));
        }
    }

    Ok(None)
}
