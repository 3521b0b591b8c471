use chrono::{Datelike, Local, NaiveDate};
use crossterm::event::KeyCode;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

/// Segmented year/month/day editor for an optional date
pub struct DateInputState {
    pub date: Option<NaiveDate>,
    pub editing: bool,
    pub date_part: DatePart,
    pub current_date_input: String,
}

impl DateInputState {
    /// Start from an ISO `YYYY-MM-DD` value; anything else is treated as no date.
    pub fn new(value: &str) -> Self {
        Self {
            date: NaiveDate::parse_from_str(value, "%Y-%m-%d").ok(),
            editing: false,
            date_part: DatePart::Year,
            current_date_input: String::new(),
        }
    }

    /// ISO string for the current date, empty when unset.
    pub fn value(&self) -> String {
        self.date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    pub fn start_editing(&mut self) {
        self.editing = true;
        self.date_part = DatePart::Year;
        self.current_date_input.clear();
        if self.date.is_none() {
            self.date = Some(Local::now().date_naive());
        }
    }

    pub fn stop_editing(&mut self) {
        self.editing = false;
        self.current_date_input.clear();
    }

    pub fn next_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Year => DatePart::Month,
            DatePart::Month => DatePart::Day,
            DatePart::Day => DatePart::Year,
        };
        self.current_date_input.clear();
    }

    pub fn previous_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Year => DatePart::Day,
            DatePart::Month => DatePart::Year,
            DatePart::Day => DatePart::Month,
        };
        self.current_date_input.clear();
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => self.push_digit(c),
            KeyCode::Backspace => {
                self.current_date_input.pop();
            }
            KeyCode::Delete => {
                self.date = None;
                self.current_date_input.clear();
            }
            KeyCode::Right => self.next_date_part(),
            KeyCode::Left => self.previous_date_part(),
            _ => {}
        }
    }

    fn push_digit(&mut self, c: char) {
        let date = *self.date.get_or_insert_with(|| Local::now().date_naive());
        self.current_date_input.push(c);

        let width = match self.date_part {
            DatePart::Year => 4,
            DatePart::Month | DatePart::Day => 2,
        };
        if self.current_date_input.len() < width {
            return;
        }

        let (year, month, day) = (date.year(), date.month(), date.day());
        let updated = match (self.date_part, self.current_date_input.parse::<u32>()) {
            (DatePart::Year, Ok(y)) if (1900..=2100).contains(&y) => {
                clamped_date(y as i32, month, day)
            }
            (DatePart::Month, Ok(m)) if (1..=12).contains(&m) => clamped_date(year, m, day),
            (DatePart::Day, Ok(d)) => NaiveDate::from_ymd_opt(year, month, d),
            _ => None,
        };
        if let Some(updated) = updated {
            self.date = Some(updated);
        }
        self.current_date_input.clear();
    }

    pub fn get_display_string(&self) -> String {
        let Some(date) = self.date else {
            return if self.editing { "[YYYY]-MM-DD".to_string() } else { String::new() };
        };
        let (year, month, day) = (
            format!("{:04}", date.year()),
            format!("{:02}", date.month()),
            format!("{:02}", date.day()),
        );

        if !self.editing {
            return format!("{}-{}-{}", year, month, day);
        }

        let current_input = if !self.current_date_input.is_empty() {
            format!("[{}]", self.current_date_input)
        } else {
            match self.date_part {
                DatePart::Year => "[YYYY]".to_string(),
                DatePart::Month => "[MM]".to_string(),
                DatePart::Day => "[DD]".to_string(),
            }
        };

        match self.date_part {
            DatePart::Year => format!("{}{}-{}-{}", year, current_input, month, day),
            DatePart::Month => format!("{}-{}{}-{}", year, month, current_input, day),
            DatePart::Day => format!("{}-{}-{}{}", year, month, day, current_input),
        }
    }
}

// Keep the day inside the target month, e.g. Jan 31 -> Feb 28
fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    (1..=day)
        .rev()
        .find_map(|d| NaiveDate::from_ymd_opt(year, month, d))
}
