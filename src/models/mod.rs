mod invoice;
mod line_item;

pub use invoice::{InvoiceSnapshot, Template};
pub use line_item::LineItem;
