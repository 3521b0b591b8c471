use anyhow::Result;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

use crate::models::{InvoiceSnapshot, Template};

/// Files produced by one export
#[derive(Debug)]
pub struct ExportedInvoice {
    pub markdown: PathBuf,
    pub pdf: Option<PathBuf>,
}

impl ExportedInvoice {
    /// The most print-ready file that was produced
    pub fn best(&self) -> &Path {
        self.pdf.as_deref().unwrap_or(&self.markdown)
    }
}

/// Renders the invoice to Markdown and, when pandoc is installed, to PDF.
/// This is the application's print facility.
pub struct InvoiceGenerator {
    output_dir: PathBuf,
}

impl InvoiceGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        if !output_dir.exists() {
            fs::create_dir_all(&output_dir)?;
        }

        Ok(Self { output_dir })
    }

    pub fn generate_invoice(&self, invoice: &InvoiceSnapshot) -> Result<ExportedInvoice> {
        let markdown = generate_markdown(invoice);

        let stem = format!("invoice_{}", file_stem(&invoice.invoice_number));
        let md_path = self.output_dir.join(format!("{stem}.md"));
        let pdf_path = self.output_dir.join(format!("{stem}.pdf"));

        fs::write(&md_path, markdown)?;
        info!(path = %md_path.display(), "Invoice exported");

        let pdf = match Command::new("pandoc").arg(&md_path).arg("-o").arg(&pdf_path).output() {
            Ok(output) if output.status.success() => Some(pdf_path),
            Ok(output) => {
                let error = String::from_utf8_lossy(&output.stderr);
                warn!(error = %error.trim(), "pandoc failed, keeping Markdown only");
                None
            }
            Err(err) => {
                warn!(error = %err, "Could not run pandoc, keeping Markdown only");
                None
            }
        };

        Ok(ExportedInvoice {
            markdown: md_path,
            pdf,
        })
    }
}

fn file_stem(invoice_number: &str) -> String {
    let stem: String = invoice_number
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if stem.is_empty() { "draft".to_string() } else { stem }
}

/// Markdown for the invoice in its selected template
pub fn generate_markdown(invoice: &InvoiceSnapshot) -> String {
    let mut content = String::new();

    if invoice.template == Template::Modern {
        content.push_str("<hr style=\"height: 5px; background-color: #343876; border: none;\">\n\n");
    }

    if !invoice.logo_url.is_empty() {
        let _ = writeln!(content, "![Logo]({})\n", invoice.logo_url);
    }

    content.push_str("# Invoice\n\n");

    let header = [
        ("Client", &invoice.client_name),
        ("Invoice #", &invoice.invoice_number),
        ("Due Date", &invoice.due_date),
    ];
    for (label, value) in header.iter().filter(|(_, value)| !value.is_empty()) {
        let _ = writeln!(content, "**{label}:** {value}  ");
    }
    content.push('\n');

    match invoice.template {
        Template::Basic => {
            for item in &invoice.items {
                let _ = writeln!(content, "- {} – {} × ${:.2}", item.name, item.quantity, item.price);
            }
            let _ = writeln!(content, "\n## Total: ${:.2}\n", invoice.total());
        }
        Template::Modern => {
            content.push_str("| Item | Qty | Price | Amount |\n");
            content.push_str("|:-----|----:|------:|-------:|\n");
            for item in &invoice.items {
                let _ = writeln!(
                    content,
                    "| {} | {} | ${:.2} | ${:.2} |",
                    item.name,
                    item.quantity,
                    item.price,
                    item.amount()
                );
            }
            let _ = writeln!(
                content,
                "\n<h2 style=\"text-align: right; color: #e83e8c;\">Total: ${:.2}</h2>\n",
                invoice.total()
            );
        }
    }

    if !invoice.notes.is_empty() {
        let _ = writeln!(content, "**Notes:**\n\n{}", invoice.notes);
    }

    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;
    use tempfile::tempdir;

    fn invoice(template: Template) -> InvoiceSnapshot {
        InvoiceSnapshot {
            items: vec![
                LineItem { id: 1, name: "Consulting".into(), quantity: 3.0, price: 50.0 },
                LineItem { id: 2, name: "Travel".into(), quantity: 1.0, price: 20.5 },
            ],
            client_name: "Acme".into(),
            invoice_number: "INV 42/a".into(),
            template,
            ..Default::default()
        }
    }

    #[test]
    fn basic_template_lists_items() {
        let markdown = generate_markdown(&invoice(Template::Basic));
        assert!(markdown.contains("- Consulting – 3 × $50.00"));
        assert!(markdown.contains("## Total: $170.50"));
        assert!(markdown.contains("**Client:** Acme"));
        assert!(!markdown.contains("Due Date"));
        assert!(!markdown.contains("| Item |"));
    }

    #[test]
    fn modern_template_uses_table() {
        let markdown = generate_markdown(&invoice(Template::Modern));
        assert!(markdown.contains("| Item | Qty | Price | Amount |"));
        assert!(markdown.contains("| Consulting | 3 | $50.00 | $150.00 |"));
        assert!(markdown.contains("Total: $170.50"));
    }

    #[test]
    fn optional_sections_follow_fields() {
        let mut snapshot = InvoiceSnapshot::default();
        let markdown = generate_markdown(&snapshot);
        assert!(!markdown.contains("![Logo]"));
        assert!(!markdown.contains("Notes"));
        assert!(markdown.contains("Total: $0.00"));

        snapshot.logo_url = "https://example.com/logo.png".into();
        snapshot.notes = "Net 30".into();
        let markdown = generate_markdown(&snapshot);
        assert!(markdown.contains("![Logo](https://example.com/logo.png)"));
        assert!(markdown.contains("**Notes:**\n\nNet 30"));
    }

    #[test]
    fn writes_markdown_named_after_invoice_number() {
        let dir = tempdir().unwrap();
        let generator = InvoiceGenerator::new(dir.path().join("out")).unwrap();

        let exported = generator.generate_invoice(&invoice(Template::Basic)).unwrap();
        assert_eq!(exported.markdown, dir.path().join("out").join("invoice_INV42a.md"));
        let written = fs::read_to_string(&exported.markdown).unwrap();
        assert!(written.contains("Consulting"));
    }

    #[test]
    fn unnamed_invoice_exports_as_draft() {
        assert_eq!(file_stem(""), "draft");
        assert_eq!(file_stem("///"), "draft");
        assert_eq!(file_stem("INV-7_b"), "INV-7_b");
    }
}
