mod config;
mod form;
mod invoice_gen;
mod models;
mod session;
mod storage;
mod ui;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::config::Config;
use crate::invoice_gen::{ExportedInvoice, InvoiceGenerator};
use crate::models::InvoiceSnapshot;
use crate::session::InvoiceSession;
use crate::storage::{FileStore, InvoiceMirror, KeyValueStore};
use crate::ui::invoice_form::{
    handle_input, render_invoice_form, InvoiceFormAction, InvoiceFormState,
};

/// Build, save and print a single invoice from the terminal
#[derive(Parser, Debug)]
#[command(name = "invoice-builder", version)]
struct Args {
    /// File backing the invoice store [env: INVOICE_STORE_PATH]
    #[arg(long)]
    store: Option<PathBuf>,
    /// Directory for printed invoices [env: INVOICE_EXPORT_DIR]
    #[arg(long)]
    export_dir: Option<PathBuf>,
    /// Log file [env: INVOICE_LOG_FILE]
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Print the saved invoice and exit
    #[arg(long)]
    print: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(store) = &self.store {
            config.store_path = store.clone();
        }
        if let Some(export_dir) = &self.export_dir {
            config.export_dir = export_dir.clone();
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = log_file.clone();
        }
    }
}

// Main application state
struct AppState<S> {
    session: InvoiceSession<S>,
    form_state: InvoiceFormState,
    export_dir: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration, flags win over the environment
    let mut config = config::init()?;
    args.apply(&mut config);
    init_logging(&config.log_file)?;

    let store = FileStore::new(&config.store_path);
    info!(store = %store.path().display(), "Starting invoice builder");

    let mut session = InvoiceSession::new(InvoiceMirror::new(store));
    session.hydrate();
    info!(phase = ?session.phase(), "Session ready");

    if args.print {
        let exported = print_invoice(&config.export_dir, session.form().snapshot())?;
        println!("Invoice written to {}", exported.best().display());
        return Ok(());
    }

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let form_state = InvoiceFormState::new(session.form());
    let mut app_state = AppState {
        session,
        form_state,
        export_dir: config.export_dir.clone(),
    };

    let result = run_app(&mut terminal, &mut app_state);

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        println!("Error: {}", err);
    }

    println!("Thanks for using Invoice Builder!");

    Ok(())
}

fn run_app<B: Backend, S: KeyValueStore>(terminal: &mut Terminal<B>, app_state: &mut AppState<S>) -> Result<()> {
    loop {
        terminal.draw(|f| render_invoice_form(f, &app_state.form_state, app_state.session.form()))?;

        match handle_input(&mut app_state.form_state, &mut app_state.session)? {
            Some(InvoiceFormAction::Quit) => break,
            Some(InvoiceFormAction::Print) => {
                match print_invoice(&app_state.export_dir, app_state.session.form().snapshot()) {
                    Ok(exported) => app_state
                        .form_state
                        .set_status(format!("Exported to {}", exported.best().display())),
                    Err(err) => {
                        warn!(error = %err, "Export failed");
                        app_state.form_state.set_status("Export failed, see log");
                    }
                }
            }
            None => {}
        }
    }

    info!("Exiting");
    Ok(())
}

fn print_invoice(export_dir: &Path, invoice: &InvoiceSnapshot) -> Result<ExportedInvoice> {
    InvoiceGenerator::new(export_dir)?.generate_invoice(invoice)
}

// The terminal belongs to the UI, so logs go to a file
fn init_logging(log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
