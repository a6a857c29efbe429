use clap::Parser;
use ev_permit::{PermitClient, PermitInfoState};
use std::io::{self, Write};
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about = "Ask a running permit server whether an EV charger install needs a permit", long_about = None)]
#[command(after_help = "EXAMPLES:
    permit-check \"1600 Amphitheatre Parkway, Mountain View, CA\"
    permit-check --server http://localhost:8080 \"350 5th Ave, New York, NY\"")]
struct Args {
    /// Street address of the installation
    address: String,

    /// Base URL of the permit server
    #[arg(short, long, default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Prints state updates to the terminal. Each update carries the whole answer,
/// so only the part not yet on screen is written.
#[derive(Default)]
struct TerminalView {
    header_shown: bool,
    printed: usize,
}

impl TerminalView {
    fn render(&mut self, out: &mut impl Write, state: &PermitInfoState) -> io::Result<()> {
        if !self.header_shown {
            writeln!(out, "Location Details")?;
            writeln!(out, "  City:     {}", state.city)?;
            writeln!(out, "  Township: {}", state.township)?;
            writeln!(out, "  County:   {}", state.county)?;
            writeln!(out)?;
            writeln!(out, "Permit Information")?;
            self.header_shown = true;
        }
        match state.permit_info.get(self.printed..) {
            Some(rest) => write!(out, "{rest}")?,
            // the answer no longer extends what is on screen; show it again
            None => write!(out, "\n{}", state.permit_info)?,
        }
        self.printed = state.permit_info.len();
        out.flush()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        let _ = dotenvy::dotenv();
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "ev_permit=debug".into()),
            )
            .with_writer(io::stderr)
            .init();
    }

    let client = PermitClient::new(args.server);
    let mut view = TerminalView::default();
    let mut render_error = None;
    let outcome = client
        .submit(&args.address, |state| {
            if render_error.is_none() {
                render_error = view.render(&mut io::stdout().lock(), state).err();
            }
        })
        .await;
    if let Some(err) = render_error {
        eprintln!("Error: could not write to terminal: {err}");
        return ExitCode::FAILURE;
    }
    println!();

    match outcome.error {
        Some(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
        None => ExitCode::SUCCESS,
    }
}
