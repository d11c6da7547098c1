use std::error::Error;
use std::io::{BufRead, Write};

use relay::config::load_dotenv;
use relay::{BANNER, Flow, RelayConfig, Repl, build_runtime};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let config = RelayConfig::from_args()?;
    let runtime = build_runtime(&config).await?;
    for failure in &runtime.connections.failures {
        eprintln!(
            "❌ Error connecting to {}: {}",
            failure.server, failure.error.message
        );
    }
    for report in &runtime.connections.reports {
        for failure in &report.failures {
            eprintln!(
                "❌ {} ({}): {}",
                report.backend, failure.category, failure.error.message
            );
        }
    }

    let repl = Repl::from_runtime(&runtime);
    let mut stdout = std::io::stdout();
    writeln!(stdout, "\n{BANNER}")?;

    let mut lines = spawn_line_reader();
    loop {
        write!(stdout, "\nQuery: ")?;
        stdout.flush()?;

        let line = tokio::select! {
            line = lines.recv() => line,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        // Ctrl-C abandons the running turn without recording it.
        let flow = tokio::select! {
            flow = repl.handle_line(&line, &mut stdout) => flow?,
            _ = tokio::signal::ctrl_c() => {
                writeln!(std::io::stdout(), "\n❌ Interrupted.")?;
                Flow::Continue
            }
        };
        if flow == Flow::Quit {
            break;
        }
    }

    writeln!(stdout)?;
    Ok(())
}

/// Reads stdin on a dedicated thread so a pending read never blocks shutdown.
fn spawn_line_reader() -> mpsc::Receiver<String> {
    let (sender, receiver) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if sender.blocking_send(line).is_err() {
                break;
            }
        }
    });
    receiver
}
