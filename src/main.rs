//! Factbot — entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI args
//!   3. Load config
//!   4. Resolve effective log level (CLI `-v` flags > env > config)
//!   5. Init logger once
//!   6. Build the corpus store (eager load for bundled data)
//!   7. Spawn Ctrl-C → shutdown signal watcher
//!   8. Run comms channels until shutdown

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use factbot::corpus::CorpusStore;
use factbot::error::AppError;
use factbot::{comms, config, logger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let mut config = config::load(args.config_path.as_deref())?;

    // Without -i, the console channel stays off (daemon-safe default).
    if !args.interactive {
        config.comms.pty.enabled = false;
    }

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some())?;

    info!(
        bot_name = %config.bot_name,
        corpus_source = %config.corpus.source,
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        interactive = %args.interactive,
        "config loaded"
    );

    let store = Arc::new(CorpusStore::new(config.corpus.to_source()));

    // Bundled data loads eagerly so a data bug fails the process at startup.
    // A remote corpus is fetched lazily, memoized on first success.
    if config.corpus.is_remote() {
        if let Some(url) = &config.corpus.url {
            info!(%url, "remote corpus — fetch deferred to first query");
        }
    } else {
        let corpus = store.get().await?;
        info!(
            facts = corpus.len(),
            categories = corpus.categories().len(),
            "bundled corpus ready"
        );
    }

    // Shared shutdown token — Ctrl-C cancels it, all channels watch it.
    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    print_startup_summary(&config, &store, args.interactive);

    let comms = comms::start(&config, store, shutdown.clone());
    comms.join().await?;

    // If comms exited on its own (EOF, error), still signal everything to stop.
    shutdown.cancel();

    // In interactive mode, print a clean exit line so the shell prompt
    // appears below the tracing output. In daemon mode, exit silently.
    if args.interactive {
        use std::io::Write as _;
        println!("\nBye :) ...");
        let _ = std::io::stdout().flush();
    }

    Ok(())
}

fn print_startup_summary(config: &config::Config, store: &CorpusStore, interactive: bool) {
    let fit = |text: String| -> String {
        const WIDTH: usize = 50;
        let char_count = text.chars().count();
        if char_count >= WIDTH {
            let mut out = text.chars().take(WIDTH - 1).collect::<String>();
            out.push('…');
            out
        } else {
            format!("{text:<WIDTH$}")
        }
    };

    let corpus_line = match store.cached() {
        Some(corpus) => format!(
            "{} facts, {} categories ({})",
            corpus.len(),
            corpus.categories().len(),
            config.corpus.source
        ),
        None => format!("{} (deferred)", config.corpus.source),
    };

    let mut comms_lines = Vec::new();

    #[cfg(feature = "channel-pty")]
    {
        let status = if config.comms.pty.enabled { "enabled" } else { "disabled" };
        comms_lines.push(format!("⌨️  pty: {status}"));
    }

    #[cfg(feature = "channel-telegram")]
    {
        let status = if config.comms.telegram.enabled { "enabled" } else { "disabled" };
        comms_lines.push(format!("✈️  telegram: {status}"));
    }

    #[cfg(feature = "channel-axum")]
    {
        if config.comms.http.enabled {
            comms_lines.push(format!("🌐 http: {}", config.comms.http.bind));
        } else {
            comms_lines.push("🌐 http: disabled".to_string());
        }
    }

    let mode_text = if interactive { "interactive" } else { "daemon" };

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║ 🤖 Factbot Status                                    ║");
    println!("╟──────────────────────────────────────────────────────╢");
    println!("║ 🧾 Bot: {}║", fit(format!("{} v{}", config.bot_name, env!("CARGO_PKG_VERSION"))));
    println!("║ 🧠 PID: {}║", fit(std::process::id().to_string()));
    println!("║ 🛰️  Mode: {}║", fit(mode_text.to_string()));
    println!("╟──────────────────────────────────────────────────────╢");
    println!("║ 📚 Corpus                                            ║");
    println!("║   {}║", fit(corpus_line));
    println!("╟──────────────────────────────────────────────────────╢");
    println!("║ 📡 Comms                                             ║");
    for line in comms_lines {
        println!("║   {}║", fit(line));
    }
    println!("╚══════════════════════════════════════════════════════╝");

    if interactive {
        println!("💡 Type /start for the command list");
    }
}

struct CliArgs {
    log_level: Option<&'static str>,
    interactive: bool,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut interactive = false;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: factbot [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -i, --interactive          Run in interactive mode (enables console channel)");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-i" | "--interactive" => interactive = true,
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    // Each -v raises verbosity one tier from the config default:
    //   -v      → warn   (suppress info noise, show warnings+errors only)
    //   -vv     → info   (normal operational output — the typical default)
    //   -vvv    → debug  (flow-level diagnostics: routing, channel lifecycle)
    //   -vvvv+  → trace  (full payload dumps, very verbose)
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, interactive, config_path }
}
