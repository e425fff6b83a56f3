use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use codeblue_core::{
    export_csv, export_filename, logs_to_xml, Console, Dispatcher, History, Interpreter,
};
use codeblue_store::EventStore;
use codeblue_timer::TimerService;

const BANNER: &str = "ACLS Assistant CLI\n輸入 'help' 查看可用指令。";
const HELP: &str = "可用指令:\n  show logs | 顯示記錄\n  export logs | 匯出紀錄\n  exit";

#[derive(Parser)]
#[command(name = "codeblue", version, about = "ACLS resuscitation event recorder")]
struct Cli {
    #[arg(
        long,
        default_value = "~/.codeblue",
        help = "Data root directory (contains data/ and logs/)"
    )]
    data_dir: PathBuf,

    #[arg(long, default_value = "gpt-4o-mini", help = "Interpretation model")]
    model: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Expand ~ to home directory
    if cli.data_dir.starts_with("~") {
        if let Some(home) = std::env::var_os("HOME") {
            cli.data_dir =
                PathBuf::from(home).join(cli.data_dir.strip_prefix("~").unwrap_or(&cli.data_dir));
        }
    }

    let log_dir = cli.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "codeblue.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    let db_path = cli.data_dir.join("data/codeblue.db");
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Store trouble at startup is the one fatal error; a fresh session
    // always begins with an empty log.
    let store = EventStore::open(&db_path)?;
    let cleared = store.clear().await?;
    if cleared > 0 {
        tracing::info!(events = cleared, "previous session log cleared");
    }

    let interpreter = Interpreter::from_env(&cli.model);
    let timers = TimerService::new();
    let console = Console::stdout();
    let dispatcher = Dispatcher::new(
        store.clone(),
        timers,
        interpreter,
        console.clone(),
    );
    let mut history = History::new();

    console.line(BANNER);
    run_loop(&dispatcher, &store, &console, &mut history).await;

    Ok(())
}

async fn run_loop(
    dispatcher: &Dispatcher,
    store: &EventStore,
    console: &Console,
    history: &mut History,
) {
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let line = tokio::select! {
            line = read_line() => line,
            _ = tokio::signal::ctrl_c() => {
                console.line("\nKeyboardInterrupt, bye");
                break;
            }
        };
        let Some(line) = line else {
            console.line("bye");
            break;
        };

        let input = line.trim().to_string();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit" | "q") {
            console.line("bye");
            break;
        }
        if matches!(input.as_str(), "help" | "h" | "?") {
            console.line(HELP);
            continue;
        }

        dispatcher.handle_input(&input, history).await;

        // Display and export match on the raw input prefix, regardless of
        // what intent the dispatcher just applied.
        if input.starts_with("show logs") || input.starts_with("顯示記錄") {
            match store.list(1000).await {
                Ok(events) => console.line(&logs_to_xml(&events)),
                Err(e) => console.line(&format!("讀取紀錄失敗: {e}")),
            }
        }
        if input.starts_with("export logs") || input.starts_with("匯出紀錄") {
            match store.list(1000).await {
                Ok(events) => {
                    let filename = export_filename();
                    match export_csv(&events, std::path::Path::new(&filename)) {
                        Ok(()) => console.line(&format!("已匯出紀錄到 {filename}")),
                        Err(e) => console.line(&format!("匯出紀錄失敗: {e}")),
                    }
                }
                Err(e) => console.line(&format!("讀取紀錄失敗: {e}")),
            }
        }
    }
}

/// One line from stdin off the runtime; None on EOF or read error.
async fn read_line() -> Option<String> {
    tokio::task::spawn_blocking(|| {
        let mut buf = String::new();
        match std::io::stdin().read_line(&mut buf) {
            Ok(0) => None,
            Ok(_) => Some(buf),
            Err(_) => None,
        }
    })
    .await
    .ok()
    .flatten()
}
