use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncBufReadExt;

use coplan_agent::{HttpLlmClient, PlanGenerator, SessionRuntime};
use coplan_core::config::{AppConfig, LoadOptions};
use coplan_core::domain::WizardContext;
use coplan_core::engine::TurnReply;
use coplan_db::{connect, migrations, ProjectStore, SqlProjectStore};

use crate::commands::CommandResult;

type SessionFailure = (&'static str, String, u8);

pub fn run(
    project: &str,
    config_path: Option<PathBuf>,
    grade_level: Option<String>,
    subjects: Vec<String>,
    duration: Option<String>,
) -> CommandResult {
    let config = match AppConfig::load(LoadOptions { config_path, ..LoadOptions::default() }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let wizard = WizardContext {
        grade_level: grade_level.unwrap_or_default(),
        subjects,
        duration: duration.unwrap_or_default(),
        ..WizardContext::default()
    };

    match runtime.block_on(run_session(project, wizard, &config)) {
        Ok(()) => CommandResult::success("chat", "session closed"),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("chat", error_class, message, exit_code)
        }
    }
}

async fn run_session(
    project: &str,
    wizard: WizardContext,
    config: &AppConfig,
) -> Result<(), SessionFailure> {
    let pool = connect(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), 5u8))?;

    let store: Arc<dyn ProjectStore> = Arc::new(SqlProjectStore::new(pool.clone()));
    let client = HttpLlmClient::from_config(&config.llm)
        .map_err(|error| ("llm_client", error.to_string(), 6u8))?;
    let generator = PlanGenerator::new(client);

    let (session, opening) = SessionRuntime::open(
        project,
        wizard,
        generator,
        store,
        Duration::from_millis(config.session.save_debounce_ms),
    )
    .await
    .map_err(|error| ("session_open", error.to_string(), 7u8))?;

    render(&opening);
    print_prompt();

    // Ctrl-C discards whatever draft is being generated instead of
    // killing the session; the listener runs concurrently so the
    // interrupt lands even while a turn is awaiting the AI call.
    let cancel = session.cancel_handle();
    let interrupt_watch = tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
            println!("\n(stopped that draft — nothing was changed; say \"exit\" to leave)");
        }
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut turn_counter: u64 = 0;
    while let Ok(Some(line)) = lines.next_line().await {
        let text = line.trim();
        if text.is_empty() {
            print_prompt();
            continue;
        }
        if matches!(text.to_ascii_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        turn_counter += 1;
        match session.turn(text).await {
            Ok(reply) => render(&reply),
            Err(error) => {
                let correlation_id = format!("turn-{turn_counter}");
                tracing::error!(%correlation_id, %error, "turn failed");
                let interface = error.into_interface(correlation_id);
                println!("{}\n", interface.user_message());
            }
        }
        print_prompt();
    }

    interrupt_watch.abort();
    session.shutdown().await;
    pool.close().await;
    Ok(())
}

fn render(reply: &TurnReply) {
    // Assistant messages are display-ready; print them verbatim.
    for message in &reply.messages {
        println!("{}\n", message.text);
    }
}

fn print_prompt() {
    use std::io::Write;
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn init_logging(config: &AppConfig) {
    use coplan_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}
