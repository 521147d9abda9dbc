pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "coplan",
    about = "Conversational project plan co-authoring",
    long_about = "Co-author a multi-stage project plan in conversation: big idea, essential \
                  question, challenge, learning journey, and deliverables.",
    after_help = "Examples:\n  coplan chat my-project\n  coplan show my-project\n  coplan doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start or resume a planning conversation for a project")]
    Chat {
        #[arg(help = "Project identifier; reused to resume a session")]
        project: String,
        #[arg(long, help = "Path to a coplan.toml config file")]
        config: Option<PathBuf>,
        #[arg(long, help = "Grade level for the setup context, e.g. \"7th grade\"")]
        grade_level: Option<String>,
        #[arg(long = "subject", help = "Subject area (repeatable)")]
        subjects: Vec<String>,
        #[arg(long, help = "Planned duration, e.g. \"6 weeks\"")]
        duration: Option<String>,
    },
    #[command(about = "Print the captured plan for a project")]
    Show {
        project: String,
        #[arg(long, help = "Path to a coplan.toml config file")]
        config: Option<PathBuf>,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with redaction")]
    Config,
    #[command(about = "Validate config, generation credentials, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { project, config, grade_level, subjects, duration } => {
            commands::chat::run(&project, config, grade_level, subjects, duration)
        }
        Command::Show { project, config } => commands::show::run(&project, config),
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
