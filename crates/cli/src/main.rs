use std::process::ExitCode;

fn main() -> ExitCode {
    coplan_cli::run()
}
