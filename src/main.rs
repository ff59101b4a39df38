use std::process::ExitCode;

use clap::Parser;
use screen_qa_lib::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logs = match screen_qa_lib::logging::init() {
        Ok(logs) => logs,
        Err(e) => {
            eprintln!("failed to initialize logging: {e}");
            return ExitCode::from(1);
        }
    };

    match screen_qa_lib::run(cli, logs) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}
