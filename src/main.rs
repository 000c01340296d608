use colored::Colorize;
use std::process::ExitCode;

fn main() -> ExitCode {
    match scout::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} [{}] {}", "Error:".red().bold(), err.kind(), err);
            ExitCode::FAILURE
        }
    }
}
