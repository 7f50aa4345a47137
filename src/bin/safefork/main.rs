// src/bin/safefork/main.rs
use std::process::ExitCode;

fn main() -> ExitCode {
    match safefork_cli::run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("safefork: {err:#}");
            ExitCode::from(safefork_cli::EXIT_ERROR)
        }
    }
}
