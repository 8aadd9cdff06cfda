use std::process::ExitCode;

fn main() -> ExitCode {
    conform::cli::run()
}
