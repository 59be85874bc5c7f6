use std::process::ExitCode;

fn main() -> ExitCode {
    agrimarket_cli::run()
}
