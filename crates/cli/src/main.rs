use std::process::ExitCode;

fn main() -> ExitCode {
    plugfix_cli::run()
}
