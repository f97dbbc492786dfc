use std::process::ExitCode;

fn main() -> ExitCode {
    regpilot_cli::run()
}
