use std::process::ExitCode;

fn main() -> ExitCode {
    comptoir_cli::run()
}
