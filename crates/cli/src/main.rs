use std::process::ExitCode;

fn main() -> ExitCode {
    autorec_cli::run()
}
