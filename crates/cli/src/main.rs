use std::process::ExitCode;

fn main() -> ExitCode {
    precivox_cli::run()
}
