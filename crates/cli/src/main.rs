use std::process::ExitCode;

fn main() -> ExitCode {
    fuelbid_cli::run()
}
