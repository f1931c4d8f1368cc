use std::process::ExitCode;

fn main() -> ExitCode {
    moldquote_cli::run()
}
