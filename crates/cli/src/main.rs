use std::process::ExitCode;

fn main() -> ExitCode {
    securebank_cli::run()
}
