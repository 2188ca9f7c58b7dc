use clap::Parser;
use std::process::ExitCode;

use ob_cli::ObCli;

fn main() -> ExitCode {
    let cli = ObCli::parse();
    match cli.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ob: {err}");
            ExitCode::from(ob_cli::exit_code(&err))
        }
    }
}
