use std::process::ExitCode;

use clap::Parser;
use env_logger::{Builder, Env};
use minimvc::cli::Args;

fn main() -> ExitCode {
    let args = Args::parse();
    Builder::from_env(Env::default().default_filter_or(args.log_filter())).init();

    match args.run() {
        Ok(response) => {
            for sql in &response.recorded {
                eprintln!("-- {}", sql);
            }
            print!("{}", response.body);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
