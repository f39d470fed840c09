use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use gpush::args::{GpushCommand, parse_args, version_line};
use gpush::error::GpushError;
use gpush::live_progress::{Console, live_progress_mode};
use gpush::push::{LinePrompter, PushOptions, run_push};

fn print_error(err: &GpushError) {
    println!("\n\nGpush encountered an error:");
    println!("{err}");
    println!("\nExiting gpush.");
}

fn run(cwd: PathBuf) -> Result<i32, GpushError> {
    let cli = match parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return Ok(err.exit_code());
        }
    };
    gpush::logging::init_logging(cli.verbose);
    if cli.version {
        println!("{}", version_line());
        return Ok(0);
    }

    let (config_path, config) = gpush::config::load_config(&cwd, cli.config_file.as_deref())?;
    let console = Arc::new(Console::stdout());
    match &cli.command {
        Some(GpushCommand::Run { name }) => {
            gpush::commands::run_named_command(&config, &name.join(" "), &console)
        }
        Some(GpushCommand::Fix) => gpush::commands::run_fix(&config, &console),
        None => {
            let verbose = cli.verbose || config.verbose.unwrap_or(false);
            if verbose {
                let repo_root = gpush::git::find_repo_root(&cwd);
                console.println(&format!(
                    "Using config file: {}",
                    gpush::config::display_config_path(&config_path, repo_root.as_deref())
                ));
            }
            let options = PushOptions {
                dry_run: cli.dry_run,
                verbose,
                progress: live_progress_mode(std::io::stdout().is_terminal()),
            };
            let mut prompter = LinePrompter::stdin();
            run_push(&cwd, &config, options, &console, &mut prompter)
                .map(|outcome| outcome.exit_code())
        }
    }
}

fn main() {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let code = match run(cwd) {
        Ok(code) => code,
        // The phase already explained what failed and that gpush is halting.
        Err(GpushError::PhaseFailed { .. }) => 1,
        Err(err) => {
            print_error(&err);
            1
        }
    };
    std::process::exit(code);
}
