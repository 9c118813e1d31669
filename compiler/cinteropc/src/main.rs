//! Cinterop CLI

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cinteropc::{init_tracing, link, run_config, DriverConfig, DriverError};

fn main() -> ExitCode {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();

    let result = match args.get(1).map(String::as_str) {
        None | Some("-h" | "--help") => {
            print_usage();
            return ExitCode::from(2);
        }
        Some("link") => {
            if args.len() < 3 {
                eprintln!("Usage: cinterop link <library.klib>...");
                return ExitCode::from(2);
            }
            let paths: Vec<PathBuf> = args[2..].iter().map(PathBuf::from).collect();
            link_command(&paths)
        }
        Some(config) => generate_command(Path::new(config)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn generate_command(config: &Path) -> Result<(), DriverError> {
    let config = DriverConfig::load(config)?;
    let output = run_config(&config)?;
    println!(
        "{}: {} bridges, {} skipped",
        output.library.display(),
        output.bridges,
        output.skipped
    );
    Ok(())
}

fn link_command(paths: &[PathBuf]) -> Result<(), DriverError> {
    let program = link(paths)?;
    for module in &program.modules {
        println!("{}", module.name);
    }
    for class in program.forward_declarations.classes() {
        println!("unresolved {}", class.name);
    }
    Ok(())
}

fn print_usage() {
    eprintln!("Usage: cinterop <config.toml>");
    eprintln!("       cinterop link <library.klib>...");
}
