//! Command-line front end: read the input file, run the compressor or
//! decompressor, write the result. All the interesting work lives in
//! `prizip::{coder, container}`; this binary is just argument parsing
//! and file I/O.

use std::process::ExitCode;

use prizip::config::{Config, Mode};

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::new(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if config.verbose {
        log::info!(
            "{:?} {} -> {} (trie budget {} MiB)",
            config.mode,
            config.input.display(),
            config.output.display(),
            config.trie_megs,
        );
    }

    let input = match std::fs::read(&config.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("failed to read {}: {e}", config.input.display());
            return ExitCode::FAILURE;
        }
    };
    log::debug!("read {} bytes from {}", input.len(), config.input.display());

    let result = match config.mode {
        Mode::Encode => prizip::encode(&input, config.trie_megs),
        Mode::Decode => prizip::decode(&input, config.trie_megs),
    };

    let output = match result {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = std::fs::write(&config.output, &output) {
        eprintln!("failed to write {}: {e}", config.output.display());
        return ExitCode::FAILURE;
    }

    log::info!("wrote {} bytes to {}", output.len(), config.output.display());
    ExitCode::SUCCESS
}
