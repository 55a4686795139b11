//! Command-line argument parsing, trimmed to the handful of flags this
//! crate's single-buffer compressor actually uses. Mirrors the reference
//! CLI's state-machine parser shape (`Parse` tracks "what does the next
//! token mean"), but reports bad input through a `Result` instead of
//! printing usage text and calling `exit` directly.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::params::PZIP_TRIE_MEGS_DEFAULT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Encode,
    Decode,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub verbose: bool,
    pub trie_megs: u64,
    pub input: PathBuf,
    pub output: PathBuf,
}

enum Parse {
    None,
    Mem,
}

impl Config {
    pub fn new(args: &[String]) -> Result<Config, ConfigError> {
        let mut mode = Mode::Decode;
        let mut verbose = false;
        let mut trie_megs = PZIP_TRIE_MEGS_DEFAULT;
        let mut positional: Vec<PathBuf> = Vec::new();

        let mut parser = Parse::None;
        for arg in args {
            match parser {
                Parse::None => match arg.as_str() {
                    "-e" => mode = Mode::Encode,
                    "-v" => verbose = true,
                    "-mem" => parser = Parse::Mem,
                    _ => positional.push(PathBuf::from(arg)),
                },
                Parse::Mem => {
                    parser = Parse::None;
                    let opt: u64 = arg.parse().map_err(|_| ConfigError::InvalidMemory)?;
                    if opt > 9 {
                        return Err(ConfigError::OutOfRangeMemory(opt));
                    }
                    trie_megs = 1 << opt;
                }
            }
        }

        let input = positional.first().cloned().ok_or(ConfigError::NoInput)?;
        if !input.is_file() {
            return Err(ConfigError::InvalidInput(input));
        }
        let output = positional.get(1).cloned().unwrap_or_else(|| default_output(&input, mode));

        Ok(Config { mode, verbose, trie_megs, input, output })
    }
}

fn default_output(input: &PathBuf, mode: Mode) -> PathBuf {
    match mode {
        Mode::Encode => {
            let mut out = input.clone().into_os_string();
            out.push(".pzp");
            PathBuf::from(out)
        }
        Mode::Decode => match input.extension() {
            Some(ext) if ext == "pzp" => input.with_extension(""),
            _ => {
                let mut out = input.clone().into_os_string();
                out.push(".out");
                PathBuf::from(out)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_input() {
        let args: Vec<String> = vec!["-e".into(), "-v".into()];
        match Config::new(&args) {
            Err(ConfigError::NoInput) => {}
            other => panic!("expected NoInput, got {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_mem() {
        let args: Vec<String> = vec!["-mem".into(), "10".into(), "in.pzp".into()];
        match Config::new(&args) {
            Err(ConfigError::OutOfRangeMemory(10)) => {}
            other => panic!("expected OutOfRangeMemory(10), got {other:?}"),
        }
    }

    #[test]
    fn rejects_unparsable_mem() {
        let args: Vec<String> = vec!["-mem".into(), "lots".into(), "in.pzp".into()];
        match Config::new(&args) {
            Err(ConfigError::InvalidMemory) => {}
            other => panic!("expected InvalidMemory, got {other:?}"),
        }
    }

    #[test]
    fn default_output_names() {
        assert_eq!(default_output(&PathBuf::from("report.txt"), Mode::Encode), PathBuf::from("report.txt.pzp"));
        assert_eq!(default_output(&PathBuf::from("report.txt.pzp"), Mode::Decode), PathBuf::from("report.txt"));
        assert_eq!(default_output(&PathBuf::from("noext"), Mode::Decode), PathBuf::from("noext.out"));
    }
}
