use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;

/// Settings read from a YAML file. Absent keys fall back to the command line defaults.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: Option<String>,
    pub symbols: Option<String>,
    pub optimize: Option<bool>,
    pub legacy_keywords: Option<bool>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Error> {
        let file = File::open(path)?;
        serde_yaml::from_reader(BufReader::new(file))
            .map_err(|e| Error::Config(format!("{}: {}", path, e)))
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        serde_yaml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file() {
        let config = Config::parse("optimize: false\n").unwrap();
        assert_eq!(config.optimize, Some(false));
        assert_eq!(config.output, None);
    }

    #[test]
    fn unknown_type() {
        assert!(matches!(
            Config::parse("optimize: maybe\n"),
            Err(Error::Config(_))
        ));
    }
}
