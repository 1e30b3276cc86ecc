//! INI file configuration adapter.

use crate::domain::error::PapertraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PapertraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| PapertraderError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, PapertraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| PapertraderError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[database]
path = /var/lib/papertrader/trading.db

[universe]
symbols = AAPL, MSFT
pairs = MSFT/GOOGL
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("database", "path"),
            Some("/var/lib/papertrader/trading.db".to_string())
        );
        assert_eq!(
            adapter.get_string("universe", "pairs"),
            Some("MSFT/GOOGL".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[engine]\ninitial_capital = 100\n").unwrap();
        assert_eq!(adapter.get_string("engine", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value() {
        let adapter = FileConfigAdapter::from_string("[engine]\nmax_positions = 5\n").unwrap();
        assert_eq!(adapter.get_int("engine", "max_positions", 0), 5);
    }

    #[test]
    fn get_int_returns_default_for_missing_or_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[engine]\nmax_positions = abc\n").unwrap();
        assert_eq!(adapter.get_int("engine", "max_positions", 42), 42);
        assert_eq!(adapter.get_int("engine", "history_limit", 100), 100);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter =
            FileConfigAdapter::from_string("[engine]\ninitial_capital = 100000.5\n").unwrap();
        assert_eq!(adapter.get_double("engine", "initial_capital", 0.0), 100000.5);
    }

    #[test]
    fn get_double_returns_default_for_missing_or_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[sizing]\ntarget_risk = not_a_number\n").unwrap();
        assert_eq!(adapter.get_double("sizing", "target_risk", 0.01), 0.01);
        assert_eq!(adapter.get_double("sizing", "missing", 99.9), 99.9);
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[logging]\na = true\nb = yes\nc = on\nd = false\ne = no\nf = 0\ng = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("logging", "a", false));
        assert!(adapter.get_bool("logging", "b", false));
        assert!(adapter.get_bool("logging", "c", false));
        assert!(!adapter.get_bool("logging", "d", true));
        assert!(!adapter.get_bool("logging", "e", true));
        assert!(!adapter.get_bool("logging", "f", true));
        assert!(adapter.get_bool("logging", "g", true));
        assert!(!adapter.get_bool("logging", "missing", false));
    }

    const ENGINE_INI: &str = r#"
[engine]
initial_capital = 250000
risk_per_trade = 0.015
max_positions = 20

[sizing]
target_risk = 0.0125
default_volatility = 2e-2
pair_volatility = 0.015

[stat_arb]
spread_mean = -12.5
spread_scale = 40
entry_z = 1.75

[logging]
ansi = off
"#;

    #[test]
    fn engine_sections_are_read() {
        let adapter = FileConfigAdapter::from_string(ENGINE_INI).unwrap();
        assert_eq!(adapter.get_double("engine", "initial_capital", 0.0), 250_000.0);
        assert_eq!(adapter.get_double("engine", "risk_per_trade", 0.0), 0.015);
        assert_eq!(adapter.get_int("engine", "max_positions", 50), 20);
        assert_eq!(adapter.get_double("sizing", "target_risk", 0.0), 0.0125);
        assert_eq!(adapter.get_double("sizing", "default_volatility", 0.0), 0.02);
        assert_eq!(adapter.get_double("sizing", "pair_volatility", 0.0), 0.015);
        assert_eq!(adapter.get_double("stat_arb", "spread_mean", 100.0), -12.5);
        assert_eq!(adapter.get_double("stat_arb", "spread_scale", 50.0), 40.0);
        assert_eq!(adapter.get_double("stat_arb", "entry_z", 2.0), 1.75);
        assert!(!adapter.get_bool("logging", "ansi", true));
    }

    #[test]
    fn integer_valued_keys_read_as_doubles() {
        let adapter = FileConfigAdapter::from_string(ENGINE_INI).unwrap();
        assert_eq!(adapter.get_double("engine", "max_positions", 0.0), 20.0);
        // 0.015 is not an integer, so the integer accessor falls back.
        assert_eq!(adapter.get_int("engine", "risk_per_trade", 7), 7);
    }

    #[test]
    fn section_and_key_lookup_is_case_insensitive() {
        let adapter =
            FileConfigAdapter::from_string("[Stat_Arb]\nEntry_Z = 2.5\n").unwrap();
        assert_eq!(adapter.get_double("stat_arb", "entry_z", 0.0), 2.5);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[logging]\nlevel = debug\nformat = json\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("logging", "format"),
            Some("json".to_string())
        );
    }

    #[test]
    fn from_file_missing_file_is_config_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(PapertraderError::ConfigParse { .. })));
    }
}
