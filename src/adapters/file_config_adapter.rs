//! INI file configuration adapter.

use crate::domain::error::TurtleError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TurtleError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| TurtleError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, TurtleError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| TurtleError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn invalid(section: &str, key: &str, reason: String) -> TurtleError {
        TurtleError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .filter(|v| !v.trim().is_empty())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, TurtleError> {
        self.config
            .getint(section, key)
            .map(|v| v.unwrap_or(default))
            .map_err(|reason| Self::invalid(section, key, reason))
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, TurtleError> {
        self.config
            .getfloat(section, key)
            .map(|v| v.unwrap_or(default))
            .map_err(|reason| Self::invalid(section, key, reason))
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
[account]
initial_equity = 100000.0

[system1]
entry_period = 20

[data]
path = ./data
symbol = BTCUSDT
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "symbol"),
            Some("BTCUSDT".to_string())
        );
        assert_eq!(adapter.get_int("system1", "entry_period", 0).unwrap(), 20);
    }

    #[test]
    fn get_string_returns_none_for_missing_or_blank() {
        let adapter = FileConfigAdapter::from_string("[data]\npath = ./d\nsymbol =\n").unwrap();
        assert_eq!(adapter.get_string("data", "missing"), None);
        assert_eq!(adapter.get_string("data", "symbol"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[turtle]\n").unwrap();
        assert_eq!(adapter.get_int("turtle", "max_units", 4).unwrap(), 4);
    }

    #[test]
    fn get_int_rejects_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[turtle]\nmax_units = four\n").unwrap();
        let err = adapter.get_int("turtle", "max_units", 4).unwrap_err();
        assert!(matches!(err, TurtleError::ConfigInvalid { key, .. } if key == "max_units"));
    }

    #[test]
    fn get_double_returns_value_and_default() {
        let adapter =
            FileConfigAdapter::from_string("[turtle]\nrisk_ratio = 0.015\n").unwrap();
        assert_eq!(adapter.get_double("turtle", "risk_ratio", 0.02).unwrap(), 0.015);
        assert_eq!(adapter.get_double("turtle", "unit_gap", 0.5).unwrap(), 0.5);
    }

    #[test]
    fn get_double_rejects_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[account]\ninitial_equity = lots\n").unwrap();
        let err = adapter.get_double("account", "initial_equity", 1.0).unwrap_err();
        assert!(
            matches!(err, TurtleError::ConfigInvalid { section, .. } if section == "account")
        );
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[data]\npath = /srv/bars\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "path"),
            Some("/srv/bars".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/turtle.ini").unwrap_err();
        assert!(matches!(err, TurtleError::ConfigParse { file, .. } if file.contains("turtle.ini")));
    }
}
