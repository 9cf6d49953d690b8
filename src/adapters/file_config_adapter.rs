//! INI file configuration adapter.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
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

    fn get_decimal(&self, section: &str, key: &str, default: Decimal) -> Decimal {
        self.config
            .get(section, key)
            .and_then(|v| Decimal::from_str(v.trim()).ok())
            .unwrap_or(default)
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .config
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
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
[data]
path = /var/bars

[scan]
symbol = ESZ4
warmup_days = 3

[strategy]
name = Opening Drive
condition1 = price > vwap
condition2 = rsi < 70
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "path"),
            Some("/var/bars".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "condition1"),
            Some("price > vwap".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "condition2"),
            Some("rsi < 70".to_string())
        );
    }

    #[test]
    fn inline_semicolon_starts_a_comment() {
        let adapter =
            FileConfigAdapter::from_string("[strategy]\ncondition1 = price > vwap; rsi < 70\n")
                .unwrap();
        assert_eq!(
            adapter.get_string("strategy", "condition1"),
            Some("price > vwap".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[scan]\nsymbol = ES\n").unwrap();
        assert_eq!(adapter.get_string("scan", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value() {
        let adapter = FileConfigAdapter::from_string("[scan]\nmin_lookback = 75\n").unwrap();
        assert_eq!(adapter.get_int("scan", "min_lookback", 0), 75);
    }

    #[test]
    fn get_int_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[scan]\n").unwrap();
        assert_eq!(adapter.get_int("scan", "missing", 42), 42);
    }

    #[test]
    fn get_int_returns_default_for_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[scan]\nmin_lookback = abc\n").unwrap();
        assert_eq!(adapter.get_int("scan", "min_lookback", 42), 42);
    }

    #[test]
    fn get_decimal_is_exact() {
        let adapter = FileConfigAdapter::from_string("[scan]\ncommission = 4.10\n").unwrap();
        assert_eq!(adapter.get_decimal("scan", "commission", dec!(0)), dec!(4.10));
    }

    #[test]
    fn get_decimal_returns_default_for_missing_or_invalid() {
        let adapter = FileConfigAdapter::from_string("[scan]\ncommission = lots\n").unwrap();
        assert_eq!(adapter.get_decimal("scan", "commission", dec!(5)), dec!(5));
        assert_eq!(adapter.get_decimal("scan", "missing", dec!(1.5)), dec!(1.5));
    }

    #[test]
    fn keys_lists_section_entries_sorted() {
        let content = "[symbols]\nNQ = 20, 0.25, 5\nES = 50, 0.25, 12.5\n";
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(adapter.keys("symbols"), vec!["es", "nq"]);
        assert_eq!(adapter.keys("SYMBOLS"), vec!["es", "nq"]);
        assert!(adapter.keys("absent").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[data]\npath = /tmp/bars\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "path"),
            Some("/tmp/bars".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(result.is_err());
    }
}
