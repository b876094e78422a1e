use std::{collections::BTreeMap, fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::LoggingError;

/// Переменная окружения, переопределяющая уровень логирования.
pub const LOG_LEVEL_ENV: &str = "TRIGGER_HUB_LOG_LEVEL";
/// Переменная окружения, переопределяющая каталог логов.
pub const LOG_DIR_ENV: &str = "TRIGGER_HUB_LOG_DIR";
/// Переменная окружения, переопределяющая формат консольного вывода.
pub const LOG_FORMAT_ENV: &str = "TRIGGER_HUB_LOG_FORMAT";

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Формат вывода событий.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Периодичность ротации файлового лога.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileRotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FileConfig {
    pub enabled: bool,
    /// Префикс имени файла: `trigger-hub.log.2026-10-17` при daily-ротации
    pub filename_prefix: String,
    pub format: LogFormat,
    pub rotation: FileRotation,
}

/// Конфигурация логирования.
///
/// Читается как секция `logging` настроек хаба; отсутствующие поля берутся
/// из `Default`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Базовый уровень для крейта (`trace|debug|info|warn|error`)
    pub level: String,
    pub log_dir: PathBuf,
    pub console_enabled: bool,
    pub console: ConsoleConfig,
    pub file_enabled: bool,
    pub file: FileConfig,
    /// Уровни для отдельных модулей, например `trigger_hub::transport = "debug"`
    pub module_levels: BTreeMap<String, String>,
}

impl LoggingConfig {
    /// Применяет переопределения из переменных окружения.
    ///
    /// Некорректное значение формата игнорируется, уровень проверяется позже
    /// в [`LoggingConfig::validate`].
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            self.level = level.trim().to_lowercase();
        }
        if let Ok(dir) = std::env::var(LOG_DIR_ENV) {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(format) = std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|f| f.parse().ok())
        {
            self.console.format = format;
        }
    }

    pub fn validate(&self) -> Result<(), LoggingError> {
        check_level(&self.level)?;
        for (module, level) in &self.module_levels {
            if module.trim().is_empty() {
                return Err(LoggingError::InvalidDirective {
                    directive: format!("={level}"),
                    reason: "empty module name".to_string(),
                });
            }
            check_level(level)?;
        }
        if self.file_enabled && self.file.filename_prefix.trim().is_empty() {
            return Err(LoggingError::InvalidDirective {
                directive: "file.filename_prefix".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Создаёт каталог логов, если включён файловый вывод.
    pub fn ensure_log_dir(&self) -> Result<(), LoggingError> {
        if !self.file_enabled || !self.file.enabled {
            return Ok(());
        }
        std::fs::create_dir_all(&self.log_dir).map_err(|source| LoggingError::Io {
            path: self.log_dir.clone(),
            source,
        })
    }

    /// Собирает директиву для `EnvFilter`: `trigger_hub=<level>` плюс уровни
    /// модулей.
    pub fn build_filter_directive(&self) -> String {
        let mut directive = format!("trigger_hub={}", self.level);
        for (module, level) in &self.module_levels {
            directive.push(',');
            directive.push_str(module);
            directive.push('=');
            directive.push_str(level);
        }
        directive
    }

    pub fn console_format(&self) -> LogFormat {
        self.console.format
    }
}

fn check_level(level: &str) -> Result<(), LoggingError> {
    if LEVELS.contains(&level) {
        Ok(())
    } else {
        Err(LoggingError::InvalidLevel(level.to_string()))
    }
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::InvalidDirective {
                directive: other.to_string(),
                reason: "unknown log format".to_string(),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        };
        f.write_str(s)
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: LogFormat::Pretty,
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filename_prefix: "trigger-hub.log".to_string(),
            format: LogFormat::Json,
            rotation: FileRotation::Daily,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            console_enabled: true,
            console: ConsoleConfig::default(),
            file_enabled: false,
            file: FileConfig::default(),
            module_levels: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    /// Тест проверяет значения по умолчанию.
    #[test]
    fn test_defaults() {
        let cfg = LoggingConfig::default();
        assert_eq!(cfg.level, "info");
        assert!(cfg.console_enabled);
        assert!(!cfg.file_enabled);
        assert_eq!(cfg.console_format(), LogFormat::Pretty);
        assert!(cfg.validate().is_ok());
    }

    /// Тест проверяет, что неизвестный уровень отклоняется.
    #[test]
    fn test_validate_rejects_unknown_level() {
        let cfg = LoggingConfig {
            level: "loud".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(LoggingError::InvalidLevel(l)) if l == "loud"));
    }

    /// Тест проверяет проверку уровней модулей.
    #[test]
    fn test_validate_module_levels() {
        let mut cfg = LoggingConfig::default();
        cfg.module_levels
            .insert("trigger_hub::transport".into(), "debug".into());
        assert!(cfg.validate().is_ok());

        cfg.module_levels.insert("tokio".into(), "verbose".into());
        assert!(cfg.validate().is_err());
    }

    /// Тест проверяет сборку директивы фильтра.
    #[test]
    fn test_build_filter_directive() {
        let mut cfg = LoggingConfig {
            level: "warn".into(),
            ..Default::default()
        };
        assert_eq!(cfg.build_filter_directive(), "trigger_hub=warn");

        cfg.module_levels
            .insert("trigger_hub::pubsub".into(), "trace".into());
        assert_eq!(
            cfg.build_filter_directive(),
            "trigger_hub=warn,trigger_hub::pubsub=trace"
        );
    }

    /// Тест проверяет переопределения из окружения.
    #[test]
    #[serial]
    fn test_apply_env_overrides() {
        std::env::set_var(LOG_LEVEL_ENV, " DEBUG ");
        std::env::set_var(LOG_FORMAT_ENV, "json");
        std::env::set_var(LOG_DIR_ENV, "/tmp/trigger-hub-logs");

        let mut cfg = LoggingConfig::default();
        cfg.apply_env_overrides();

        std::env::remove_var(LOG_LEVEL_ENV);
        std::env::remove_var(LOG_FORMAT_ENV);
        std::env::remove_var(LOG_DIR_ENV);

        assert_eq!(cfg.level, "debug");
        assert_eq!(cfg.console.format, LogFormat::Json);
        assert_eq!(cfg.log_dir, PathBuf::from("/tmp/trigger-hub-logs"));
    }

    /// Тест проверяет, что каталог логов создаётся только при включённом
    /// файловом выводе.
    #[test]
    fn test_ensure_log_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/logs");

        let mut cfg = LoggingConfig {
            log_dir: dir.clone(),
            ..Default::default()
        };
        cfg.ensure_log_dir().unwrap();
        assert!(!dir.exists());

        cfg.file_enabled = true;
        cfg.ensure_log_dir().unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("Compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    /// Тест проверяет десериализацию частичной секции.
    #[test]
    fn test_deserialize_partial() {
        let cfg: LoggingConfig = serde_json::from_str(
            r#"{"level":"debug","console":{"format":"compact"},"file_enabled":true}"#,
        )
        .unwrap();
        assert_eq!(cfg.level, "debug");
        assert_eq!(cfg.console.format, LogFormat::Compact);
        assert!(cfg.console.with_ansi);
        assert!(cfg.file_enabled);
        assert_eq!(cfg.file.filename_prefix, "trigger-hub.log");
    }
}
