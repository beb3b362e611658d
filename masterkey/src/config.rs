use serde::Deserialize;
use site::config::Config as SiteConfig;
use std::fs::File;
use std::path::Path;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
    #[serde(default = "default_metrics_prefix")]
    pub prefix: String,
}

fn default_metrics_prefix() -> String {
    "masterkey".to_string()
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is not set. Accepts any `EnvFilter` directive.
    #[serde(default = "default_log_level")]
    pub level: String,
    pub sentry_dsn: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            sentry_dsn: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub site: SiteConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }

    /// Loads and validates the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(metrics) = &self.common.metrics
            && metrics.statsd_port == 0
        {
            return Err(ConfigError::InvalidStatsdPort);
        }
        self.site.validate()?;
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    ValidationError(#[from] site::config::ValidationError),
    #[error("invalid config: statsd port cannot be 0")]
    InvalidStatsdPort,
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_proxy::config::CacheConfig;
    use site::config::Environment;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    const SITE_YAML: &str = r#"
listener:
    host: 0.0.0.0
    port: 3000
admin_listener:
    host: 127.0.0.1
    port: 3001
renderer:
    url: http://127.0.0.1:4000
"#;

    #[test]
    fn full_config() {
        let yaml = r#"
            listener:
                host: 0.0.0.0
                port: 3000
            admin_listener:
                host: 127.0.0.1
                port: 3001
            environment: development
            renderer:
                url: http://renderer.internal:4000
                timeout_secs: 10
            attribution:
                max_age_secs: 86400
            data_proxy:
                rentcast:
                    api_key: env:RENTCAST_API_KEY
                openai:
                    api_key: sk-test
                    model: gpt-4o
                cache:
                    type: disabled
            logging:
                level: debug
                sentry_dsn: https://public@sentry.example.com/1
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::load(tmp.path()).expect("load config");

        assert_eq!(config.common.logging.level, "debug");
        assert_eq!(
            config.common.logging.sentry_dsn.as_deref(),
            Some("https://public@sentry.example.com/1")
        );
        let metrics = config.common.metrics.expect("metrics config");
        assert_eq!(metrics.statsd_port, 8125);
        assert_eq!(metrics.prefix, "masterkey");

        assert_eq!(config.site.environment, Environment::Development);
        assert_eq!(config.site.renderer.timeout_secs, 10);
        assert_eq!(config.site.attribution.max_age_secs, 86400);
        assert_eq!(config.site.data_proxy.openai.model, "gpt-4o");
        assert_eq!(config.site.data_proxy.cache, CacheConfig::Disabled);
    }

    #[test]
    fn minimal_config() {
        let tmp = write_tmp_file(SITE_YAML);
        let config = Config::load(tmp.path()).expect("load config");

        assert_eq!(config.common.logging, LoggingConfig::default());
        assert_eq!(config.common.metrics, None);
        assert_eq!(config.site.listener.port, 3000);
    }

    #[test]
    fn invalid_config() {
        let tmp = write_tmp_file(&format!(
            "{SITE_YAML}metrics:\n    statsd_host: localhost\n    statsd_port: 0\n"
        ));
        assert!(matches!(
            Config::load(tmp.path()),
            Err(ConfigError::InvalidStatsdPort)
        ));

        let tmp = write_tmp_file(&SITE_YAML.replace("port: 3001", "port: 0"));
        assert!(matches!(
            Config::load(tmp.path()),
            Err(ConfigError::ValidationError(_))
        ));

        let tmp = write_tmp_file("listener: [");
        assert!(matches!(
            Config::load(tmp.path()),
            Err(ConfigError::ParseError(_))
        ));

        assert!(matches!(
            Config::load(Path::new("/nonexistent/masterkey.yaml")),
            Err(ConfigError::LoadError(_))
        ));
    }
}
