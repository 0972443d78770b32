use serde::Deserialize;
use std::{collections::BTreeMap, path::PathBuf, time::Duration};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    #[serde(default)]
    pub deploy: bool,
    pub predictors: Vec<String>,
    pub addresses: AddressConfig,
    #[serde(default)]
    pub staging: StagingConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

/// Which set of addresses and which staging directory a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Test,
    Deploy,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Test => "test",
            RunMode::Deploy => "deploy",
        }
    }
}

/// Base addresses of every known predictor, one map per run mode.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AddressConfig {
    #[serde(default)]
    pub test: BTreeMap<String, String>,
    #[serde(default)]
    pub deploy: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StagingConfig {
    #[serde(default = "default_test_dir")]
    pub test_dir: PathBuf,
    #[serde(default = "default_deploy_dir")]
    pub deploy_dir: PathBuf,
    #[serde(default)]
    pub import_from: Option<PathBuf>,
    #[serde(default)]
    pub clear_after_run: bool,
}

fn default_test_dir() -> PathBuf {
    PathBuf::from("content_storage_test/prediction_images")
}

fn default_deploy_dir() -> PathBuf {
    PathBuf::from("/content_storage/prediction_images")
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            test_dir: default_test_dir(),
            deploy_dir: default_deploy_dir(),
            import_from: None,
            clear_after_run: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReadinessConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_attempts: None,
            timeout_secs: None,
        }
    }
}

impl ReadinessConfig {
    pub fn get_poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

fn default_max_in_flight() -> usize {
    1
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: None,
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl DispatchConfig {
    pub fn get_request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("configuration/prediction_results.json")
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MetricsConfig {
    #[serde(default)]
    pub textfile: Option<PathBuf>,
}

impl Config {
    pub fn run_mode(&self) -> RunMode {
        if self.deploy {
            RunMode::Deploy
        } else {
            RunMode::Test
        }
    }

    pub fn base_addresses(&self) -> &BTreeMap<String, String> {
        match self.run_mode() {
            RunMode::Test => &self.addresses.test,
            RunMode::Deploy => &self.addresses.deploy,
        }
    }

    pub fn staging_dir(&self) -> &PathBuf {
        match self.run_mode() {
            RunMode::Test => &self.staging.test_dir,
            RunMode::Deploy => &self.staging.deploy_dir,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.dispatch.max_in_flight == 0 {
            return Err("dispatch.max_in_flight must be at least 1".into());
        }
        if self.readiness.poll_interval_secs == 0 {
            return Err("readiness.poll_interval_secs must be at least 1".into());
        }
        if self.readiness.max_attempts == Some(0) {
            return Err("readiness.max_attempts must be at least 1 when set".into());
        }
        if self.readiness.timeout_secs == Some(0) {
            return Err("readiness.timeout_secs must be at least 1 when set".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

/// `AO_`-prefixed overrides; `AO_PREDICTORS=2,1` replaces the selection list.
fn environment_source() -> config::Environment {
    config::Environment::with_prefix("AO")
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("predictors")
        .try_parsing(true)
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("current directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    let config = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(format!("{}.yaml", environment.as_str())),
        ))
        .add_source(environment_source())
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;
    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        return Err(config::ConfigError::Message(e));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize::<Config>()
            .unwrap()
    }

    const BASE: &str = r#"
log_level: INFO
predictors: ["1", "2"]
addresses:
  test:
    "1": "http://localhost:8001"
    "2": "http://localhost:8002"
  deploy:
    "1": "http://predictor1:80"
"#;

    #[test]
    fn test_defaults_follow_reference_run() {
        let config = parse(BASE);

        assert_eq!(config.run_mode(), RunMode::Test);
        assert_eq!(config.readiness.get_poll_interval(), Duration::from_secs(5));
        assert!(config.readiness.max_attempts.is_none());
        assert!(config.readiness.get_timeout().is_none());
        assert_eq!(config.dispatch.max_in_flight, 1);
        assert_eq!(
            config.staging_dir(),
            &PathBuf::from("content_storage_test/prediction_images")
        );
        assert_eq!(config.base_addresses().len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deploy_flag_switches_addresses_and_staging() {
        let config = parse(&format!("{}deploy: true\n", BASE));

        assert_eq!(config.run_mode(), RunMode::Deploy);
        assert_eq!(
            config.staging_dir(),
            &PathBuf::from("/content_storage/prediction_images")
        );
        assert_eq!(
            config.base_addresses().get("1").map(String::as_str),
            Some("http://predictor1:80")
        );
    }

    #[test]
    fn test_rejects_zero_in_flight() {
        let config = parse(&format!("{}dispatch:\n  max_in_flight: 0\n", BASE));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_readiness_bounds() {
        let attempts = parse(&format!("{}readiness:\n  max_attempts: 0\n", BASE));
        assert!(attempts.validate().is_err());

        let timeout = parse(&format!("{}readiness:\n  timeout_secs: 0\n", BASE));
        assert!(timeout.validate().is_err());

        let bounded = parse(&format!(
            "{}readiness:\n  max_attempts: 3\n  timeout_secs: 60\n",
            BASE
        ));
        assert!(bounded.validate().is_ok());
    }

    #[test]
    fn test_environment_overrides_selection_list() {
        let overrides = std::collections::HashMap::from([
            ("AO_PREDICTORS".to_string(), "2,1".to_string()),
            ("AO_DEPLOY".to_string(), "true".to_string()),
        ]);
        let config = config::Config::builder()
            .add_source(config::File::from_str(BASE, config::FileFormat::Yaml))
            .add_source(environment_source().source(Some(overrides)))
            .build()
            .unwrap()
            .try_deserialize::<Config>()
            .unwrap();

        assert_eq!(config.predictors, vec!["2", "1"]);
        assert_eq!(config.run_mode(), RunMode::Deploy);
    }

    #[test]
    fn test_log_level_parsing() {
        assert!(matches!(
            LogLevel::try_from("Debug".to_string()),
            Ok(LogLevel::Debug)
        ));
        assert!(LogLevel::try_from("trace".to_string()).is_err());
    }
}
