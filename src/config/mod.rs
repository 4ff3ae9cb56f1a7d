//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::fetch::FetchConfig;
use crate::infra::providers;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "ecodash";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_DATA_DAYS: u32 = 365;
const DEFAULT_RECORDS_PER_DAY: u32 = 50;
const DEFAULT_API_RATE_LIMIT_WINDOW_SECS: u64 = 60;
const DEFAULT_API_RATE_LIMIT_MAX_REQUESTS: u64 = 120;

/// Command-line arguments for the ecodash binary.
#[derive(Debug, Parser)]
#[command(name = "ecodash", version, about = "Economic dashboard backend")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "ECODASH_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the ecodash HTTP service.
    Serve(Box<ServeArgs>),
    /// Generate the demo dataset CSV files and exit.
    #[command(name = "generate")]
    Generate(GenerateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct DataOverrides {
    /// Override the dataset directory.
    #[arg(long = "data-directory", value_name = "PATH")]
    pub data_directory: Option<PathBuf>,

    /// Override the number of days of sales history to generate.
    #[arg(long = "data-days", value_name = "DAYS")]
    pub data_days: Option<u32>,

    /// Override the base number of sales records per day.
    #[arg(long = "data-records-per-day", value_name = "COUNT")]
    pub data_records_per_day: Option<u32>,

    /// Fix the generator seed for reproducible data.
    #[arg(long = "data-seed", value_name = "SEED")]
    pub data_seed: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub data: DataOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the API rate limit window size.
    #[arg(long = "api-rate-limit-window-seconds", value_name = "SECONDS")]
    pub api_rate_limit_window_seconds: Option<u64>,

    /// Override the API rate limit request ceiling.
    #[arg(long = "api-rate-limit-max-requests", value_name = "COUNT")]
    pub api_rate_limit_max_requests: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub data: DataOverrides,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub data: DataSettings,
    pub fetch: FetchSettings,
    pub providers: ProviderSettings,
    pub api_rate_limit: ApiRateLimitSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DataSettings {
    pub directory: PathBuf,
    pub days: NonZeroU32,
    pub records_per_day: NonZeroU32,
    pub seed: Option<u64>,
}

/// Per-provider tuning for the external fetch pipeline.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub crypto: FetchConfig,
    pub worldbank: FetchConfig,
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub coingecko_base_url: String,
    pub worldbank_base_url: String,
}

#[derive(Debug, Clone)]
pub struct ApiRateLimitSettings {
    pub window_seconds: NonZeroU32,
    pub max_requests: NonZeroU32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("ECODASH").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Generate(args)) => raw.apply_data_overrides(&args.data),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    data: RawDataSettings,
    fetch: RawFetchSettings,
    providers: RawProviderSettings,
    api_rate_limit: RawApiRateLimitSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(window) = overrides.api_rate_limit_window_seconds {
            self.api_rate_limit.window_seconds = Some(window);
        }
        if let Some(max) = overrides.api_rate_limit_max_requests {
            self.api_rate_limit.max_requests = Some(max);
        }

        self.apply_data_overrides(&overrides.data);
    }

    fn apply_data_overrides(&mut self, overrides: &DataOverrides) {
        if let Some(directory) = overrides.data_directory.as_ref() {
            self.data.directory = Some(directory.clone());
        }
        if let Some(days) = overrides.data_days {
            self.data.days = Some(days);
        }
        if let Some(records) = overrides.data_records_per_day {
            self.data.records_per_day = Some(records);
        }
        if let Some(seed) = overrides.data_seed {
            self.data.seed = Some(seed);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            data,
            fetch,
            providers,
            api_rate_limit,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let data = build_data_settings(data)?;
        let fetch = build_fetch_settings(fetch)?;
        let providers = build_provider_settings(providers)?;
        let api_rate_limit = build_api_rate_limit_settings(api_rate_limit)?;

        Ok(Self {
            server,
            logging,
            data,
            fetch,
            providers,
            api_rate_limit,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_data_settings(data: RawDataSettings) -> Result<DataSettings, LoadError> {
    let directory = data
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "data.directory",
            "path must not be empty",
        ));
    }

    let days = non_zero_u32(data.days.unwrap_or(DEFAULT_DATA_DAYS).into(), "data.days")?;
    let records_per_day = non_zero_u32(
        data.records_per_day.unwrap_or(DEFAULT_RECORDS_PER_DAY).into(),
        "data.records_per_day",
    )?;

    Ok(DataSettings {
        directory,
        days,
        records_per_day,
        seed: data.seed,
    })
}

fn build_fetch_settings(fetch: RawFetchSettings) -> Result<FetchSettings, LoadError> {
    Ok(FetchSettings {
        crypto: build_fetch_config(fetch.crypto, "fetch.crypto")?,
        worldbank: build_fetch_config(fetch.worldbank, "fetch.worldbank")?,
    })
}

fn build_fetch_config(
    raw: RawFetchConfig,
    key: &'static str,
) -> Result<FetchConfig, LoadError> {
    let defaults = FetchConfig::default();

    let ttl = match raw.ttl_seconds {
        Some(0) => {
            return Err(LoadError::invalid(key, "ttl_seconds must be greater than zero"));
        }
        Some(seconds) => Duration::from_secs(seconds),
        None => defaults.ttl,
    };

    let capacity = match raw.capacity {
        Some(value) => NonZeroUsize::new(value)
            .ok_or_else(|| LoadError::invalid(key, "capacity must be greater than zero"))?,
        None => defaults.capacity,
    };

    let min_interval = raw
        .min_interval_ms
        .map_or(defaults.min_interval, Duration::from_millis);

    let upstream_timeout = match raw.timeout_seconds {
        Some(0) => {
            return Err(LoadError::invalid(key, "timeout_seconds must be greater than zero"));
        }
        Some(seconds) => Duration::from_secs(seconds),
        None => defaults.upstream_timeout,
    };

    Ok(FetchConfig {
        ttl,
        capacity,
        min_interval,
        upstream_timeout,
    })
}

fn build_provider_settings(
    providers: RawProviderSettings,
) -> Result<ProviderSettings, LoadError> {
    let coingecko_base_url = providers
        .coingecko_base_url
        .unwrap_or_else(|| providers::coingecko::DEFAULT_BASE_URL.to_string());
    if coingecko_base_url.trim().is_empty() {
        return Err(LoadError::invalid(
            "providers.coingecko_base_url",
            "URL must not be empty",
        ));
    }

    let worldbank_base_url = providers
        .worldbank_base_url
        .unwrap_or_else(|| providers::worldbank::DEFAULT_BASE_URL.to_string());
    if worldbank_base_url.trim().is_empty() {
        return Err(LoadError::invalid(
            "providers.worldbank_base_url",
            "URL must not be empty",
        ));
    }

    Ok(ProviderSettings {
        coingecko_base_url,
        worldbank_base_url,
    })
}

fn build_api_rate_limit_settings(
    rate_limit: RawApiRateLimitSettings,
) -> Result<ApiRateLimitSettings, LoadError> {
    let window_seconds_val = rate_limit
        .window_seconds
        .unwrap_or(DEFAULT_API_RATE_LIMIT_WINDOW_SECS);
    let window_seconds = non_zero_u32(window_seconds_val, "api_rate_limit.window_seconds")?;

    let max_requests_val = rate_limit
        .max_requests
        .unwrap_or(DEFAULT_API_RATE_LIMIT_MAX_REQUESTS);
    let max_requests = non_zero_u32(max_requests_val, "api_rate_limit.max_requests")?;

    Ok(ApiRateLimitSettings {
        window_seconds,
        max_requests,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDataSettings {
    directory: Option<PathBuf>,
    days: Option<u32>,
    records_per_day: Option<u32>,
    seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFetchSettings {
    crypto: RawFetchConfig,
    worldbank: RawFetchConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFetchConfig {
    ttl_seconds: Option<u64>,
    capacity: Option<usize>,
    min_interval_ms: Option<u64>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawProviderSettings {
    coingecko_base_url: Option<String>,
    worldbank_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiRateLimitSettings {
    window_seconds: Option<u64>,
    max_requests: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
