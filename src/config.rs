//! Configuration management for KUDE Server

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_PORT: u16 = 3004;
const DEFAULT_RENDER_PARAMS: &str = r#"{"param1":"value1","param2":"value2"}"#;
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 120;
const DEFAULT_QUEUE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_LOG_FILTER: &str = "kude_server=info,tower_http=info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub renderer: RendererConfig,
    pub output: OutputConfig,
    pub request: RequestConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// How the external report tool is launched and throttled
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Interpreter executable (a Java 8 runtime in production)
    pub java_path: PathBuf,
    /// Launch artifact handed to the interpreter with `-jar`
    pub jar_path: PathBuf,
    /// Compiled report template
    pub template_path: PathBuf,
    /// JSON text passed verbatim as the last positional argument
    pub params: String,
    pub timeout: Duration,
    pub max_concurrent: usize,
    pub queue_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

/// How the body of `POST /` is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// The body is the XML document itself
    RawXml,
    /// The body is `{"xml": "<path>"}` naming a file to read
    PathReference,
}

impl FromStr for RequestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" | "xml" => Ok(Self::RawXml),
            "path" | "json" => Ok(Self::PathReference),
            other => Err(format!("expected `raw` or `path`, got `{}`", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub mode: RequestMode,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
            },
            renderer: RendererConfig {
                java_path: PathBuf::from("java"),
                jar_path: PathBuf::from("CreateKude.jar"),
                template_path: PathBuf::from("kude.jasper"),
                params: DEFAULT_RENDER_PARAMS.to_string(),
                timeout: Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS),
                max_concurrent: default_concurrency(),
                queue_timeout: Duration::from_secs(DEFAULT_QUEUE_TIMEOUT_SECS),
            },
            output: OutputConfig {
                dir: PathBuf::from("./output"),
            },
            request: RequestConfig {
                mode: RequestMode::RawXml,
                max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            },
            logging: LoggingConfig {
                dir: PathBuf::from("logs"),
                filter: DEFAULT_LOG_FILTER.to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| -> Result<String, ConfigError> {
            lookup(var)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let params = lookup("KUDE_RENDER_PARAMS").unwrap_or_else(|| DEFAULT_RENDER_PARAMS.to_string());
        if let Err(e) = serde_json::from_str::<serde_json::Value>(&params) {
            return Err(ConfigError::Invalid {
                var: "KUDE_RENDER_PARAMS",
                value: params,
                reason: e.to_string(),
            });
        }

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "SERVER_PORT", DEFAULT_PORT)?,
            },
            renderer: RendererConfig {
                java_path: lookup("JAVA8_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("java")),
                jar_path: PathBuf::from(required("CREATE_KUDE_JAR_PATH")?),
                template_path: PathBuf::from(required("SRC_JASPER")?),
                params,
                timeout: Duration::from_secs(positive_or(
                    &lookup,
                    "KUDE_RENDER_TIMEOUT_SECS",
                    DEFAULT_RENDER_TIMEOUT_SECS,
                )?),
                max_concurrent: positive_or(&lookup, "KUDE_MAX_CONCURRENT_RENDERS", default_concurrency())?,
                queue_timeout: Duration::from_secs(positive_or(
                    &lookup,
                    "KUDE_QUEUE_TIMEOUT_SECS",
                    DEFAULT_QUEUE_TIMEOUT_SECS,
                )?),
            },
            output: OutputConfig {
                dir: PathBuf::from(required("DEST_FOLDER")?),
            },
            request: RequestConfig {
                mode: parse_or(&lookup, "KUDE_REQUEST_MODE", RequestMode::RawXml)?,
                max_body_bytes: positive_or(&lookup, "KUDE_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
            },
            logging: LoggingConfig {
                dir: lookup("LOG_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("logs")),
                filter: DEFAULT_LOG_FILTER.to_string(),
            },
        })
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

fn positive_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let value = parse_or(lookup, var, default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            var,
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}
