//! Command-line settings and the `server_config.json` server table.
//!
//! ```rust
//! use relay::config::ServerConfigFile;
//!
//! let file = ServerConfigFile::parse(
//!     r#"{"mcpServers": {"research": {"command": "uv", "args": ["run", "research_server.py"]}}}"#,
//! )
//! .expect("config should parse");
//!
//! assert_eq!(file.servers[0].0, "research");
//! ```

use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use rtooling::{CollisionPolicy, StdioServerConfig};
use serde::Deserialize;
use serde_json::{Map, Value};

pub const DEFAULT_SERVER_CONFIG: &str = "server_config.json";
pub const DEFAULT_MODEL: &str = "o4-mini";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_TURNS: u32 = 20;
pub const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 2024;
pub const DEFAULT_RESOURCE_SCHEME: &str = "papers";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "relay",
    version,
    about = "Chat with a model that can call tools on MCP servers."
)]
pub struct CliArgs {
    /// Path to the JSON file listing MCP servers under `mcpServers`.
    #[arg(long, env = "RELAY_SERVER_CONFIG", default_value = DEFAULT_SERVER_CONFIG)]
    pub config: PathBuf,

    #[arg(long, env = "DEFAULT_LLM_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, env = "OPENAI_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Ceiling on model calls per user turn.
    #[arg(long, env = "RELAY_MAX_TURNS", default_value_t = DEFAULT_MAX_TURNS)]
    pub max_turns: u32,

    #[arg(
        long,
        env = "RELAY_MAX_COMPLETION_TOKENS",
        default_value_t = DEFAULT_MAX_COMPLETION_TOKENS
    )]
    pub max_completion_tokens: u32,

    /// Scheme used to expand `@name` shorthands.
    #[arg(long, env = "RELAY_RESOURCE_SCHEME", default_value = DEFAULT_RESOURCE_SCHEME)]
    pub resource_scheme: String,

    #[arg(
        long,
        env = "RELAY_REQUEST_TIMEOUT_SECS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS
    )]
    pub request_timeout_secs: u64,

    /// Keep the first server's capability when names collide.
    #[arg(long)]
    pub reject_collisions: bool,

    #[arg(long, env = "RELAY_SYSTEM_PROMPT")]
    pub system_prompt: Option<String>,
}

/// Validated runtime settings.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub server_config: PathBuf,
    pub model: String,
    pub api_base: String,
    pub api_key: String,
    pub max_turns: u32,
    pub max_completion_tokens: u32,
    pub resource_scheme: String,
    pub request_timeout: Duration,
    pub collision_policy: CollisionPolicy,
    pub system_prompt: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
    Read { path: PathBuf, message: String },
    Parse { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => write!(f, "invalid {name} value: {value}"),
            Self::Read { path, message } => {
                write!(f, "cannot read server config {}: {message}", path.display())
            }
            Self::Parse { message } => write!(f, "invalid server config: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Loads a `.env` file from the working directory or one of its parents.
/// Variables already present in the environment keep their values.
pub fn load_dotenv() -> Option<PathBuf> {
    report_dotenv(dotenvy::dotenv())
}

pub fn load_dotenv_from(path: &Path) -> Option<PathBuf> {
    report_dotenv(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}

fn report_dotenv(result: Result<PathBuf, dotenvy::Error>) -> Option<PathBuf> {
    match result {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "loaded environment file");
            Some(path)
        }
        Err(error) if error.not_found() => None,
        Err(error) => {
            tracing::warn!(error = %error, "ignoring unreadable environment file");
            None
        }
    }
}

impl RelayConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::try_from(CliArgs::parse())
    }
}

impl TryFrom<CliArgs> for RelayConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let api_key = args
            .api_key
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingSetting("OPENAI_API_KEY"))?;

        if args.model.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "DEFAULT_LLM_MODEL",
                value: args.model,
            });
        }
        if args.max_turns == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "RELAY_MAX_TURNS",
                value: args.max_turns.to_string(),
            });
        }
        if args.max_completion_tokens == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "RELAY_MAX_COMPLETION_TOKENS",
                value: args.max_completion_tokens.to_string(),
            });
        }
        if args.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "RELAY_REQUEST_TIMEOUT_SECS",
                value: args.request_timeout_secs.to_string(),
            });
        }

        let resource_scheme = args.resource_scheme.trim().to_string();
        if resource_scheme.is_empty() || !is_scheme(&resource_scheme) {
            return Err(ConfigError::InvalidSetting {
                name: "RELAY_RESOURCE_SCHEME",
                value: args.resource_scheme,
            });
        }

        let api_base = args.api_base.trim().trim_end_matches('/').to_string();
        if api_base.is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "OPENAI_API_BASE",
                value: args.api_base,
            });
        }

        Ok(Self {
            server_config: args.config,
            model: args.model.trim().to_string(),
            api_base,
            api_key,
            max_turns: args.max_turns,
            max_completion_tokens: args.max_completion_tokens,
            resource_scheme,
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            collision_policy: if args.reject_collisions {
                CollisionPolicy::Reject
            } else {
                CollisionPolicy::LastWins
            },
            system_prompt: args.system_prompt.filter(|value| !value.trim().is_empty()),
        })
    }
}

fn is_scheme(value: &str) -> bool {
    let mut chars = value.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// The `mcpServers` table, in file order.
///
/// Entries that cannot describe a stdio server land in `rejected` and are
/// reported at startup; the rest still connect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfigFile {
    pub servers: Vec<(String, StdioServerConfig)>,
    pub rejected: Vec<RejectedServer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedServer {
    pub server: String,
    pub message: String,
}

#[derive(Deserialize)]
struct RawServerConfigFile {
    #[serde(rename = "mcpServers", default)]
    mcp_servers: Map<String, Value>,
}

impl ServerConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let file: RawServerConfigFile =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse {
                message: err.to_string(),
            })?;

        let mut parsed = Self::default();
        for (name, entry) in file.mcp_servers {
            match server_entry(entry) {
                Ok(config) => parsed.servers.push((name, config)),
                Err(message) => {
                    tracing::warn!(server = %name, error = %message, "skipping invalid server entry");
                    parsed.rejected.push(RejectedServer {
                        server: name,
                        message,
                    });
                }
            }
        }

        Ok(parsed)
    }

    /// True when no entry, valid or not, was configured.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty() && self.rejected.is_empty()
    }
}

fn server_entry(entry: Value) -> Result<StdioServerConfig, String> {
    let config: StdioServerConfig = serde_json::from_value(entry).map_err(|err| err.to_string())?;
    if config.command.trim().is_empty() {
        return Err("command must not be empty".to_string());
    }
    Ok(config)
}
