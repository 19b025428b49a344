//! Gateway configuration
//!
//! Every setting can be given as a flag or through a `CCP_`-prefixed
//! environment variable. Raw arguments are validated into [`Settings`]
//! once at startup; nothing is re-read afterwards.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CCP_BIND_ADDR` | `0.0.0.0:8000` | Listen address. |
//! | `CCP_USER_TOKENS` | *(none)* | `credential:label` pairs, comma separated. |
//! | `CCP_RATE_LIMIT_PER_MINUTE` | `60` | Requests per identity per 60 s. |
//! | `CCP_OPENAI_API_BASE` | `https://api.openai.com/v1` | Upstream base URL. |
//! | `CCP_OPENAI_API_KEY` | *(none)* | Upstream key; empty serves stub completions. |
//! | `CCP_REDUCTION_BUDGET` | `128` | Max context tokens after reduction. |

use std::net::SocketAddr;

use ccp_context::DEFAULT_MAX_TOKENS;
use ccp_runtime::upstream::openai::OPENAI_API_BASE;
use clap::Parser;
use url::Url;

use crate::auth::IdentityMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed identity entry #{position}: expected `credential:label`")]
    MalformedIdentity { position: usize },
    #[error("identity entry #{position} has an empty credential")]
    EmptyCredential { position: usize },
    #[error("identity entry #{position} has an empty label")]
    EmptyLabel { position: usize },
    #[error("duplicate credential for identity '{label}'")]
    DuplicateCredential { label: String },
    #[error("rate limit must be a non-negative integer, got {0}")]
    NegativeRateLimit(i64),
    #[error("invalid upstream base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Raw command-line / environment arguments.
#[derive(Debug, Clone, Parser)]
#[command(name = "ccp-gateway", version, about = "Context compression proxy")]
pub struct GatewayArgs {
    /// Address to listen on
    #[arg(long, env = "CCP_BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind_addr: SocketAddr,

    /// Credential mapping, e.g. `tok1:alice,tok2:bob`
    #[arg(long, env = "CCP_USER_TOKENS", default_value = "", hide_env_values = true)]
    pub user_tokens: String,

    /// Requests allowed per identity in any 60 second window
    #[arg(
        long,
        env = "CCP_RATE_LIMIT_PER_MINUTE",
        default_value_t = 60,
        allow_negative_numbers = true
    )]
    pub rate_limit_per_minute: i64,

    /// Base URL of the OpenAI-compatible upstream
    #[arg(long, env = "CCP_OPENAI_API_BASE", default_value = OPENAI_API_BASE)]
    pub openai_api_base: String,

    /// Upstream API key; leave empty to serve stub completions
    #[arg(long, env = "CCP_OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    pub openai_api_key: String,

    /// Maximum number of context tokens forwarded upstream
    #[arg(long, env = "CCP_REDUCTION_BUDGET", default_value_t = DEFAULT_MAX_TOKENS)]
    pub reduction_budget: usize,

    /// Emit logs as JSON
    #[arg(long, env = "CCP_LOG_JSON")]
    pub log_json: bool,
}

/// Validated settings, immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub identities: IdentityMap,
    pub rate_limit_per_minute: usize,
    pub upstream_base_url: String,
    pub upstream_api_key: String,
    pub reduction_budget: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            identities: IdentityMap::default(),
            rate_limit_per_minute: 60,
            upstream_base_url: OPENAI_API_BASE.to_string(),
            upstream_api_key: String::new(),
            reduction_budget: DEFAULT_MAX_TOKENS,
        }
    }
}

impl Settings {
    /// Stub mode: no upstream credential configured.
    pub fn is_offline(&self) -> bool {
        self.upstream_api_key.is_empty()
    }
}

impl TryFrom<GatewayArgs> for Settings {
    type Error = ConfigError;

    fn try_from(args: GatewayArgs) -> Result<Self, Self::Error> {
        let identities = IdentityMap::parse(&args.user_tokens)?;

        let rate_limit_per_minute = usize::try_from(args.rate_limit_per_minute)
            .map_err(|_| ConfigError::NegativeRateLimit(args.rate_limit_per_minute))?;

        validate_base_url(&args.openai_api_base)?;

        Ok(Self {
            bind_addr: args.bind_addr,
            identities,
            rate_limit_per_minute,
            upstream_base_url: args.openai_api_base,
            upstream_api_key: args.openai_api_key,
            reduction_budget: args.reduction_budget,
        })
    }
}

fn validate_base_url(raw: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}
