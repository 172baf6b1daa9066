//! Environment configuration loader for agentgate.
//!
//! Settings come from `SECTION__FIELD` (and `SECTION__SUB__FIELD`) variables,
//! optionally primed from a `.env` file. Names are matched
//! case-insensitively. Every failure names the offending variable; there is
//! no partial mode.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::SecretString;

use agentgate_core::agent::prompt::DEFAULT_INSTRUCTION;
use agentgate_types::config::{
    AgentSettings, AppSettings, GatewaySettings, MasterAgentSettings, ModelSettings, Settings,
    StoreBackend, StoreSettings, default_card_path, default_gateway_timeout_secs,
    default_instruction_path, default_max_tokens, default_max_tool_rounds,
    default_model_timeout_secs, default_request_timeout_secs,
};
use agentgate_types::error::ConfigError;

/// Prime the process environment from an env file.
///
/// With `env_file`, that file must exist. Without it, a `.env` in the working
/// directory is loaded when present. Variables already set in the
/// environment win over file entries. Call this before logging is set up so
/// a `RUST_LOG` from the file applies; returns the file that was loaded.
pub fn load_env_file(env_file: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    match env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .map_err(|e| ConfigError::EnvFile(format!("{}: {e}", path.display())))?;
            Ok(Some(path.to_path_buf()))
        }
        None => Ok(dotenvy::dotenv().ok()),
    }
}

/// Load settings from the process environment.
pub fn load_settings() -> Result<Settings, ConfigError> {
    settings_from_vars(std::env::vars())
}

/// Build settings from an explicit set of variables.
pub fn settings_from_vars<I>(vars: I) -> Result<Settings, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env = EnvSource::new(vars);

    let gateway = GatewaySettings {
        name: env.required("GATEWAY__NAME")?,
        json_response: env.parsed_with("GATEWAY__JSON_RESPONSE", false, parse_bool)?,
        backend_servers: parse_backend_servers(&env.required("GATEWAY__BACKEND_SERVERS")?)?,
        timeout_secs: env.parsed("GATEWAY__TIMEOUT_SECS", default_gateway_timeout_secs())?,
    };

    let model = ModelSettings {
        name: env.required("AGENT__MODEL__NAME")?,
        base_url: env.required("AGENT__MODEL__BASE_URL")?,
        api_key: SecretString::from(env.required("AGENT__MODEL__API_KEY")?),
        max_tokens: env.parsed("AGENT__MODEL__MAX_TOKENS", default_max_tokens())?,
        temperature: env.parsed_opt("AGENT__MODEL__TEMPERATURE")?,
        timeout_secs: env.parsed("AGENT__MODEL__TIMEOUT_SECS", default_model_timeout_secs())?,
    };

    let agent = AgentSettings {
        name: env.required("AGENT__NAME")?,
        base_url: env.optional("AGENT__BASE_URL"),
        instruction_path: env
            .optional("AGENT__INSTRUCTION_PATH")
            .unwrap_or_else(default_instruction_path),
        card_path: env
            .optional("AGENT__CARD_PATH")
            .unwrap_or_else(default_card_path),
        max_tool_rounds: env.parsed("AGENT__MAX_TOOL_ROUNDS", default_max_tool_rounds())?,
        model,
    };

    let app = AppSettings {
        name: env.required("APP__NAME")?,
        host: env.required("APP__HOST")?,
        port: env.parsed_required("APP__PORT")?,
        request_timeout_secs: env.parsed(
            "APP__REQUEST_TIMEOUT_SECS",
            default_request_timeout_secs(),
        )?,
    };

    let store_defaults = StoreSettings::default();
    let store = StoreSettings {
        backend: env.parsed_with("STORE__BACKEND", store_defaults.backend, |s| {
            s.parse::<StoreBackend>()
        })?,
        host: env.optional("STORE__HOST").unwrap_or(store_defaults.host),
        port: env.parsed("STORE__PORT", store_defaults.port)?,
        password: env.optional("STORE__PASSWORD").map(SecretString::from),
        db: env.parsed("STORE__DB", store_defaults.db)?,
        timeout_secs: env.parsed("STORE__TIMEOUT_SECS", store_defaults.timeout_secs)?,
    };

    let master_agent = env
        .optional("MASTER_AGENT__BASE_URL")
        .map(|base_url| MasterAgentSettings { base_url });

    Ok(Settings {
        gateway,
        agent,
        app,
        store,
        master_agent,
    })
}

/// Read the agent instruction, falling back to the built-in text when the
/// file is missing or empty.
pub fn load_instruction(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "instruction file is empty, using built-in instruction");
            DEFAULT_INSTRUCTION.to_string()
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), "cannot read instruction file ({err}), using built-in instruction");
            DEFAULT_INSTRUCTION.to_string()
        }
    }
}

/// Variables keyed by upper-cased name.
struct EnvSource {
    vars: HashMap<String, String>,
}

impl EnvSource {
    fn new<I: IntoIterator<Item = (String, String)>>(vars: I) -> Self {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.to_ascii_uppercase(), v))
                .collect(),
        }
    }

    /// Value of `var`; blank values count as unset.
    fn optional(&self, var: &str) -> Option<String> {
        self.vars
            .get(var)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn required(&self, var: &str) -> Result<String, ConfigError> {
        self.optional(var)
            .ok_or_else(|| ConfigError::Missing(var.to_string()))
    }

    fn parsed_with<T, E, F>(&self, var: &str, default: T, parse: F) -> Result<T, ConfigError>
    where
        E: std::fmt::Display,
        F: FnOnce(&str) -> Result<T, E>,
    {
        match self.optional(var) {
            Some(raw) => parse(&raw).map_err(|e| ConfigError::Invalid {
                var: var.to_string(),
                message: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    fn parsed<T>(&self, var: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.parsed_with(var, default, str::parse::<T>)
    }

    fn parsed_opt<T>(&self, var: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.parsed_with(var, None, |raw| raw.parse::<T>().map(Some))
    }

    fn parsed_required<T>(&self, var: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.required(var)?;
        raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            var: var.to_string(),
            message: e.to_string(),
        })
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got '{other}'")),
    }
}

fn parse_backend_servers(raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    serde_json::from_str(raw).map_err(|e| ConfigError::Invalid {
        var: "GATEWAY__BACKEND_SERVERS".to_string(),
        message: format!("must be a JSON object of server name to URL: {e}"),
    })
}
