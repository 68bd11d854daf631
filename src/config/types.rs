//! Configuration types: backend selection and parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    AmpOptions, ClaudeCodeOptions, CodexOptions, CommandOverrides, ConfigError, GeminiOptions,
    OpencodeOptions,
};

/// Supported coding-agent backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackendKind {
    Amp,
    ClaudeCode,
    Gemini,
    Codex,
    Opencode,
}

impl BackendKind {
    /// Every recognized backend, in declaration order.
    pub const ALL: [BackendKind; 5] = [
        Self::Amp,
        Self::ClaudeCode,
        Self::Gemini,
        Self::Codex,
        Self::Opencode,
    ];

    /// The top-level configuration key selecting this backend.
    #[must_use]
    pub fn config_key(self) -> &'static str {
        match self {
            Self::Amp => "AMP",
            Self::ClaudeCode => "CLAUDE_CODE",
            Self::Gemini => "GEMINI",
            Self::Codex => "CODEX",
            Self::Opencode => "OPENCODE",
        }
    }

    /// Look up a backend by its configuration key. Matching is exact.
    #[must_use]
    pub fn from_config_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.config_key() == key)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

/// The option record of the selected backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOptions {
    Amp(AmpOptions),
    ClaudeCode(ClaudeCodeOptions),
    Gemini(GeminiOptions),
    Codex(CodexOptions),
    Opencode(OpencodeOptions),
}

impl BackendOptions {
    /// Deserialize and validate the options for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MalformedOptions` if the value does not match the
    /// backend's option record or fails validation.
    pub fn from_value(kind: BackendKind, value: Value) -> Result<Self, ConfigError> {
        // `null` is accepted as "all defaults".
        let value = if value.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            value
        };
        let malformed = |e: serde_json::Error| ConfigError::malformed(kind, e.to_string());

        let options = match kind {
            BackendKind::Amp => Self::Amp(serde_json::from_value(value).map_err(malformed)?),
            BackendKind::ClaudeCode => {
                Self::ClaudeCode(serde_json::from_value(value).map_err(malformed)?)
            }
            BackendKind::Gemini => Self::Gemini(serde_json::from_value(value).map_err(malformed)?),
            BackendKind::Codex => Self::Codex(serde_json::from_value(value).map_err(malformed)?),
            BackendKind::Opencode => {
                Self::Opencode(serde_json::from_value(value).map_err(malformed)?)
            }
        };

        options
            .validate()
            .map_err(|reason| ConfigError::malformed(kind, reason))?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Amp(o) => o.validate(),
            Self::ClaudeCode(o) => o.validate(),
            Self::Gemini(o) => o.validate(),
            Self::Codex(o) => o.validate(),
            Self::Opencode(o) => o.validate(),
        }
    }

    /// Which backend these options belong to.
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Amp(_) => BackendKind::Amp,
            Self::ClaudeCode(_) => BackendKind::ClaudeCode,
            Self::Gemini(_) => BackendKind::Gemini,
            Self::Codex(_) => BackendKind::Codex,
            Self::Opencode(_) => BackendKind::Opencode,
        }
    }

    /// The overrides shared by every backend.
    #[must_use]
    pub fn overrides(&self) -> &CommandOverrides {
        match self {
            Self::Amp(o) => &o.cmd,
            Self::ClaudeCode(o) => &o.cmd,
            Self::Gemini(o) => &o.cmd,
            Self::Codex(o) => &o.cmd,
            Self::Opencode(o) => &o.cmd,
        }
    }

    fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Amp(o) => serde_json::to_value(o),
            Self::ClaudeCode(o) => serde_json::to_value(o),
            Self::Gemini(o) => serde_json::to_value(o),
            Self::Codex(o) => serde_json::to_value(o),
            Self::Opencode(o) => serde_json::to_value(o),
        }
    }
}

/// A parsed executor configuration: exactly one backend and its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    options: BackendOptions,
}

impl Configuration {
    /// Parse a `{ "<BACKEND>": { ... } }` mapping.
    ///
    /// # Errors
    ///
    /// - `NotAMapping` if `raw` is not an object.
    /// - `EmptyConfiguration` if it has no keys.
    /// - `AmbiguousSelection` if it has more than one key.
    /// - `UnknownBackend` if the key is not recognized.
    /// - `MalformedOptions` if the backend's options are invalid.
    pub fn parse(raw: &Value) -> Result<Self, ConfigError> {
        let map = raw.as_object().ok_or(ConfigError::NotAMapping {
            found: value_type_name(raw),
        })?;

        let mut entries = map.iter();
        let (key, value) = match (entries.next(), entries.next()) {
            (None, _) => return Err(ConfigError::EmptyConfiguration),
            (Some(entry), None) => entry,
            (Some(_), Some(_)) => {
                return Err(ConfigError::AmbiguousSelection {
                    keys: map.keys().cloned().collect(),
                })
            }
        };

        let kind = BackendKind::from_config_key(key)
            .ok_or_else(|| ConfigError::UnknownBackend { name: key.clone() })?;
        let options = BackendOptions::from_value(kind, value.clone())?;

        tracing::debug!(backend = %kind, "Parsed executor configuration");
        Ok(Self { options })
    }

    /// Parse configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` for invalid JSON, otherwise as [`Configuration::parse`].
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::parse(&value)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Toml` for invalid TOML, otherwise as [`Configuration::parse`].
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let value: Value = toml::from_str(raw)?;
        Self::parse(&value)
    }

    /// Build a configuration directly from typed options.
    #[must_use]
    pub fn from_options(options: BackendOptions) -> Self {
        Self { options }
    }

    /// The selected backend.
    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.options.kind()
    }

    /// The selected backend's options.
    #[must_use]
    pub fn options(&self) -> &BackendOptions {
        &self.options
    }

    /// Serialize back into the `{ "<BACKEND>": { ... } }` shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the options cannot be serialized.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let mut map = serde_json::Map::new();
        map.insert(
            self.backend().config_key().to_string(),
            self.options.to_value()?,
        );
        Ok(Value::Object(map))
    }
}

impl FromStr for Configuration {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json_str(s)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}
