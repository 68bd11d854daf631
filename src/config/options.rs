//! Per-backend option records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Overrides shared by every backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOverrides {
    /// Text appended to every prompt before it is handed to the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append_prompt: Option<String>,
    /// Replaces the default program and base arguments.
    ///
    /// Tokens are separated by whitespace; the first one is the program.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_command_override: Option<String>,
    /// Extra arguments placed after the backend's own flags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_params: Option<Vec<String>>,
    /// Environment variables that take precedence over the caller's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
}

impl CommandOverrides {
    /// Check the overrides, returning a human-readable reason on failure.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if let Some(base) = &self.base_command_override {
            if base.split_whitespace().next().is_none() {
                return Err("base_command_override must name a program".to_string());
            }
        }
        if let Some(env) = &self.env {
            for key in env.keys() {
                if key.is_empty() || key.contains('=') || key.contains('\0') {
                    return Err(format!("invalid environment variable name: {key:?}"));
                }
            }
        }
        Ok(())
    }

    /// Combine the caller's prompt with the configured suffix.
    #[must_use]
    pub fn combine_prompt(&self, prompt: &str) -> String {
        match &self.append_prompt {
            Some(suffix) => format!("{prompt}{suffix}"),
            None => prompt.to_string(),
        }
    }

    /// Extra arguments, empty when none are configured.
    #[must_use]
    pub fn additional_params(&self) -> &[String] {
        self.additional_params.as_deref().unwrap_or_default()
    }
}

fn validate_name(field: &str, value: Option<&String>) -> Result<(), String> {
    match value {
        Some(v) if v.trim().is_empty() => Err(format!("{field} must not be blank")),
        _ => Ok(()),
    }
}

/// Options for the Sourcegraph Amp CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmpOptions {
    /// Allow every tool call without asking.
    #[serde(default)]
    pub dangerously_allow_all: bool,
    #[serde(flatten)]
    pub cmd: CommandOverrides,
}

impl AmpOptions {
    pub(crate) fn validate(&self) -> Result<(), String> {
        self.cmd.validate()
    }
}

/// Options for Claude Code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaudeCodeOptions {
    /// Run in plan mode. Takes precedence over `dangerously_skip_permissions`.
    #[serde(default)]
    pub plan: bool,
    /// Route permission prompts through the stdio permission tool.
    #[serde(default)]
    pub approvals: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub dangerously_skip_permissions: bool,
    #[serde(flatten)]
    pub cmd: CommandOverrides,
}

impl ClaudeCodeOptions {
    pub(crate) fn validate(&self) -> Result<(), String> {
        validate_name("model", self.model.as_ref())?;
        self.cmd.validate()
    }
}

/// Options for the Gemini CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Auto-approve every action.
    #[serde(default)]
    pub yolo: bool,
    #[serde(flatten)]
    pub cmd: CommandOverrides,
}

impl GeminiOptions {
    pub(crate) fn validate(&self) -> Result<(), String> {
        validate_name("model", self.model.as_ref())?;
        self.cmd.validate()
    }
}

/// Sandbox policy accepted by `codex exec --sandbox`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodexSandbox {
    ReadOnly,
    WorkspaceWrite,
    DangerFullAccess,
}

impl CodexSandbox {
    /// The value passed on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read-only",
            Self::WorkspaceWrite => "workspace-write",
            Self::DangerFullAccess => "danger-full-access",
        }
    }
}

/// Options for the OpenAI Codex CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodexOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<CodexSandbox>,
    #[serde(default)]
    pub dangerously_bypass_approvals_and_sandbox: bool,
    #[serde(flatten)]
    pub cmd: CommandOverrides,
}

impl CodexOptions {
    pub(crate) fn validate(&self) -> Result<(), String> {
        validate_name("model", self.model.as_ref())?;
        self.cmd.validate()
    }
}

/// Options for opencode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpencodeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(flatten)]
    pub cmd: CommandOverrides,
}

impl OpencodeOptions {
    pub(crate) fn validate(&self) -> Result<(), String> {
        validate_name("model", self.model.as_ref())?;
        validate_name("agent", self.agent.as_ref())?;
        self.cmd.validate()
    }
}
