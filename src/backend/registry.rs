//! Backend dispatch: from parsed options to a command builder.

use std::path::Path;

use crate::config::{BackendKind, BackendOptions, CommandOverrides};

use super::{merge_env, CommandSpec, ExecutionEnv};

/// Variables every backend sets so agent output stays line-oriented and quiet.
pub const DEFAULT_BACKEND_ENV: [(&str, &str); 2] =
    [("NPM_CONFIG_LOGLEVEL", "error"), ("NO_COLOR", "1")];

/// Inputs of one `spawn` call.
#[derive(Debug, Clone, Copy)]
pub struct SpawnRequest<'a> {
    pub cwd: &'a Path,
    pub prompt: &'a str,
    pub env: &'a ExecutionEnv,
}

impl<'a> SpawnRequest<'a> {
    #[must_use]
    pub fn new(cwd: &'a Path, prompt: &'a str, env: &'a ExecutionEnv) -> Self {
        Self { cwd, prompt, env }
    }
}

/// Translates a spawn request into a concrete process invocation.
///
/// Implementations are pure: no I/O and no process creation.
pub trait CommandBuilder: Send + Sync {
    /// The backend this builder serves.
    fn kind(&self) -> BackendKind;

    /// Build the command for one spawn.
    fn build(&self, request: &SpawnRequest<'_>) -> CommandSpec;
}

/// Pick the builder for the configured backend.
#[must_use]
pub fn resolve(options: &BackendOptions) -> &dyn CommandBuilder {
    match options {
        BackendOptions::Amp(o) => o,
        BackendOptions::ClaudeCode(o) => o,
        BackendOptions::Gemini(o) => o,
        BackendOptions::Codex(o) => o,
        BackendOptions::Opencode(o) => o,
    }
}

/// Start a spec from the backend's default base command, or the configured
/// override.
pub(crate) fn base_spec(
    default: &[&str],
    overrides: &CommandOverrides,
    request: &SpawnRequest<'_>,
) -> CommandSpec {
    let configured: Option<Vec<&str>> = overrides
        .base_command_override
        .as_deref()
        .map(|base| base.split_whitespace().collect())
        .filter(|tokens: &Vec<&str>| !tokens.is_empty());
    let tokens = configured.unwrap_or_else(|| default.to_vec());

    let (program, base_args) = match tokens.split_first() {
        Some((program, rest)) => (*program, rest),
        None => ("", &[][..]),
    };
    CommandSpec::new(program, request.cwd).args(base_args.iter().copied())
}

/// Append configured extra arguments and the environment layers.
pub(crate) fn finish_spec(
    spec: CommandSpec,
    overrides: &CommandOverrides,
    request: &SpawnRequest<'_>,
) -> CommandSpec {
    let configured_env = overrides
        .env
        .iter()
        .flatten()
        .map(|(k, v)| (k.as_str(), v.as_str()));
    let env = merge_env(
        request.env,
        DEFAULT_BACKEND_ENV.into_iter().chain(configured_env),
    );
    spec.args(overrides.additional_params().iter().cloned())
        .envs(env)
}
