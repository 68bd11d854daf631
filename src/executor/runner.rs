//! The `Executor`: resolves a backend once and spawns agents from it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::backend::{resolve, CommandSpec, ExecutionEnv, SpawnRequest};
use crate::config::{BackendKind, ConfigError, Configuration, ExecutorProfile, ExecutorSettings};
use crate::process::{launch, LaunchError};
use crate::stream::Observer;

use super::{ChildHandle, ExecutorError};

/// Spawns agent processes for one configured backend.
///
/// Cheap to clone; holds no process state. Each [`Executor::spawn`] call
/// creates an independent [`ChildHandle`].
#[derive(Debug, Clone)]
pub struct Executor {
    config: Configuration,
    settings: ExecutorSettings,
}

impl Executor {
    #[must_use]
    pub fn new(config: Configuration) -> Self {
        Self {
            config,
            settings: ExecutorSettings::default(),
        }
    }

    /// Parse a JSON configuration blob such as `{"GEMINI": {"yolo": true}}`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the blob is not valid JSON or does not select
    /// exactly one known backend with well-formed options.
    pub fn from_config(raw: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(Configuration::from_json_str(raw)?))
    }

    /// Build from an already-parsed configuration value.
    ///
    /// # Errors
    ///
    /// Same as [`Executor::from_config`], minus JSON syntax errors.
    pub fn from_value(raw: &Value) -> Result<Self, ConfigError> {
        Ok(Self::new(Configuration::parse(raw)?))
    }

    #[must_use]
    pub fn from_profile(profile: ExecutorProfile) -> Self {
        Self::new(profile.agent).with_settings(profile.settings)
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ExecutorSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.config.backend()
    }

    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    #[must_use]
    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// The invocation `spawn` would launch, without launching it.
    #[must_use]
    pub fn command_for(&self, cwd: &Path, prompt: &str, env: &ExecutionEnv) -> CommandSpec {
        resolve(self.config.options()).build(&SpawnRequest::new(cwd, prompt, env))
    }

    /// Launch the configured agent and start draining its output.
    ///
    /// A relative `cwd` is resolved against the current directory.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::Launch` if the working directory is invalid or
    /// the process cannot be created. Nothing is retried.
    pub async fn spawn(
        &self,
        cwd: impl AsRef<Path>,
        prompt: &str,
        env: &ExecutionEnv,
    ) -> Result<ChildHandle, ExecutorError> {
        self.spawn_with_observers(cwd, prompt, env, Vec::new()).await
    }

    /// Like [`Executor::spawn`], with observers attached before the first
    /// line is read.
    ///
    /// # Errors
    ///
    /// Same as [`Executor::spawn`].
    pub async fn spawn_with_observers<I>(
        &self,
        cwd: impl AsRef<Path>,
        prompt: &str,
        env: &ExecutionEnv,
        observers: I,
    ) -> Result<ChildHandle, ExecutorError>
    where
        I: IntoIterator<Item = Arc<dyn Observer>>,
    {
        let cwd = absolute_cwd(cwd.as_ref())?;
        let spec = self.command_for(&cwd, prompt, env);
        tracing::info!(
            backend = %self.backend(),
            command = %spec.display_command(),
            cwd = %cwd.display(),
            "Spawning agent"
        );

        let process = launch(&spec)?;
        Ok(ChildHandle::start(
            process,
            self.backend(),
            &self.settings,
            observers,
        ))
    }
}

fn absolute_cwd(cwd: &Path) -> Result<PathBuf, LaunchError> {
    if cwd.is_absolute() {
        return Ok(cwd.to_path_buf());
    }
    std::env::current_dir()
        .map(|base| base.join(cwd))
        .map_err(|e| LaunchError::WorkingDirectoryInvalid {
            path: cwd.to_path_buf(),
            reason: e.to_string(),
        })
}
