//! Resolved process invocations.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

/// How the prompt reaches the agent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PromptTransport {
    /// The prompt is already part of the argument list; stdin stays detached.
    #[default]
    Argument,
    /// The text is written to stdin, which is then closed.
    Stdin(String),
}

/// A fully resolved, ready-to-launch process invocation.
///
/// Built by a backend once per spawn and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: PathBuf,
    prompt_transport: PromptTransport,
}

impl CommandSpec {
    /// Start a spec for `program` running in `cwd`.
    #[must_use]
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: cwd.into(),
            prompt_transport: PromptTransport::Argument,
        }
    }

    /// Add a single argument. Arguments are never shell-interpreted.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set one environment override.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set several environment overrides; later pairs win.
    #[must_use]
    pub fn envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in envs {
            self.env.insert(key.into(), value.into());
        }
        self
    }

    /// Deliver `text` on stdin instead of as an argument.
    #[must_use]
    pub fn stdin(mut self, text: impl Into<String>) -> Self {
        self.prompt_transport = PromptTransport::Stdin(text.into());
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Environment overrides applied on top of the inherited environment.
    #[must_use]
    pub fn env_overrides(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    #[must_use]
    pub fn prompt_transport(&self) -> &PromptTransport {
        &self.prompt_transport
    }

    /// Render the invocation as a shell-escaped string for logs and previews.
    #[must_use]
    pub fn display_command(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|part| shell_escape::escape(Cow::Borrowed(part.as_str())).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Convert into a `tokio::process::Command` with piped output.
    ///
    /// Stdin is piped only when the prompt travels over it.
    #[must_use]
    pub fn to_tokio_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(&self.env)
            .current_dir(&self.cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        match self.prompt_transport {
            PromptTransport::Argument => cmd.stdin(Stdio::null()),
            PromptTransport::Stdin(_) => cmd.stdin(Stdio::piped()),
        };

        cmd
    }
}
