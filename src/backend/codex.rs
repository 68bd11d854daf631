//! OpenAI Codex CLI.

use crate::config::{BackendKind, CodexOptions};

use super::registry::{base_spec, finish_spec};
use super::{CommandBuilder, CommandSpec, SpawnRequest};

const BASE_COMMAND: &[&str] = &["npx", "-y", "@openai/codex@latest", "exec", "--json"];

impl CommandBuilder for CodexOptions {
    fn kind(&self) -> BackendKind {
        BackendKind::Codex
    }

    fn build(&self, request: &SpawnRequest<'_>) -> CommandSpec {
        let mut spec = base_spec(BASE_COMMAND, &self.cmd, request);
        if let Some(model) = &self.model {
            spec = spec.args(["--model", model.as_str()]);
        }
        if let Some(sandbox) = self.sandbox {
            spec = spec.args(["--sandbox", sandbox.as_str()]);
        }
        if self.dangerously_bypass_approvals_and_sandbox {
            spec = spec.arg("--dangerously-bypass-approvals-and-sandbox");
        }
        spec = spec.arg("--skip-git-repo-check");
        finish_spec(spec, &self.cmd, request).arg(self.cmd.combine_prompt(request.prompt))
    }
}
