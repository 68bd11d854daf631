//! Claude Code.

use crate::config::{BackendKind, ClaudeCodeOptions};

use super::registry::{base_spec, finish_spec};
use super::{CommandBuilder, CommandSpec, SpawnRequest};

const BASE_COMMAND: &[&str] = &[
    "npx",
    "-y",
    "@anthropic-ai/claude-code@latest",
    "-p",
    "--verbose",
    "--output-format=stream-json",
];

impl CommandBuilder for ClaudeCodeOptions {
    fn kind(&self) -> BackendKind {
        BackendKind::ClaudeCode
    }

    fn build(&self, request: &SpawnRequest<'_>) -> CommandSpec {
        let mut spec = base_spec(BASE_COMMAND, &self.cmd, request);

        // Plan mode and permission bypass are mutually exclusive; plan wins.
        if self.plan {
            spec = spec.args(["--permission-mode", "plan"]);
        } else if self.dangerously_skip_permissions {
            spec = spec.arg("--dangerously-skip-permissions");
        }
        if self.approvals {
            spec = spec.args(["--permission-prompt-tool", "stdio"]);
        }
        if let Some(model) = &self.model {
            spec = spec.args(["--model", model.as_str()]);
        }

        finish_spec(spec, &self.cmd, request).arg(self.cmd.combine_prompt(request.prompt))
    }
}
