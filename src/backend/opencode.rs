//! opencode.

use crate::config::{BackendKind, OpencodeOptions};

use super::registry::{base_spec, finish_spec};
use super::{CommandBuilder, CommandSpec, SpawnRequest};

const BASE_COMMAND: &[&str] = &["npx", "-y", "opencode-ai@latest", "run", "--format", "json"];

impl CommandBuilder for OpencodeOptions {
    fn kind(&self) -> BackendKind {
        BackendKind::Opencode
    }

    fn build(&self, request: &SpawnRequest<'_>) -> CommandSpec {
        let mut spec = base_spec(BASE_COMMAND, &self.cmd, request);
        if let Some(model) = &self.model {
            spec = spec.args(["-m", model.as_str()]);
        }
        if let Some(agent) = &self.agent {
            spec = spec.args(["--agent", agent.as_str()]);
        }
        finish_spec(spec, &self.cmd, request).arg(self.cmd.combine_prompt(request.prompt))
    }
}
