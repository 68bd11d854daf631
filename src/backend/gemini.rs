//! Google Gemini CLI.

use crate::config::{BackendKind, GeminiOptions};

use super::registry::{base_spec, finish_spec};
use super::{CommandBuilder, CommandSpec, SpawnRequest};

const BASE_COMMAND: &[&str] = &["npx", "-y", "@google/gemini-cli@latest"];

impl CommandBuilder for GeminiOptions {
    fn kind(&self) -> BackendKind {
        BackendKind::Gemini
    }

    fn build(&self, request: &SpawnRequest<'_>) -> CommandSpec {
        let mut spec = base_spec(BASE_COMMAND, &self.cmd, request);
        if let Some(model) = &self.model {
            spec = spec.args(["--model", model.as_str()]);
        }
        if self.yolo {
            spec = spec.arg("--yolo");
        }
        finish_spec(spec, &self.cmd, request)
            .args(["--prompt".to_string(), self.cmd.combine_prompt(request.prompt)])
    }
}
