//! Sourcegraph Amp.

use crate::config::{AmpOptions, BackendKind};

use super::registry::{base_spec, finish_spec};
use super::{CommandBuilder, CommandSpec, SpawnRequest};

const BASE_COMMAND: &[&str] = &["npx", "-y", "@sourcegraph/amp@latest"];

impl CommandBuilder for AmpOptions {
    fn kind(&self) -> BackendKind {
        BackendKind::Amp
    }

    fn build(&self, request: &SpawnRequest<'_>) -> CommandSpec {
        let mut spec = base_spec(BASE_COMMAND, &self.cmd, request).arg("--stream-json");
        if self.dangerously_allow_all {
            spec = spec.arg("--dangerously-allow-all");
        }
        finish_spec(spec, &self.cmd, request)
            .args(["--execute".to_string(), self.cmd.combine_prompt(request.prompt)])
    }
}
