//! Share sinks available from the command line.

use async_trait::async_trait;
use serde::Serialize;
use smartshare_core::{ShareHint, TargetRef};
use smartshare_processing::{ShareError, ShareSink};
use std::io::Write;
use std::process::Stdio;

/// What a manifest sink prints: the hint plus the targets, in batch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareManifest {
    pub mime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_app: Option<String>,
    pub targets: Vec<TargetRef>,
}

impl ShareManifest {
    pub fn new(targets: &[TargetRef], hint: &ShareHint) -> Self {
        Self {
            mime: hint.mime.clone(),
            target_app: hint.target_app.clone(),
            targets: targets.to_vec(),
        }
    }
}

/// Prints a JSON manifest to stdout for whatever consumes this process's output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestShareSink;

#[async_trait]
impl ShareSink for ManifestShareSink {
    async fn share(&self, targets: &[TargetRef], hint: &ShareHint) -> Result<(), ShareError> {
        let manifest = ShareManifest::new(targets, hint);
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| ShareError::HandOffFailed(e.to_string()))?;

        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", json)?;
        stdout.flush()?;
        Ok(())
    }
}

/// Launches a program with the published paths as trailing arguments.
///
/// The hint is passed through `SMARTSHARE_SHARE_MIME` and, when set,
/// `SMARTSHARE_SHARE_TARGET`. The program is not waited for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandShareSink {
    program: String,
    args: Vec<String>,
}

impl CommandShareSink {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a command line on whitespace: `"xdg-open"`, `"gallery --import"`.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(String::from);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl ShareSink for CommandShareSink {
    async fn share(&self, targets: &[TargetRef], hint: &ShareHint) -> Result<(), ShareError> {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.args)
            .args(targets.iter().map(|t| t.path.as_os_str()))
            .env("SMARTSHARE_SHARE_MIME", &hint.mime)
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        if let Some(target_app) = &hint.target_app {
            command.env("SMARTSHARE_SHARE_TARGET", target_app);
        }

        let child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                ShareError::Unavailable(format!("{}: {}", self.program, e))
            }
            _ => ShareError::Io(e),
        })?;

        tracing::debug!(
            program = %self.program,
            pid = child.id(),
            count = targets.len(),
            "Share command launched"
        );

        Ok(())
    }
}
