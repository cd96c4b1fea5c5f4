use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

use super::confirm::Confirm;
use super::{Arguments, Capability};
use crate::context::Context;
use crate::errors::{CapabilityError, CapabilityResult};
use crate::models::capability::{CapabilityDescriptor, Parameter};

pub const DECLINED: &str = "user declined script execution";

/// Captured outcome of a finished script. A non-zero status is data, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs a script through an interpreter after the operator approves it.
pub struct ScriptCapability {
    descriptor: CapabilityDescriptor,
    kind: String,
    program: String,
    args: Vec<String>,
    confirm: Arc<dyn Confirm>,
}

impl ScriptCapability {
    /// `kind` is the human name of the script language shown in the confirmation
    /// prompt; the script text is appended after `args` when invoking `program`.
    pub fn new<N, D>(
        name: N,
        description: D,
        kind: &str,
        program: &str,
        args: &[&str],
        confirm: Arc<dyn Confirm>,
    ) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        let descriptor = CapabilityDescriptor::new(name, description).with_parameter(
            "script",
            Parameter::string(format!("The {} script to execute", kind)).required(),
        );

        Self {
            descriptor,
            kind: kind.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            confirm,
        }
    }

    #[cfg(not(windows))]
    pub fn shell(confirm: Arc<dyn Confirm>) -> Self {
        Self::new(
            "execute_shell_script",
            "Executes shell script and returns its stdout, stderr and status",
            "shell",
            "sh",
            &["-c"],
            confirm,
        )
    }

    #[cfg(windows)]
    pub fn shell(confirm: Arc<dyn Confirm>) -> Self {
        Self::new(
            "execute_shell_script",
            "Executes powershell script and returns its stdout, stderr and status",
            "powershell",
            "powershell",
            &["-Command"],
            confirm,
        )
    }

    pub fn python(confirm: Arc<dyn Confirm>) -> Self {
        Self::new(
            "execute_python_script",
            "Executes python script and returns its stdout, stderr and status. \
             Use print statements to produce output.",
            "python",
            "python",
            &["-c"],
            confirm,
        )
    }

    fn prompt(&self, script: &str) -> String {
        format!(
            "I need to execute the following {} script:\n\n{}\n\nDo you want to proceed?",
            self.kind, script
        )
    }

    async fn ask(&self, script: &str) -> CapabilityResult<bool> {
        let confirm = Arc::clone(&self.confirm);
        let prompt = self.prompt(script);
        tokio::task::spawn_blocking(move || confirm.confirm(&prompt))
            .await
            .map_err(|e| CapabilityError::ExecutionError(e.to_string()))?
            .map_err(|e| {
                CapabilityError::ExecutionError(format!(
                    "failed to ask user if script execution is allowed, so it was not: {}",
                    e
                ))
            })
    }

    async fn execute(&self, ctx: &Context, script: &str) -> CapabilityResult<ScriptOutput> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CapabilityError::ExecutionError(format!("failed to execute script: {}", e))
            })?;

        let output = ctx
            .run_until_cancelled(child.wait_with_output())
            .await
            .ok_or(CapabilityError::Cancelled)?
            .map_err(|e| {
                CapabilityError::ExecutionError(format!("failed to execute script: {}", e))
            })?;

        Ok(ScriptOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait]
impl Capability for ScriptCapability {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn call(&self, ctx: &Context, args: Arguments) -> CapabilityResult<Value> {
        let script = args.string("script")?;

        if !self.ask(script).await? {
            return Ok(json!(DECLINED));
        }

        let output = self.execute(ctx, script).await?;
        debug!(program = %self.program, status = ?output.status, "script finished");
        Ok(json!(output))
    }
}
