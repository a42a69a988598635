// src/exec/builtins.rs

//! Builtin task handlers available to plan files.

use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use crate::errors::TaskError;

/// Returns its single argument, or all arguments as an array.
pub async fn echo(mut args: Vec<Value>) -> Result<Value, TaskError> {
    if args.len() == 1 {
        return Ok(args.remove(0));
    }
    Ok(Value::Array(args))
}

/// Always fails; the first argument (if any) is the message.
pub async fn fail(args: Vec<Value>) -> Result<Value, TaskError> {
    let msg = match args.first() {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "job failed".to_string(),
    };
    Err(TaskError::failed(msg))
}

/// Sleeps for `args[0]` milliseconds and returns `null`.
pub async fn sleep(args: Vec<Value>) -> Result<Value, TaskError> {
    let ms = args
        .first()
        .and_then(Value::as_u64)
        .ok_or_else(|| TaskError::InvalidArgs("sleep expects a millisecond count".to_string()))?;
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Ok(Value::Null)
}

/// Runs `args[0]` through the platform shell. Remaining arguments are
/// passed as positional parameters (`$1`, `$2`, ...); strings verbatim,
/// anything else as JSON text.
///
/// Returns trimmed stdout. A non-zero exit fails with the exit code and
/// trimmed stderr.
pub async fn shell(args: Vec<Value>) -> Result<Value, TaskError> {
    let mut iter = args.into_iter();
    let script = match iter.next() {
        Some(Value::String(s)) => s,
        _ => {
            return Err(TaskError::InvalidArgs(
                "shell expects a command string as its first parameter".to_string(),
            ));
        }
    };
    let positional: Vec<String> = iter
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect();

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&script).args(&positional);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&script).arg("jobdag").args(&positional);
        c
    };

    // Dropping the future (e.g. on timeout) kills the child.
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(cmd = %script, args = ?positional, "running shell task");
    let output = cmd.output().await?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TaskError::Failed(format!(
            "command exited with code {code}: {}",
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(Value::String(stdout.trim().to_string()))
}
