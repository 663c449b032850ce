use log::debug;
use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

// @module: Child process execution with timeouts for external engines

/// Failure of an external command
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The executable could not be started
    #[error("Failed to execute {program}: {message}")]
    Spawn {
        program: String,
        message: String,
    },

    /// The command ran longer than allowed
    #[error("{program} timed out after {secs} seconds")]
    Timeout {
        program: String,
        secs: u64,
    },

    /// Talking to the running command failed
    #[error("I/O error with {program}: {message}")]
    Io {
        program: String,
        message: String,
    },

    /// The command exited with a non-zero status
    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Run a command to completion, killing it after `timeout_secs`.
///
/// When `stdin_data` is given it is written to the child's stdin, which is
/// then closed. The write runs alongside output collection and both count
/// against the timeout. A non-zero exit becomes `ProcessError::Failed` with
/// the filtered stderr.
pub async fn run_with_timeout(
    mut command: Command,
    timeout_secs: u64,
    stdin_data: Option<&str>,
) -> Result<Output, ProcessError> {
    let program = command.as_std().get_program().to_string_lossy().to_string();
    debug!("Running {:?}", command.as_std());

    command
        .stdin(if stdin_data.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| ProcessError::Spawn {
        program: program.clone(),
        message: e.to_string(),
    })?;

    let stdin_pipe = child.stdin.take();
    let write_stdin = async move {
        match (stdin_data, stdin_pipe) {
            (Some(data), Some(mut stdin)) => {
                let result = stdin.write_all(data.as_bytes()).await;
                // Dropping stdin closes the pipe so the engine sees EOF
                drop(stdin);
                result
            }
            _ => Ok(()),
        }
    };

    let timeout_duration = Duration::from_secs(timeout_secs);
    let (write_result, wait_result) = match tokio::time::timeout(
        timeout_duration,
        async { tokio::join!(write_stdin, child.wait_with_output()) },
    )
    .await
    {
        Ok(results) => results,
        Err(_) => return Err(ProcessError::Timeout { program, secs: timeout_secs }),
    };

    let output = wait_result.map_err(|e| ProcessError::Io {
        program: program.clone(),
        message: format!("failed to collect output: {}", e),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProcessError::Failed {
            program,
            status: output.status.to_string(),
            stderr: filter_ffmpeg_stderr(&stderr),
        });
    }

    write_result.map_err(|e| ProcessError::Io {
        program: program.clone(),
        message: format!("failed to write stdin: {}", e),
    })?;

    Ok(output)
}

/// Filter ffmpeg stderr to only show meaningful error lines, stripping the
/// version banner, build configuration, and stream metadata noise.
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let dominated_prefixes = [
        "ffmpeg version",
        "ffprobe version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Stream #",
        "encoder",
        "handler_name",
        "Output #",
        "Stream mapping:",
        "Press [q]",
        "frame=",
        "size=",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return false;
            }
            !dominated_prefixes.iter().any(|p| trimmed.starts_with(p))
        })
        .collect();

    if meaningful.is_empty() {
        "unknown error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
