// ABOUTME: Command runner for System jobs, spawning processes through tokio
// ABOUTME: Captures stdout, stderr and exit code when waiting, or detaches and reports the pid

use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::engine::error::{ExecutionError, Result};
use crate::parser::SystemCommand;

/// What a command left behind.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Completed {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
    Detached {
        pid: Option<u32>,
    },
}

/// The command line as it is shown in logs and errors.
pub fn display_line(config: &SystemCommand) -> String {
    if config.args.is_empty() {
        config.command.clone()
    } else {
        format!("{} {}", config.command, config.args.join(" "))
    }
}

fn build_command(config: &SystemCommand) -> Command {
    let mut cmd = if config.shell {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(display_line(config));
        cmd
    } else {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);
        cmd
    };

    if let Some(ref env) = config.env {
        for (key, value) in env {
            cmd.env(key, value);
        }
    }

    if let Some(ref cwd) = config.cwd {
        cmd.current_dir(cwd);
    }

    cmd
}

/// Run `config` for `job`. A spawn failure is a crash; a non-zero exit is
/// an ignorable `CommandFailed` unless `config.ignore` is set.
pub async fn run(job: &str, config: &SystemCommand) -> Result<CommandOutcome> {
    let line = display_line(config);
    let mut cmd = build_command(config);
    let spawn_error = |e: std::io::Error| ExecutionError::Command {
        job: Some(job.to_string()),
        command: line.clone(),
        message: e.to_string(),
    };

    if !config.wait {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let child = cmd.spawn().map_err(spawn_error)?;
        let pid = child.id();
        info!("Started command '{}' for job '{}' (pid {:?})", line, job, pid);
        return Ok(CommandOutcome::Detached { pid });
    }

    debug!("Running command '{}' for job '{}'", line, job);
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let output = cmd.output().await.map_err(spawn_error)?;

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    debug!("Command '{}' completed with exit code: {}", line, exit_code);

    if exit_code != 0 {
        if !config.ignore {
            return Err(ExecutionError::CommandFailed {
                job: Some(job.to_string()),
                command: line,
                code: exit_code,
                stderr: stderr.trim().to_string(),
            });
        }
        warn!(
            "Command '{}' exited with code {} (ignored)",
            line, exit_code
        );
    }

    Ok(CommandOutcome::Completed {
        exit_code,
        stdout,
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(line: &str) -> SystemCommand {
        SystemCommand {
            command: line.to_string(),
            args: Vec::new(),
            shell: true,
            wait: true,
            cwd: None,
            env: None,
            ignore: false,
        }
    }

    #[tokio::test]
    async fn test_captures_output() {
        let mut config = command("echo");
        config.args = vec!["hello".to_string(), "$GREETING_NAME".to_string()];
        config.env = Some([("GREETING_NAME".to_string(), "world".to_string())].into());

        match run("job", &config).await.unwrap() {
            CommandOutcome::Completed {
                exit_code, stdout, ..
            } => {
                assert_eq!(exit_code, 0);
                assert_eq!(stdout.trim(), "hello world");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let config = command("exit 3");
        let error = run("job", &config).await.unwrap_err();
        assert!(matches!(
            error,
            ExecutionError::CommandFailed { code: 3, .. }
        ));
        assert!(error.is_ignorable());

        let mut config = command("exit 3");
        config.ignore = true;
        assert!(matches!(
            run("job", &config).await.unwrap(),
            CommandOutcome::Completed { exit_code: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_a_crash() {
        let mut config = command("/definitely/not/a/binary");
        config.shell = false;
        let error = run("job", &config).await.unwrap_err();
        assert!(matches!(error, ExecutionError::Command { .. }));
        assert!(!error.is_ignorable());
    }
}
