use std::{fmt, io, path::PathBuf, process::Stdio, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{process, time::timeout};

use crate::config::{CoordinatorConfig, DeviceConfig};

use super::defs::Command;

/* === Definitions === */

/// Something that can execute bridge commands on behalf of the coordinator.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Checks whether the bridge can be launched at all.
    async fn probe(&self) -> bool;

    async fn run(&self, command: &Command) -> Result<CommandOutput, ExecError>;
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Bridge program could not be launched: {0}")]
    Unavailable(#[source] io::Error),

    #[error("Bridge program did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Bridge program I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Runs the `blowcontrol` program as a child process.
pub struct Cli {
    program: PathBuf,
    env: [(&'static str, String); 5],
    timeout: Duration,
}

struct MaskedEnv<'a>(&'a [(&'static str, String)]);

/* === Implementations === */

impl Cli {
    const PROBE_ARG: &'static str = "--help";

    pub fn new(program: impl Into<PathBuf>, device: &DeviceConfig, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            env: device.env(),
            timeout,
        }
    }

    pub fn from_config(device: &DeviceConfig, config: &CoordinatorConfig) -> Self {
        Self::new(config.program.clone(), device, config.command_timeout())
    }

    fn process<I, S>(&self, args: I) -> process::Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut process = process::Command::new(&self.program);

        process
            .args(args)
            .envs(self.env.iter().map(|(key, value)| (key, value)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        process
    }
}

#[async_trait]
impl CommandRunner for Cli {
    async fn probe(&self) -> bool {
        let child = self
            .process([Self::PROBE_ARG])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match child {
            Ok(mut child) => {
                // Only the launch matters, the exit status of the probe is irrelevant
                let _ = timeout(self.timeout, child.wait()).await;
                true
            }

            Err(err) => {
                tracing::warn!("BlowControl CLI not available ({}): {err}", self.program.display());
                false
            }
        }
    }

    async fn run(&self, command: &Command) -> Result<CommandOutput, ExecError> {
        tracing::debug!(
            "Running {} {command} [{}]",
            self.program.display(),
            MaskedEnv(&self.env)
        );

        let child = self
            .process(command.args())
            .spawn()
            .map_err(ExecError::Unavailable)?;

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ExecError::Timeout(self.timeout))??;

        let output = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::debug!("{command} exited with {:?}", output.status);
        tracing::trace!("stdout: {}", output.stdout);
        tracing::trace!("stderr: {}", output.stderr);

        Ok(output)
    }
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

impl fmt::Display for MaskedEnv<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }

            if *key == DeviceConfig::ENV_MQTT_PASSWORD {
                write!(f, "{key}=***")?;
            } else {
                write!(f, "{key}={value}")?;
            }
        }

        Ok(())
    }
}
