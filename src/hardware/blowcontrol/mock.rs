use std::{
    collections::VecDeque,
    io,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::sleep;

use super::{
    defs::Command,
    protocol::{CommandOutput, CommandRunner, ExecError},
};

/// Scripted stand-in for the bridge program.
pub struct MockRunner {
    available: bool,
    probe_delay: Duration,
    run_delay: Duration,
    probes: AtomicUsize,
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: Mutex<Vec<Command>>,
}

#[derive(Clone, Debug)]
pub enum Reply {
    Output(CommandOutput),
    Unavailable,
    Timeout,
    Io,
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            available: true,
            probe_delay: Duration::ZERO,
            run_delay: Duration::ZERO,
            probes: AtomicUsize::new(0),
            replies: Mutex::default(),
            fallback: Reply::ok(""),
            calls: Mutex::default(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    pub fn with_run_delay(mut self, delay: Duration) -> Self {
        self.run_delay = delay;
        self
    }

    /// Reply used once the queue of scripted replies is exhausted.
    pub fn with_fallback(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    pub fn reply(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Command> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn probe(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        sleep(self.probe_delay).await;
        self.available
    }

    async fn run(&self, command: &Command) -> Result<CommandOutput, ExecError> {
        self.calls.lock().unwrap().push(command.clone());

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        sleep(self.run_delay).await;

        match reply {
            Reply::Output(output) => Ok(output),
            Reply::Unavailable => Err(ExecError::Unavailable(io::ErrorKind::NotFound.into())),
            Reply::Timeout => Err(ExecError::Timeout(Duration::from_secs(10))),
            Reply::Io => Err(ExecError::Io(io::ErrorKind::BrokenPipe.into())),
        }
    }
}

impl Reply {
    pub fn ok(stdout: &str) -> Self {
        Reply::Output(CommandOutput {
            status: Some(0),
            stdout: stdout.to_owned(),
            stderr: String::new(),
        })
    }

    pub fn exit(status: i32, stderr: &str) -> Self {
        Reply::Output(CommandOutput {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.to_owned(),
        })
    }
}
