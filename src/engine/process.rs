use super::error::EngineError;
use super::transport::{EventSender, Transport, TransportEvent, TransportHandle};
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// Transport backed by an engine child process speaking over stdin/stdout.
///
/// Writes happen on a background task so `send` never blocks the caller.
pub struct ProcessTransport {
    commands: mpsc::UnboundedSender<String>,
}

impl ProcessTransport {
    /// Start the engine binary and wire up its pipes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(path: &Path, args: &[String]) -> Result<TransportHandle, EngineError> {
        let mut child = Command::new(path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EngineError::Unavailable(format!(
                    "failed to start engine '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            EngineError::Unavailable("engine process has no stdin pipe".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            EngineError::Unavailable("engine process has no stdout pipe".to_string())
        })?;

        info!(
            "Started engine process {} (pid {:?})",
            path.display(),
            child.id()
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let failures = FailureReporter::new(event_tx.clone());

        tokio::spawn(write_commands(stdin, command_rx, failures.clone()));
        tokio::spawn(read_lines(stdout, event_tx, failures));
        tokio::spawn(reap(child));

        Ok(TransportHandle::new(
            ProcessTransport {
                commands: command_tx,
            },
            event_rx,
        ))
    }
}

impl Transport for ProcessTransport {
    fn send(&mut self, command: &str) {
        // A closed channel means the writer already reported the failure
        if self.commands.send(command.to_string()).is_err() {
            debug!("Dropping '{}': engine writer has stopped", command);
        }
    }
}

/// Emits at most one `Failed` event however many pipe tasks hit trouble
#[derive(Clone)]
struct FailureReporter {
    events: EventSender,
    reported: Arc<AtomicBool>,
}

impl FailureReporter {
    fn new(events: EventSender) -> Self {
        Self {
            events,
            reported: Arc::new(AtomicBool::new(false)),
        }
    }

    fn report(&self, reason: String) {
        if !self.reported.swap(true, Ordering::SeqCst) {
            error!("Engine transport failed: {}", reason);
            let _ = self.events.send(TransportEvent::Failed(reason));
        }
    }
}

async fn write_commands(
    mut stdin: ChildStdin,
    mut commands: mpsc::UnboundedReceiver<String>,
    failures: FailureReporter,
) {
    while let Some(command) = commands.recv().await {
        trace!("engine <- {}", command);
        let written = async {
            stdin.write_all(command.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        }
        .await;

        if let Err(e) = written {
            failures.report(format!("write to engine failed: {e}"));
            return;
        }
    }
    debug!("Engine command channel closed, closing stdin");
}

async fn read_lines(stdout: ChildStdout, events: EventSender, failures: FailureReporter) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                trace!("engine -> {}", line);
                if events.send(TransportEvent::Line(line)).is_err() {
                    // Nobody is listening any more
                    return;
                }
            }
            Ok(None) => {
                failures.report("engine closed its output".to_string());
                return;
            }
            Err(e) => {
                failures.report(format!("read from engine failed: {e}"));
                return;
            }
        }
    }
}

async fn reap(mut child: Child) {
    match child.wait().await {
        Ok(status) if status.success() => debug!("Engine process exited cleanly"),
        Ok(status) => warn!("Engine process exited with {}", status),
        Err(e) => warn!("Failed to wait for engine process: {}", e),
    }
}
