//! Helpers for running child processes with an optional timeout and a log file.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

type SharedLog = Arc<Mutex<BufWriter<File>>>;

/// Outcome of a child process whose output went to a log file.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    /// Leading stderr bytes, kept for reporting.
    pub stderr: Vec<u8>,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stderr_text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stderr).into_owned();
        if self.stderr_truncated > 0 {
            text.push_str(&format!("\n[stderr truncated {} bytes]\n", self.stderr_truncated));
        }
        text
    }
}

/// Run a command, streaming stdout and stderr line by line into `log_path`.
///
/// The log is created (truncated) before spawning. Both pipes are drained
/// concurrently so the child never blocks on a full pipe. Up to
/// `stderr_limit_bytes` of stderr are also returned in memory. With
/// `timeout: None` the call waits for the child indefinitely.
///
/// With a timeout the child leads its own process group, and on expiry the
/// whole group is killed, so grandchildren holding the pipes die with it.
#[instrument(skip_all, fields(log = %log_path.display(), timeout_secs = timeout.map(|t| t.as_secs())))]
pub fn run_command_to_log(
    mut cmd: Command,
    log_path: &Path,
    timeout: Option<Duration>,
    stderr_limit_bytes: usize,
) -> Result<CommandOutput> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create log dir {}", parent.display()))?;
    }
    let file = File::create(log_path)
        .with_context(|| format!("create log file {}", log_path.display()))?;
    let log: SharedLog = Arc::new(Mutex::new(BufWriter::new(file)));

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        if timeout.is_some() {
            cmd.process_group(0);
        }
    }

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_log = Arc::clone(&log);
    let stdout_handle = thread::spawn(move || tee_lines(stdout, 0, &stdout_log));
    let stderr_log = Arc::clone(&log);
    let stderr_handle =
        thread::spawn(move || tee_lines(stderr, stderr_limit_bytes, &stderr_log));

    let mut timed_out = false;
    let status = match timeout {
        None => child.wait().context("wait for command")?,
        Some(timeout) => match child.wait_timeout(timeout).context("wait for command")? {
            Some(status) => status,
            None => {
                warn!(
                    timeout_secs = timeout.as_secs(),
                    "command timed out, killing"
                );
                timed_out = true;
                kill_process_group(&mut child).context("kill command")?;
                child.wait().context("wait command after kill")?
            }
        },
    };

    join_reader(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_reader(stderr_handle).context("join stderr")?;

    let mut writer = log
        .lock()
        .map_err(|_| anyhow!("log writer lock poisoned"))?;
    if timed_out {
        writeln!(writer, "[timed out after {:?}]", timeout.unwrap_or_default())
            .context("write log")?;
    }
    writer
        .flush()
        .with_context(|| format!("flush log {}", log_path.display()))?;

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stderr,
        stderr_truncated,
        timed_out,
    })
}

/// Kill the child and everything in its process group.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) -> std::io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = i32::try_from(child.id()).map_err(std::io::Error::other)?;
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        // Already gone.
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(errno.into()),
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}

fn join_reader(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

/// Copy every line of `reader` into the shared log, keeping the first `limit` bytes.
fn tee_lines<R: Read>(reader: R, limit: usize, log: &SharedLog) -> Result<(Vec<u8>, usize)> {
    let mut buf_reader = BufReader::new(reader);
    let mut collected = Vec::new();
    let mut truncated = 0usize;

    loop {
        let mut line = Vec::new();
        let n = buf_reader
            .read_until(b'\n', &mut line)
            .context("read line")?;
        if n == 0 {
            break;
        }

        if let Ok(mut writer) = log.lock()
            && let Err(e) = writer.write_all(&line)
        {
            warn!(err = %e, "failed to write to log file");
        }

        let remaining = limit.saturating_sub(collected.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            collected.extend_from_slice(&line[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((collected, truncated))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn streams_both_pipes_into_log() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = temp.path().join("nested/run.log");

        let output = run_command_to_log(sh("echo out; echo err >&2"), &log, None, 1024)
            .expect("run");

        assert!(output.status.success());
        assert!(!output.timed_out);
        assert_eq!(output.stderr, b"err\n");
        let contents = std::fs::read_to_string(&log).expect("read log");
        assert!(contents.contains("out\n"));
        assert!(contents.contains("err\n"));
    }

    #[test]
    fn reports_non_zero_exit() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = temp.path().join("run.log");

        let output = run_command_to_log(sh("exit 3"), &log, None, 1024).expect("run");
        assert_eq!(output.status.code(), Some(3));
    }

    #[test]
    fn truncates_captured_stderr() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = temp.path().join("run.log");

        let output =
            run_command_to_log(sh("echo 0123456789 >&2"), &log, None, 4).expect("run");
        assert_eq!(output.stderr, b"0123");
        assert_eq!(output.stderr_truncated, 7);
        assert!(output.stderr_text().contains("truncated 7 bytes"));
    }

    #[test]
    fn kills_on_timeout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = temp.path().join("run.log");

        let output = run_command_to_log(
            sh("exec sleep 5"),
            &log,
            Some(Duration::from_millis(100)),
            1024,
        )
        .expect("run");
        assert!(output.timed_out);
        assert!(!output.status.success());
    }

    #[test]
    fn timeout_kills_grandchildren_holding_the_pipes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = temp.path().join("run.log");

        let started = std::time::Instant::now();
        let output = run_command_to_log(
            sh("sleep 6; echo after"),
            &log,
            Some(Duration::from_millis(200)),
            1024,
        )
        .expect("run");

        assert!(output.timed_out);
        assert!(
            started.elapsed() < Duration::from_secs(3),
            "phase outlived its timeout: {:?}",
            started.elapsed()
        );
        let contents = std::fs::read_to_string(&log).expect("read log");
        assert!(!contents.contains("after"));
        assert!(contents.contains("[timed out after"));
    }
}
