//! Subprocess execution with logging and timeouts.
//!
//! All external commands go through [`Cmd`]. Each run is logged at debug
//! level before it starts and again when it finishes, as one trace line:
//!
//! ```text
//! [rd-trace] ts=1234 tid=3 context=my-repo cmd="git status --porcelain" dur_us=5120 ok=true
//! ```

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::OnceLock;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use wait_timeout::ChildExt;

/// Start of the process, for relative `ts=` values.
static PROCESS_START: OnceLock<Instant> = OnceLock::new();

/// Builder for one external command.
///
/// ```ignore
/// let output = Cmd::new("git")
///     .args(["status", "--porcelain"])
///     .current_dir(&repo_path)
///     .context("my-repo")
///     .timeout(Duration::from_secs(10))
///     .run()?;
/// ```
#[derive(Debug, Clone)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    context: Option<String>,
    timeout: Option<Duration>,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            context: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Label for log lines, usually the repository name.
    pub fn context(mut self, ctx: impl Into<String>) -> Self {
        self.context = Some(ctx.into());
        self
    }

    /// Kill the process if it runs longer than `limit`.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Run to completion and return the raw output.
    ///
    /// A non-zero exit is still `Ok`; callers inspect `status`. Spawn
    /// failures are `Err`, as is exceeding the timeout (`ErrorKind::TimedOut`).
    pub fn run(self) -> std::io::Result<Output> {
        let line = self.command_line();
        let ctx = self.context.as_deref().unwrap_or("-");
        log::debug!("$ {line} [{ctx}]");

        let started = Instant::now();
        let ts = started
            .duration_since(*PROCESS_START.get_or_init(Instant::now))
            .as_micros();

        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null());
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        let result = match self.timeout {
            Some(limit) => run_bounded(command, limit),
            None => command.output(),
        };

        let outcome = match &result {
            Ok(output) => format!("ok={}", output.status.success()),
            Err(e) => format!("err=\"{e}\""),
        };
        log::debug!(
            "[rd-trace] ts={ts} tid={} context={ctx} cmd=\"{line}\" dur_us={} {outcome}",
            thread_number(),
            started.elapsed().as_micros(),
        );
        result
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Spawn with piped output and wait at most `limit`; on expiry kill and reap
/// the child.
fn run_bounded(mut command: Command, limit: Duration) -> std::io::Result<Output> {
    let mut child = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Both pipes are drained while waiting so the child never blocks on a
    // full pipe buffer
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let Some(status) = child.wait_timeout(limit)? else {
        kill_and_reap(&mut child);
        let _ = (stdout.join(), stderr.join());
        return Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("timed out after {:.1}s", limit.as_secs_f32()),
        ));
    };
    Ok(collect(status, stdout, stderr))
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::debug!("failed to kill timed-out process {}: {e}", child.id());
    }
    let _ = child.wait();
}

fn collect(status: ExitStatus, stdout: JoinHandle<Vec<u8>>, stderr: JoinHandle<Vec<u8>>) -> Output {
    Output {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    }
}

/// Numeric part of the current `ThreadId` (its Debug form is `ThreadId(N)`).
fn thread_number() -> u64 {
    format!("{:?}", std::thread::current().id())
        .trim_start_matches("ThreadId(")
        .trim_end_matches(')')
        .parse()
        .unwrap_or(0)
}
