use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
};

use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    process::{Child, Command},
    sync::Mutex,
    task::JoinHandle,
};
use tracing::warn;

use crate::error::ExecError;

/// Where the process writes its streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    /// Standard output, opened in append mode.
    pub stdout: PathBuf,
    /// Standard error, opened in append mode; `None` merges it into `stdout`.
    pub stderr: Option<PathBuf>,
    /// Also copy both streams to the controller's own console.
    pub echo: bool,
}

impl OutputTarget {
    pub fn new(stdout: impl Into<PathBuf>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: None,
            echo: false,
        }
    }

    pub fn with_stderr(mut self, stderr: impl Into<PathBuf>) -> Self {
        self.stderr = Some(stderr.into());
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

/// Files opened for one launch, waiting to be wired into a spawned child.
pub(crate) enum Redirect {
    /// Streams go straight into the files.
    Direct,
    /// Streams are piped and pumped by background copiers.
    Echo {
        out: Arc<Mutex<File>>,
        err: Arc<Mutex<File>>,
    },
}

async fn open_append(path: &Path) -> Result<File, ExecError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| ExecError::Redirect {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Open the target files and configure the command's stdio.
pub(crate) async fn attach(
    cmd: &mut Command,
    target: &OutputTarget,
) -> Result<Redirect, ExecError> {
    let out = open_append(&target.stdout).await?;
    let err = match &target.stderr {
        Some(path) => Some(open_append(path).await?),
        None => None,
    };

    cmd.stdin(Stdio::null());

    if target.echo {
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let out = Arc::new(Mutex::new(out));
        let err = match err {
            Some(file) => Arc::new(Mutex::new(file)),
            None => Arc::clone(&out),
        };
        return Ok(Redirect::Echo { out, err });
    }

    let out = out.into_std().await;
    let err = match err {
        Some(file) => file.into_std().await,
        None => out.try_clone()?,
    };
    cmd.stdout(Stdio::from(out));
    cmd.stderr(Stdio::from(err));
    Ok(Redirect::Direct)
}

/// Copiers started for an echoing launch.
pub(crate) struct Pumps {
    tasks: Vec<JoinHandle<()>>,
}

impl Pumps {
    /// Wait until both copiers drained their pipes.
    pub(crate) async fn finish(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

impl Redirect {
    /// Start copying piped output, if any.
    pub(crate) fn start(self, child: &mut Child) -> Pumps {
        let mut tasks = Vec::new();
        if let Redirect::Echo { out, err } = self {
            if let Some(stdout) = child.stdout.take() {
                tasks.push(tokio::spawn(pump(stdout, out, tokio::io::stdout())));
            }
            if let Some(stderr) = child.stderr.take() {
                tasks.push(tokio::spawn(pump(stderr, err, tokio::io::stderr())));
            }
        }
        Pumps { tasks }
    }
}

async fn pump<R, W>(reader: R, file: Arc<Mutex<File>>, mut console: W)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                {
                    let mut file = file.lock().await;
                    if let Err(e) = file.write_all(&line).await {
                        warn!(target: "qjob.exec.proc", error = %e, "output file write failed");
                    }
                }
                let _ = console.write_all(&line).await;
            }
            Err(e) => {
                warn!(target: "qjob.exec.proc", error = %e, "reading child output failed");
                break;
            }
        }
    }
    let _ = file.lock().await.flush().await;
    let _ = console.flush().await;
}
