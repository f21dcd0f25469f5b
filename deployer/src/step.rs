use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum StepError {
    #[error("Unable to locate the {program} binary: {source}")]
    NotFound {
        program: String,
        #[source]
        source: which::Error,
    },
    #[error("An error occured during the spawn of step {step}: {source}")]
    Spawn {
        step: String,
        #[source]
        source: std::io::Error,
    },
    #[error("An error occured while reading the output of step {step}: {source}")]
    Io {
        step: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Step {step} timed out after {timeout:?}")]
    Timeout { step: String, timeout: Duration },
    #[error("Step {step} failed with exit code {code:?}, stderr: \"{stderr}\"")]
    Failed {
        step: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// An opaque action run before the manifests are applied,
/// such as building or pushing the container image.
#[async_trait]
pub trait ExternalStep: Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Run the step to completion and return the lines it printed.
    async fn run(&self) -> Result<Vec<String>, StepError>;
}

/// A step backed by an external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStep {
    name: String,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandStep {
    pub fn new<I, S>(name: impl Into<String>, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: Duration::from_secs(600),
        }
    }

    /// `docker build -t <tag> <context>`
    pub fn docker_build(context: &Path, tag: &str) -> Self {
        Self::new(
            "build",
            "docker",
            [
                "build".to_string(),
                "-t".to_string(),
                tag.to_string(),
                context.display().to_string(),
            ],
        )
    }

    /// `docker push <tag>`
    pub fn docker_push(tag: &str) -> Self {
        Self::new("push", "docker", ["push", tag])
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl ExternalStep for CommandStep {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(name = "CommandStep::run", skip(self))]
    async fn run(&self) -> Result<Vec<String>, StepError> {
        let program = which::which(&self.program).map_err(|source| StepError::NotFound {
            program: self.program.clone(),
            source,
        })?;

        debug!("{} {}", program.display(), self.args.join(" "));

        let mut child = Command::new(&program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| StepError::Spawn {
                step: self.name.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let execution = async {
            let read_stdout = async {
                let mut lines = Vec::new();
                if let Some(stdout) = stdout {
                    let mut reader = BufReader::new(stdout).lines();
                    while let Some(line) = reader.next_line().await? {
                        info!(step = %self.name, "{}", line);
                        lines.push(line);
                    }
                }
                Ok::<_, std::io::Error>(lines)
            };
            let read_stderr = async {
                let mut buffer = String::new();
                if let Some(mut stderr) = stderr {
                    stderr.read_to_string(&mut buffer).await?;
                }
                Ok::<_, std::io::Error>(buffer)
            };

            let (lines, stderr) = tokio::try_join!(read_stdout, read_stderr)?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((lines, stderr, status))
        };

        let (lines, stderr, status) = tokio::time::timeout(self.timeout, execution)
            .await
            .map_err(|_| StepError::Timeout {
                step: self.name.clone(),
                timeout: self.timeout,
            })?
            .map_err(|source| StepError::Io {
                step: self.name.clone(),
                source,
            })?;

        if !status.success() {
            error!("Step {} failed : {}", self.name, stderr);
            return Err(StepError::Failed {
                step: self.name.clone(),
                code: status.code(),
                stderr,
            });
        }

        Ok(lines)
    }
}
