//! Command execution for cluster tooling

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::common::{Error, Result};

/// kubectl bound to one kube config
#[derive(Debug, Clone)]
pub struct Kubectl {
    binary: PathBuf,
    kubeconfig: Option<PathBuf>,
}

impl Kubectl {
    /// Resolve the kubectl binary, preferring an explicit path over PATH
    pub fn locate(explicit: Option<&Path>, kubeconfig: Option<&Path>) -> Result<Self> {
        let binary = match explicit {
            Some(path) => path.to_path_buf(),
            None => which::which("kubectl").map_err(|_| Error::ToolNotFound("kubectl".into()))?,
        };
        Ok(Self {
            binary,
            kubeconfig: kubeconfig.map(Path::to_path_buf),
        })
    }

    pub async fn run(&self, args: &[String], stdin: Option<String>) -> Result<String> {
        let mut full = Vec::with_capacity(args.len() + 2);
        if let Some(kubeconfig) = &self.kubeconfig {
            full.push("--kubeconfig".to_string());
            full.push(kubeconfig.display().to_string());
        }
        full.extend_from_slice(args);
        exec(&self.binary, &full, stdin).await
    }
}

/// Run a tool to completion, feeding `stdin` and returning stdout
///
/// A non-zero exit status is an error carrying the tool's stderr.
pub async fn exec(binary: &Path, args: &[String], stdin: Option<String>) -> Result<String> {
    let shown = format!("{} {}", binary.display(), args.join(" "));
    debug!(command = %shown, "Executing");

    let mut child = TokioCommand::new(binary)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::command_failed(&shown, &e.to_string()))?;

    if let Some(input) = stdin {
        let mut pipe = child
            .stdin
            .take()
            .ok_or_else(|| Error::command_failed(&shown, "stdin not captured"))?;
        pipe.write_all(input.as_bytes()).await?;
        // Closing stdin lets the tool see EOF
        drop(pipe);
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            format!("exit status {:?}", output.status.code())
        } else {
            stderr.into_owned()
        };
        return Err(Error::command_failed(&shown, &message));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
