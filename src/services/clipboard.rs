use crate::models::ClipboardConfig;
use async_trait::async_trait;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Errors writing to the system clipboard
#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("No clipboard command configured")]
    Unavailable,

    #[error("Failed to start clipboard command {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to clipboard command: {0}")]
    Write(#[source] std::io::Error),

    #[error("Clipboard command exited with {0}")]
    Exit(std::process::ExitStatus),
}

/// Destination for "copy to clipboard" actions
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn set_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard backed by an external command that reads the text on stdin
/// (`pbcopy`, `clip`, `xclip -selection clipboard`, `wl-copy`, ...)
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    program: Option<String>,
    args: Vec<String>,
}

impl CommandClipboard {
    pub fn new(config: &ClipboardConfig) -> Self {
        let mut parts = config.command.iter().cloned();
        Self {
            program: parts.next(),
            args: parts.collect(),
        }
    }
}

#[async_trait]
impl Clipboard for CommandClipboard {
    async fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        let program = self.program.as_deref().ok_or(ClipboardError::Unavailable)?;

        let mut child = Command::new(program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ClipboardError::Spawn {
                command: program.to_string(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(ClipboardError::Write)?;
            // Closing stdin lets the command finish
            drop(stdin);
        }

        let status = child.wait().await.map_err(ClipboardError::Write)?;
        if !status.success() {
            return Err(ClipboardError::Exit(status));
        }

        tracing::debug!("Copied {} bytes to clipboard via {}", text.len(), program);
        Ok(())
    }
}
