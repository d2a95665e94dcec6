//! Render, validate and commit.
//!
//! [`CommandWriter::commit`] walks the states
//! `RENDER (memory) -> PRE_CHECK -> WRITE -> POST_COMMAND`:
//!
//! - the model is rendered to bytes first; a render failure touches nothing
//! - with a pre-command and a prior artifact, the artifact is moved aside,
//!   the candidate is written at the real target path and validated, and
//!   the original is moved back whatever the outcome
//! - with a pre-command and no prior artifact, the candidate is deleted
//!   again if validation fails
//! - the real write goes to a sibling temp file that is renamed over the
//!   target, so readers never see a half-written file
//! - a failing post-command does not undo the commit

mod command;
mod render;

pub use command::*;
pub use render::*;


use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::constants::DEFAULT_FILE_MODE;
use crate::file_io::create_parent_dir_if_not_exist;
use crate::file_io::delete_file;
use crate::file_io::file_exists;
use crate::file_io::rename;
use crate::file_io::sibling_path;
use crate::file_io::write_file;
use crate::CommitError;

#[derive(Debug, Clone)]
pub struct CommandWriter {
    target: PathBuf,
    renderer: Renderer,
    pre_command: Option<String>,
    post_command: Option<String>,
    file_mode: u32,
}

impl CommandWriter {
    pub fn new(
        target: impl Into<PathBuf>,
        renderer: Renderer,
    ) -> Self {
        Self {
            target: target.into(),
            renderer,
            pre_command: None,
            post_command: None,
            file_mode: DEFAULT_FILE_MODE,
        }
    }

    pub fn with_pre_command(
        mut self,
        command: Option<String>,
    ) -> Self {
        self.pre_command = command.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_post_command(
        mut self,
        command: Option<String>,
    ) -> Self {
        self.post_command = command.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_file_mode(
        mut self,
        mode: u32,
    ) -> Self {
        self.file_mode = mode;
        self
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Renders `model` and commits it to the target.
    ///
    /// # Errors
    /// - [`CommitError::Render`] / [`CommitError::Io`]: nothing was committed
    /// - [`CommitError::Validation`]: the pre-command rejected the candidate,
    ///   the previous artifact is unchanged
    /// - [`CommitError::ReloadSignal`]: the artifact is committed, only the
    ///   post-command failed
    pub async fn commit<T: Serialize + Sync>(
        &self,
        model: &T,
    ) -> Result<(), CommitError> {
        let content = self.renderer.render(&self.target, model).await?;
        create_parent_dir_if_not_exist(&self.target)?;

        if let Some(command) = &self.pre_command {
            self.pre_check(command, &content).await?;
        }

        self.write_atomically(&content).await?;
        info!("committed {:?}", self.target);

        if let Some(command) = &self.post_command {
            let status = run_command(command).await?;
            if !status.success() {
                return Err(CommitError::ReloadSignal {
                    command: command.clone(),
                    status,
                });
            }
        }
        Ok(())
    }

    async fn pre_check(
        &self,
        command: &str,
        content: &[u8],
    ) -> Result<(), CommitError> {
        if !file_exists(&self.target).await? {
            let result = self.validate_candidate(command, content).await;
            if result.is_err() {
                if let Err(e) = delete_file(&self.target).await {
                    warn!("failed to remove rejected candidate {:?}: {e}", self.target);
                }
            }
            return result;
        }

        let aside = sibling_path(&self.target, "orig");
        rename(&self.target, &aside).await?;

        let result = self.validate_candidate(command, content).await;

        // the original goes back in every case
        if let Err(e) = rename(&aside, &self.target).await {
            error!(
                "failed to restore {:?} from {:?}, manual intervention required: {e}",
                self.target, aside
            );
            return Err(e);
        }
        result
    }

    async fn validate_candidate(
        &self,
        command: &str,
        content: &[u8],
    ) -> Result<(), CommitError> {
        write_file(&self.target, content, self.file_mode).await?;
        let status = run_command(command).await?;
        if status.success() {
            Ok(())
        } else {
            Err(CommitError::Validation {
                command: command.to_string(),
                status,
            })
        }
    }

    async fn write_atomically(
        &self,
        content: &[u8],
    ) -> Result<(), CommitError> {
        let temp = sibling_path(&self.target, "tmp");
        let result = match write_file(&temp, content, self.file_mode).await {
            Ok(()) => rename(&temp, &self.target).await,
            Err(e) => Err(e),
        };
        if result.is_err() {
            if let Err(e) = delete_file(&temp).await {
                warn!("failed to remove temp file {:?}: {e}", temp);
            }
        }
        result
    }
}
