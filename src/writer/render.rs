use std::path::Path;
use std::path::PathBuf;

use handlebars::Handlebars;
use serde::Serialize;

use crate::CommitError;

/// Turns a model into the bytes of an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Renderer {
    /// Handlebars template read from `path` on every render
    Template { path: PathBuf, escape_html: bool },
    /// Compact JSON of the model
    Json,
}

impl Renderer {
    pub fn template(
        path: impl Into<PathBuf>,
        escape_html: bool,
    ) -> Self {
        Renderer::Template {
            path: path.into(),
            escape_html,
        }
    }

    /// Renders `model` for `target`. Nothing is written.
    pub async fn render<T: Serialize + Sync>(
        &self,
        target: &Path,
        model: &T,
    ) -> Result<Vec<u8>, CommitError> {
        match self {
            Renderer::Template { path, escape_html } => {
                let source = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| CommitError::io(path, e))?;
                render_template(&source, model, *escape_html)
                    .map(String::into_bytes)
                    .map_err(|e| CommitError::Render {
                        target: target.to_path_buf(),
                        reason: e.to_string(),
                    })
            }
            Renderer::Json => serde_json::to_vec(model).map_err(|e| CommitError::Render {
                target: target.to_path_buf(),
                reason: format!("failed to marshal data to json: {e}"),
            }),
        }
    }
}

/// Renders a handlebars template string. Unknown fields render empty.
pub fn render_template<T: Serialize>(
    source: &str,
    model: &T,
    escape_html: bool,
) -> Result<String, handlebars::RenderError> {
    let mut handlebars = Handlebars::new();
    if !escape_html {
        // configuration files, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
    }
    handlebars.render_template(source, model)
}
