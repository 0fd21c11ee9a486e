use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

/// File extensions read as reference documents
const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "md", "json"];

/// Reference text assembled at startup, read-only afterwards
#[derive(Debug, Clone)]
pub struct ContextBundle {
    pub text: Arc<str>,
    /// File names that made it into `text`
    pub documents: Vec<String>,
}

impl ContextBundle {
    pub fn empty() -> Self {
        Self {
            text: Arc::from(""),
            documents: Vec::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        !self.text.is_empty()
    }

    pub fn chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// Load every document in `dir` into one text blob.
///
/// Never fails: a missing directory gives an empty context and unreadable
/// documents are logged and skipped. The blob is cut to `max_chars`.
pub fn load_context(dir: &Path, max_chars: usize) -> ContextBundle {
    let mut paths = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_document(path))
            .collect::<Vec<_>>(),
        Err(e) => {
            warn!(
                dir = %dir.display(),
                error = %e,
                "context directory not readable, continuing without context"
            );
            return ContextBundle::empty();
        }
    };
    paths.sort();

    let mut sections = Vec::new();
    let mut documents = Vec::new();
    for path in &paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match read_document(path) {
            Ok(content) if content.is_empty() => {
                warn!(document = %name, "skipping empty document");
            }
            Ok(content) => {
                info!(document = %name, chars = content.chars().count(), "loaded context document");
                sections.push(format!("### {}\n{}", name, content));
                documents.push(name);
            }
            Err(e) => {
                warn!(document = %name, error = %e, "skipping unreadable document");
            }
        }
    }

    let mut text = sections.join("\n\n");
    if let Some((cut, _)) = text.char_indices().nth(max_chars) {
        warn!(max_chars, "context truncated");
        text.truncate(cut);
    }

    info!(documents = documents.len(), chars = text.chars().count(), "reference context ready");
    ContextBundle {
        text: Arc::from(text),
        documents,
    }
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| DOCUMENT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn read_document(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(content.trim().to_string())
}
