//! Turning a directory tree into [`Document`]s.
//!
//! Plain text is read directly; `.docx` goes through `pandoc -t plain` and
//! `.pdf` through `pdftotext`. Both tools must be on `PATH` for those formats;
//! a file that fails to convert is logged and skipped.
//!
//! Categories come from a `CONTEXT.yml` next to the file:
//!
//! ```yaml
//! categories: [lore, glauben]
//! overwrites:
//!   lieder.txt:
//!     categories: [lieder]
//! ```
//!
//! A per-file entry under `overwrites` replaces the directory's categories.

use crate::error::{Result, RetrieverError};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Name of the per-directory category file.
pub const CONTEXT_FILE: &str = "CONTEXT.yml";

/// A source document as seen by the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub categories: BTreeSet<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            categories: BTreeSet::new(),
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    PlainText,
    Docx,
    Pdf,
}

impl DocumentKind {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "md" => Some(Self::PlainText),
            "docx" => Some(Self::Docx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ContextFile {
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    overwrites: HashMap<String, ContextFile>,
}

/// Category files parsed so far, keyed by directory.
#[derive(Default)]
struct CategoryResolver {
    contexts: HashMap<PathBuf, Option<ContextFile>>,
}

impl CategoryResolver {
    async fn categories_for(&mut self, path: &Path) -> BTreeSet<String> {
        let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        if !self.contexts.contains_key(&dir) {
            let context = load_context(&dir).await;
            self.contexts.insert(dir.clone(), context);
        }

        let Some(Some(context)) = self.contexts.get(&dir) else {
            return BTreeSet::new();
        };

        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        match context.overwrites.get(file_name) {
            Some(overwrite) => overwrite.categories.iter().cloned().collect(),
            None => context.categories.iter().cloned().collect(),
        }
    }
}

async fn load_context(dir: &Path) -> Option<ContextFile> {
    let path = dir.join(CONTEXT_FILE);
    let raw = tokio::fs::read_to_string(&path).await.ok()?;
    match serde_yaml::from_str::<ContextFile>(&raw) {
        Ok(context) => Some(context),
        Err(e) => {
            tracing::warn!("Ignoring unparsable {}: {e}", path.display());
            None
        }
    }
}

/// Walk `root` and load every supported file.
///
/// Hidden and git-ignored files are skipped. Documents come back sorted by path.
pub async fn parse_documents(root: &Path) -> Result<Vec<Document>> {
    if !root.exists() {
        return Err(RetrieverError::Documents {
            path: root.to_path_buf(),
            source: anyhow::anyhow!("path does not exist"),
        });
    }

    let mut paths = Vec::new();
    for entry in ignore::WalkBuilder::new(root)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build()
    {
        match entry {
            Ok(entry) if entry.file_type().is_some_and(|t| t.is_file()) => {
                paths.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed accessing entry under {}: {e}", root.display()),
        }
    }

    let mut resolver = CategoryResolver::default();
    let mut documents = Vec::new();

    for path in paths {
        let Some(kind) = DocumentKind::from_path(&path) else {
            tracing::debug!("Skipping unsupported file {}", path.display());
            continue;
        };

        let text = match read_text(&path, kind).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Skipping {}: {e:#}", path.display());
                continue;
            }
        };

        let categories = resolver.categories_for(&path).await;
        tracing::debug!(
            "Parsed {} ({} chars, categories {:?})",
            path.display(),
            text.chars().count(),
            categories
        );

        documents.push(Document {
            id: path.to_string_lossy().into_owned(),
            text,
            categories,
        });
    }

    tracing::info!("Parsed {} documents from {}", documents.len(), root.display());
    Ok(documents)
}

async fn read_text(path: &Path, kind: DocumentKind) -> anyhow::Result<String> {
    match kind {
        DocumentKind::PlainText => {
            let bytes = tokio::fs::read(path).await?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        DocumentKind::Docx => {
            let mut command = Command::new("pandoc");
            command.args(["-t", "plain"]).arg(path);
            run_converter(&mut command).await
        }
        DocumentKind::Pdf => {
            let mut command = Command::new("pdftotext");
            command.arg(path).arg("-");
            run_converter(&mut command).await
        }
    }
}

async fn run_converter(command: &mut Command) -> anyhow::Result<String> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();
    let output = command
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("failed to run {program}: {e}"))?;

    if !output.status.success() {
        anyhow::bail!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
