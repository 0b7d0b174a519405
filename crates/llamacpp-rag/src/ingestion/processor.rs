//! Ingestion pipeline: parse, split, embed, store

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

use crate::cache::AnswerCache;
use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::storage::VectorStoreProvider;
use crate::types::{Chunk, FileType, IngestResult};

use super::parser::{hash_content, FileParser};
use super::splitter::TokenTextSplitter;

/// Loads files into the vector store.
///
/// Per-file problems become warnings on the returned [`IngestResult`]; a run
/// never fails because of one bad file.
pub struct DocumentIngestor {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    splitter: TokenTextSplitter,
    batch_size: usize,
    replace_existing: bool,
    cache: Option<Arc<AnswerCache>>,
}

/// What parsing and splitting one file produced
struct SplitFile {
    documents: usize,
    chunks: Vec<Chunk>,
}

impl DocumentIngestor {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        splitter: TokenTextSplitter,
    ) -> Self {
        Self {
            embedder,
            store,
            splitter,
            batch_size: 32,
            replace_existing: true,
            cache: None,
        }
    }

    /// Build from the chunking, embedding and ingestion sections of `config`
    pub fn from_config(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
    ) -> Self {
        Self::new(
            embedder,
            store,
            TokenTextSplitter::new(config.chunking.clone()),
        )
        .with_batch_size(config.embeddings.batch_size)
        .with_replace_existing(config.ingestion.replace_existing)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_replace_existing(mut self, replace_existing: bool) -> Self {
        self.replace_existing = replace_existing;
        self
    }

    /// Answer cache cleared after a run that stored chunks
    pub fn with_cache(mut self, cache: Arc<AnswerCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Ingest every `.txt`, `.md` and `.pdf` file below `folder`
    pub async fn ingest_local_folder(&self, folder: &Path) -> Result<IngestResult> {
        let started = Instant::now();
        let root = absolute(folder);

        if !root.is_dir() {
            let message = format!("Folder not found: {}", root.display());
            tracing::warn!("{}", message);
            return Ok(IngestResult::warning(message));
        }

        tracing::info!(folder = %root.display(), "Ingesting folder");

        let walk_root = root.clone();
        let files = tokio::task::spawn_blocking(move || collect_files(&walk_root))
            .await
            .map_err(|e| Error::internal(format!("Folder walk panicked: {}", e)))?;

        let mut result = IngestResult::default();
        for path in &files {
            let source = path.display().to_string();
            let outcome = match tokio::fs::read(path).await {
                Ok(data) => self.ingest_bytes(&source, data).await,
                Err(e) => failed(&source, &e.to_string()),
            };
            result.merge(outcome);
        }

        self.finish_run(&result);
        tracing::info!(
            folder = %root.display(),
            files = files.len(),
            documents = result.documents,
            chunks = result.chunks,
            unchanged = result.unchanged,
            warnings = result.warnings.len(),
            "Ingestion finished in {} ms",
            started.elapsed().as_millis()
        );
        Ok(result)
    }

    /// Ingest one uploaded file; its name becomes the chunk `source`
    pub async fn ingest_upload(&self, filename: &str, data: &[u8]) -> Result<IngestResult> {
        tracing::info!("Processing upload: {} ({} bytes)", filename, data.len());
        let result = self.ingest_bytes(filename, data.to_vec()).await;
        self.finish_run(&result);
        Ok(result)
    }

    async fn ingest_bytes(&self, source: &str, data: Vec<u8>) -> IngestResult {
        let Some(file_type) = FileType::from_filename(source) else {
            let message = format!("Unsupported file type: {}", file_name(source));
            tracing::warn!("{}", message);
            return IngestResult::warning(message);
        };

        let content_hash = hash_content(&data);
        let mut stale = false;
        if self.replace_existing {
            match self.store.source_hash(source).await {
                Ok(Some(stored)) if stored == content_hash => {
                    tracing::info!("Skipped unchanged file: {}", source);
                    return IngestResult {
                        unchanged: 1,
                        ..Default::default()
                    };
                }
                Ok(stored) => stale = stored.is_some(),
                Err(e) => return failed(source, &e.to_string()),
            }
        }

        let split = match self.parse_and_split(source, file_type, data).await {
            Ok(split) => split,
            Err(result) => return result,
        };
        if split.documents == 0 {
            return IngestResult::default();
        }

        match self.store_chunks(source, split.chunks, stale).await {
            Ok(chunks) => {
                tracing::info!(
                    "Ingested {} ({} documents, {} chunks)",
                    source,
                    split.documents,
                    chunks
                );
                IngestResult {
                    documents: split.documents,
                    chunks,
                    ..Default::default()
                }
            }
            Err(e) => failed(source, &e.to_string()),
        }
    }

    /// Parse and split off the async runtime; failures come back as the
    /// warning result for the file
    async fn parse_and_split(
        &self,
        source: &str,
        file_type: FileType,
        data: Vec<u8>,
    ) -> std::result::Result<SplitFile, IngestResult> {
        let splitter = self.splitter.clone();
        let owned_source = source.to_string();

        let parsed = tokio::task::spawn_blocking(move || {
            FileParser::parse(&owned_source, &data).map(|documents| SplitFile {
                documents: documents.len(),
                chunks: splitter.split(&documents),
            })
        })
        .await
        .map_err(|e| Error::internal(format!("Parser panicked: {}", e)));

        match (file_type, parsed) {
            (_, Err(e)) => Err(failed(source, &e.to_string())),
            (FileType::Pdf, Ok(Err(Error::FileParse { message, .. }))) => {
                let message = format!("Failed reading PDF {}: {}", source, message);
                tracing::warn!("{}", message);
                Err(IngestResult::warning(message))
            }
            (_, Ok(Err(e))) => Err(failed(source, &e.to_string())),
            (FileType::Pdf, Ok(Ok(split))) if split.documents == 0 => {
                let message = format!(
                    "No extractable text found in PDF (may be scanned image): {}",
                    source
                );
                tracing::warn!("{}", message);
                Err(IngestResult::warning(message))
            }
            (_, Ok(Ok(split))) => Ok(split),
        }
    }

    /// Embed in batches, then replace or append; returns chunks written
    async fn store_chunks(&self, source: &str, mut chunks: Vec<Chunk>, stale: bool) -> Result<usize> {
        for batch in chunks.chunks_mut(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }
            for (chunk, embedding) in batch.iter_mut().zip(embeddings) {
                chunk.embedding = embedding;
            }
        }

        if stale {
            self.store.replace_source(source, &chunks).await?;
            tracing::info!("Replaced previous chunks of {}", source);
        } else {
            self.store.add(&chunks).await?;
        }
        Ok(chunks.len())
    }

    fn finish_run(&self, result: &IngestResult) {
        if result.chunks == 0 {
            return;
        }
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
            tracing::info!("Answer cache cleared after ingesting {} chunks", result.chunks);
        }
    }
}

fn failed(source: &str, message: &str) -> IngestResult {
    let message = format!("Failed ingesting {}: {}", source, message);
    tracing::warn!("{}", message);
    IngestResult::warning(message)
}

fn file_name(source: &str) -> &str {
    Path::new(source)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(source)
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Regular files with a supported extension, in path order
fn collect_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .and_then(FileType::from_filename)
                .is_some()
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}
