//! Chunked LLM reformatting pipeline.
//!
//! Splits a large Markdown document at paragraph boundaries, reformats each
//! chunk through the model with bounded retries, and reassembles in order.
//! Each formatted chunk is persisted so an interrupted run can resume from
//! the highest completed index, and a checkpoint of the joined document is
//! written at a fixed interval.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::PipelineError;
use crate::ollama::{ChatMessage, OllamaClient};

/// Filename prefix of per-chunk intermediate files.
const CHUNK_PREFIX: &str = "formatted_";

/// Tunables for one reformatting run. All retry and checkpoint behavior is
/// configured here rather than in module state.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Maximum chunk size in characters.
    pub max_chunk_size: usize,
    /// Attempts per chunk before inserting an error placeholder.
    pub max_retries: usize,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
    /// Chunks between checkpoint writes.
    pub checkpoint_interval: usize,
    /// Resume from previously completed chunks instead of starting over.
    pub resume: bool,
    /// Remove intermediate files and the checkpoint after final assembly.
    pub clean: bool,
    /// Directory holding per-chunk intermediate files.
    pub intermediate_dir: PathBuf,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_chunk_size: 5000,
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            checkpoint_interval: 10,
            resume: false,
            clean: false,
            intermediate_dir: PathBuf::from("data/output"),
        }
    }
}

/// Split text at paragraph boundaries, packing paragraphs greedily up to
/// `max_chunk_size` characters. A single oversized paragraph passes through
/// as its own chunk rather than being split mid-paragraph.
#[must_use]
pub fn split_by_paragraphs(text: &str, max_chunk_size: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n") {
        if !current.is_empty() && current.len() + paragraph.len() + 2 > max_chunk_size {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Reformat `input` through the model and write the assembled result to
/// `output`. Returns the output path.
///
/// # Errors
///
/// Returns [`PipelineError`] on file I/O failure. Model failures never
/// abort the run; an exhausted chunk is replaced with a visible placeholder
/// so downstream assembly stays aligned.
pub fn format_file(
    input: &Path,
    output: &Path,
    client: &OllamaClient,
    options: &PipelineOptions,
) -> Result<PathBuf, PipelineError> {
    let started = Instant::now();
    tracing::info!(model = client.model(), "starting markdown formatting");

    let content = fs::read_to_string(input)?;
    tracing::info!(chars = content.len(), path = %input.display(), "read input file");

    fs::create_dir_all(&options.intermediate_dir)?;
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let chunks = split_by_paragraphs(&content, options.max_chunk_size);
    let total = chunks.len();
    tracing::info!(chunks = total, "split content into chunks");

    let mut formatted: Vec<String> = Vec::new();
    let mut start_chunk = 0;
    if options.resume {
        start_chunk = highest_completed_chunk(&options.intermediate_dir)?.map_or(0, |i| i + 1);
        for i in 0..start_chunk {
            let path = chunk_path(&options.intermediate_dir, i);
            if path.exists() {
                formatted.push(fs::read_to_string(&path)?);
            }
        }
        tracing::info!(start_chunk, "resuming from previous run");
    }

    let interval = options.checkpoint_interval.max(1);
    for i in start_chunk..total {
        tracing::info!(chunk = i + 1, total, "processing chunk");

        let previous = if i > 0 { chunks[i - 1].as_str() } else { "" };
        let next = chunks.get(i + 1).map_or("", String::as_str);
        let chunk_file = chunk_path(&options.intermediate_dir, i);
        let existing = if chunk_file.exists() {
            tracing::info!(chunk = i + 1, "found existing formatting");
            fs::read_to_string(&chunk_file)?
        } else {
            String::new()
        };

        let prompt = build_prompt(i, &existing, previous, &chunks[i], next);
        let text = match format_chunk_with_retry(client, &prompt, i, options) {
            Some(text) => {
                fs::write(&chunk_file, &text)?;
                text
            }
            None => format!("[ERROR: Failed to process chunk {}]", i + 1),
        };
        formatted.push(text);

        if (i + 1) % interval == 0 || i + 1 == total {
            let checkpoint = checkpoint_path(output);
            fs::write(&checkpoint, formatted.join("\n\n"))?;
            tracing::info!(path = %checkpoint.display(), "saved checkpoint");
        }
    }

    fs::write(output, formatted.join("\n\n"))?;

    if options.clean {
        clean_intermediates(output, total, options);
    }

    tracing::info!(
        elapsed_secs = started.elapsed().as_secs(),
        path = %output.display(),
        "processing complete"
    );
    Ok(output.to_path_buf())
}

/// Path of the intermediate file for chunk `index`.
#[must_use]
pub fn chunk_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("{CHUNK_PREFIX}{index}.md"))
}

/// Path of the checkpoint file next to `output`.
#[must_use]
pub fn checkpoint_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".checkpoint");
    PathBuf::from(name)
}

/// Highest chunk index with an intermediate file present, if any.
fn highest_completed_chunk(dir: &Path) -> Result<Option<usize>, PipelineError> {
    if !dir.exists() {
        return Ok(None);
    }
    let mut highest: Option<usize> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let index = name
            .strip_prefix(CHUNK_PREFIX)
            .and_then(|rest| rest.strip_suffix(".md"))
            .and_then(|digits| digits.parse::<usize>().ok());
        if let Some(index) = index {
            highest = Some(highest.map_or(index, |h| h.max(index)));
        }
    }
    Ok(highest)
}

fn format_chunk_with_retry(
    client: &OllamaClient,
    prompt: &str,
    index: usize,
    options: &PipelineOptions,
) -> Option<String> {
    for attempt in 1..=options.max_retries.max(1) {
        match client.chat(&[ChatMessage::user(prompt)]) {
            Ok(text) => return Some(text),
            Err(err) => {
                tracing::error!(
                    chunk = index + 1,
                    attempt,
                    max = options.max_retries,
                    error = %err,
                    "chunk formatting attempt failed"
                );
                if attempt < options.max_retries {
                    tracing::info!(delay_secs = options.retry_delay.as_secs(), "retrying");
                    thread::sleep(options.retry_delay);
                }
            }
        }
    }
    tracing::warn!(chunk = index + 1, "all attempts failed, inserting placeholder");
    None
}

fn build_prompt(index: usize, existing: &str, previous: &str, current: &str, next: &str) -> String {
    format!(
        "Format the following text as proper markdown.\n\
         ----\n\
         Here is a previous formatting of this chunk, reuse it if it is good:\n\
         current formatting of chunk {index}: {existing}\n\n\
         ----\n\
         Previous chunk: {previous}\n\
         Current chunk {index}: {current}\n\
         Next chunk: {next}\n\
         Only return the current chunk formatted as proper markdown; the previous and next \
         chunks are provided to give you context."
    )
}

fn clean_intermediates(output: &Path, total: usize, options: &PipelineOptions) {
    tracing::info!("cleaning up intermediate files");
    for i in 0..total {
        let path = chunk_path(&options.intermediate_dir, i);
        if path.exists()
            && let Err(err) = fs::remove_file(&path)
        {
            tracing::error!(path = %path.display(), error = %err, "failed to remove intermediate file");
        }
    }
    let checkpoint = checkpoint_path(output);
    if checkpoint.exists()
        && let Err(err) = fs::remove_file(&checkpoint)
    {
        tracing::error!(path = %checkpoint.display(), error = %err, "failed to remove checkpoint");
    }
}
