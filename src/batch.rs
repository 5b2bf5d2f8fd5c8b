//! Batch orchestration: collect inputs, refit each document, package the
//! results.
//!
//! Per input the pipeline is compose → remap styles → find/replace →
//! page setup → header/footer (page dimensions first, furniture second).
//! A file that fails anywhere in its own pipeline — not a zip, a zip with
//! malformed inner XML, a missing required part — is reported and skipped;
//! one bad file never aborts the batch. Everything runs sequentially over
//! in-memory buffers within one request; no state survives the run.

use crate::compose::compose;
use crate::config::{CompiledRule, RefitConfig};
use crate::detect;
use crate::docx::DocxPackage;
use crate::error::{Error, Result};
use crate::styles::{remap_styles, StyleWarning};
use crate::template::default_template_package;
use crate::{layout, rules};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Suffix appended to each output file's stem.
pub const OUTPUT_SUFFIX: &str = "_refit";

/// One input document held in memory.
#[derive(Debug, Clone)]
pub struct InputDoc {
    /// Display name (used to derive the output name).
    pub name: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl InputDoc {
    /// Create an input document.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Collect input documents from a path: a `.docx` file is taken as-is, a
/// zip archive is expanded into its `.docx` entries.
pub fn collect_inputs_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<InputDoc>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());

    if detect::has_docx_extension(&name) || detect::is_docx_bytes(&bytes) {
        return Ok(vec![InputDoc::new(name, bytes)]);
    }
    if detect::is_zip_bytes(&bytes) {
        return expand_zip_inputs(&bytes);
    }
    Ok(vec![InputDoc::new(name, bytes)])
}

/// Expand a zip archive into its `.docx` entries, in archive order.
pub fn expand_zip_inputs(bytes: &[u8]) -> Result<Vec<InputDoc>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut inputs = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() || !detect::has_docx_extension(entry.name()) {
            continue;
        }
        let name = entry
            .name()
            .rsplit('/')
            .next()
            .unwrap_or(entry.name())
            .to_string();
        let mut content = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut content)?;
        inputs.push(InputDoc::new(name, content));
    }
    Ok(inputs)
}

/// A successfully refitted file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSuccess {
    /// Input file name.
    pub input: String,
    /// Name of the produced archive entry.
    pub output: String,
    /// Style remapping warnings for this file.
    pub warnings: Vec<StyleWarning>,
}

/// A skipped file and the reason it was skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFailure {
    /// Input file name.
    pub input: String,
    /// Human-readable skip reason.
    pub reason: String,
}

/// Per-file outcome report for one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Files refitted, in input order.
    pub succeeded: Vec<FileSuccess>,
    /// Files skipped, in input order.
    pub failed: Vec<FileFailure>,
}

impl BatchSummary {
    /// Total number of inputs seen.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Whether every input was refitted.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of a batch run: the output archive plus the summary.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Zip archive holding one `<stem>_refit.docx` per successful input.
    pub archive: Vec<u8>,
    /// Per-file outcomes.
    pub summary: BatchSummary,
}

/// A configured batch: one template, one configuration, compiled rules.
///
/// Construction performs all fatal validation (template must open, every
/// find/replace pattern must compile); [`BatchJob::run`] can then only
/// fail per-file.
#[derive(Debug)]
pub struct BatchJob {
    template: DocxPackage,
    config: RefitConfig,
    rules: Vec<CompiledRule>,
}

impl BatchJob {
    /// Create a batch from template bytes and configuration. `None` uses
    /// the bundled default template.
    pub fn new(template: Option<&[u8]>, config: RefitConfig) -> Result<Self> {
        let template = match template {
            Some(bytes) => DocxPackage::open_bytes(bytes)
                .map_err(|e| Error::Config(format!("template is not a valid DOCX: {e}")))?,
            None => default_template_package(),
        };
        let rules = config.compile_rules()?;
        Ok(Self {
            template,
            config,
            rules,
        })
    }

    /// The configuration driving this batch.
    pub fn config(&self) -> &RefitConfig {
        &self.config
    }

    /// Refit a single document, returning the output bytes and any style
    /// warnings.
    pub fn refit_one(&self, input: &[u8]) -> Result<(Vec<u8>, Vec<StyleWarning>)> {
        let source = DocxPackage::open_bytes(input)?;
        let mut composed = compose(&self.template, &source)?;
        let warnings = remap_styles(&mut composed, &self.config.style_map)?;
        rules::apply_rules(&mut composed, &self.rules)?;
        // Orientation and margins first; header layout depends on them.
        layout::apply_page_setup(&mut composed, &self.config.page_setup)?;
        layout::apply_header_footer(&mut composed, &self.config.header_footer)?;
        Ok((composed.save_bytes()?, warnings))
    }

    /// Run the batch over the given inputs, in order.
    ///
    /// Every per-file failure is recorded in the summary and the batch
    /// continues; configuration problems were already rejected in
    /// [`BatchJob::new`], so nothing reaching this point aborts the run.
    pub fn run(&self, inputs: &[InputDoc]) -> Result<BatchResult> {
        let mut summary = BatchSummary::default();
        let mut outputs: Vec<(String, Vec<u8>)> = Vec::new();
        let mut used_names: Vec<String> = Vec::new();

        for input in inputs {
            log::debug!("refitting {:?}", input.name);
            match self.refit_one(&input.bytes) {
                Ok((bytes, warnings)) => {
                    let output = output_name(&input.name, &used_names);
                    used_names.push(output.clone());
                    summary.succeeded.push(FileSuccess {
                        input: input.name.clone(),
                        output: output.clone(),
                        warnings,
                    });
                    outputs.push((output, bytes));
                }
                Err(e) => {
                    log::warn!("skipping {:?}: {e}", input.name);
                    summary.failed.push(FileFailure {
                        input: input.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let archive = pack_outputs(&outputs)?;
        Ok(BatchResult { archive, summary })
    }
}

/// Derive the archive entry name: input stem + `_refit.docx`, made unique
/// within the batch.
fn output_name(input: &str, used: &[String]) -> String {
    let base = input.rsplit('/').next().unwrap_or(input);
    // has_docx_extension guarantees the last 5 bytes are an ASCII ".docx"
    // in some casing, so the slice is safe.
    let stem = if detect::has_docx_extension(base) {
        &base[..base.len() - ".docx".len()]
    } else {
        base
    };
    let mut candidate = format!("{stem}{OUTPUT_SUFFIX}.docx");
    let mut index = 2;
    while used.contains(&candidate) {
        candidate = format!("{stem}{OUTPUT_SUFFIX}_{index}.docx");
        index += 1;
    }
    candidate
}

/// Zip the outputs with a fixed timestamp; output bytes depend only on
/// inputs and configuration.
fn pack_outputs(outputs: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());
    for (name, bytes) in outputs {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(bytes)?;
    }
    Ok(zip.finish()?.into_inner())
}
