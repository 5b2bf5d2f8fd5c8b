//! # docrefit
//!
//! Batch-apply a new visual layout to legacy DOCX documents.
//!
//! Each legacy document's body content (paragraphs, tables, images, lists)
//! is composed into a copy of a template document, then optional style
//! remapping and regex find/replace rules run over the result, and finally
//! page setup and header/footer from the configuration are applied. A
//! batch of inputs produces a zip archive of outputs plus a per-file
//! success/failure summary.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docrefit::{BatchJob, InputDoc, RefitConfig};
//!
//! fn main() -> docrefit::Result<()> {
//!     let config = RefitConfig::from_yaml_file("refit.yaml")?;
//!     let template = std::fs::read("template.docx")?;
//!
//!     let job = BatchJob::new(Some(&template), config)?;
//!     let inputs = vec![InputDoc::new("legacy.docx", std::fs::read("legacy.docx")?)];
//!     let result = job.run(&inputs)?;
//!
//!     std::fs::write("refitted.zip", &result.archive)?;
//!     for file in &result.summary.failed {
//!         eprintln!("skipped {}: {}", file.input, file.reason);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Behavior notes
//!
//! - One bad input never aborts a batch: it is skipped and reported.
//! - Invalid YAML or an invalid find/replace pattern fails up front,
//!   before any document is touched.
//! - A regex match spanning multiple runs collapses the matched span into
//!   one run with the first run's formatting; this simplification is part
//!   of the contract.
//! - The same inputs and configuration always produce byte-identical
//!   output archives.

pub mod batch;
pub mod compose;
pub mod config;
pub mod detect;
pub mod docx;
pub mod error;
pub mod layout;
pub mod rules;
pub mod styles;
pub mod template;

// Re-export commonly used types
pub use batch::{
    collect_inputs_from_path, expand_zip_inputs, BatchJob, BatchResult, BatchSummary,
    FileFailure, FileSuccess, InputDoc,
};
pub use compose::compose;
pub use config::{
    CompiledRule, FindReplaceRule, HeaderFooter, Margins, Orientation, PageSetup, RefitConfig,
};
pub use detect::{has_docx_extension, is_docx_bytes, is_zip_bytes};
pub use docx::DocxPackage;
pub use error::{Error, Result};
pub use styles::{StyleCatalog, StyleWarning};
pub use template::build_default_template;

/// Refit a single document and return the output bytes.
///
/// `template` falls back to the bundled default when `None`.
///
/// # Example
///
/// ```no_run
/// use docrefit::RefitConfig;
///
/// let input = std::fs::read("legacy.docx").unwrap();
/// let config = RefitConfig::default();
/// let output = docrefit::refit_bytes(&input, None, config).unwrap();
/// std::fs::write("legacy_refit.docx", output).unwrap();
/// ```
pub fn refit_bytes(
    input: &[u8],
    template: Option<&[u8]>,
    config: RefitConfig,
) -> Result<Vec<u8>> {
    let job = BatchJob::new(template, config)?;
    let (bytes, _warnings) = job.refit_one(input)?;
    Ok(bytes)
}

/// Builder for configuring and running a refit batch.
///
/// # Example
///
/// ```no_run
/// use docrefit::{InputDoc, Refitter};
///
/// let result = Refitter::new()
///     .with_config_yaml("style_map:\n  \"Heading 1\": Title\n")?
///     .with_template_bytes(std::fs::read("template.docx")?)
///     .run(&[InputDoc::new("a.docx", std::fs::read("a.docx")?)])?;
/// # Ok::<(), docrefit::Error>(())
/// ```
#[derive(Default)]
pub struct Refitter {
    config: RefitConfig,
    template: Option<Vec<u8>>,
}

impl Refitter {
    /// Create a builder with the default configuration and template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a parsed configuration.
    pub fn with_config(mut self, config: RefitConfig) -> Self {
        self.config = config;
        self
    }

    /// Parse and use a YAML configuration.
    pub fn with_config_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = RefitConfig::from_yaml_str(yaml)?;
        Ok(self)
    }

    /// Use the given template document instead of the bundled default.
    pub fn with_template_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.template = Some(bytes);
        self
    }

    /// Validate everything and build the batch job.
    pub fn build(self) -> Result<BatchJob> {
        BatchJob::new(self.template.as_deref(), self.config)
    }

    /// Build and run over the given inputs.
    pub fn run(self, inputs: &[InputDoc]) -> Result<BatchResult> {
        self.build()?.run(inputs)
    }
}
