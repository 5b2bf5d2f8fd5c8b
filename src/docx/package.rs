//! In-memory OPC package (the zip container behind a `.docx`).
//!
//! The whole batch runs over request-scoped byte buffers, so a package is
//! just an ordered list of part name → bytes. Order is preserved from the
//! source archive and kept stable on save; together with a fixed entry
//! timestamp this makes repeated runs byte-for-byte identical.

use crate::detect;
use crate::docx::xml::Element;
use crate::error::{Error, Result};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Part name of the main document.
pub const DOCUMENT_PART: &str = "word/document.xml";
/// Part name of the style definitions.
pub const STYLES_PART: &str = "word/styles.xml";
/// Part name of the numbering (list) definitions.
pub const NUMBERING_PART: &str = "word/numbering.xml";
/// Part name of the main document's relationships.
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
/// Part name of the content-type map.
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// An opened DOCX package.
#[derive(Debug, Clone, Default)]
pub struct DocxPackage {
    parts: Vec<(String, Vec<u8>)>,
}

impl DocxPackage {
    /// Create an empty package (used by the default-template builder).
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a package from raw bytes.
    ///
    /// Failures are reported as [`Error::Composition`]: an input that is not
    /// a zip archive, or a zip without `word/document.xml`, is a per-file
    /// problem the batch recovers from by skipping the file.
    pub fn open_bytes(data: &[u8]) -> Result<Self> {
        if !detect::is_zip_bytes(data) {
            return Err(Error::Composition(
                "not a DOCX package (missing zip signature)".to_string(),
            ));
        }
        let mut archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| Error::Composition(format!("unreadable zip archive: {e}")))?;

        let mut parts = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| Error::Composition(format!("corrupt zip entry: {e}")))?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| Error::Composition(format!("corrupt zip entry {name:?}: {e}")))?;
            parts.push((name, bytes));
        }

        let pkg = Self { parts };
        if !pkg.has_part(DOCUMENT_PART) {
            return Err(Error::Composition(format!(
                "zip archive has no {DOCUMENT_PART} part"
            )));
        }
        Ok(pkg)
    }

    /// Serialize the package back to zip bytes.
    ///
    /// Entries are written in part order with a fixed timestamp so that
    /// identical inputs produce identical output bytes.
    pub fn save_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());
        for (name, bytes) in &self.parts {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes)?;
        }
        Ok(zip.finish()?.into_inner())
    }

    /// Whether a part exists.
    pub fn has_part(&self, name: &str) -> bool {
        self.parts.iter().any(|(n, _)| n == name)
    }

    /// Raw bytes of a part.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| b.as_slice())
    }

    /// Set or replace a part.
    pub fn set_part(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        let name = name.into();
        if let Some(entry) = self.parts.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = bytes;
        } else {
            self.parts.push((name, bytes));
        }
    }

    /// Names of all parts, in package order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(n, _)| n.as_str())
    }

    /// Parse a part as an XML tree.
    pub fn part_xml(&self, name: &str) -> Result<Element> {
        let bytes = self
            .part(name)
            .ok_or_else(|| Error::MissingPart(name.to_string()))?;
        Element::parse(bytes)
            .map_err(|e| Error::Package(format!("{name}: {e}")))
    }

    /// Serialize an XML tree into a part.
    pub fn set_part_xml(&mut self, name: impl Into<String>, root: &Element) -> Result<()> {
        let bytes = root.to_document_bytes()?;
        self.set_part(name, bytes);
        Ok(())
    }

    /// The main document tree (`word/document.xml`).
    pub fn document(&self) -> Result<Element> {
        self.part_xml(DOCUMENT_PART)
    }

    /// Replace the main document tree.
    pub fn set_document(&mut self, root: &Element) -> Result<()> {
        self.set_part_xml(DOCUMENT_PART, root)
    }

    /// The main document's relationships, or an empty `Relationships` root
    /// when the part is absent.
    pub fn document_rels(&self) -> Result<Element> {
        if self.has_part(DOCUMENT_RELS_PART) {
            self.part_xml(DOCUMENT_RELS_PART)
        } else {
            Ok(Element::new("Relationships").with_attr(
                "xmlns",
                "http://schemas.openxmlformats.org/package/2006/relationships",
            ))
        }
    }

    /// Replace the main document's relationships.
    pub fn set_document_rels(&mut self, rels: &Element) -> Result<()> {
        self.set_part_xml(DOCUMENT_RELS_PART, rels)
    }
}
