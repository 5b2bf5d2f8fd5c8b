//! DOCX container detection.
//!
//! A `.docx` file is an OPC package: a zip archive whose main document part
//! lives at `word/document.xml`. Detection here is deliberately shallow —
//! magic bytes plus a cheap central-directory probe — so the batch collector
//! can triage uploads without fully opening every package.

use std::io::Cursor;

/// Zip local-file-header magic: "PK\x03\x04"
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Check if bytes look like a zip archive.
pub fn is_zip_bytes(data: &[u8]) -> bool {
    data.len() >= ZIP_MAGIC.len() && data.starts_with(ZIP_MAGIC)
}

/// Check if bytes are a DOCX package (zip archive containing
/// `word/document.xml`).
///
/// This opens the zip central directory but does not decompress any entry.
pub fn is_docx_bytes(data: &[u8]) -> bool {
    if !is_zip_bytes(data) {
        return false;
    }
    match zip::ZipArchive::new(Cursor::new(data)) {
        Ok(archive) => archive
            .file_names()
            .any(|name| name == "word/document.xml"),
        Err(_) => false,
    }
}

/// Check if a file name carries a `.docx` extension (case-insensitive).
pub fn has_docx_extension(name: &str) -> bool {
    name.rsplit('.')
        .next()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"))
        && name.contains('.')
}
