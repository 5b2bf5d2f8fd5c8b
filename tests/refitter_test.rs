//! Library surface tests: builder API, single-document entry point, and
//! filesystem input collection.

use docrefit::docx::document;
use docrefit::docx::package::DOCUMENT_PART;
use docrefit::docx::{DocxPackage, Element};
use docrefit::{
    build_default_template, collect_inputs_from_path, is_docx_bytes, refit_bytes, InputDoc,
    RefitConfig, Refitter,
};
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn minimal_doc(text: &str) -> Vec<u8> {
    let body = Element::new("w:body")
        .with_child(document::make_paragraph(None, text))
        .with_child(Element::new("w:sectPr"));
    let mut pkg = DocxPackage::new();
    pkg.set_part_xml(DOCUMENT_PART, &Element::new("w:document").with_child(body))
        .unwrap();
    pkg.save_bytes().unwrap()
}

#[test]
fn test_refit_bytes_produces_valid_docx() {
    let output = refit_bytes(&minimal_doc("hello"), None, RefitConfig::default()).unwrap();
    assert!(is_docx_bytes(&output));
}

#[test]
fn test_refit_bytes_with_explicit_template() {
    let template = build_default_template().unwrap();
    let output = refit_bytes(&minimal_doc("hello"), Some(&template), RefitConfig::default());
    assert!(output.is_ok());
}

#[test]
fn test_refitter_end_to_end() {
    let result = Refitter::new()
        .with_config_yaml("find_replace:\n  - pattern: 'old'\n    replace: 'new'\n")
        .unwrap()
        .run(&[InputDoc::new("doc.docx", minimal_doc("old text"))])
        .unwrap();
    assert_eq!(result.summary.succeeded.len(), 1);
    assert!(result.summary.is_complete());
}

#[test]
fn test_refitter_invalid_pattern_fails_at_build() {
    let refitter = Refitter::new()
        .with_config_yaml("find_replace:\n  - pattern: '(unclosed'\n")
        .unwrap();
    assert!(refitter.build().is_err());
}

#[test]
fn test_collect_single_docx_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.docx");
    std::fs::write(&path, minimal_doc("x")).unwrap();

    let inputs = collect_inputs_from_path(&path).unwrap();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].name, "report.docx");
}

#[test]
fn test_collect_expands_zip_of_docx() {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    zip.start_file("a.docx", options).unwrap();
    zip.write_all(&minimal_doc("a")).unwrap();
    zip.start_file("nested/b.docx", options).unwrap();
    zip.write_all(&minimal_doc("b")).unwrap();
    zip.start_file("notes.txt", options).unwrap();
    zip.write_all(b"ignored").unwrap();
    let archive = zip.finish().unwrap().into_inner();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.zip");
    std::fs::write(&path, archive).unwrap();

    let inputs = collect_inputs_from_path(&path).unwrap();
    let names: Vec<&str> = inputs.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["a.docx", "b.docx"]);
}

#[test]
fn test_collect_missing_path_is_io_error() {
    let result = collect_inputs_from_path("/nonexistent/input.docx");
    assert!(matches!(result, Err(docrefit::Error::Io(_))));
}
