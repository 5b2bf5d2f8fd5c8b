//! Bundled default template.
//!
//! Used when the caller supplies no template of their own: A4 portrait,
//! 20mm top/bottom, 25mm left, 15mm right, "New Layout" header,
//! "Confidential" footer, and a small style catalog (Normal, Title,
//! Heading 1–3) that style maps can target.

use crate::docx::package::{
    DocxPackage, CONTENT_TYPES_PART, DOCUMENT_PART, DOCUMENT_RELS_PART, STYLES_PART,
};
use crate::docx::{document, Element};
use crate::error::Result;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Build the default template package.
pub fn default_template_package() -> DocxPackage {
    let mut pkg = DocxPackage::new();

    pkg.set_part(
        CONTENT_TYPES_PART,
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
            r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
            r#"<Override PartName="/word/header1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/>"#,
            r#"<Override PartName="/word/footer1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml"/>"#,
            r#"</Types>"#,
        )
        .as_bytes()
        .to_vec(),
    );

    pkg.set_part(
        "_rels/.rels",
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
            r#"</Relationships>"#,
        )
        .as_bytes()
        .to_vec(),
    );

    pkg.set_part(
        DOCUMENT_RELS_PART,
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
            r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/>"#,
            r#"<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer" Target="footer1.xml"/>"#,
            r#"</Relationships>"#,
        )
        .as_bytes()
        .to_vec(),
    );

    // A4 portrait, margins top/bottom 20mm, left 25mm, right 15mm (in
    // twentieths of a point).
    let body = Element::new("w:body").with_child(
        Element::new("w:sectPr")
            .with_child(
                Element::new("w:headerReference")
                    .with_attr("w:type", "default")
                    .with_attr("r:id", "rId2"),
            )
            .with_child(
                Element::new("w:footerReference")
                    .with_attr("w:type", "default")
                    .with_attr("r:id", "rId3"),
            )
            .with_child(
                Element::new("w:pgSz")
                    .with_attr("w:w", "11906")
                    .with_attr("w:h", "16838")
                    .with_attr("w:orient", "portrait"),
            )
            .with_child(
                Element::new("w:pgMar")
                    .with_attr("w:top", "1134")
                    .with_attr("w:right", "850")
                    .with_attr("w:bottom", "1134")
                    .with_attr("w:left", "1417")
                    .with_attr("w:header", "708")
                    .with_attr("w:footer", "708")
                    .with_attr("w:gutter", "0"),
            ),
    );
    let doc = Element::new("w:document")
        .with_attr("xmlns:w", W_NS)
        .with_attr("xmlns:r", R_NS)
        .with_child(body);
    pkg.set_part_xml(DOCUMENT_PART, &doc)
        .expect("serializing a built tree cannot fail");

    let mut styles = Element::new("w:styles").with_attr("xmlns:w", W_NS);
    styles.push_element(style_def("Normal", "Normal", Some(22)));
    styles.push_element(style_def("Title", "Title", Some(36)));
    styles.push_element(style_def("Heading1", "Heading 1", Some(32)));
    styles.push_element(style_def("Heading2", "Heading 2", Some(28)));
    styles.push_element(style_def("Heading3", "Heading 3", Some(24)));
    styles.push_element(style_def("Header", "Header", None));
    styles.push_element(style_def("Footer", "Footer", None));
    pkg.set_part_xml(STYLES_PART, &styles)
        .expect("serializing a built tree cannot fail");

    let header = Element::new("w:hdr")
        .with_attr("xmlns:w", W_NS)
        .with_child(document::make_paragraph(Some("Header"), "New Layout"));
    pkg.set_part_xml("word/header1.xml", &header)
        .expect("serializing a built tree cannot fail");

    let mut footer_p = document::make_paragraph(Some("Footer"), "Confidential");
    footer_p
        .child_mut("w:pPr")
        .unwrap()
        .push_element(Element::new("w:jc").with_attr("w:val", "right"));
    let footer = Element::new("w:ftr")
        .with_attr("xmlns:w", W_NS)
        .with_child(footer_p);
    pkg.set_part_xml("word/footer1.xml", &footer)
        .expect("serializing a built tree cannot fail");

    pkg
}

/// Build the default template and return its bytes.
pub fn build_default_template() -> Result<Vec<u8>> {
    default_template_package().save_bytes()
}

/// One paragraph style: Calibri, optional size in half-points.
fn style_def(style_id: &str, name: &str, size_half_points: Option<u32>) -> Element {
    let mut style = Element::new("w:style")
        .with_attr("w:type", "paragraph")
        .with_attr("w:styleId", style_id)
        .with_child(Element::new("w:name").with_attr("w:val", name));
    let mut rpr = Element::new("w:rPr").with_child(
        Element::new("w:rFonts")
            .with_attr("w:ascii", "Calibri")
            .with_attr("w:hAnsi", "Calibri"),
    );
    if let Some(sz) = size_half_points {
        rpr.push_element(Element::new("w:sz").with_attr("w:val", sz.to_string()));
    }
    style.push_element(rpr);
    style
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::StyleCatalog;

    #[test]
    fn test_default_template_is_openable() {
        let bytes = build_default_template().unwrap();
        let pkg = DocxPackage::open_bytes(&bytes).unwrap();
        assert!(pkg.has_part(DOCUMENT_PART));
        assert!(pkg.has_part(STYLES_PART));
        assert!(pkg.has_part("word/header1.xml"));
        assert!(pkg.has_part("word/footer1.xml"));
    }

    #[test]
    fn test_default_template_style_catalog() {
        let pkg = default_template_package();
        let catalog = StyleCatalog::from_package(&pkg).unwrap();
        for name in ["Normal", "Title", "Heading 1", "Heading 2", "Heading 3"] {
            assert!(catalog.resolve(name).is_some(), "missing style {name}");
        }
    }

    #[test]
    fn test_default_template_page_setup() {
        let pkg = default_template_package();
        let doc = pkg.document().unwrap();
        let sect = document::body(&doc).unwrap().child("w:sectPr").unwrap();
        let pg_mar = sect.child("w:pgMar").unwrap();
        assert_eq!(pg_mar.attr("w:left"), Some("1417")); // 25mm
        assert_eq!(pg_mar.attr("w:right"), Some("850")); // 15mm
    }

    #[test]
    fn test_default_template_is_deterministic() {
        assert_eq!(
            build_default_template().unwrap(),
            build_default_template().unwrap()
        );
    }
}
