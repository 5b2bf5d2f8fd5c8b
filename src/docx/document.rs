//! Accessors over the main document tree.
//!
//! Scope note: "paragraphs" here are the direct `w:p` children of a block
//! container (`w:body`, `w:hdr`, `w:ftr`). Paragraphs nested inside table
//! cells are left alone by the remapping and rule passes; the refit touches
//! flowing text only.

use crate::docx::xml::{Element, XmlNode};
use crate::error::{Error, Result};

/// The `w:body` element of a document tree.
pub fn body(document: &Element) -> Result<&Element> {
    document
        .child("w:body")
        .ok_or_else(|| Error::Package("document has no w:body".to_string()))
}

/// Mutable access to the `w:body` element.
pub fn body_mut(document: &mut Element) -> Result<&mut Element> {
    document
        .child_mut("w:body")
        .ok_or_else(|| Error::Package("document has no w:body".to_string()))
}

/// Direct `w:p` children of a block container, mutably.
pub fn paragraphs_mut(container: &mut Element) -> impl Iterator<Item = &mut Element> {
    container
        .children
        .iter_mut()
        .filter_map(XmlNode::as_element_mut)
        .filter(|e| e.name == "w:p")
}

/// The paragraph's style id (`w:pPr/w:pStyle/@w:val`), if any.
pub fn paragraph_style_id(paragraph: &Element) -> Option<&str> {
    paragraph
        .child("w:pPr")
        .and_then(|ppr| ppr.child("w:pStyle"))
        .and_then(|style| style.attr("w:val"))
}

/// Point the paragraph at a different style id.
///
/// `w:pPr` must be the first paragraph child, so it is created up front
/// when absent.
pub fn set_paragraph_style_id(paragraph: &mut Element, style_id: &str) {
    if paragraph.child("w:pPr").is_none() {
        paragraph
            .children
            .insert(0, XmlNode::Element(Element::new("w:pPr")));
    }
    let ppr = paragraph.child_mut("w:pPr").unwrap();
    ppr.ensure_child("w:pStyle").set_attr("w:val", style_id);
}

/// Direct `w:r` children of a paragraph.
pub fn runs(paragraph: &Element) -> impl Iterator<Item = &Element> {
    paragraph.children_named("w:r")
}

/// Visible text of one run: its `w:t` children concatenated.
pub fn run_text(run: &Element) -> String {
    run.children_named("w:t").map(|t| t.text()).collect()
}

/// Replace a run's text with a single `w:t` child, keeping run properties.
pub fn set_run_text(run: &mut Element, text: &str) {
    run.remove_children("w:t");
    // xml:space="preserve" keeps leading/trailing spaces through Word.
    run.push_element(
        Element::new("w:t")
            .with_attr("xml:space", "preserve")
            .with_text(text),
    );
}

/// Visible text of a paragraph: all run texts concatenated.
pub fn paragraph_text(paragraph: &Element) -> String {
    runs(paragraph).map(run_text).collect()
}

/// The body-level `w:sectPr` of a document, mutably. Word keeps the final
/// section's properties as the last child of `w:body`; one is created there
/// when the document has none.
pub fn sect_pr_mut(document: &mut Element) -> Result<&mut Element> {
    let body = body_mut(document)?;
    if body.child("w:sectPr").is_none() {
        body.push_element(Element::new("w:sectPr"));
    }
    Ok(body.child_mut("w:sectPr").unwrap())
}

/// Build a plain paragraph: optional style, one run with the given text.
pub fn make_paragraph(style_id: Option<&str>, text: &str) -> Element {
    let mut p = Element::new("w:p");
    if let Some(id) = style_id {
        p.push_element(
            Element::new("w:pPr")
                .with_child(Element::new("w:pStyle").with_attr("w:val", id)),
        );
    }
    let mut run = Element::new("w:r");
    set_run_text(&mut run, text);
    p.push_element(run);
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> Element {
        Element::parse(
            br#"<w:document><w:body>
                <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Title text</w:t></w:r></w:p>
                <w:p><w:r><w:t xml:space="preserve">Hello </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>
                <w:sectPr/>
            </w:body></w:document>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_paragraph_text_concatenates_runs() {
        let doc = sample_doc();
        let body = body(&doc).unwrap();
        let paragraphs: Vec<_> = body.children_named("w:p").collect();
        assert_eq!(paragraph_text(paragraphs[0]), "Title text");
        assert_eq!(paragraph_text(paragraphs[1]), "Hello world");
    }

    #[test]
    fn test_style_id_roundtrip() {
        let mut doc = sample_doc();
        let body = body_mut(&mut doc).unwrap();
        {
            let mut paragraphs = paragraphs_mut(body);
            assert_eq!(paragraph_style_id(paragraphs.next().unwrap()), Some("Heading1"));
            assert_eq!(paragraph_style_id(paragraphs.next().unwrap()), None);
        }

        set_paragraph_style_id(paragraphs_mut(body).nth(1).unwrap(), "Quote");

        let second = body.children_named("w:p").nth(1).unwrap();
        assert_eq!(paragraph_style_id(second), Some("Quote"));
        // pPr must come first
        assert_eq!(second.child_elements().next().unwrap().name, "w:pPr");
    }

    #[test]
    fn test_set_run_text_preserves_properties() {
        let mut run = Element::parse(
            br#"<w:r><w:rPr><w:b/></w:rPr><w:t>old</w:t></w:r>"#,
        )
        .unwrap();
        set_run_text(&mut run, "new text");
        assert!(run.child("w:rPr").is_some());
        assert_eq!(run_text(&run), "new text");
        assert_eq!(
            run.child("w:t").unwrap().attr("xml:space"),
            Some("preserve")
        );
    }

    #[test]
    fn test_sect_pr_created_when_absent() {
        let mut doc = Element::parse(b"<w:document><w:body/></w:document>").unwrap();
        sect_pr_mut(&mut doc).unwrap();
        assert!(body(&doc).unwrap().child("w:sectPr").is_some());
    }

    #[test]
    fn test_make_paragraph() {
        let p = make_paragraph(Some("Normal"), "hi");
        assert_eq!(paragraph_style_id(&p), Some("Normal"));
        assert_eq!(paragraph_text(&p), "hi");
    }
}
