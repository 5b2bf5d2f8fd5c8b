//! Page setup and header/footer application.
//!
//! Orientation and margins are written into every `w:sectPr` of the
//! document; header/footer text goes into the section's default header and
//! footer parts, which are created (part + relationship + content type +
//! section reference) when the template has none. Page setup must run
//! before header/footer, since header layout depends on page dimensions.
//! Both operations are idempotent.

use crate::config::{HeaderFooter, Orientation, PageSetup};
use crate::docx::package::{DocxPackage, CONTENT_TYPES_PART};
use crate::docx::{document, Element, XmlNode};
use crate::error::Result;

/// A4 short edge in twentieths of a point.
const A4_SHORT_TWIPS: i64 = 11906;
/// A4 long edge in twentieths of a point.
const A4_LONG_TWIPS: i64 = 16838;

const HEADER_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
const FOOTER_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
const HEADER_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";
const FOOTER_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";

/// Schema-mandated child order inside `w:sectPr`.
const SECT_PR_ORDER: &[&str] = &[
    "w:headerReference",
    "w:footerReference",
    "w:footnotePr",
    "w:endnotePr",
    "w:type",
    "w:pgSz",
    "w:pgMar",
    "w:paperSrc",
    "w:pgBorders",
    "w:lnNumType",
    "w:pgNumType",
    "w:cols",
    "w:formProt",
    "w:vAlign",
    "w:titlePg",
    "w:textDirection",
    "w:docGrid",
];

/// Convert millimetres to twentieths of a point (1440 twips per inch).
pub fn mm_to_twips(mm: f64) -> i64 {
    (mm * 1440.0 / 25.4).round() as i64
}

/// Apply orientation and margins to every section of the document.
pub fn apply_page_setup(pkg: &mut DocxPackage, setup: &PageSetup) -> Result<()> {
    let mut doc = pkg.document()?;
    // Make sure the body carries a final sectPr to configure.
    document::sect_pr_mut(&mut doc)?;
    doc.visit_mut(&mut |elem| {
        if elem.name == "w:sectPr" {
            configure_section(elem, setup);
        }
    });
    pkg.set_document(&doc)
}

fn configure_section(sect_pr: &mut Element, setup: &PageSetup) {
    // Page size: keep the template's sheet dimensions, normalize them to
    // the requested orientation (long edge horizontal for landscape).
    // Normalizing rather than swapping keeps the operation idempotent.
    if sect_pr.child("w:pgSz").is_none() {
        insert_sect_child(sect_pr, Element::new("w:pgSz"));
    }
    let pg_sz = sect_pr.child_mut("w:pgSz").unwrap();
    let w = attr_i64(pg_sz, "w:w").unwrap_or(A4_SHORT_TWIPS);
    let h = attr_i64(pg_sz, "w:h").unwrap_or(A4_LONG_TWIPS);
    let long = w.max(h);
    let short = w.min(h);
    match setup.orientation {
        Orientation::Portrait => {
            pg_sz.set_attr("w:w", short.to_string());
            pg_sz.set_attr("w:h", long.to_string());
            pg_sz.set_attr("w:orient", "portrait");
        }
        Orientation::Landscape => {
            pg_sz.set_attr("w:w", long.to_string());
            pg_sz.set_attr("w:h", short.to_string());
            pg_sz.set_attr("w:orient", "landscape");
        }
    }

    if sect_pr.child("w:pgMar").is_none() {
        insert_sect_child(sect_pr, Element::new("w:pgMar"));
    }
    let margins = &setup.margins_mm;
    let pg_mar = sect_pr.child_mut("w:pgMar").unwrap();
    pg_mar.set_attr("w:top", mm_to_twips(margins.top).to_string());
    pg_mar.set_attr("w:right", mm_to_twips(margins.right).to_string());
    pg_mar.set_attr("w:bottom", mm_to_twips(margins.bottom).to_string());
    pg_mar.set_attr("w:left", mm_to_twips(margins.left).to_string());
    for (attr, default) in [("w:header", "708"), ("w:footer", "708"), ("w:gutter", "0")] {
        if pg_mar.attr(attr).is_none() {
            pg_mar.set_attr(attr, default);
        }
    }
}

fn attr_i64(elem: &Element, key: &str) -> Option<i64> {
    elem.attr(key).and_then(|v| v.parse().ok())
}

/// Insert a child into `w:sectPr` at its schema-mandated position.
fn insert_sect_child(sect_pr: &mut Element, child: Element) {
    let rank = |name: &str| {
        SECT_PR_ORDER
            .iter()
            .position(|n| *n == name)
            .unwrap_or(SECT_PR_ORDER.len())
    };
    let child_rank = rank(&child.name);
    let index = sect_pr
        .children
        .iter()
        .position(|n| n.as_element().is_some_and(|e| rank(&e.name) > child_rank))
        .unwrap_or(sect_pr.children.len());
    sect_pr.children.insert(index, XmlNode::Element(child));
}

/// Which of the two furniture parts is being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HfKind {
    Header,
    Footer,
}

impl HfKind {
    fn reference_name(self) -> &'static str {
        match self {
            HfKind::Header => "w:headerReference",
            HfKind::Footer => "w:footerReference",
        }
    }

    fn root_name(self) -> &'static str {
        match self {
            HfKind::Header => "w:hdr",
            HfKind::Footer => "w:ftr",
        }
    }

    fn part_stem(self) -> &'static str {
        match self {
            HfKind::Header => "header",
            HfKind::Footer => "footer",
        }
    }

    fn rel_type(self) -> &'static str {
        match self {
            HfKind::Header => HEADER_REL_TYPE,
            HfKind::Footer => FOOTER_REL_TYPE,
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            HfKind::Header => HEADER_CONTENT_TYPE,
            HfKind::Footer => FOOTER_CONTENT_TYPE,
        }
    }

    fn style_id(self) -> &'static str {
        match self {
            HfKind::Header => "Header",
            HfKind::Footer => "Footer",
        }
    }
}

/// Apply header/footer text and the optional PAGE number field.
pub fn apply_header_footer(pkg: &mut DocxPackage, cfg: &HeaderFooter) -> Result<()> {
    if cfg.is_noop() {
        return Ok(());
    }
    if let Some(text) = cfg.header_text.clone() {
        let part = resolve_or_create_part(pkg, HfKind::Header)?;
        write_furniture(pkg, &part, HfKind::Header, &text, false)?;
    }
    if cfg.footer_text.is_some() || cfg.include_page_numbers {
        let text = match (&cfg.footer_text, cfg.include_page_numbers) {
            (Some(t), true) => format!("{t} — "),
            (Some(t), false) => t.clone(),
            (None, _) => String::new(),
        };
        let part = resolve_or_create_part(pkg, HfKind::Footer)?;
        write_furniture(pkg, &part, HfKind::Footer, &text, cfg.include_page_numbers)?;
    }
    Ok(())
}

/// Find the part behind the section's default header/footer reference, or
/// create the part, its relationship, its content-type override, and the
/// reference itself.
fn resolve_or_create_part(pkg: &mut DocxPackage, kind: HfKind) -> Result<String> {
    let doc = pkg.document()?;
    let rels = pkg.document_rels()?;

    // Existing default reference anywhere in the document wins.
    for sect_pr in doc.descendants().filter(|e| e.name == "w:sectPr") {
        for reference in sect_pr.children_named(kind.reference_name()) {
            if reference.attr("w:type") != Some("default") {
                continue;
            }
            let Some(rel_id) = reference.attr("r:id") else {
                continue;
            };
            if let Some(target) = rel_target(&rels, rel_id) {
                let part = normalize_part_name(&target);
                if pkg.has_part(&part) {
                    return Ok(part);
                }
            }
        }
    }

    // No usable reference: create everything.
    let part_name = free_part_name(pkg, kind.part_stem());
    let rel_id = free_rel_id(&rels);
    let target = part_name.trim_start_matches("word/").to_string();

    let mut rels = rels;
    rels.push_element(
        Element::new("Relationship")
            .with_attr("Id", rel_id.clone())
            .with_attr("Type", kind.rel_type())
            .with_attr("Target", target),
    );
    pkg.set_document_rels(&rels)?;

    ensure_content_type_override(pkg, &part_name, kind.content_type())?;

    pkg.set_part_xml(
        part_name.clone(),
        &Element::new(kind.root_name()).with_attr(
            "xmlns:w",
            "http://schemas.openxmlformats.org/wordprocessingml/2006/main",
        ),
    )?;

    let mut doc = pkg.document()?;
    document::sect_pr_mut(&mut doc)?;
    doc.visit_mut(&mut |elem| {
        if elem.name == "w:sectPr"
            && !elem
                .children_named(kind.reference_name())
                .any(|r| r.attr("w:type") == Some("default"))
        {
            insert_sect_child(
                elem,
                Element::new(kind.reference_name())
                    .with_attr("w:type", "default")
                    .with_attr("r:id", rel_id.clone()),
            );
        }
    });
    pkg.set_document(&doc)?;

    Ok(part_name)
}

fn rel_target(rels: &Element, rel_id: &str) -> Option<String> {
    rels.children_named("Relationship")
        .find(|r| r.attr("Id") == Some(rel_id))
        .and_then(|r| r.attr("Target"))
        .map(str::to_string)
}

fn normalize_part_name(target: &str) -> String {
    let target = target.trim_start_matches('/');
    if target.starts_with("word/") {
        target.to_string()
    } else {
        format!("word/{target}")
    }
}

fn free_part_name(pkg: &DocxPackage, stem: &str) -> String {
    let mut index = 1;
    loop {
        let candidate = format!("word/{stem}{index}.xml");
        if !pkg.has_part(&candidate) {
            return candidate;
        }
        index += 1;
    }
}

fn free_rel_id(rels: &Element) -> String {
    let max = rels
        .children_named("Relationship")
        .filter_map(|r| r.attr("Id"))
        .filter_map(|id| id.strip_prefix("rId"))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("rId{}", max + 1)
}

/// Register a content-type override for a part, creating `[Content_Types].xml`
/// when the package lacks one.
pub fn ensure_content_type_override(
    pkg: &mut DocxPackage,
    part_name: &str,
    content_type: &str,
) -> Result<()> {
    let mut types = if pkg.has_part(CONTENT_TYPES_PART) {
        pkg.part_xml(CONTENT_TYPES_PART)?
    } else {
        Element::new("Types").with_attr(
            "xmlns",
            "http://schemas.openxmlformats.org/package/2006/content-types",
        )
    };
    let with_slash = format!("/{part_name}");
    let exists = types
        .children_named("Override")
        .any(|o| o.attr("PartName") == Some(with_slash.as_str()));
    if !exists {
        types.push_element(
            Element::new("Override")
                .with_attr("PartName", with_slash)
                .with_attr("ContentType", content_type),
        );
        pkg.set_part_xml(CONTENT_TYPES_PART, &types)?;
    }
    Ok(())
}

/// Rewrite the first paragraph of a header/footer part with the given text,
/// appending the PAGE field when requested. Further paragraphs are kept.
fn write_furniture(
    pkg: &mut DocxPackage,
    part_name: &str,
    kind: HfKind,
    text: &str,
    page_numbers: bool,
) -> Result<()> {
    let mut root = pkg.part_xml(part_name)?;
    if root.child("w:p").is_none() {
        root.push_element(document::make_paragraph(Some(kind.style_id()), ""));
    }
    let paragraph = root.child_mut("w:p").unwrap();

    // Replace the runs, keep paragraph properties.
    paragraph.remove_children("w:r");
    paragraph.remove_children("w:hyperlink");
    if !text.is_empty() {
        let mut run = Element::new("w:r");
        document::set_run_text(&mut run, text);
        paragraph.push_element(run);
    }
    if page_numbers {
        let mut run = Element::new("w:r");
        document::set_run_text(&mut run, "Page ");
        paragraph.push_element(run);
        paragraph.push_element(page_field_run());
    }

    pkg.set_part_xml(part_name, &root)
}

/// One run holding a complete PAGE field: begin, instruction, separator,
/// cached value, end. Word refreshes the cached "1" on render.
fn page_field_run() -> Element {
    Element::new("w:r")
        .with_child(Element::new("w:fldChar").with_attr("w:fldCharType", "begin"))
        .with_child(
            Element::new("w:instrText")
                .with_attr("xml:space", "preserve")
                .with_text("PAGE"),
        )
        .with_child(Element::new("w:fldChar").with_attr("w:fldCharType", "separate"))
        .with_child(Element::new("w:t").with_text("1"))
        .with_child(Element::new("w:fldChar").with_attr("w:fldCharType", "end"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Margins;
    use crate::docx::package::DOCUMENT_PART;

    fn minimal_pkg() -> DocxPackage {
        let mut pkg = DocxPackage::new();
        pkg.set_part(
            CONTENT_TYPES_PART,
            br#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#
                .to_vec(),
        );
        pkg.set_part(
            DOCUMENT_PART,
            br#"<w:document><w:body><w:p><w:r><w:t>x</w:t></w:r></w:p><w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr></w:body></w:document>"#.to_vec(),
        );
        pkg
    }

    fn body_sect_pr(pkg: &DocxPackage) -> Element {
        let doc = pkg.document().unwrap();
        document::body(&doc)
            .unwrap()
            .child("w:sectPr")
            .unwrap()
            .clone()
    }

    #[test]
    fn test_mm_to_twips() {
        assert_eq!(mm_to_twips(25.4), 1440);
        assert_eq!(mm_to_twips(20.0), 1134);
        assert_eq!(mm_to_twips(0.0), 0);
    }

    #[test]
    fn test_portrait_margins() {
        let mut pkg = minimal_pkg();
        let setup = PageSetup {
            orientation: Orientation::Portrait,
            margins_mm: Margins {
                top: 20.0,
                right: 15.0,
                bottom: 20.0,
                left: 25.0,
            },
        };
        apply_page_setup(&mut pkg, &setup).unwrap();

        let sect = body_sect_pr(&pkg);
        let pg_sz = sect.child("w:pgSz").unwrap();
        assert_eq!(pg_sz.attr("w:w"), Some("11906"));
        assert_eq!(pg_sz.attr("w:h"), Some("16838"));
        assert_eq!(pg_sz.attr("w:orient"), Some("portrait"));
        let pg_mar = sect.child("w:pgMar").unwrap();
        assert_eq!(pg_mar.attr("w:top"), Some("1134"));
        assert_eq!(pg_mar.attr("w:right"), Some("850"));
        assert_eq!(pg_mar.attr("w:left"), Some("1417"));
    }

    #[test]
    fn test_landscape_swaps_dimensions_idempotently() {
        let mut pkg = minimal_pkg();
        let setup = PageSetup {
            orientation: Orientation::Landscape,
            margins_mm: Margins::default(),
        };
        apply_page_setup(&mut pkg, &setup).unwrap();
        let first = body_sect_pr(&pkg);

        apply_page_setup(&mut pkg, &setup).unwrap();
        let second = body_sect_pr(&pkg);

        assert_eq!(first, second);
        let pg_sz = second.child("w:pgSz").unwrap();
        assert_eq!(pg_sz.attr("w:w"), Some("16838"));
        assert_eq!(pg_sz.attr("w:h"), Some("11906"));
        assert_eq!(pg_sz.attr("w:orient"), Some("landscape"));
    }

    #[test]
    fn test_header_created_with_rel_and_content_type() {
        let mut pkg = minimal_pkg();
        let cfg = HeaderFooter {
            header_text: Some("Confidential".to_string()),
            footer_text: None,
            include_page_numbers: false,
        };
        apply_header_footer(&mut pkg, &cfg).unwrap();

        let hdr = pkg.part_xml("word/header1.xml").unwrap();
        assert_eq!(hdr.name, "w:hdr");
        assert_eq!(
            document::paragraph_text(hdr.child("w:p").unwrap()),
            "Confidential"
        );

        let sect = body_sect_pr(&pkg);
        let reference = sect.child("w:headerReference").unwrap();
        assert_eq!(reference.attr("w:type"), Some("default"));
        // Reference must precede pgSz per schema order.
        let names: Vec<_> = sect.child_elements().map(|e| e.name.as_str()).collect();
        let ref_pos = names.iter().position(|n| *n == "w:headerReference").unwrap();
        let sz_pos = names.iter().position(|n| *n == "w:pgSz").unwrap();
        assert!(ref_pos < sz_pos);

        let rels = pkg.document_rels().unwrap();
        assert!(rels
            .children_named("Relationship")
            .any(|r| r.attr("Target") == Some("header1.xml")));

        let types = pkg.part_xml(CONTENT_TYPES_PART).unwrap();
        assert!(types
            .children_named("Override")
            .any(|o| o.attr("PartName") == Some("/word/header1.xml")));
    }

    #[test]
    fn test_existing_header_part_is_rewritten_not_duplicated() {
        let mut pkg = minimal_pkg();
        let cfg = HeaderFooter {
            header_text: Some("First".to_string()),
            footer_text: None,
            include_page_numbers: false,
        };
        apply_header_footer(&mut pkg, &cfg).unwrap();
        let cfg = HeaderFooter {
            header_text: Some("Second".to_string()),
            footer_text: None,
            include_page_numbers: false,
        };
        apply_header_footer(&mut pkg, &cfg).unwrap();

        assert!(!pkg.has_part("word/header2.xml"));
        let hdr = pkg.part_xml("word/header1.xml").unwrap();
        assert_eq!(document::paragraph_text(hdr.child("w:p").unwrap()), "Second");

        let sect = body_sect_pr(&pkg);
        assert_eq!(sect.children_named("w:headerReference").count(), 1);
    }

    #[test]
    fn test_footer_with_page_numbers() {
        let mut pkg = minimal_pkg();
        let cfg = HeaderFooter {
            header_text: None,
            footer_text: Some("© Your Company".to_string()),
            include_page_numbers: true,
        };
        apply_header_footer(&mut pkg, &cfg).unwrap();

        let ftr = pkg.part_xml("word/footer1.xml").unwrap();
        let p = ftr.child("w:p").unwrap();
        assert_eq!(document::paragraph_text(p), "© Your Company — Page 1");
        let field_run = p
            .children_named("w:r")
            .find(|r| r.child("w:fldChar").is_some())
            .expect("PAGE field run present");
        assert_eq!(
            field_run.child("w:instrText").unwrap().text(),
            "PAGE"
        );
        assert_eq!(field_run.children_named("w:fldChar").count(), 3);
    }

    #[test]
    fn test_header_footer_noop() {
        let mut pkg = minimal_pkg();
        let before = pkg.save_bytes().unwrap();
        apply_header_footer(&mut pkg, &HeaderFooter::default()).unwrap();
        assert_eq!(pkg.save_bytes().unwrap(), before);
    }
}
