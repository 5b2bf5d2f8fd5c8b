//! Template composition: append a legacy document's body into a copy of
//! the template package.
//!
//! The output takes page/section formatting, styles, and header/footer
//! furniture from the template; body content (paragraphs, tables, images,
//! numbered/bulleted lists) comes from the legacy document, appended after
//! any template boilerplate. Relationship ids, media parts, numbering
//! definitions, and content types are re-registered so the appended
//! content keeps resolving inside the new package. This is a deliberate
//! best-effort merge over the parts flowing documents actually use;
//! exotic parts (footnote catalogs, embedded charts' sub-relationships)
//! are not chased.

use crate::docx::package::{
    DocxPackage, CONTENT_TYPES_PART, NUMBERING_PART, STYLES_PART,
};
use crate::docx::{document, Element, XmlNode};
use crate::error::{Error, Result};
use crate::layout::ensure_content_type_override;
use std::collections::HashMap;

const NUMBERING_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
const NUMBERING_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml";
const STYLES_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const STYLES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";

/// Relationship types resolved through dedicated merge logic (or replaced
/// wholesale by the template); their source entries are not carried over.
const SKIPPED_REL_TYPES: &[&str] = &[
    "styles",
    "numbering",
    "settings",
    "webSettings",
    "fontTable",
    "theme",
    "header",
    "footer",
    "footnotes",
    "endnotes",
    "customXml",
];

/// Attributes that carry relationship ids inside body content.
const REL_ID_ATTRS: &[&str] = &["r:id", "r:embed", "r:link"];

/// Compose one legacy document into a copy of the template.
pub fn compose(template: &DocxPackage, source: &DocxPackage) -> Result<DocxPackage> {
    let mut out = template.clone();

    let src_doc = source.document()?;
    let src_body = document::body(&src_doc)?;

    let rel_map = carry_relationships(&mut out, source)?;
    let num_map = merge_numbering(&mut out, source)?;
    merge_styles(&mut out, source)?;

    // Clone source body children (everything except section properties)
    // and rewrite the ids they reference.
    let mut appended: Vec<XmlNode> = Vec::new();
    for node in &src_body.children {
        if let XmlNode::Element(e) = node {
            if e.name == "w:sectPr" {
                continue;
            }
        }
        let mut node = node.clone();
        if let XmlNode::Element(e) = &mut node {
            rewrite_references(e, &rel_map, &num_map);
        }
        appended.push(node);
    }

    let mut out_doc = out.document()?;
    let out_body = document::body_mut(&mut out_doc)?;
    let insert_at = out_body
        .children
        .iter()
        .position(|n| n.as_element().is_some_and(|e| e.name == "w:sectPr"))
        .unwrap_or(out_body.children.len());
    out_body.children.splice(insert_at..insert_at, appended);
    out.set_document(&out_doc)?;

    Ok(out)
}

/// Copy the source's document relationships into the output under fresh
/// ids, bringing referenced parts (media etc.) along. Returns the old→new
/// relationship id map.
fn carry_relationships(
    out: &mut DocxPackage,
    source: &DocxPackage,
) -> Result<HashMap<String, String>> {
    let src_rels = source.document_rels()?;
    let mut out_rels = out.document_rels()?;
    let mut rel_map = HashMap::new();
    let mut next_id = max_rel_id(&out_rels) + 1;

    for rel in src_rels.children_named("Relationship") {
        let (Some(old_id), Some(rel_type), Some(target)) =
            (rel.attr("Id"), rel.attr("Type"), rel.attr("Target"))
        else {
            continue;
        };
        if SKIPPED_REL_TYPES
            .iter()
            .any(|suffix| rel_type.ends_with(suffix))
        {
            continue;
        }

        let new_id = format!("rId{next_id}");
        let mut entry = Element::new("Relationship")
            .with_attr("Id", new_id.clone())
            .with_attr("Type", rel_type);

        if rel.attr("TargetMode") == Some("External") {
            entry.set_attr("Target", target);
            entry.set_attr("TargetMode", "External");
        } else {
            let src_part = resolve_rel_target(target);
            let Some(bytes) = source.part(&src_part) else {
                // Dangling relationship in the source; drop it.
                continue;
            };
            let dest_part = place_part(out, &src_part, bytes);
            copy_content_type(out, source, &dest_part)?;
            entry.set_attr("Target", dest_part.trim_start_matches("word/").to_string());
        }

        out_rels.push_element(entry);
        rel_map.insert(old_id.to_string(), new_id);
        next_id += 1;
    }

    if !rel_map.is_empty() {
        out.set_document_rels(&out_rels)?;
    }
    Ok(rel_map)
}

fn max_rel_id(rels: &Element) -> u32 {
    rels.children_named("Relationship")
        .filter_map(|r| r.attr("Id"))
        .filter_map(|id| id.strip_prefix("rId"))
        .filter_map(|n| n.parse().ok())
        .max()
        .unwrap_or(0)
}

/// Resolve a document-relative relationship target to a part name.
fn resolve_rel_target(target: &str) -> String {
    let target = target.trim_start_matches('/');
    if target.starts_with("word/") {
        target.to_string()
    } else {
        format!("word/{}", target.trim_start_matches("../"))
    }
}

/// Store a part in the output, reusing an identical existing part and
/// renaming on content collision. Returns the part name used.
fn place_part(out: &mut DocxPackage, name: &str, bytes: &[u8]) -> String {
    match out.part(name) {
        None => {
            out.set_part(name.to_string(), bytes.to_vec());
            name.to_string()
        }
        Some(existing) if existing == bytes => name.to_string(),
        Some(_) => {
            let (stem, ext) = split_extension(name);
            let mut index = 1;
            loop {
                let candidate = format!("{stem}_{index}{ext}");
                match out.part(&candidate) {
                    None => {
                        out.set_part(candidate.clone(), bytes.to_vec());
                        return candidate;
                    }
                    Some(existing) if existing == bytes => return candidate,
                    Some(_) => index += 1,
                }
            }
        }
    }
}

fn split_extension(name: &str) -> (&str, String) {
    match name.rfind('.') {
        Some(dot) if dot > name.rfind('/').map_or(0, |s| s + 1) => {
            (&name[..dot], name[dot..].to_string())
        }
        _ => (name, String::new()),
    }
}

/// Make sure the output's content-type map can describe a copied part,
/// preferring whatever the source declared for it.
fn copy_content_type(
    out: &mut DocxPackage,
    source: &DocxPackage,
    part_name: &str,
) -> Result<()> {
    let ext = match part_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return Ok(()),
    };

    let mut out_types = if out.has_part(CONTENT_TYPES_PART) {
        out.part_xml(CONTENT_TYPES_PART)?
    } else {
        Element::new("Types").with_attr(
            "xmlns",
            "http://schemas.openxmlformats.org/package/2006/content-types",
        )
    };
    let covered = out_types
        .children_named("Default")
        .any(|d| d.attr("Extension").is_some_and(|e| e.eq_ignore_ascii_case(&ext)));
    if covered {
        return Ok(());
    }

    let declared = source
        .part(CONTENT_TYPES_PART)
        .and_then(|bytes| Element::parse(bytes).ok())
        .and_then(|types| {
            types
                .children_named("Default")
                .find(|d| d.attr("Extension").is_some_and(|e| e.eq_ignore_ascii_case(&ext)))
                .and_then(|d| d.attr("ContentType").map(str::to_string))
        });
    let content_type = declared.unwrap_or_else(|| fallback_content_type(&ext).to_string());

    out_types.push_element(
        Element::new("Default")
            .with_attr("Extension", ext)
            .with_attr("ContentType", content_type),
    );
    out.set_part_xml(CONTENT_TYPES_PART, &out_types)
}

fn fallback_content_type(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Merge the source's numbering definitions into the output, offsetting
/// ids past the template's. Returns the old→new `w:numId` map.
fn merge_numbering(
    out: &mut DocxPackage,
    source: &DocxPackage,
) -> Result<HashMap<String, String>> {
    let Some(src_bytes) = source.part(NUMBERING_PART) else {
        return Ok(HashMap::new());
    };
    let src_numbering = Element::parse(src_bytes)
        .map_err(|e| Error::Composition(format!("source numbering: {e}")))?;

    if !out.has_part(NUMBERING_PART) {
        // Template has no lists at all: adopt the source part wholesale.
        out.set_part(NUMBERING_PART, src_bytes.to_vec());
        let mut rels = out.document_rels()?;
        let has_rel = rels
            .children_named("Relationship")
            .any(|r| r.attr("Type") == Some(NUMBERING_REL_TYPE));
        if !has_rel {
            let id = format!("rId{}", max_rel_id(&rels) + 1);
            rels.push_element(
                Element::new("Relationship")
                    .with_attr("Id", id)
                    .with_attr("Type", NUMBERING_REL_TYPE)
                    .with_attr("Target", "numbering.xml"),
            );
            out.set_document_rels(&rels)?;
        }
        ensure_content_type_override(out, NUMBERING_PART, NUMBERING_CONTENT_TYPE)?;
        return Ok(HashMap::new());
    }

    let mut out_numbering = out.part_xml(NUMBERING_PART)?;
    let abstract_offset = max_attr_id(&out_numbering, "w:abstractNum", "w:abstractNumId") + 1;
    let num_offset = max_attr_id(&out_numbering, "w:num", "w:numId") + 1;

    let mut num_map = HashMap::new();
    let mut new_abstracts: Vec<Element> = Vec::new();
    let mut new_nums: Vec<Element> = Vec::new();

    for child in src_numbering.child_elements() {
        match child.name.as_str() {
            "w:abstractNum" => {
                let mut cloned = child.clone();
                if let Some(old) = parse_id(cloned.attr("w:abstractNumId")) {
                    cloned.set_attr("w:abstractNumId", (old + abstract_offset).to_string());
                }
                new_abstracts.push(cloned);
            }
            "w:num" => {
                let mut cloned = child.clone();
                if let Some(old) = parse_id(cloned.attr("w:numId")) {
                    let new = old + num_offset;
                    num_map.insert(old.to_string(), new.to_string());
                    cloned.set_attr("w:numId", new.to_string());
                }
                if let Some(abs) = cloned.child_mut("w:abstractNumId") {
                    if let Some(old) = parse_id(abs.attr("w:val")) {
                        abs.set_attr("w:val", (old + abstract_offset).to_string());
                    }
                }
                new_nums.push(cloned);
            }
            _ => {}
        }
    }

    // Schema order: every abstractNum precedes the first num.
    let first_num = out_numbering
        .children
        .iter()
        .position(|n| n.as_element().is_some_and(|e| e.name == "w:num"))
        .unwrap_or(out_numbering.children.len());
    out_numbering.children.splice(
        first_num..first_num,
        new_abstracts.into_iter().map(XmlNode::Element),
    );
    for num in new_nums {
        out_numbering.push_element(num);
    }
    out.set_part_xml(NUMBERING_PART, &out_numbering)?;

    Ok(num_map)
}

fn max_attr_id(root: &Element, child_name: &str, attr: &str) -> i64 {
    root.children_named(child_name)
        .filter_map(|e| parse_id(e.attr(attr)))
        .max()
        .unwrap_or(0)
}

fn parse_id(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.parse().ok())
}

/// Copy source style definitions the template does not have, so appended
/// `w:pStyle` references keep resolving. On a styleId conflict the
/// template definition wins; refitting the look is the whole point.
fn merge_styles(out: &mut DocxPackage, source: &DocxPackage) -> Result<()> {
    let Some(src_bytes) = source.part(STYLES_PART) else {
        return Ok(());
    };

    if !out.has_part(STYLES_PART) {
        out.set_part(STYLES_PART, src_bytes.to_vec());
        let mut rels = out.document_rels()?;
        let has_rel = rels
            .children_named("Relationship")
            .any(|r| r.attr("Type") == Some(STYLES_REL_TYPE));
        if !has_rel {
            let id = format!("rId{}", max_rel_id(&rels) + 1);
            rels.push_element(
                Element::new("Relationship")
                    .with_attr("Id", id)
                    .with_attr("Type", STYLES_REL_TYPE)
                    .with_attr("Target", "styles.xml"),
            );
            out.set_document_rels(&rels)?;
        }
        ensure_content_type_override(out, STYLES_PART, STYLES_CONTENT_TYPE)?;
        return Ok(());
    }

    let src_styles = Element::parse(src_bytes)
        .map_err(|e| Error::Composition(format!("source styles: {e}")))?;
    let mut out_styles = out.part_xml(STYLES_PART)?;
    let existing: Vec<String> = out_styles
        .children_named("w:style")
        .filter_map(|s| s.attr("w:styleId"))
        .map(str::to_string)
        .collect();

    let mut added = false;
    for style in src_styles.children_named("w:style") {
        let Some(id) = style.attr("w:styleId") else {
            continue;
        };
        if !existing.iter().any(|e| e == id) {
            out_styles.push_element(style.clone());
            added = true;
        }
    }
    if added {
        out.set_part_xml(STYLES_PART, &out_styles)?;
    }
    Ok(())
}

/// Rewrite relationship-id and numbering-id references in appended content.
fn rewrite_references(
    elem: &mut Element,
    rel_map: &HashMap<String, String>,
    num_map: &HashMap<String, String>,
) {
    elem.visit_mut(&mut |e| {
        for attr in REL_ID_ATTRS {
            if let Some(old) = e.attr(attr) {
                if let Some(new) = rel_map.get(old) {
                    let new = new.clone();
                    e.set_attr(*attr, new);
                }
            }
        }
        if e.name == "w:numId" {
            if let Some(old) = e.attr("w:val") {
                if let Some(new) = num_map.get(old) {
                    let new = new.clone();
                    e.set_attr("w:val", new);
                }
            }
        }
    });
}
