//! Ordered regex find/replace over paragraph text.
//!
//! Each rule is a global substitution over a paragraph's concatenated
//! visible text, applied across run boundaries best-effort:
//!
//! - a match falling inside a single run edits that run in place, leaving
//!   neighboring runs and their formatting untouched;
//! - a match spanning several runs collapses the matched span into one run
//!   carrying the FIRST spanned run's formatting.
//!
//! The collapse is a documented formatting simplification, not a defect;
//! full run fidelity under cross-run edits is explicitly not attempted.
//! Rules never fail here: invalid patterns are rejected when the
//! configuration is compiled, before any document is touched.

use crate::config::CompiledRule;
use crate::docx::package::DocxPackage;
use crate::docx::{document, Element};
use crate::error::Result;

/// Apply the compiled rule list to every body, header, and footer
/// paragraph of the package.
pub fn apply_rules(pkg: &mut DocxPackage, rules: &[CompiledRule]) -> Result<()> {
    if rules.is_empty() {
        return Ok(());
    }

    // Body paragraphs.
    let mut doc = pkg.document()?;
    let body = document::body_mut(&mut doc)?;
    if apply_to_container(body, rules) {
        pkg.set_document(&doc)?;
    }

    // Header/footer paragraphs, matching the scope of the document tool
    // this replaces.
    let hf_parts: Vec<String> = pkg
        .part_names()
        .filter(|name| is_header_footer_part(name))
        .map(str::to_string)
        .collect();
    for name in hf_parts {
        let mut root = pkg.part_xml(&name)?;
        if apply_to_container(&mut root, rules) {
            pkg.set_part_xml(name, &root)?;
        }
    }

    Ok(())
}

fn is_header_footer_part(name: &str) -> bool {
    (name.starts_with("word/header") || name.starts_with("word/footer"))
        && name.ends_with(".xml")
}

/// Apply rules to the direct paragraphs of a block container. Returns
/// whether anything changed.
fn apply_to_container(container: &mut Element, rules: &[CompiledRule]) -> bool {
    let mut changed = false;
    for paragraph in document::paragraphs_mut(container) {
        changed |= apply_to_paragraph(paragraph, rules);
    }
    changed
}

/// A slice of paragraph text attributed to one run.
#[derive(Debug, Clone, PartialEq)]
struct Segment {
    /// Index into the paragraph's run list.
    run: usize,
    text: String,
}

/// Apply every rule in order to one paragraph. Returns whether the
/// paragraph was modified.
pub fn apply_to_paragraph(paragraph: &mut Element, rules: &[CompiledRule]) -> bool {
    let original: Vec<String> = document::runs(paragraph).map(document::run_text).collect();
    if original.is_empty() {
        return false;
    }

    let mut segments: Vec<Segment> = original
        .iter()
        .enumerate()
        .map(|(run, text)| Segment {
            run,
            text: text.clone(),
        })
        .collect();

    for rule in rules {
        segments = apply_rule(segments, rule);
    }

    // Reassemble per-run text; segments keep run indices in order.
    let mut rebuilt: Vec<String> = vec![String::new(); original.len()];
    for segment in &segments {
        rebuilt[segment.run].push_str(&segment.text);
    }
    if rebuilt == original {
        return false;
    }

    write_back(paragraph, &original, &rebuilt);
    true
}

/// One global substitution pass over the concatenated segment text.
fn apply_rule(segments: Vec<Segment>, rule: &CompiledRule) -> Vec<Segment> {
    let text: String = segments.iter().map(|s| s.text.as_str()).collect();
    if !rule.regex.is_match(&text) {
        return segments;
    }

    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
    let mut last = 0usize;
    for caps in rule.regex.captures_iter(&text) {
        let m = caps.get(0).expect("group 0 always present");
        copy_span(&segments, last, m.start(), &mut out);

        let mut replacement = String::new();
        caps.expand(&rule.replace, &mut replacement);
        if !replacement.is_empty() {
            out.push(Segment {
                run: owner_of(&segments, m.start()),
                text: replacement,
            });
        }
        last = m.end();
    }
    copy_span(&segments, last, text.len(), &mut out);
    out
}

/// Copy the byte span `[from, to)` of the concatenated text into `out`,
/// split along the original segment boundaries.
fn copy_span(segments: &[Segment], from: usize, to: usize, out: &mut Vec<Segment>) {
    if from >= to {
        return;
    }
    let mut offset = 0usize;
    for segment in segments {
        let start = offset;
        let end = offset + segment.text.len();
        offset = end;
        if end <= from {
            continue;
        }
        if start >= to {
            break;
        }
        let lo = from.max(start) - start;
        let hi = to.min(end) - start;
        out.push(Segment {
            run: segment.run,
            text: segment.text[lo..hi].to_string(),
        });
    }
}

/// Run index of the segment containing byte `pos` of the concatenated
/// text; the match start decides which run's formatting survives a
/// cross-run collapse.
fn owner_of(segments: &[Segment], pos: usize) -> usize {
    let mut offset = 0usize;
    for segment in segments {
        let end = offset + segment.text.len();
        if pos < end {
            return segment.run;
        }
        offset = end;
    }
    segments.last().map_or(0, |s| s.run)
}

/// Write rebuilt run texts into the paragraph, dropping runs whose text
/// vanished entirely (unless they carry non-text content like drawings).
fn write_back(paragraph: &mut Element, original: &[String], rebuilt: &[String]) {
    let run_positions: Vec<usize> = paragraph
        .children
        .iter()
        .enumerate()
        .filter(|(_, n)| n.as_element().is_some_and(|e| e.name == "w:r"))
        .map(|(i, _)| i)
        .collect();

    let mut remove: Vec<usize> = Vec::new();
    for (run_idx, &child_idx) in run_positions.iter().enumerate() {
        if rebuilt[run_idx] == original[run_idx] {
            continue;
        }
        let run = paragraph.children[child_idx]
            .as_element_mut()
            .expect("position collected above");
        if rebuilt[run_idx].is_empty() {
            run.remove_children("w:t");
            if run
                .child_elements()
                .all(|e| e.name == "w:rPr")
            {
                remove.push(child_idx);
            }
        } else {
            document::set_run_text(run, &rebuilt[run_idx]);
        }
    }
    for child_idx in remove.into_iter().rev() {
        paragraph.children.remove(child_idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RefitConfig;

    fn rules_from_yaml(yaml: &str) -> Vec<CompiledRule> {
        RefitConfig::from_yaml_str(yaml)
            .unwrap()
            .compile_rules()
            .unwrap()
    }

    fn paragraph_with_runs(texts: &[&str]) -> Element {
        let mut p = Element::new("w:p");
        for text in texts {
            let mut run = Element::new("w:r");
            document::set_run_text(&mut run, text);
            p.push_element(run);
        }
        p
    }

    fn run_texts(p: &Element) -> Vec<String> {
        document::runs(p).map(document::run_text).collect()
    }

    #[test]
    fn test_collapse_whitespace_rule() {
        let rules = rules_from_yaml(
            "find_replace:\n  - pattern: '\\s{2,}'\n    replace: ' '\n",
        );
        let mut p = paragraph_with_runs(&["AAAA  BBBB"]);
        assert!(apply_to_paragraph(&mut p, &rules));
        assert_eq!(document::paragraph_text(&p), "AAAA BBBB");
    }

    #[test]
    fn test_word_boundary_replacement() {
        let rules = rules_from_yaml(
            "find_replace:\n  - pattern: '\\bACME Corp\\b'\n    replace: 'Your Company'\n",
        );
        let mut p = paragraph_with_runs(&["Contact ACME Corp today"]);
        assert!(apply_to_paragraph(&mut p, &rules));
        assert_eq!(document::paragraph_text(&p), "Contact Your Company today");
    }

    #[test]
    fn test_match_inside_one_run_leaves_neighbors_alone() {
        let rules = rules_from_yaml(
            "find_replace:\n  - pattern: 'cruel '\n    replace: ''\n",
        );
        let mut p = paragraph_with_runs(&["Hello ", "cruel world", "!"]);
        assert!(apply_to_paragraph(&mut p, &rules));
        assert_eq!(run_texts(&p), vec!["Hello ", "world", "!"]);
    }

    #[test]
    fn test_cross_run_match_collapses_into_first_run() {
        let rules = rules_from_yaml(
            "find_replace:\n  - pattern: '\\bACME Corp\\b'\n    replace: 'Your Company'\n",
        );
        let mut p = paragraph_with_runs(&["Contact AC", "ME Corp", " today"]);
        assert!(apply_to_paragraph(&mut p, &rules));
        // The middle run is fully consumed by the match and removed; the
        // replacement lands in the run where the match started.
        assert_eq!(run_texts(&p), vec!["Contact Your Company", " today"]);
    }

    #[test]
    fn test_run_fully_deleted_is_removed() {
        let rules = rules_from_yaml(
            "find_replace:\n  - pattern: 'DRAFT'\n    replace: ''\n",
        );
        let mut p = paragraph_with_runs(&["before ", "DRAFT", " after"]);
        assert!(apply_to_paragraph(&mut p, &rules));
        assert_eq!(run_texts(&p), vec!["before ", " after"]);
    }

    #[test]
    fn test_emptied_run_with_drawing_is_kept() {
        let rules = rules_from_yaml(
            "find_replace:\n  - pattern: 'caption'\n    replace: ''\n",
        );
        let mut p = Element::new("w:p");
        let mut run = Element::new("w:r");
        run.push_element(Element::new("w:drawing"));
        document::set_run_text(&mut run, "caption");
        p.push_element(run);

        assert!(apply_to_paragraph(&mut p, &rules));
        let run = p.child("w:r").expect("run with drawing survives");
        assert!(run.child("w:drawing").is_some());
        assert!(run.child("w:t").is_none());
    }

    #[test]
    fn test_rules_apply_in_order() {
        // First rule rewrites, second rule matches the rewritten text.
        let rules = rules_from_yaml(
            "find_replace:\n  - pattern: 'alpha'\n    replace: 'beta'\n  - pattern: 'beta'\n    replace: 'gamma'\n",
        );
        let mut p = paragraph_with_runs(&["alpha"]);
        apply_to_paragraph(&mut p, &rules);
        assert_eq!(document::paragraph_text(&p), "gamma");
    }

    #[test]
    fn test_capture_group_expansion() {
        let rules = rules_from_yaml(
            "find_replace:\n  - pattern: '(\\w+) Corp'\n    replace: '$1 Inc'\n",
        );
        let mut p = paragraph_with_runs(&["ACME Corp and Initech Corp"]);
        apply_to_paragraph(&mut p, &rules);
        assert_eq!(document::paragraph_text(&p), "ACME Inc and Initech Inc");
    }

    #[test]
    fn test_no_match_leaves_paragraph_untouched() {
        let rules = rules_from_yaml(
            "find_replace:\n  - pattern: 'zzz'\n    replace: 'yyy'\n",
        );
        let mut p = paragraph_with_runs(&["nothing to see"]);
        assert!(!apply_to_paragraph(&mut p, &rules));
    }

    #[test]
    fn test_multiple_matches_in_one_pass() {
        let rules = rules_from_yaml(
            "find_replace:\n  - pattern: '\\s{2,}'\n    replace: ' '\n",
        );
        let mut p = paragraph_with_runs(&["A  B   C    D"]);
        apply_to_paragraph(&mut p, &rules);
        assert_eq!(document::paragraph_text(&p), "A B C D");
    }

    #[test]
    fn test_header_parts_are_covered() {
        use crate::docx::package::DOCUMENT_PART;

        let mut pkg = DocxPackage::new();
        pkg.set_part(
            DOCUMENT_PART,
            br#"<w:document><w:body><w:p><w:r><w:t>body DRAFT</w:t></w:r></w:p><w:sectPr/></w:body></w:document>"#.to_vec(),
        );
        pkg.set_part(
            "word/header1.xml",
            br#"<w:hdr><w:p><w:r><w:t>header DRAFT</w:t></w:r></w:p></w:hdr>"#.to_vec(),
        );

        let rules = rules_from_yaml(
            "find_replace:\n  - pattern: ' DRAFT'\n    replace: ''\n",
        );
        apply_rules(&mut pkg, &rules).unwrap();

        let doc = pkg.document().unwrap();
        let body = document::body(&doc).unwrap();
        assert_eq!(
            document::paragraph_text(body.children_named("w:p").next().unwrap()),
            "body"
        );
        let hdr = pkg.part_xml("word/header1.xml").unwrap();
        assert_eq!(
            document::paragraph_text(hdr.children_named("w:p").next().unwrap()),
            "header"
        );
    }
}
