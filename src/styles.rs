//! Style catalog and paragraph style remapping.
//!
//! `word/styles.xml` defines the template's style catalog. Remapping is
//! name-based (config speaks display names like "Heading 1", the document
//! references style ids like `Heading1`), single-pass, in body paragraph
//! order. A mapping whose target is absent from the catalog leaves the
//! paragraph untouched and records a warning; it never fails the batch.

use crate::docx::package::{DocxPackage, STYLES_PART};
use crate::docx::{document, Element};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One style definition from `word/styles.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDef {
    /// The id paragraphs reference via `w:pStyle`.
    pub style_id: String,
    /// The display name (`w:name/@w:val`).
    pub name: String,
    /// Style type: `paragraph`, `character`, `table`, `numbering`.
    pub kind: String,
}

/// The set of styles defined by a package.
#[derive(Debug, Clone, Default)]
pub struct StyleCatalog {
    styles: Vec<StyleDef>,
}

impl StyleCatalog {
    /// Read the catalog from a package. A package without a styles part
    /// yields an empty catalog.
    pub fn from_package(pkg: &DocxPackage) -> Result<Self> {
        let Some(_) = pkg.part(STYLES_PART) else {
            return Ok(Self::default());
        };
        let root = pkg.part_xml(STYLES_PART)?;
        Ok(Self::from_styles_xml(&root))
    }

    /// Build the catalog from a parsed `w:styles` tree.
    pub fn from_styles_xml(root: &Element) -> Self {
        let styles = root
            .children_named("w:style")
            .filter_map(|style| {
                let style_id = style.attr("w:styleId")?.to_string();
                let name = style
                    .child("w:name")
                    .and_then(|n| n.attr("w:val"))
                    .unwrap_or(&style_id)
                    .to_string();
                let kind = style.attr("w:type").unwrap_or("paragraph").to_string();
                Some(StyleDef {
                    style_id,
                    name,
                    kind,
                })
            })
            .collect();
        Self { styles }
    }

    /// Number of defined styles.
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// All definitions, in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &StyleDef> {
        self.styles.iter()
    }

    /// Look a style up by display name (case-insensitive) or exact id.
    ///
    /// Word stores built-in display names lowercased ("heading 1") while
    /// configs are usually written title-cased ("Heading 1"); matching
    /// case-insensitively keeps both spellings working.
    pub fn resolve(&self, key: &str) -> Option<&StyleDef> {
        self.styles
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(key))
            .or_else(|| self.styles.iter().find(|s| s.style_id == key))
    }

    /// Whether a style id is defined.
    pub fn contains_id(&self, style_id: &str) -> bool {
        self.styles.iter().any(|s| s.style_id == style_id)
    }
}

/// A non-fatal remapping miss: the target style is not in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleWarning {
    /// Source style name from the map.
    pub source: String,
    /// Target style name that was not found.
    pub target: String,
}

impl std::fmt::Display for StyleWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "style {:?} kept: target style {:?} not in template catalog",
            self.source, self.target
        )
    }
}

/// Rewrite paragraph styles according to the configured map.
///
/// Single pass over body paragraphs in document order. Returns the
/// warnings collected (one per distinct unresolved mapping).
pub fn remap_styles(
    pkg: &mut DocxPackage,
    style_map: &[(String, String)],
) -> Result<Vec<StyleWarning>> {
    if style_map.is_empty() {
        return Ok(Vec::new());
    }

    let catalog = StyleCatalog::from_package(pkg)?;
    let mut document = pkg.document()?;
    let mut warnings: Vec<StyleWarning> = Vec::new();
    let mut changed = false;

    let body = document::body_mut(&mut document)?;
    for paragraph in document::paragraphs_mut(body) {
        let Some(current_id) = document::paragraph_style_id(paragraph) else {
            continue;
        };
        let current_name = catalog
            .resolve(current_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| current_id.to_string());

        let Some((source, target)) = style_map.iter().find(|(source, _)| {
            source.eq_ignore_ascii_case(&current_name) || source == current_id
        }) else {
            continue;
        };

        match catalog.resolve(target) {
            Some(def) => {
                let target_id = def.style_id.clone();
                document::set_paragraph_style_id(paragraph, &target_id);
                changed = true;
            }
            None => {
                let warning = StyleWarning {
                    source: source.clone(),
                    target: target.clone(),
                };
                if !warnings.contains(&warning) {
                    log::warn!("{warning}");
                    warnings.push(warning);
                }
            }
        }
    }

    if changed {
        pkg.set_document(&document)?;
    }
    Ok(warnings)
}
