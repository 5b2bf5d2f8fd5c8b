//! Batch configuration: page setup, header/footer, style map, find/replace.
//!
//! The configuration is a YAML document with four optional top-level keys:
//!
//! ```yaml
//! page_setup:
//!   orientation: portrait   # portrait|landscape
//!   margins_mm: {top: 20, right: 15, bottom: 20, left: 25}
//! header_footer:
//!   header_text: "Confidential — New Layout"
//!   footer_text: "© Your Company"
//!   include_page_numbers: true
//! style_map:
//!   "Heading 1": "Title"
//! find_replace:
//!   - pattern: '\bACME Corp\b'
//!     replace: "Your Company"
//! ```
//!
//! Missing keys fall back to defaults; unknown keys are ignored so older
//! binaries accept newer config files. The configuration is immutable once
//! loaded: one instance drives one batch run.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Top-level batch configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefitConfig {
    /// Page orientation and margins.
    #[serde(default)]
    pub page_setup: PageSetup,

    /// Header/footer text and page numbering.
    #[serde(default)]
    pub header_footer: HeaderFooter,

    /// Ordered mapping from source style name to target style name.
    #[serde(default, deserialize_with = "ordered_string_map")]
    pub style_map: Vec<(String, String)>,

    /// Ordered find/replace rules applied to paragraph text.
    #[serde(default)]
    pub find_replace: Vec<FindReplaceRule>,
}

impl RefitConfig {
    /// Parse a configuration from YAML text.
    ///
    /// Empty or whitespace-only input yields the default configuration.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parse a configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Compile every find/replace pattern.
    ///
    /// An invalid pattern fails the whole configuration with
    /// [`Error::Config`] before any document is processed; per-document
    /// regex failures are thereby impossible.
    pub fn compile_rules(&self) -> Result<Vec<CompiledRule>> {
        self.find_replace
            .iter()
            .map(|rule| {
                let regex = Regex::new(&rule.pattern).map_err(|e| {
                    Error::Config(format!("invalid find/replace pattern {:?}: {e}", rule.pattern))
                })?;
                Ok(CompiledRule {
                    regex,
                    replace: rule.replace.clone(),
                })
            })
            .collect()
    }
}

/// Page orientation and margins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSetup {
    /// Page orientation.
    #[serde(default)]
    pub orientation: Orientation,

    /// Page margins in millimetres.
    #[serde(default)]
    pub margins_mm: Margins,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            orientation: Orientation::Portrait,
            margins_mm: Margins::default(),
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Short edge horizontal (the default).
    #[default]
    Portrait,
    /// Long edge horizontal.
    Landscape,
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    #[serde(default = "default_margin")]
    pub top: f64,
    #[serde(default = "default_margin")]
    pub right: f64,
    #[serde(default = "default_margin")]
    pub bottom: f64,
    #[serde(default = "default_margin")]
    pub left: f64,
}

fn default_margin() -> f64 {
    20.0
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 20.0,
            bottom: 20.0,
            left: 20.0,
        }
    }
}

/// Header/footer content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderFooter {
    /// Header text; `None` leaves the template header untouched.
    #[serde(default)]
    pub header_text: Option<String>,

    /// Footer text; `None` leaves the template footer untouched.
    #[serde(default)]
    pub footer_text: Option<String>,

    /// Append a PAGE number field to the footer.
    #[serde(default)]
    pub include_page_numbers: bool,
}

impl HeaderFooter {
    /// Whether this configuration changes anything at all.
    pub fn is_noop(&self) -> bool {
        self.header_text.is_none() && self.footer_text.is_none() && !self.include_page_numbers
    }
}

/// One find/replace rule: a regex pattern and its replacement text.
///
/// Replacement text uses `regex` crate capture syntax (`$1`, `${name}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindReplaceRule {
    /// Regex pattern matched against each paragraph's visible text.
    pub pattern: String,

    /// Replacement text (empty string deletes the match).
    #[serde(default)]
    pub replace: String,
}

/// A find/replace rule with its pattern compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// Compiled pattern.
    pub regex: Regex,
    /// Replacement text.
    pub replace: String,
}

/// Deserialize a YAML mapping into a `Vec<(String, String)>`, preserving
/// the order in which keys appear in the document.
fn ordered_string_map<'de, D>(deserializer: D) -> std::result::Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct MapVisitor;

    impl<'de> serde::de::Visitor<'de> for MapVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a mapping of style name to style name")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: serde::de::MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, String>()? {
                entries.push((key, value));
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(MapVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
page_setup:
  orientation: landscape
  margins_mm: {top: 10, right: 15, bottom: 20, left: 25}
header_footer:
  header_text: "Confidential"
  footer_text: "© Your Company"
  include_page_numbers: true
style_map:
  "Heading 1": "Title"
  "Heading 2": "Heading 1"
  "Heading 3": "Heading 2"
find_replace:
  - pattern: '\bACME Corp\b'
    replace: "Your Company"
  - pattern: '\s{2,}'
    replace: " "
"#;

    #[test]
    fn test_parse_full_config() {
        let cfg = RefitConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(cfg.page_setup.orientation, Orientation::Landscape);
        assert_eq!(cfg.page_setup.margins_mm.top, 10.0);
        assert_eq!(cfg.page_setup.margins_mm.left, 25.0);
        assert_eq!(cfg.header_footer.header_text.as_deref(), Some("Confidential"));
        assert!(cfg.header_footer.include_page_numbers);
        assert_eq!(cfg.style_map.len(), 3);
        assert_eq!(cfg.find_replace.len(), 2);
    }

    #[test]
    fn test_style_map_preserves_order() {
        let cfg = RefitConfig::from_yaml_str(SAMPLE).unwrap();
        let keys: Vec<&str> = cfg.style_map.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["Heading 1", "Heading 2", "Heading 3"]);
    }

    #[test]
    fn test_empty_input_yields_defaults() {
        let cfg = RefitConfig::from_yaml_str("   \n").unwrap();
        assert_eq!(cfg.page_setup.orientation, Orientation::Portrait);
        assert_eq!(cfg.page_setup.margins_mm, Margins::default());
        assert!(cfg.header_footer.is_noop());
        assert!(cfg.style_map.is_empty());
        assert!(cfg.find_replace.is_empty());
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let cfg = RefitConfig::from_yaml_str("page_setup:\n  orientation: landscape\n").unwrap();
        assert_eq!(cfg.page_setup.orientation, Orientation::Landscape);
        // Margins untouched by a partial page_setup
        assert_eq!(cfg.page_setup.margins_mm, Margins::default());
        assert!(cfg.style_map.is_empty());
    }

    #[test]
    fn test_partial_margins() {
        let cfg =
            RefitConfig::from_yaml_str("page_setup:\n  margins_mm: {top: 5}\n").unwrap();
        assert_eq!(cfg.page_setup.margins_mm.top, 5.0);
        assert_eq!(cfg.page_setup.margins_mm.bottom, 20.0);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let cfg = RefitConfig::from_yaml_str("future_feature: true\nstyle_map:\n  A: B\n");
        let cfg = cfg.unwrap();
        assert_eq!(cfg.style_map, vec![("A".to_string(), "B".to_string())]);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let result = RefitConfig::from_yaml_str("style_map: [unclosed");
        assert!(matches!(result, Err(Error::Yaml(_))));
    }

    #[test]
    fn test_invalid_regex_fails_at_compile() {
        let cfg = RefitConfig::from_yaml_str(
            "find_replace:\n  - pattern: '([unclosed'\n    replace: x\n",
        )
        .unwrap();
        let result = cfg.compile_rules();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_replace_defaults_to_empty() {
        let cfg =
            RefitConfig::from_yaml_str("find_replace:\n  - pattern: 'DRAFT'\n").unwrap();
        assert_eq!(cfg.find_replace[0].replace, "");
    }
}
