//! DOCX package handling: the zip container, a small WordprocessingML DOM,
//! and accessors over the main document tree.

pub mod document;
pub mod package;
pub mod xml;

pub use package::DocxPackage;
pub use xml::{Element, XmlNode};
