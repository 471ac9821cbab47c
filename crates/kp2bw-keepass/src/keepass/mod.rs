// ── kp2bw-keepass / keepass module ─────────────────────────────────────────────
//
// KeePass source reading:
//   • Normalized entry model (uppercase-hex identifiers, group paths, tags)
//   • KeePass 2.x XML export parser with binary pool resolution
//   • Encrypted KDBX reader (feature `kdbx`)
//   • Reader selection by file extension

pub mod types;
pub mod xml;
pub mod source;
#[cfg(feature = "kdbx")]
pub mod kdbx;

pub use types::*;
pub use source::{open_source, EntrySource, SourceCredentials};
pub use xml::XmlExportReader;
#[cfg(feature = "kdbx")]
pub use kdbx::KdbxReader;
