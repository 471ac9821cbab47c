// ── kp2bw-convert / convert module ─────────────────────────────────────────────
//
// Migration pipeline:
//   • Reference token parsing ({REF:<field>@<mode>:<target>})
//   • Two-pass entry index with alias merging
//   • Entry → Bitwarden item mapping
//   • Progress sink and submission orchestrator

pub mod types;
pub mod error;
pub mod reference;
pub mod mapper;
pub mod resolver;
pub mod sink;
pub mod orchestrator;

pub use types::*;
pub use error::{ConvertError, ConvertErrorKind};
pub use reference::{parse_token, LookupMode, ReferenceToken, ReferencedField};
pub use mapper::map_entry;
pub use resolver::{resolve, EntryIndex, Resolution};
pub use sink::{LogSink, MigrationEvent, MigrationSink};
pub use orchestrator::{MigrationReport, Migrator, Phase};
