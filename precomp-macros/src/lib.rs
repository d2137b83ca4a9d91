//! The macro engine: object-like and function-like macro storage and
//! expansion, `#`/`##`, dynamic macros, and the `defined(...)` pre-pass
//! (§3 "Macro table", §4.2).

pub mod defined;
pub mod definitions;
pub mod engine;
pub mod substitute;

pub use defined::expand_defined;
pub use definitions::{Body, Definition, Definitions, DuplicateParameter, DynamicGenerator, ExpansionContext};
pub use engine::{ExpansionSite, MacroEngine};
pub use substitute::{collect_arguments, normalize_hash_tokens, stringify_arg, substitute};
