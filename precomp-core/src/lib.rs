//! Conditional evaluation, include/require resolution, the parser driver,
//! and output assembly (§4.3, §4.4, §4.5, §4.6).

pub mod assembler;
pub mod conditional;
pub mod driver;
pub mod expression;
pub mod host;
pub mod include;
pub mod require;

pub use assembler::LineMapping;
pub use conditional::{ConditionalStack, DirectiveKind};
pub use driver::{preprocess, DetectedInclude, DetectedMacro, ParserState, PreprocessOutput};
pub use host::{Host, PreprocessorConfig};
pub use include::{IncludeState, ProcessedInclude};
pub use require::RequireState;
