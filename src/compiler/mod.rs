//! 编译模块：将原始规则编译为可执行的正则模式
pub mod pattern;
pub mod compiler;

pub use self::pattern::{
    Category, DomSelector, Fingerprint, Implication, Matcher, Pattern, SignatureDatabase,
    TechMetadata, DEFAULT_CONFIDENCE, IMPLY_CONFIDENCE_THRESHOLD,
};
pub use self::compiler::{CompileStats, RuleCompiler};
