use std::fmt;

use super::{ResourceKind, ShaderStage};

/// Errors raised while creating or rebuilding GPU resources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GfxError {
    /// The driver refused to allocate an object.
    Allocation { kind: ResourceKind, reason: String },
    /// A shader stage failed to compile. `log` is the compiler output.
    Compile { stage: ShaderStage, log: String },
    /// A program failed to link. `log` is the linker output.
    Link { log: String },
    /// The driver reported an error flag after an operation.
    Driver { operation: String, code: u32 },
}

impl fmt::Display for GfxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GfxError::Allocation { kind, reason } => {
                write!(f, "failed to allocate {kind}: {reason}")
            }
            GfxError::Compile { stage, log } => {
                write!(f, "{stage} shader failed to compile:\n{}", log.trim_end())
            }
            GfxError::Link { log } => {
                write!(f, "shader program failed to link:\n{}", log.trim_end())
            }
            GfxError::Driver { operation, code } => {
                write!(f, "{operation}: {} (0x{code:04X})", super::describe_gl_error(*code))
            }
        }
    }
}

impl std::error::Error for GfxError {}
