use shadertrack_hash::HashError;
use thiserror::Error;

use crate::stage::RawShaderStage;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("unsupported shader stage {0}")]
    UnsupportedStage(RawShaderStage),
    #[error("shader rejected: {0}")]
    Hash(#[from] HashError),
    #[error("constant upload expects {expected} floats but got {actual}")]
    ConstantDataTooShort { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("profile parse error at line {line}, column {column}: {source}")]
    Parse {
        line: usize,
        column: usize,
        source: serde_json::Error,
    },
    #[error("profile encode error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("unsupported profile version {found} (supported up to {supported})")]
    UnsupportedVersion { found: u64, supported: u32 },
    #[error("profile document root must be an object")]
    NotAnObject,
}

impl ProfileError {
    pub(crate) fn parse(source: serde_json::Error) -> Self {
        Self::Parse {
            line: source.line(),
            column: source.column(),
            source,
        }
    }
}
