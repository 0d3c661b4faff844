use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    #[error("shader bytecode pointer is null")]
    NullBytecode,
    #[error("shader end token not found within {scanned} bytes (limit {limit})")]
    MalformedBytecode { scanned: usize, limit: usize },
}

/// A fingerprint string that is not the canonical decimal form produced by `Display`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid shader fingerprint {0:?}: expected a decimal u32 without sign, padding or leading zeros")]
pub struct ParseShaderHashError(pub String);
