use core::fmt;
use core::str::FromStr;

use crate::crc32::crc32;
use crate::error::{HashError, ParseShaderHashError};
use crate::limits::MAX_SHADER_BYTECODE_BYTES;
use crate::token_stream::token_stream_len;

/// Content fingerprint of a shader token stream.
///
/// Two shaders with identical instruction streams share a fingerprint no matter which handle the
/// host assigned them. CRC-32 collisions are not resolved: colliding shaders share one identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHash(pub u32);

impl ShaderHash {
    /// Bucket used for state recorded while no (known) shader is bound.
    pub const NONE: ShaderHash = ShaderHash(0);

    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for ShaderHash {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

// Decimal, matching the keys of the profile file and the names of disassembly dumps.
impl fmt::Display for ShaderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ShaderHash {
    type Err = ParseShaderHashError;

    /// Only the exact `Display` form is accepted, so two distinct strings never name the same
    /// fingerprint.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical = !s.is_empty()
            && s.bytes().all(|b| b.is_ascii_digit())
            && (s == "0" || !s.starts_with('0'));
        if !canonical {
            return Err(ParseShaderHashError(s.to_owned()));
        }
        s.parse::<u32>()
            .map(Self)
            .map_err(|_| ParseShaderHashError(s.to_owned()))
    }
}

/// Fingerprints the token stream at the start of `bytes` using the default scan limit.
pub fn fingerprint(bytes: &[u8]) -> Result<ShaderHash, HashError> {
    fingerprint_with_limit(bytes, MAX_SHADER_BYTECODE_BYTES)
}

/// Fingerprints the token stream at the start of `bytes`, scanning at most `max_bytes` for the
/// end token. Bytes after the end token do not contribute.
pub fn fingerprint_with_limit(bytes: &[u8], max_bytes: usize) -> Result<ShaderHash, HashError> {
    let len = token_stream_len(bytes, max_bytes)?;
    Ok(ShaderHash(crc32(&bytes[..len])))
}
