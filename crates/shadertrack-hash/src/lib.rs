//! Content fingerprints for legacy D3D9 shader token streams.
//!
//! A D3D9 SM1-SM3 shader is a little-endian DWORD token stream terminated by the end token
//! `0x0000FFFF`. The host API hands us a pointer to the first token but no length, so the
//! fingerprint covers every byte from the version token up to and including the end token.
//!
//! Fingerprints are standard CRC-32 (the zlib/PNG variant) so they can be reproduced by
//! external tools and stay stable across runs, which is what lets per-shader profiles be
//! persisted by fingerprint rather than by the runtime handle.
//!
//! Bytecode is treated as untrusted: scans are bounded by [`MAX_SHADER_BYTECODE_BYTES`] (or a
//! caller-supplied limit) and fail with [`HashError::MalformedBytecode`] instead of reading past
//! the buffer.

mod crc32;
mod error;
mod fingerprint;
mod limits;
mod token_stream;

pub use crate::crc32::crc32;
pub use crate::error::{HashError, ParseShaderHashError};
pub use crate::fingerprint::{fingerprint, fingerprint_with_limit, ShaderHash};
pub use crate::limits::MAX_SHADER_BYTECODE_BYTES;
pub use crate::token_stream::{token_stream_from_raw, token_stream_len, END_TOKEN};
