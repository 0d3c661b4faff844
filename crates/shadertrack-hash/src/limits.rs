/// Maximum number of bytes scanned while looking for the end token.
///
/// Real-world SM2/SM3 shaders are a few KiB at most. The cap only exists so a stream that is
/// missing its end token is rejected instead of being scanned into unrelated memory.
pub const MAX_SHADER_BYTECODE_BYTES: usize = 256 * 1024; // 256 KiB
