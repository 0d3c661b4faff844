use crate::error::HashError;

/// SM1-SM3 end-of-stream token. Identical for vertex and pixel shaders.
pub const END_TOKEN: u32 = 0x0000_FFFF;

const TOKEN_BYTES: usize = 4;

/// Returns the byte length of the token stream in `bytes`, up to and including the first
/// [`END_TOKEN`].
///
/// Only whole little-endian DWORDs are considered. At most `max_bytes` are scanned; a stream with
/// no end token inside that window (or inside `bytes`) is rejected.
pub fn token_stream_len(bytes: &[u8], max_bytes: usize) -> Result<usize, HashError> {
    let window = bytes.len().min(max_bytes);
    let mut offset = 0usize;
    for chunk in bytes[..window].chunks_exact(TOKEN_BYTES) {
        offset += TOKEN_BYTES;
        let token = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if token == END_TOKEN {
            return Ok(offset);
        }
    }
    Err(HashError::MalformedBytecode {
        scanned: offset,
        limit: max_bytes,
    })
}

/// Builds a byte slice over a token stream handed out by the host API as a bare pointer.
///
/// Tokens are read one at a time, so no memory past the end token is ever touched. The scan stops
/// with [`HashError::MalformedBytecode`] after `max_bytes`.
///
/// # Safety
///
/// `ptr` must be null or point to a readable, 4-byte aligned token stream that stays alive and
/// unmodified for `'a`. The memory must be readable up to and including the end token, or up to
/// `max_bytes` if the stream is not terminated within that bound.
pub unsafe fn token_stream_from_raw<'a>(
    ptr: *const u32,
    max_bytes: usize,
) -> Result<&'a [u8], HashError> {
    if ptr.is_null() {
        return Err(HashError::NullBytecode);
    }
    let max_tokens = max_bytes / TOKEN_BYTES;
    let mut count = 0usize;
    while count < max_tokens {
        // SAFETY: the caller guarantees the stream is readable up to the end token or `max_bytes`,
        // and `count` never exceeds either bound.
        let token = unsafe { u32::from_le(ptr.add(count).read()) };
        count += 1;
        if token == END_TOKEN {
            // SAFETY: the `count` tokens just read form one readable allocation.
            return Ok(unsafe {
                std::slice::from_raw_parts(ptr.cast::<u8>(), count * TOKEN_BYTES)
            });
        }
    }
    Err(HashError::MalformedBytecode {
        scanned: count * TOKEN_BYTES,
        limit: max_bytes,
    })
}
