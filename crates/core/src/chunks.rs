//! Chunk boundary math shared by inbound sessions and outbound adapters.

/// Number of chunks needed to cover `total_size` bytes at `chunk_size`.
pub fn chunk_count(total_size: u64, chunk_size: u64) -> u32 {
    if chunk_size == 0 {
        return 0;
    }
    total_size.div_ceil(chunk_size) as u32
}

/// Expected byte size of the chunk at `index`.
///
/// Every chunk is exactly `chunk_size` bytes except the final one, which is
/// the remainder. Indices past the declared count get 0.
pub fn chunk_size_for_index(total_size: u64, total_chunks: u32, chunk_size: u64, index: u32) -> u64 {
    if total_chunks == 0 || index >= total_chunks {
        return 0;
    }
    if index + 1 < total_chunks {
        return chunk_size;
    }
    // Final chunk: whatever the fixed-size chunks left over.
    total_size - chunk_size * u64::from(total_chunks - 1)
}

/// Absolute byte offset where the chunk at `index` starts.
pub fn chunk_offset(chunk_size: u64, index: u32) -> u64 {
    chunk_size * u64::from(index)
}
