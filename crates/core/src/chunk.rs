//! Fixed-size chunk planning.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// One indexed, contiguous byte range of a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Position in the file (0-indexed).
    pub index: u32,
    /// Byte offset of the first byte.
    pub offset: u64,
    /// Length in bytes.
    pub len: u64,
}

impl ChunkSpan {
    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }

    /// Read this span's bytes from a seekable source.
    pub async fn read_from<R>(&self, reader: &mut R) -> std::io::Result<Bytes>
    where
        R: AsyncRead + AsyncSeek + Unpin,
    {
        reader.seek(std::io::SeekFrom::Start(self.offset)).await?;
        let mut buf = vec![0u8; self.len as usize];
        reader.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}

/// Number of chunks needed to cover `size` bytes.
pub fn chunk_count(size: u64, chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    size.div_ceil(chunk_size)
}

/// Deterministic partition of `[0, size)` into chunks of `chunk_size` bytes.
///
/// Every chunk is full-sized except possibly the last. A plan is `Copy`, so
/// iterating it again restarts from index 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkPlan {
    size: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    /// Create a plan. Fails if `chunk_size` is zero or the file would need
    /// more than `u32::MAX` chunks.
    pub fn new(size: u64, chunk_size: u64) -> crate::Result<Self> {
        if chunk_size == 0 || chunk_count(size, chunk_size) > u64::from(u32::MAX) {
            return Err(crate::Error::InvalidChunkSize {
                size: chunk_size,
                min: size.div_ceil(u64::from(u32::MAX)).max(1),
                max: u64::MAX,
            });
        }
        Ok(Self { size, chunk_size })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Total number of chunks.
    pub fn len(&self) -> u32 {
        chunk_count(self.size, self.chunk_size) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The span at `index`, if it exists.
    pub fn span(&self, index: u32) -> Option<ChunkSpan> {
        if index >= self.len() {
            return None;
        }
        let offset = u64::from(index) * self.chunk_size;
        Some(ChunkSpan {
            index,
            offset,
            len: self.chunk_size.min(self.size - offset),
        })
    }

    /// Iterate over all spans in ascending index order.
    pub fn spans(&self) -> ChunkSpans {
        ChunkSpans {
            plan: *self,
            next: 0,
        }
    }
}

impl IntoIterator for ChunkPlan {
    type Item = ChunkSpan;
    type IntoIter = ChunkSpans;

    fn into_iter(self) -> ChunkSpans {
        self.spans()
    }
}

/// Lazy iterator over a [`ChunkPlan`].
#[derive(Clone, Debug)]
pub struct ChunkSpans {
    plan: ChunkPlan,
    next: u32,
}

impl Iterator for ChunkSpans {
    type Item = ChunkSpan;

    fn next(&mut self) -> Option<ChunkSpan> {
        let span = self.plan.span(self.next)?;
        self.next += 1;
        Some(span)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.plan.len().saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkSpans {}
