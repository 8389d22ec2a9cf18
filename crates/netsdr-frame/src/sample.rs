//! Fixed-width sample extraction from data-frame bodies.

use std::slice::ChunksExact;

use crate::error::{FrameError, Result};

/// Split a data-frame body into consecutive fixed-width samples.
///
/// `width_bits` must be 8, 16, or 32; anything else fails eagerly,
/// before any sample is produced. Samples are non-overlapping chunks
/// taken in body order; a trailing partial chunk is silently dropped
/// because streamed payloads are not guaranteed to align on sample
/// boundaries at arbitrary capture points. An empty body yields an
/// empty iterator.
///
/// The returned iterator borrows `body` and is `Clone`, so the same
/// body can be walked again with identical results.
pub fn extract_samples(width_bits: u16, body: &[u8]) -> Result<Samples<'_>> {
    let width = match width_bits {
        8 => 1,
        16 => 2,
        32 => 4,
        bits => return Err(FrameError::UnsupportedSampleWidth { bits }),
    };
    Ok(Samples {
        chunks: body.chunks_exact(width),
    })
}

/// Iterator over the samples of one body; each item is a borrowed
/// fixed-width byte slice, not an owned copy.
#[derive(Debug, Clone)]
pub struct Samples<'a> {
    chunks: ChunksExact<'a, u8>,
}

impl<'a> Iterator for Samples<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Samples<'_> {}
