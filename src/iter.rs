// Copyright 2026 ndarray-chunked developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use ndarray::{ArrayViewD, Axis};

use crate::chunk::Chunk;
use crate::chunk_seq::ChunkSeq;
use crate::chunked::ElemOf;

/// Offset walk over a chunk sequence.
///
/// Yields `(start, chunk)` where `start` is the logical position of the
/// chunk's first cell. Created with
/// [`ChunkedArray::offsets`](crate::ChunkedArray::offsets).
pub struct Offsets<'a, S>
where S: ChunkSeq + 'a
{
    chunks: S::Chunks<'a>,
    sofar: usize,
}

impl<'a, S> Offsets<'a, S>
where S: ChunkSeq + 'a
{
    pub(crate) fn new(chunks: S::Chunks<'a>) -> Self
    {
        Offsets { chunks, sofar: 0 }
    }

    /// Number of cells in the chunks yielded so far.
    ///
    /// Once the walk is exhausted this is the logical length.
    pub fn walked(&self) -> usize
    {
        self.sofar
    }
}

impl<'a, S> Iterator for Offsets<'a, S>
where S: ChunkSeq + 'a
{
    type Item = (usize, &'a S::Chunk);

    fn next(&mut self) -> Option<Self::Item>
    {
        let chunk = self.chunks.next()?;
        let start = self.sofar;
        self.sofar += chunk.num_rows();
        Some((start, chunk))
    }

    fn size_hint(&self) -> (usize, Option<usize>)
    {
        self.chunks.size_hint()
    }
}

/// Cursor over the cells of a chunked array, in logical order.
///
/// Holds the position in the chunk sequence and the row within the current
/// chunk. Created with [`ChunkedArray::iter`](crate::ChunkedArray::iter).
pub struct Iter<'a, S>
where S: ChunkSeq + 'a
{
    chunks: S::Chunks<'a>,
    current: Option<ArrayViewD<'a, ElemOf<S>>>,
    row: usize,
}

impl<'a, S> Iter<'a, S>
where S: ChunkSeq + 'a
{
    pub(crate) fn new(chunks: S::Chunks<'a>) -> Self
    {
        Iter {
            chunks,
            current: None,
            row: 0,
        }
    }
}

impl<'a, S> Iterator for Iter<'a, S>
where S: ChunkSeq + 'a
{
    type Item = ArrayViewD<'a, ElemOf<S>>;

    fn next(&mut self) -> Option<Self::Item>
    {
        loop {
            if let Some(view) = &self.current {
                if self.row < view.len_of(Axis(0)) {
                    let cell = view.clone().index_axis_move(Axis(0), self.row);
                    self.row += 1;
                    return Some(cell);
                }
            }
            // empty chunks are passed over here
            self.current = Some(self.chunks.next()?.view());
            self.row = 0;
        }
    }
}
