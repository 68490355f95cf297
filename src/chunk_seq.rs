// Copyright 2026 ndarray-chunked developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::{linked_list, vec_deque, LinkedList, VecDeque};
use std::slice;

use crate::chunk::Chunk;
use crate::error::ChunkedError;

/// An ordered collection of chunks.
///
/// The sequence only has to be iterable; it need not be indexable.
/// Sequences that can grow report it through
/// [`can_append`](ChunkSeq::can_append) and implement
/// [`push_chunk`](ChunkSeq::push_chunk).
pub trait ChunkSeq
{
    type Chunk: Chunk;

    type Chunks<'a>: Iterator<Item = &'a Self::Chunk>
    where Self: 'a;

    /// Iterate the chunks in insertion order.
    fn chunks(&self) -> Self::Chunks<'_>;

    /// Number of chunks (not of elements).
    fn num_chunks(&self) -> usize;

    /// Whether [`push_chunk`](ChunkSeq::push_chunk) is supported.
    fn can_append(&self) -> bool
    {
        false
    }

    /// Add a chunk at the end.
    ///
    /// **Errors** with `UnsupportedOperation` if the sequence cannot grow.
    fn push_chunk(&mut self, _chunk: Self::Chunk) -> Result<(), ChunkedError>
    {
        Err(ChunkedError::UnsupportedOperation("chunk sequence has no append"))
    }
}

impl<C: Chunk> ChunkSeq for Vec<C>
{
    type Chunk = C;
    type Chunks<'a> = slice::Iter<'a, C>
    where Self: 'a;

    fn chunks(&self) -> Self::Chunks<'_>
    {
        self.iter()
    }

    fn num_chunks(&self) -> usize
    {
        self.len()
    }

    fn can_append(&self) -> bool
    {
        true
    }

    fn push_chunk(&mut self, chunk: C) -> Result<(), ChunkedError>
    {
        self.push(chunk);
        Ok(())
    }
}

impl<C: Chunk> ChunkSeq for VecDeque<C>
{
    type Chunk = C;
    type Chunks<'a> = vec_deque::Iter<'a, C>
    where Self: 'a;

    fn chunks(&self) -> Self::Chunks<'_>
    {
        self.iter()
    }

    fn num_chunks(&self) -> usize
    {
        self.len()
    }

    fn can_append(&self) -> bool
    {
        true
    }

    fn push_chunk(&mut self, chunk: C) -> Result<(), ChunkedError>
    {
        self.push_back(chunk);
        Ok(())
    }
}

impl<C: Chunk> ChunkSeq for LinkedList<C>
{
    type Chunk = C;
    type Chunks<'a> = linked_list::Iter<'a, C>
    where Self: 'a;

    fn chunks(&self) -> Self::Chunks<'_>
    {
        self.iter()
    }

    fn num_chunks(&self) -> usize
    {
        self.len()
    }

    fn can_append(&self) -> bool
    {
        true
    }

    fn push_chunk(&mut self, chunk: C) -> Result<(), ChunkedError>
    {
        self.push_back(chunk);
        Ok(())
    }
}

impl<C: Chunk> ChunkSeq for Box<[C]>
{
    type Chunk = C;
    type Chunks<'a> = slice::Iter<'a, C>
    where Self: 'a;

    fn chunks(&self) -> Self::Chunks<'_>
    {
        self.iter()
    }

    fn num_chunks(&self) -> usize
    {
        self.len()
    }
}

impl<'s, C: Chunk> ChunkSeq for &'s [C]
{
    type Chunk = C;
    type Chunks<'a> = slice::Iter<'a, C>
    where Self: 'a;

    fn chunks(&self) -> Self::Chunks<'_>
    {
        self.iter()
    }

    fn num_chunks(&self) -> usize
    {
        self.len()
    }
}

/// A chunked array can hold a borrowed sequence; appends then go to the
/// caller's sequence.
impl<'s, T> ChunkSeq for &'s mut T
where T: ChunkSeq + ?Sized
{
    type Chunk = T::Chunk;
    type Chunks<'a> = T::Chunks<'a>
    where Self: 'a;

    fn chunks(&self) -> Self::Chunks<'_>
    {
        (**self).chunks()
    }

    fn num_chunks(&self) -> usize
    {
        (**self).num_chunks()
    }

    fn can_append(&self) -> bool
    {
        (**self).can_append()
    }

    fn push_chunk(&mut self, chunk: T::Chunk) -> Result<(), ChunkedError>
    {
        (**self).push_chunk(chunk)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn total_rows<S: ChunkSeq>(seq: &S) -> usize
    {
        seq.chunks().map(|c| c.num_rows()).sum()
    }

    #[test]
    fn fixed_sequences_refuse_append()
    {
        let chunks = vec![vec![1, 2], vec![3]];
        let mut boxed: Box<[Vec<i32>]> = chunks.clone().into_boxed_slice();
        assert!(!boxed.can_append());
        assert_eq!(
            boxed.push_chunk(vec![4]),
            Err(ChunkedError::UnsupportedOperation("chunk sequence has no append"))
        );
        let mut borrowed = &chunks[..];
        assert!(borrowed.push_chunk(vec![4]).is_err());
        assert_eq!(total_rows(&borrowed), 3);
    }

    #[test]
    fn linked_list_is_not_indexable_but_appends()
    {
        let mut list = LinkedList::new();
        list.push_chunk(vec![1.0, 2.0]).unwrap();
        list.push_chunk(vec![3.0]).unwrap();
        assert_eq!(list.num_chunks(), 2);
        assert_eq!(total_rows(&list), 3);
    }

    #[test]
    fn borrowed_mut_appends_in_place()
    {
        fn push_through<S: ChunkSeq>(mut seq: S, chunk: S::Chunk) -> Result<(), ChunkedError>
        {
            assert!(seq.can_append());
            seq.push_chunk(chunk)
        }

        let mut chunks = vec![vec![0u8]];
        push_through(&mut chunks, vec![1, 2]).unwrap();
        assert_eq!(chunks.len(), 2);
    }
}
