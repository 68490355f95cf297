// Copyright 2026 ndarray-chunked developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::num::NonZeroUsize;

use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};
use tracing::debug;

use crate::chunk::Chunk;
use crate::chunk_seq::ChunkSeq;
use crate::element::ElementType;
use crate::error::ChunkedError;
use crate::iter::{Iter, Offsets};

/// Element type of the chunks of a sequence `S`.
pub type ElemOf<S> = <<S as ChunkSeq>::Chunk as Chunk>::Elem;

/// Default number of rows per chunk created by
/// [`extend_rows`](ChunkedArray::extend_rows).
pub const DEFAULT_APPEND_THRESHOLD: NonZeroUsize = match NonZeroUsize::new(1024) {
    Some(threshold) => threshold,
    None => panic!("append threshold must be positive"),
};

/// Flags carried by a chunked array.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "persist", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkedOptions
{
    /// Advisory: whether callers may write elements through this array.
    pub writeable: bool,
    /// Whether chunks may be appended; requires an appendable sequence.
    pub appendable: bool,
    /// Maximum number of rows per chunk created by `extend_rows`.
    pub append_threshold: NonZeroUsize,
}

impl Default for ChunkedOptions
{
    fn default() -> Self
    {
        ChunkedOptions {
            writeable: true,
            appendable: true,
            append_threshold: DEFAULT_APPEND_THRESHOLD,
        }
    }
}

/// A logically contiguous array stored as a sequence of chunks.
///
/// The logical array is the concatenation of all chunks along axis 0; its
/// cells have the shape of the first chunk's trailing axes. Every read walks
/// the chunk sequence from the start, so nothing is cached and the sequence
/// may change freely between reads.
///
/// Positions are never counted from the back: negative indices and slice
/// bounds are errors.
///
/// ```
/// use ndarray::array;
/// use ndarray_chunked::{ChunkSlice, ChunkedArray};
///
/// let a = ChunkedArray::new(vec![vec![], vec![0, 1, 2, 3, 4], vec![5, 6], vec![], vec![7, 8, 9], vec![]]);
/// assert_eq!(a.len(), 10);
/// assert_eq!(a.get_scalar(7), Ok(&7));
/// assert_eq!(a.slice(ChunkSlice::from(2..9).step_by(2)).unwrap(), array![2, 4, 6, 8].into_dyn());
/// assert_eq!(a.take(&[9, 0, 5]).unwrap(), array![9, 0, 5].into_dyn());
/// ```
#[derive(Clone, Debug)]
pub struct ChunkedArray<S>
{
    chunks: S,
    options: ChunkedOptions,
}

/// Builder for a [`ChunkedArray`] with validated options.
#[derive(Clone, Debug)]
pub struct ChunkedArrayBuilder<S>
{
    chunks: S,
    options: ChunkedOptions,
}

impl<S: ChunkSeq> ChunkedArrayBuilder<S>
{
    pub fn writeable(mut self, writeable: bool) -> Self
    {
        self.options.writeable = writeable;
        self
    }

    pub fn appendable(mut self, appendable: bool) -> Self
    {
        self.options.appendable = appendable;
        self
    }

    pub fn append_threshold(mut self, threshold: NonZeroUsize) -> Self
    {
        self.options.append_threshold = threshold;
        self
    }

    pub fn options(mut self, options: ChunkedOptions) -> Self
    {
        self.options = options;
        self
    }

    /// **Errors** with `UnsupportedOperation` if the array is to be
    /// appendable but the sequence cannot grow.
    pub fn build(self) -> Result<ChunkedArray<S>, ChunkedError>
    {
        check_appendable(&self.chunks, self.options.appendable)?;
        Ok(ChunkedArray {
            chunks: self.chunks,
            options: self.options,
        })
    }
}

fn check_appendable<S: ChunkSeq>(chunks: &S, appendable: bool) -> Result<(), ChunkedError>
{
    if appendable && !chunks.can_append() {
        Err(ChunkedError::UnsupportedOperation("appendable requires a chunk sequence with append"))
    } else {
        Ok(())
    }
}

impl<S: ChunkSeq> ChunkedArray<S>
{
    /// Create a chunked array over `chunks`, appendable exactly when the
    /// sequence supports append.
    pub fn new(chunks: S) -> Self
    {
        let options = ChunkedOptions {
            appendable: chunks.can_append(),
            ..ChunkedOptions::default()
        };
        ChunkedArray { chunks, options }
    }

    /// Start building a chunked array over `chunks` with default options.
    pub fn builder(chunks: S) -> ChunkedArrayBuilder<S>
    {
        ChunkedArrayBuilder {
            chunks,
            options: ChunkedOptions::default(),
        }
    }

    /// Create a chunked array with `options`, validated like
    /// [`ChunkedArrayBuilder::build`].
    pub fn with_options(chunks: S, options: ChunkedOptions) -> Result<Self, ChunkedError>
    {
        Self::builder(chunks).options(options).build()
    }

    /// The chunk sequence.
    pub fn chunks(&self) -> &S
    {
        &self.chunks
    }

    /// Mutable access to the chunk sequence.
    pub fn chunks_mut(&mut self) -> &mut S
    {
        &mut self.chunks
    }

    pub fn into_chunks(self) -> S
    {
        self.chunks
    }

    pub fn options(&self) -> ChunkedOptions
    {
        self.options
    }

    pub fn is_writeable(&self) -> bool
    {
        self.options.writeable
    }

    pub fn set_writeable(&mut self, writeable: bool)
    {
        self.options.writeable = writeable;
    }

    pub fn is_appendable(&self) -> bool
    {
        self.options.appendable
    }

    /// **Errors** with `UnsupportedOperation` when enabling append on a
    /// sequence that cannot grow; the flag is left unchanged.
    pub fn set_appendable(&mut self, appendable: bool) -> Result<(), ChunkedError>
    {
        check_appendable(&self.chunks, appendable)?;
        self.options.appendable = appendable;
        Ok(())
    }

    pub fn append_threshold(&self) -> NonZeroUsize
    {
        self.options.append_threshold
    }

    pub fn set_append_threshold(&mut self, threshold: NonZeroUsize)
    {
        self.options.append_threshold = threshold;
    }

    /// Number of chunks, including empty ones.
    pub fn num_chunks(&self) -> usize
    {
        self.chunks.num_chunks()
    }

    /// Walk the chunks, yielding each with the logical position of its first
    /// cell.
    pub fn offsets(&self) -> Offsets<'_, S>
    {
        Offsets::new(self.chunks.chunks())
    }

    /// Total number of cells (the logical length).
    pub fn len(&self) -> usize
    {
        self.chunks.chunks().map(|chunk| chunk.num_rows()).sum()
    }

    pub fn is_empty(&self) -> bool
    {
        self.chunks.chunks().all(|chunk| chunk.num_rows() == 0)
    }

    /// Shape of each cell, taken from the first chunk.
    ///
    /// **Errors** with `EmptySequence` if there are no chunks.
    pub fn cell_shape(&self) -> Result<Vec<usize>, ChunkedError>
    {
        self.chunks
            .chunks()
            .next()
            .map(|chunk| chunk.cell_shape())
            .ok_or(ChunkedError::EmptySequence)
    }

    /// The element type and cell shape, taken from the first chunk.
    ///
    /// Other chunks are not checked; a chunk with a different cell shape makes
    /// the reads that touch it fail.
    ///
    /// **Errors** with `EmptySequence` if there are no chunks.
    pub fn element_type(&self) -> Result<ElementType, ChunkedError>
    {
        Ok(ElementType {
            name: std::any::type_name::<ElemOf<S>>(),
            shape: self.cell_shape()?,
        })
    }

    /// Iterate over the cells in logical order.
    ///
    /// Each call starts a fresh traversal from the first chunk.
    pub fn iter(&self) -> Iter<'_, S>
    {
        Iter::new(self.chunks.chunks())
    }

    /// Append a chunk at the end.
    ///
    /// **Errors** with `UnsupportedOperation` if the array is not appendable.
    pub fn append(&mut self, chunk: S::Chunk) -> Result<(), ChunkedError>
    {
        if !self.options.appendable {
            return Err(ChunkedError::UnsupportedOperation("chunked array is not appendable"));
        }
        debug!(rows = chunk.num_rows(), chunks = self.chunks.num_chunks(), "appending chunk");
        self.chunks.push_chunk(chunk)
    }

    /// Append the cells of `rows` (split along axis 0) as new chunks of at
    /// most `append_threshold` cells each.
    ///
    /// **Errors** with `UnsupportedOperation` if the array is not appendable.
    pub fn extend_rows(&mut self, rows: ArrayViewD<'_, ElemOf<S>>) -> Result<(), ChunkedError>
    where S::Chunk: From<ArrayD<ElemOf<S>>>
    {
        if !self.options.appendable {
            return Err(ChunkedError::UnsupportedOperation("chunked array is not appendable"));
        }
        let rows = if rows.ndim() == 0 { rows.insert_axis(Axis(0)) } else { rows };
        let total = rows.len_of(Axis(0));
        let step = self.options.append_threshold.get();
        let mut start = 0;
        while start < total {
            let end = total.min(start + step);
            let piece = rows.slice_axis(Axis(0), (start..end).into()).to_owned();
            self.chunks.push_chunk(S::Chunk::from(piece))?;
            start = end;
        }
        debug!(rows = total, threshold = step, "extended chunked array");
        Ok(())
    }

    /// Concatenate all chunks into one array.
    ///
    /// An array without chunks becomes an empty one-dimensional array.
    pub fn to_array(&self) -> Result<ArrayD<ElemOf<S>>, ChunkedError>
    {
        let views: Vec<_> = self
            .chunks
            .chunks()
            .map(|chunk| chunk.view())
            .filter(|view| view.len_of(Axis(0)) != 0)
            .collect();
        match views.len() {
            0 => self.zero_length(),
            _ => Ok(ndarray::concatenate(Axis(0), &views)?),
        }
    }

    /// An empty array with the cells of this array, or an empty
    /// one-dimensional array if there are no chunks.
    pub(crate) fn zero_length(&self) -> Result<ArrayD<ElemOf<S>>, ChunkedError>
    {
        let mut shape = vec![0];
        if let Ok(cell) = self.cell_shape() {
            shape.extend(cell);
        }
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), Vec::new())?)
    }
}

impl<C: Chunk> FromIterator<C> for ChunkedArray<Vec<C>>
{
    fn from_iter<I>(iter: I) -> Self
    where I: IntoIterator<Item = C>
    {
        ChunkedArray::new(iter.into_iter().collect())
    }
}

impl<'a, S: ChunkSeq> IntoIterator for &'a ChunkedArray<S>
{
    type Item = ArrayViewD<'a, ElemOf<S>>;
    type IntoIter = Iter<'a, S>;

    fn into_iter(self) -> Self::IntoIter
    {
        self.iter()
    }
}
