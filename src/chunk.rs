// Copyright 2026 ndarray-chunked developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The capability set a single chunk exposes to the engine.

use std::ops::Range;
use std::rc::Rc;
use std::sync::Arc;

use ndarray::{aview1, ArrayBase, ArrayD, ArrayRef, ArrayView1, ArrayViewD, Axis, Data, Dimension, IxDyn, ShapeError, Slice};

use crate::error::ChunkedError;

/// A fixed-length, densely packed array segment of a single element type.
///
/// Axis 0 of [`view`](Chunk::view) is the chunked axis; every further axis is
/// part of the cell. Only `view` is required, the indexing capabilities have
/// default implementations in terms of it.
///
/// Implemented for every ndarray array type, for `Vec<A>` and `[A]`, and
/// forwarded through `&C`, `Box<C>`, `Rc<C>` and `Arc<C>`, so storage can be
/// mixed in one sequence as `Box<dyn Chunk<Elem = A>>`.
///
/// ```
/// use ndarray::array;
/// use ndarray_chunked::Chunk;
///
/// let chunk = array![[1, 2], [3, 4], [5, 6]];
/// assert_eq!(chunk.num_rows(), 3);
/// assert_eq!(chunk.cell_shape(), vec![2]);
/// assert_eq!(chunk.take(&[2, 0]).unwrap(), array![[5, 6], [1, 2]].into_dyn());
/// ```
pub trait Chunk
{
    type Elem: Clone;

    /// A view of the whole chunk, with at least one axis.
    fn view(&self) -> ArrayViewD<'_, Self::Elem>;

    /// Number of cells (length of axis 0).
    fn num_rows(&self) -> usize
    {
        self.view().len_of(Axis(0))
    }

    /// Shape of one cell: every axis of the chunk except the first.
    fn cell_shape(&self) -> Vec<usize>
    {
        self.view().shape()[1..].to_vec()
    }

    /// The cell at `index`, or `None` if `index` is past the end.
    fn cell(&self, index: usize) -> Option<ArrayViewD<'_, Self::Elem>>
    {
        let view = self.view();
        if index < view.len_of(Axis(0)) {
            Some(view.index_axis_move(Axis(0), index))
        } else {
            None
        }
    }

    /// The cells in `range` (clamped to the chunk), in reverse order if
    /// `reversed`.
    fn row_range(&self, range: Range<usize>, reversed: bool) -> ArrayViewD<'_, Self::Elem>
    {
        let mut view = self.view();
        let end = range.end.min(view.len_of(Axis(0)));
        let start = range.start.min(end);
        view.slice_axis_inplace(Axis(0), Slice::from(start..end));
        if reversed {
            view.invert_axis(Axis(0));
        }
        view
    }

    /// Gather the cells at `rows`, in order and with repetition, into a new
    /// array.
    fn take(&self, rows: &[usize]) -> Result<ArrayD<Self::Elem>, ChunkedError>
    {
        let view = self.view();
        let len = view.len_of(Axis(0));
        if let Some(&index) = rows.iter().find(|&&r| r >= len) {
            return Err(ChunkedError::IndexOutOfBounds { index, len });
        }
        Ok(gather_rows(&view, rows.iter().cloned())?)
    }

    /// Gather the cells whose `mask` entry is true into a new array.
    fn compress(&self, mask: ArrayView1<'_, bool>) -> Result<ArrayD<Self::Elem>, ChunkedError>
    {
        let view = self.view();
        let len = view.len_of(Axis(0));
        if mask.len() != len {
            return Err(ChunkedError::LengthMismatch {
                expected: len,
                actual: mask.len(),
            });
        }
        let rows: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| if keep { Some(i) } else { None })
            .collect();
        Ok(gather_rows(&view, rows.into_iter())?)
    }
}

/// Copy the cells `rows` of `view` into a new standard layout array.
///
/// Every row must be in bounds.
pub(crate) fn gather_rows<A, I>(view: &ArrayViewD<'_, A>, rows: I) -> Result<ArrayD<A>, ShapeError>
where
    A: Clone,
    I: ExactSizeIterator<Item = usize>,
{
    let mut shape = view.shape().to_vec();
    shape[0] = rows.len();
    let mut data = Vec::with_capacity(shape.iter().product());
    for row in rows {
        data.extend(view.index_axis(Axis(0), row).iter().cloned());
    }
    ArrayD::from_shape_vec(IxDyn(&shape), data)
}

/// A zero-dimensional array is a chunk of one cell.
impl<S, D> Chunk for ArrayBase<S, D>
where
    S: Data,
    S::Elem: Clone,
    D: Dimension,
{
    type Elem = S::Elem;

    fn view(&self) -> ArrayViewD<'_, S::Elem>
    {
        let array: &ArrayRef<S::Elem, D> = self;
        let view = array.view().into_dyn();
        if view.ndim() == 0 {
            view.insert_axis(Axis(0))
        } else {
            view
        }
    }
}

impl<A: Clone> Chunk for Vec<A>
{
    type Elem = A;

    fn view(&self) -> ArrayViewD<'_, A>
    {
        aview1(self.as_slice()).into_dyn()
    }

    fn num_rows(&self) -> usize
    {
        Vec::len(self)
    }

    fn cell_shape(&self) -> Vec<usize>
    {
        Vec::new()
    }
}

impl<A: Clone> Chunk for [A]
{
    type Elem = A;

    fn view(&self) -> ArrayViewD<'_, A>
    {
        aview1(self).into_dyn()
    }

    fn num_rows(&self) -> usize
    {
        <[A]>::len(self)
    }

    fn cell_shape(&self) -> Vec<usize>
    {
        Vec::new()
    }
}

impl<'c, C> Chunk for &'c C
where
    C: Chunk + ?Sized,
{
    type Elem = C::Elem;

    #[inline]
    fn view(&self) -> ArrayViewD<'_, C::Elem>
    {
        (**self).view()
    }

    #[inline]
    fn num_rows(&self) -> usize
    {
        (**self).num_rows()
    }

    #[inline]
    fn cell_shape(&self) -> Vec<usize>
    {
        (**self).cell_shape()
    }
}

macro_rules! forward_chunk {
    ($($ptr:ident)*) => {
        $(
        impl<C> Chunk for $ptr<C>
        where
            C: Chunk + ?Sized,
        {
            type Elem = C::Elem;

            #[inline]
            fn view(&self) -> ArrayViewD<'_, C::Elem>
            {
                (**self).view()
            }

            #[inline]
            fn num_rows(&self) -> usize
            {
                (**self).num_rows()
            }

            #[inline]
            fn cell_shape(&self) -> Vec<usize>
            {
                (**self).cell_shape()
            }
        }
        )*
    };
}

forward_chunk!(Box Rc Arc);

#[cfg(test)]
mod tests
{
    use super::*;
    use ndarray::{arr0, array, Array3};

    #[test]
    fn vec_chunk()
    {
        let chunk = vec![10, 11, 12, 13];
        assert_eq!(chunk.num_rows(), 4);
        assert!(chunk.cell_shape().is_empty());
        assert_eq!(chunk.cell(2).and_then(|c| c.first().copied()), Some(12));
        assert!(chunk.cell(4).is_none());
        assert_eq!(chunk.row_range(1..3, false), array![11, 12].into_dyn());
        assert_eq!(chunk.row_range(1..9, true), array![13, 12, 11].into_dyn());
    }

    #[test]
    fn zero_dimensional_is_one_cell()
    {
        let chunk = arr0(5.);
        assert_eq!(chunk.num_rows(), 1);
        assert_eq!(chunk.cell(0).and_then(|c| c.first().copied()), Some(5.));
    }

    #[test]
    fn multidimensional_cells()
    {
        let chunk = Array3::<u8>::zeros((4, 2, 3));
        assert_eq!(chunk.num_rows(), 4);
        assert_eq!(chunk.cell_shape(), vec![2, 3]);
        assert_eq!(chunk.take(&[0, 0, 3]).unwrap().shape(), &[3, 2, 3]);
    }

    #[test]
    fn take_and_compress_bounds()
    {
        let chunk = vec![1, 2, 3];
        assert_eq!(chunk.take(&[3]), Err(ChunkedError::IndexOutOfBounds { index: 3, len: 3 }));
        let mask = [true, false];
        assert_eq!(
            chunk.compress(aview1(&mask)),
            Err(ChunkedError::LengthMismatch { expected: 3, actual: 2 })
        );
        let mask = [true, false, true];
        assert_eq!(chunk.compress(aview1(&mask)).unwrap(), array![1, 3].into_dyn());
    }

    #[test]
    fn dyn_chunks_mix_storage()
    {
        let chunks: Vec<Box<dyn Chunk<Elem = i32>>> = vec![Box::new(vec![1, 2]), Box::new(array![3, 4, 5])];
        let rows: Vec<usize> = chunks.iter().map(|c| c.num_rows()).collect();
        assert_eq!(rows, vec![2, 3]);
    }
}
