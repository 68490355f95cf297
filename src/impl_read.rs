// Copyright 2026 ndarray-chunked developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Reads: integer, slice, fancy and mask indexing over the offset walk.

use ndarray::{aview1, ArrayD, ArrayView1, ArrayViewD, Axis, CowArray, ErrorKind, Ix0, IxDyn, ShapeError, Slice, SliceInfoElem};

use crate::chunk::Chunk;
use crate::chunk_seq::ChunkSeq;
use crate::chunked::{ChunkedArray, ElemOf};
use crate::error::ChunkedError;
use crate::slice::{one_dimensional, ChunkIndex, ChunkSlice};

/// Result of a read: borrowed from a chunk where possible, owned otherwise.
pub type Cells<'a, A> = CowArray<'a, A, IxDyn>;

fn non_negative(index: isize) -> Result<usize, ChunkedError>
{
    if index < 0 {
        Err(ChunkedError::InvalidIndex(index))
    } else {
        Ok(index as usize)
    }
}

/// Record the cell shape of `piece`, or check it against the one recorded.
fn check_cell(cell: &mut Option<Vec<usize>>, piece: &[usize]) -> Result<(), ChunkedError>
{
    if let Some(known) = cell {
        if known[..] != piece[1..] {
            return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
        }
    } else {
        *cell = Some(piece[1..].to_vec());
    }
    Ok(())
}

impl<S: ChunkSeq> ChunkedArray<S>
{
    /// Read with a single index term; see [`read_with`](Self::read_with).
    pub fn read<I>(&self, index: I) -> Result<Cells<'_, ElemOf<S>>, ChunkedError>
    where I: Into<ChunkIndex>
    {
        self.read_with(index, &[] as &[SliceInfoElem])
    }

    /// Read the cells selected by `index`, then apply `rest` to the axes of
    /// the cells.
    ///
    /// - `Index(i)` reads one cell (as a view into its chunk);
    /// - `Slice(s)` reads a strided range, see [`slice`](Self::slice);
    /// - `Positions(p)` gathers cells in the order of `p`, see [`take`](Self::take);
    /// - `Mask(m)` selects the cells whose flag is true, see [`compress`](Self::compress).
    ///
    /// `rest` is a list of `SliceInfoElem`, usually written with `s![..]`,
    /// and uses ndarray's slicing conventions within the cell: negative
    /// values count from the end of their axis and slice bounds are clamped.
    ///
    /// **Errors** with `UnsupportedIndexShape` if a position or mask array is
    /// not one-dimensional, `TooManyIndices` if `rest` addresses more axes
    /// than the cells have, and as the individual read otherwise.
    pub fn read_with<I, R>(&self, index: I, rest: R) -> Result<Cells<'_, ElemOf<S>>, ChunkedError>
    where
        I: Into<ChunkIndex>,
        R: AsRef<[SliceInfoElem]>,
    {
        let rest = rest.as_ref();
        let selected = match index.into() {
            ChunkIndex::Index(i) => return apply_trailing(CowArray::from(self.get(i)?), rest, 0),
            ChunkIndex::Slice(slice) => self.slice(slice)?,
            ChunkIndex::Positions(positions) => {
                let positions = one_dimensional(positions).map_err(|ndim| ChunkedError::UnsupportedIndexShape { ndim })?;
                CowArray::from(self.take_view(ArrayView1::from(&positions))?)
            }
            ChunkIndex::Mask(mask) => {
                let mask = one_dimensional(mask).map_err(|ndim| ChunkedError::UnsupportedIndexShape { ndim })?;
                CowArray::from(self.compress_view(ArrayView1::from(&mask))?)
            }
        };
        apply_trailing(selected, rest, 1)
    }

    /// The cell at logical position `index`, as a view into its chunk.
    ///
    /// **Errors** with `InvalidIndex` if `index` is negative and with
    /// `IndexOutOfBounds` if it is not below the logical length.
    pub fn get(&self, index: isize) -> Result<ArrayViewD<'_, ElemOf<S>>, ChunkedError>
    {
        let index = non_negative(index)?;
        let mut walk = self.offsets();
        for (start, chunk) in &mut walk {
            if start <= index && index < start + chunk.num_rows() {
                if let Some(cell) = chunk.cell(index - start) {
                    return Ok(cell);
                }
            }
        }
        Err(ChunkedError::IndexOutOfBounds {
            index,
            len: walk.walked(),
        })
    }

    /// The element at logical position `index` of an array with scalar cells.
    ///
    /// **Errors** as [`get`](Self::get), or with a shape error if the cells
    /// are not scalars.
    pub fn get_scalar(&self, index: isize) -> Result<&ElemOf<S>, ChunkedError>
    {
        Ok(self.get(index)?.into_dimensionality::<Ix0>()?.into_scalar())
    }

    /// Read a strided range of cells.
    ///
    /// Each chunk contributes the part of its span inside the range, taken
    /// with unit step; the step is applied once to the concatenation so that
    /// the stride follows the logical positions across chunk boundaries. A
    /// range inside one chunk borrows from that chunk.
    ///
    /// **Errors** with `InvalidIndex` for a negative bound and with
    /// `InvalidSlice` for a zero step.
    ///
    /// ```
    /// use ndarray::array;
    /// use ndarray_chunked::{ChunkSlice, ChunkedArray};
    ///
    /// let a = ChunkedArray::new(vec![vec![0, 1, 2], vec![3, 4], vec![5, 6, 7]]);
    /// assert_eq!(a.slice(ChunkSlice::new(Some(6), Some(1), -2)).unwrap(), array![6, 4, 2].into_dyn());
    /// assert_eq!(a.slice(ChunkSlice::new(None, None, -3)).unwrap(), array![7, 4, 1].into_dyn());
    /// ```
    pub fn slice<I>(&self, slice: I) -> Result<Cells<'_, ElemOf<S>>, ChunkedError>
    where I: Into<ChunkSlice>
    {
        let ChunkSlice { start, stop, step } = slice.into();
        let start = start.map(non_negative).transpose()?;
        let stop = stop.map(non_negative).transpose()?;
        if step == 0 {
            return Err(ChunkedError::InvalidSlice);
        }

        let mut pieces = self.sliced_chunks(start, stop, step > 0);
        let mut out = match pieces.len() {
            0 => return Ok(CowArray::from(self.zero_length()?)),
            1 => CowArray::from(pieces.remove(0)),
            _ => CowArray::from(ndarray::concatenate(Axis(0), &pieces)?),
        };
        // isize::MIN has no absolute value; any stride past the end keeps only the first cell
        let stride = step.checked_abs().unwrap_or(isize::MAX);
        if stride != 1 {
            out.slice_axis_inplace(Axis(0), Slice::new(0, None, stride));
        }
        Ok(out)
    }

    /// Per-chunk pieces of the range, each with unit step, in the order the
    /// step walks them.
    fn sliced_chunks(&self, start: Option<usize>, stop: Option<usize>, forward: bool) -> Vec<ArrayViewD<'_, ElemOf<S>>>
    {
        let mut pieces = Vec::new();
        for (sofar, chunk) in self.offsets() {
            let len = chunk.num_rows();
            if len == 0 {
                continue;
            }
            let end = sofar + len;
            let (lo, hi) = if forward {
                // [start, stop)
                if matches!(stop, Some(stop) if stop <= sofar) {
                    break;
                }
                (start.map_or(sofar, |s| s.max(sofar)), stop.map_or(end, |s| s.min(end)))
            } else {
                // (stop, start]
                if matches!(start, Some(start) if start < sofar) {
                    break;
                }
                (stop.map_or(sofar, |s| (s + 1).max(sofar)), start.map_or(end, |s| (s + 1).min(end)))
            };
            // empty pieces are dropped
            if lo < hi {
                pieces.push(chunk.row_range(lo - sofar..hi - sofar, !forward));
            }
        }
        if !forward {
            pieces.reverse();
        }
        pieces
    }

    /// Gather the cells at `positions`, in order and with repetition, into a
    /// new array.
    ///
    /// The walk stops after the chunk holding the largest position.
    ///
    /// **Errors** with `InvalidIndex` for a negative position and with
    /// `IndexOutOfBounds` if the largest position is not below the logical
    /// length.
    pub fn take(&self, positions: &[isize]) -> Result<ArrayD<ElemOf<S>>, ChunkedError>
    {
        self.take_view(aview1(positions))
    }

    fn take_view(&self, positions: ArrayView1<'_, isize>) -> Result<ArrayD<ElemOf<S>>, ChunkedError>
    {
        let positions = positions
            .iter()
            .map(|&p| non_negative(p))
            .collect::<Result<Vec<_>, _>>()?;
        let maxindex = match positions.iter().max() {
            Some(&maxindex) => maxindex,
            None => return self.zero_length(),
        };

        // slot i is filled from row .1 of piece .0
        let mut slots: Vec<Option<(usize, usize)>> = vec![None; positions.len()];
        let mut pieces = Vec::new();
        let mut walk = self.offsets();
        for (sofar, chunk) in &mut walk {
            let end = sofar + chunk.num_rows();
            let mut rows = Vec::new();
            for (slot, &p) in slots.iter_mut().zip(&positions) {
                if sofar <= p && p < end {
                    *slot = Some((pieces.len(), rows.len()));
                    rows.push(p - sofar);
                }
            }
            if !rows.is_empty() {
                pieces.push(chunk.take(&rows)?);
            }
            if end > maxindex {
                break;
            }
        }
        if maxindex >= walk.walked() {
            return Err(ChunkedError::IndexOutOfBounds {
                index: maxindex,
                len: walk.walked(),
            });
        }

        let mut cell = None;
        for piece in &pieces {
            check_cell(&mut cell, piece.shape())?;
        }
        let mut shape = vec![positions.len()];
        shape.extend(cell.unwrap_or_default());
        let mut data = Vec::with_capacity(shape.iter().product());
        for &(piece, row) in slots.iter().flatten() {
            data.extend(pieces[piece].index_axis(Axis(0), row).iter().cloned());
        }
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
    }

    /// Select the cells whose `mask` entry is true into a new array.
    ///
    /// **Errors** with `LengthMismatch` unless the mask has exactly one entry
    /// per cell.
    pub fn compress(&self, mask: &[bool]) -> Result<ArrayD<ElemOf<S>>, ChunkedError>
    {
        self.compress_view(aview1(mask))
    }

    fn compress_view(&self, mask: ArrayView1<'_, bool>) -> Result<ArrayD<ElemOf<S>>, ChunkedError>
    {
        let len = self.len();
        if mask.len() != len {
            return Err(ChunkedError::LengthMismatch {
                expected: len,
                actual: mask.len(),
            });
        }
        let numtrue = mask.iter().filter(|&&keep| keep).count();
        if numtrue == 0 {
            return self.zero_length();
        }

        let mut cell = None;
        let mut data = Vec::new();
        let mut cursor = 0;
        for (sofar, chunk) in self.offsets() {
            let submask = mask.slice_axis(Axis(0), Slice::from(sofar..sofar + chunk.num_rows()));
            let next = cursor + submask.iter().filter(|&&keep| keep).count();
            if next == cursor {
                continue;
            }
            let piece = chunk.compress(submask)?;
            check_cell(&mut cell, piece.shape())?;
            data.extend(piece.iter().cloned());
            cursor = next;
        }
        debug_assert_eq!(cursor, numtrue);
        let mut shape = vec![numtrue];
        shape.extend(cell.unwrap_or_default());
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
    }
}

fn resolve_trailing(index: isize, len: usize) -> Result<usize, ChunkedError>
{
    let resolved = if index < 0 { index + len as isize } else { index };
    if resolved < 0 {
        Err(ChunkedError::InvalidIndex(index))
    } else if resolved as usize >= len {
        Err(ChunkedError::IndexOutOfBounds {
            index: resolved as usize,
            len,
        })
    } else {
        Ok(resolved as usize)
    }
}

fn clamp_bound(bound: isize, len: usize) -> usize
{
    let bound = if bound < 0 { bound + len as isize } else { bound };
    bound.clamp(0, len as isize) as usize
}

/// Apply sub-indices `rest` to the axes of `array` from `first_axis` on.
pub(crate) fn apply_trailing<'a, A>(
    mut array: CowArray<'a, A, IxDyn>, rest: &[SliceInfoElem], first_axis: usize,
) -> Result<CowArray<'a, A, IxDyn>, ChunkedError>
{
    let given = rest
        .iter()
        .filter(|elem| !matches!(elem, SliceInfoElem::NewAxis))
        .count();
    let ndim = array.ndim().saturating_sub(first_axis);
    if given > ndim {
        return Err(ChunkedError::TooManyIndices { ndim, given });
    }

    let mut axis = first_axis;
    for elem in rest {
        match *elem {
            SliceInfoElem::Index(index) => {
                let index = resolve_trailing(index, array.len_of(Axis(axis)))?;
                array = array.index_axis_move(Axis(axis), index);
            }
            SliceInfoElem::Slice { start, end, step } => {
                if step == 0 {
                    return Err(ChunkedError::InvalidSlice);
                }
                let len = array.len_of(Axis(axis));
                let start = clamp_bound(start, len);
                let end = end.map_or(len, |end| clamp_bound(end, len)).max(start);
                array.slice_axis_inplace(Axis(axis), Slice::new(start as isize, Some(end as isize), step));
                axis += 1;
            }
            SliceInfoElem::NewAxis => {
                array = array.insert_axis(Axis(axis));
                axis += 1;
            }
        }
    }
    Ok(array)
}

#[cfg(test)]
mod tests
{
    use super::*;
    use ndarray::{array, s, Array1, Array2, NewAxis};

    fn sample() -> ChunkedArray<Vec<Vec<i32>>>
    {
        ChunkedArray::new(vec![vec![], vec![0, 1, 2, 3, 4], vec![5, 6], vec![], vec![7, 8, 9], vec![]])
    }

    #[test]
    fn single_piece_slice_borrows()
    {
        let a = sample();
        assert!(a.slice(1..4).unwrap().is_view());
        assert!(!a.slice(3..7).unwrap().is_view());
        assert!(a.read(7).unwrap().is_view());
    }

    #[test]
    fn reverse_pieces_keep_global_stride()
    {
        let a = sample();
        assert_eq!(a.slice(ChunkSlice::new(Some(9), Some(0), -2)).unwrap(), array![9, 7, 5, 3, 1].into_dyn());
        assert_eq!(a.slice(ChunkSlice::new(Some(20), None, -4)).unwrap(), array![9, 5, 1].into_dyn());
        assert_eq!(a.slice(ChunkSlice::new(Some(4), Some(4), -1)).unwrap().len(), 0);
    }

    #[test]
    fn index_arrays_dispatch_to_gathers()
    {
        let a = sample();
        let positions: Array1<isize> = array![9, 0, 5];
        assert_eq!(a.read(positions).unwrap(), array![9, 0, 5].into_dyn());
        assert_eq!(a.read(array![8isize, 8].into_dyn()).unwrap(), array![8, 8].into_dyn());
        let mask = Array1::from_shape_fn(10, |i| i % 4 == 1);
        assert_eq!(a.read(mask).unwrap(), array![1, 5, 9].into_dyn());
        assert_eq!(a.read(Array1::from_elem(10, false).into_dyn()).unwrap().len(), 0);
    }

    #[test]
    fn extreme_steps_keep_first_cell()
    {
        let a = sample();
        assert_eq!(a.slice(ChunkSlice::new(None, None, isize::MIN)).unwrap(), array![9].into_dyn());
        assert_eq!(a.slice(ChunkSlice::new(Some(3), None, isize::MIN)).unwrap(), array![3].into_dyn());
        assert_eq!(a.slice(ChunkSlice::new(Some(1), None, isize::MAX)).unwrap(), array![1].into_dyn());
    }

    #[test]
    fn trailing_indices_within_cells()
    {
        let chunks = vec![
            Array2::from_shape_fn((2, 3), |(i, j)| (10 * i + j) as i64),
            Array2::from_shape_fn((1, 3), |(i, j)| (10 * (i + 2) + j) as i64),
        ];
        let a = ChunkedArray::new(chunks);
        assert_eq!(a.read_with(2, &s![1]).unwrap(), ndarray::arr0(21).into_dyn());
        assert_eq!(a.read_with(2, s![1]).unwrap(), ndarray::arr0(21).into_dyn());
        assert_eq!(a.read_with(2, vec![SliceInfoElem::Index(2)]).unwrap(), ndarray::arr0(22).into_dyn());
        assert_eq!(a.read_with(1.., &s![-1]).unwrap(), array![12, 22].into_dyn());
        assert_eq!(a.read_with(vec![2, 0], &s![..2]).unwrap(), array![[20, 21], [0, 1]].into_dyn());
        assert_eq!(a.read_with(0, &s![5..]).unwrap().len(), 0);
        assert_eq!(
            a.read_with(0, &s![3]),
            Err(ChunkedError::IndexOutOfBounds { index: 3, len: 3 })
        );
        assert_eq!(
            a.read_with(0, &s![0, 0]),
            Err(ChunkedError::TooManyIndices { ndim: 1, given: 2 })
        );
        assert_eq!(a.read_with(.., &s![NewAxis, 0]).unwrap().shape(), &[3, 1]);
    }

    #[test]
    fn mismatched_cells_fail_lazily()
    {
        let chunks: Vec<ArrayD<u8>> = vec![ArrayD::zeros(IxDyn(&[2, 2])), ArrayD::zeros(IxDyn(&[2, 3]))];
        let a = ChunkedArray::new(chunks);
        assert_eq!(a.element_type().unwrap().shape, vec![2]);
        assert!(a.read(0..2).is_ok());
        assert!(matches!(a.read(1..3), Err(ChunkedError::Shape(_))));
        assert!(matches!(a.take(&[0, 3]), Err(ChunkedError::Shape(_))));
        assert!(a.take(&[0, 1]).is_ok());
    }
}
