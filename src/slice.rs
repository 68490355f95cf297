// Copyright 2026 ndarray-chunked developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull, RangeInclusive, RangeTo};

use ndarray::{Array1, ArrayD, Ix1, IxDyn};

/// A slice (range with step size) over the chunked axis.
///
/// Bounds are positions from the start of the array; negative bounds are
/// rejected when the slice is used, they never count from the back.
/// A missing `start` or `stop` extends to the end the step walks away from
/// or towards, as in Python.
///
/// ## Examples
///
/// `ChunkSlice::from(..)` is the full range. The Python equivalent is `[:]`.
///
/// `ChunkSlice::from(a..b).step_by(2)` is every second element from `a`
/// until `b`. The Python equivalent is `[a:b:2]`.
///
/// `ChunkSlice::new(Some(a), None, -1)` is every element from `a` down to
/// the first one. The Python equivalent is `[a::-1]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkSlice
{
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: isize,
}

impl ChunkSlice
{
    /// Create a new `ChunkSlice` with the given extents.
    ///
    /// A zero `step` is accepted here and reported as `InvalidSlice` when
    /// the slice is applied.
    pub fn new(start: Option<isize>, stop: Option<isize>, step: isize) -> ChunkSlice
    {
        ChunkSlice { start, stop, step }
    }

    /// Create a new `ChunkSlice` with the given step size (multiplied with the
    /// previous step size).
    #[inline]
    pub fn step_by(self, step: isize) -> Self
    {
        ChunkSlice {
            step: self.step * step,
            ..self
        }
    }

    /// Reverse the walking direction, keeping the bounds.
    #[inline]
    pub fn reversed(self) -> Self
    {
        self.step_by(-1)
    }
}

/// Convert to `isize`, clamping values outside its range so that they stay
/// out of bounds instead of wrapping around to the other sign.
#[inline]
fn saturating_isize<T>(value: T) -> isize
where T: TryInto<isize> + PartialOrd + Default
{
    let negative = value < T::default();
    value
        .try_into()
        .unwrap_or(if negative { isize::MIN } else { isize::MAX })
}

macro_rules! impl_chunk_slice_from_index_type {
    ($index:ty) => {
        impl From<Range<$index>> for ChunkSlice
        {
            #[inline]
            fn from(r: Range<$index>) -> ChunkSlice
            {
                ChunkSlice::new(Some(saturating_isize(r.start)), Some(saturating_isize(r.end)), 1)
            }
        }

        impl From<RangeInclusive<$index>> for ChunkSlice
        {
            #[inline]
            fn from(r: RangeInclusive<$index>) -> ChunkSlice
            {
                ChunkSlice::new(Some(saturating_isize(*r.start())), Some(saturating_isize(*r.end()).saturating_add(1)), 1)
            }
        }

        impl From<RangeFrom<$index>> for ChunkSlice
        {
            #[inline]
            fn from(r: RangeFrom<$index>) -> ChunkSlice
            {
                ChunkSlice::new(Some(saturating_isize(r.start)), None, 1)
            }
        }

        impl From<RangeTo<$index>> for ChunkSlice
        {
            #[inline]
            fn from(r: RangeTo<$index>) -> ChunkSlice
            {
                ChunkSlice::new(None, Some(saturating_isize(r.end)), 1)
            }
        }
    };
}

impl_chunk_slice_from_index_type!(isize);
impl_chunk_slice_from_index_type!(usize);
impl_chunk_slice_from_index_type!(i32);

impl From<RangeFull> for ChunkSlice
{
    #[inline]
    fn from(_: RangeFull) -> ChunkSlice
    {
        ChunkSlice::new(None, None, 1)
    }
}

impl fmt::Display for ChunkSlice
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if let Some(start) = self.start {
            write!(f, "{}", start)?;
        }
        write!(f, "..")?;
        if let Some(stop) = self.stop {
            write!(f, "{}", stop)?;
        }
        if self.step != 1 {
            write!(f, ";{}", self.step)?;
        }
        Ok(())
    }
}

/// The primary index term of a read on a chunked array.
///
/// Conversions exist from integers (`Index`), ranges and `ChunkSlice`
/// (`Slice`), integer sequences and arrays (`Positions`) and boolean
/// sequences and arrays (`Mask`). Array terms may have any number of
/// dimensions; only one-dimensional ones can be applied.
#[derive(Clone, Debug, PartialEq)]
pub enum ChunkIndex
{
    /// A single position.
    Index(isize),
    /// A strided range of positions.
    Slice(ChunkSlice),
    /// Explicit positions, gathered in order (fancy indexing).
    Positions(ArrayD<isize>),
    /// One flag per element; true elements are selected.
    Mask(ArrayD<bool>),
}

impl ChunkIndex
{
    /// Return `true` if `self` is an `Index` value.
    pub fn is_index(&self) -> bool
    {
        matches!(self, ChunkIndex::Index(_))
    }
}

macro_rules! impl_chunk_index_from_int {
    ($($int:ty)*) => {
        $(
        impl From<$int> for ChunkIndex
        {
            #[inline]
            fn from(i: $int) -> ChunkIndex
            {
                ChunkIndex::Index(saturating_isize(i))
            }
        }
        )*
    };
}

impl_chunk_index_from_int!(isize usize i32 i64 u32);

macro_rules! impl_chunk_index_from_slice {
    ($($slice:ty),*) => {
        $(
        impl From<$slice> for ChunkIndex
        {
            #[inline]
            fn from(s: $slice) -> ChunkIndex
            {
                ChunkIndex::Slice(s.into())
            }
        }
        )*
    };
}

impl_chunk_index_from_slice!(
    ChunkSlice,
    RangeFull,
    Range<isize>,
    RangeFrom<isize>,
    RangeTo<isize>,
    RangeInclusive<isize>,
    Range<usize>,
    RangeFrom<usize>,
    RangeTo<usize>,
    RangeInclusive<usize>,
    Range<i32>,
    RangeFrom<i32>,
    RangeTo<i32>,
    RangeInclusive<i32>
);

impl From<ArrayD<isize>> for ChunkIndex
{
    fn from(positions: ArrayD<isize>) -> ChunkIndex
    {
        ChunkIndex::Positions(positions)
    }
}

impl From<Array1<isize>> for ChunkIndex
{
    fn from(positions: Array1<isize>) -> ChunkIndex
    {
        ChunkIndex::Positions(positions.into_dyn())
    }
}

macro_rules! impl_chunk_index_from_positions {
    ($($int:ty)*) => {
        $(
        impl From<Vec<$int>> for ChunkIndex
        {
            fn from(positions: Vec<$int>) -> ChunkIndex
            {
                positions.as_slice().into()
            }
        }

        impl From<&[$int]> for ChunkIndex
        {
            fn from(positions: &[$int]) -> ChunkIndex
            {
                let positions: Array1<isize> = positions.iter().map(|&p| saturating_isize(p)).collect();
                ChunkIndex::Positions(positions.into_dyn())
            }
        }
        )*
    };
}

impl_chunk_index_from_positions!(isize usize i32 i64);

impl From<ArrayD<bool>> for ChunkIndex
{
    fn from(mask: ArrayD<bool>) -> ChunkIndex
    {
        ChunkIndex::Mask(mask)
    }
}

impl From<Array1<bool>> for ChunkIndex
{
    fn from(mask: Array1<bool>) -> ChunkIndex
    {
        ChunkIndex::Mask(mask.into_dyn())
    }
}

impl From<Vec<bool>> for ChunkIndex
{
    fn from(mask: Vec<bool>) -> ChunkIndex
    {
        ChunkIndex::Mask(Array1::from(mask).into_dyn())
    }
}

impl From<&[bool]> for ChunkIndex
{
    fn from(mask: &[bool]) -> ChunkIndex
    {
        mask.to_vec().into()
    }
}

/// Require a one-dimensional index array.
pub(crate) fn one_dimensional<A>(array: ArrayD<A>) -> Result<Array1<A>, usize>
{
    let ndim = array.ndim();
    array.into_dimensionality::<Ix1>().map_err(|_| ndim)
}
