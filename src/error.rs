// Copyright 2026 ndarray-chunked developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::error::Error;
use std::fmt;

use ndarray::ShapeError;

/// An error produced by a read, append or configuration operation on a
/// chunked array.
///
/// Every error is terminal for the operation that raised it; no partial
/// result is returned.
#[derive(Clone, Debug, PartialEq)]
pub enum ChunkedError
{
    /// the chunk sequence holds no chunks, so the element type is unknown
    EmptySequence,
    /// a negative position was used where only non-negative ones are allowed
    InvalidIndex(isize),
    /// a slice step of zero
    InvalidSlice,
    /// position `index` is not below the logical length `len`
    IndexOutOfBounds
    {
        index: usize,
        len: usize,
    },
    /// a boolean mask of length `actual` was applied to an array of length `expected`
    LengthMismatch
    {
        expected: usize,
        actual: usize,
    },
    /// the primary index term is an array that is not one-dimensional
    UnsupportedIndexShape
    {
        ndim: usize,
    },
    /// sub-indices address `given` axes but the cells only have `ndim`
    TooManyIndices
    {
        ndim: usize,
        given: usize,
    },
    /// the operation is not supported by this array's configuration
    UnsupportedOperation(&'static str),
    /// chunks with incompatible cell shapes met in a single read
    Shape(ShapeError),
}

impl ChunkedError
{
    /// Return `true` if the error is an out of bounds error.
    pub fn is_out_of_bounds(&self) -> bool
    {
        matches!(self, ChunkedError::IndexOutOfBounds { .. })
    }
}

impl From<ShapeError> for ChunkedError
{
    fn from(err: ShapeError) -> Self
    {
        ChunkedError::Shape(err)
    }
}

impl fmt::Display for ChunkedError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match *self {
            ChunkedError::EmptySequence => write!(f, "chunk sequence is empty; cannot determine element type"),
            ChunkedError::InvalidIndex(i) => {
                write!(f, "negative index {} is not allowed in a chunked array", i)
            }
            ChunkedError::InvalidSlice => write!(f, "slice step cannot be zero"),
            ChunkedError::IndexOutOfBounds { index, len } => {
                write!(f, "index {} out of bounds for length {}", index, len)
            }
            ChunkedError::LengthMismatch { expected, actual } => write!(
                f,
                "boolean index did not match indexed array along axis 0; length is {} but mask length is {}",
                expected, actual
            ),
            ChunkedError::UnsupportedIndexShape { ndim } => write!(
                f,
                "cannot interpret a {}-dimensional array as a fancy index or mask",
                ndim
            ),
            ChunkedError::TooManyIndices { ndim, given } => write!(
                f,
                "too many indices: cells have {} axes but {} were indexed",
                ndim, given
            ),
            ChunkedError::UnsupportedOperation(what) => write!(f, "unsupported operation: {}", what),
            ChunkedError::Shape(ref err) => write!(f, "incompatible chunks: {}", err),
        }
    }
}

impl Error for ChunkedError
{
    fn source(&self) -> Option<&(dyn Error + 'static)>
    {
        match self {
            ChunkedError::Shape(err) => Some(err),
            _ => None,
        }
    }
}
