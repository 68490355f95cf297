// Copyright 2026 ndarray-chunked developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
#![doc(html_root_url = "https://docs.rs/ndarray-chunked/0.1/")]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! The `ndarray-chunked` crate provides [`ChunkedArray`], a logically
//! contiguous array stored as an ordered sequence of independent chunks.
//!
//! - Chunks are anything implementing [`Chunk`]: every ndarray array type,
//!   `Vec<A>`, shared pointers to those, or a mix of them behind
//!   `Box<dyn Chunk<Elem = A>>`.
//! - The chunk sequence is anything implementing [`ChunkSeq`]; it only has to
//!   be iterable, and appendable sequences can grow through the array.
//! - Reads resolve a logical position to a chunk and a local offset by
//!   walking the chunks once. No offset index is kept, so the sequence may be
//!   modified between reads.
//!
//! ## Indexing
//!
//! | Term | Method | Result |
//! |------|--------|--------|
//! | integer | [`get`](ChunkedArray::get) | view of one cell |
//! | [`ChunkSlice`] | [`slice`](ChunkedArray::slice) | borrowed or owned range |
//! | integer array | [`take`](ChunkedArray::take) | new array, in the given order |
//! | boolean array | [`compress`](ChunkedArray::compress) | new array of the true cells |
//!
//! [`read`](ChunkedArray::read) dispatches on a [`ChunkIndex`] and
//! [`read_with`](ChunkedArray::read_with) also applies sub-indices to the
//! cells. Negative positions are errors: nothing is counted from the back.
//!
//! ```
//! use ndarray::array;
//! use ndarray_chunked::ChunkedArray;
//!
//! let a = ChunkedArray::new(vec![vec![], vec![0, 1, 2, 3, 4], vec![5, 6], vec![], vec![7, 8, 9], vec![]]);
//! let values: Vec<i32> = a.iter().filter_map(|cell| cell.first().copied()).collect();
//! assert_eq!(values, (0..10).collect::<Vec<_>>());
//! assert_eq!(a.compress(&[true; 10]).unwrap(), array![0, 1, 2, 3, 4, 5, 6, 7, 8, 9].into_dyn());
//! assert!(a.get(-1).is_err());
//! ```
//!
//! ## Crate Feature Flags
//!
//! - `persist` (default): [`persist`] serialization of chunked arrays with
//!   reference de-duplication, compression and a call whitelist.
//! - `half`: f16 elements in persisted buffers.

pub use crate::chunk::Chunk;
pub use crate::chunk_seq::ChunkSeq;
pub use crate::chunked::{ChunkedArray, ChunkedArrayBuilder, ChunkedOptions, ElemOf, DEFAULT_APPEND_THRESHOLD};
pub use crate::element::{Element, ElementKind, ElementType};
pub use crate::error::ChunkedError;
pub use crate::impl_read::Cells;
pub use crate::iter::{Iter, Offsets};
pub use crate::slice::{ChunkIndex, ChunkSlice};

mod chunk;
mod chunk_seq;
mod chunked;
mod element;
mod error;
mod impl_read;
mod iter;
mod slice;

#[cfg(feature = "persist")]
#[cfg_attr(docsrs, doc(cfg(feature = "persist")))]
pub mod persist;
