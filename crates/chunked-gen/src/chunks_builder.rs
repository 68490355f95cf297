// Copyright 2026 ndarray-chunked developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use ndarray::{ArrayD, IxDyn, Order, ShapeBuilder};

use num_traits::Num;

/// Builder of a list of chunks with given row counts and a common cell
/// shape.
///
/// With the sequential generator, concatenating the chunks along axis 0 in
/// standard order gives `0, 1, 2, ...`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunksBuilder
{
    lengths: Vec<usize>,
    cell_shape: Vec<usize>,
    memory_order: Order,
    generator: ElementGenerator,
}

/// How to generate elements
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ElementGenerator
{
    Sequential,
    Zero,
}

impl ChunksBuilder
{
    pub fn new(lengths: impl IntoIterator<Item = usize>) -> Self
    {
        ChunksBuilder {
            lengths: lengths.into_iter().collect(),
            cell_shape: Vec::new(),
            memory_order: Order::C,
            generator: ElementGenerator::Sequential,
        }
    }

    pub fn cell_shape(mut self, shape: &[usize]) -> Self
    {
        self.cell_shape = shape.to_vec();
        self
    }

    /// Memory layout of each chunk; the logical contents do not change.
    pub fn memory_order(mut self, order: Order) -> Self
    {
        self.memory_order = order;
        self
    }

    pub fn generator(mut self, generator: ElementGenerator) -> Self
    {
        self.generator = generator;
        self
    }

    /// Total number of rows.
    pub fn len(&self) -> usize
    {
        self.lengths.iter().sum()
    }

    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    /// The chunks, together with their concatenation.
    pub fn build_with_flat<T>(self) -> (Vec<ArrayD<T>>, ArrayD<T>)
    where T: Num + Clone
    {
        let mut flat_shape = vec![self.len()];
        flat_shape.extend_from_slice(&self.cell_shape);
        let chunks = self.build::<T>();
        let views = chunks.iter().map(|c| c.view()).collect::<Vec<_>>();
        let flat = if views.is_empty() {
            ArrayD::zeros(IxDyn(&flat_shape))
        } else {
            ndarray::concatenate(ndarray::Axis(0), &views).unwrap()
        };
        (chunks, flat)
    }

    pub fn build<T>(self) -> Vec<ArrayD<T>>
    where T: Num + Clone
    {
        let cell_size: usize = self.cell_shape.iter().product();
        let use_zeros = self.generator == ElementGenerator::Zero;
        let mut current = T::zero();
        let mut chunks = Vec::with_capacity(self.lengths.len());
        for &len in &self.lengths {
            let mut shape = vec![len];
            shape.extend_from_slice(&self.cell_shape);
            let elements = (0..len * cell_size)
                .map(|_| {
                    let ret = current.clone();
                    if !use_zeros {
                        current = ret.clone() + T::one();
                    }
                    ret
                })
                .collect::<Vec<_>>();
            let chunk = ArrayD::from_shape_vec(IxDyn(&shape), elements).unwrap();
            if self.memory_order == Order::C {
                chunks.push(chunk);
            } else {
                let mut f = ArrayD::zeros(IxDyn(&shape).f());
                f.assign(&chunk);
                chunks.push(f);
            }
        }
        chunks
    }
}

#[test]
fn test_sequential()
{
    let chunks = ChunksBuilder::new([2, 0, 3]).cell_shape(&[2]).build::<i32>();
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[1].shape(), &[0, 2]);
    assert_eq!(chunks[2].iter().copied().collect::<Vec<_>>(), (4..10).collect::<Vec<_>>());
}

#[test]
fn test_order()
{
    let (c, flat_c) = ChunksBuilder::new([3, 4])
        .cell_shape(&[5])
        .build_with_flat::<i32>();
    let (f, flat_f) = ChunksBuilder::new([3, 4])
        .cell_shape(&[5])
        .memory_order(Order::F)
        .build_with_flat::<i32>();

    assert_eq!(flat_c, flat_f);
    assert_eq!(c[1].strides(), &[5, 1]);
    assert_eq!(f[1].strides(), &[1, 4]);
}
