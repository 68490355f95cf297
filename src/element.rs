// Copyright 2026 ndarray-chunked developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::fmt;

use num_complex::Complex;

/// Broad category of an element type.
///
/// Compression rules select buffers by kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind
{
    Bool,
    Int,
    UInt,
    Float,
    Complex,
}

/// Fixed-size element with a stable name and a little-endian byte codec.
///
/// This is what allows an array of `Self` to be written as a raw buffer and
/// read back.
pub trait Element: Clone + 'static
{
    /// Stable name of the element type, e.g. `"int64"`.
    const DTYPE: &'static str;
    const KIND: ElementKind;
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Append the little-endian encoding of `self` to `out`.
    fn write_le(&self, out: &mut Vec<u8>);

    /// Decode one element; `bytes` has length `SIZE`.
    fn read_le(bytes: &[u8]) -> Option<Self>;
}

macro_rules! impl_element_for_primitive {
    ($t:ty, $name:expr, $kind:expr) => {
        impl Element for $t
        {
            const DTYPE: &'static str = $name;
            const KIND: ElementKind = $kind;
            const SIZE: usize = std::mem::size_of::<$t>();

            #[inline]
            fn write_le(&self, out: &mut Vec<u8>)
            {
                out.extend_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Option<Self>
            {
                bytes.try_into().ok().map(<$t>::from_le_bytes)
            }
        }
    };
}

impl_element_for_primitive!(i8, "int8", ElementKind::Int);
impl_element_for_primitive!(i16, "int16", ElementKind::Int);
impl_element_for_primitive!(i32, "int32", ElementKind::Int);
impl_element_for_primitive!(i64, "int64", ElementKind::Int);
impl_element_for_primitive!(u8, "uint8", ElementKind::UInt);
impl_element_for_primitive!(u16, "uint16", ElementKind::UInt);
impl_element_for_primitive!(u32, "uint32", ElementKind::UInt);
impl_element_for_primitive!(u64, "uint64", ElementKind::UInt);
impl_element_for_primitive!(f32, "float32", ElementKind::Float);
impl_element_for_primitive!(f64, "float64", ElementKind::Float);

impl Element for bool
{
    const DTYPE: &'static str = "bool";
    const KIND: ElementKind = ElementKind::Bool;
    const SIZE: usize = 1;

    #[inline]
    fn write_le(&self, out: &mut Vec<u8>)
    {
        out.push(*self as u8);
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Option<Self>
    {
        match bytes {
            [0] => Some(false),
            [1] => Some(true),
            _ => None,
        }
    }
}

macro_rules! impl_element_for_complex {
    ($t:ty, $name:expr) => {
        impl Element for Complex<$t>
        {
            const DTYPE: &'static str = $name;
            const KIND: ElementKind = ElementKind::Complex;
            const SIZE: usize = 2 * <$t as Element>::SIZE;

            fn write_le(&self, out: &mut Vec<u8>)
            {
                self.re.write_le(out);
                self.im.write_le(out);
            }

            fn read_le(bytes: &[u8]) -> Option<Self>
            {
                if bytes.len() != Self::SIZE {
                    return None;
                }
                let (re, im) = bytes.split_at(<$t as Element>::SIZE);
                Some(Complex::new(<$t>::read_le(re)?, <$t>::read_le(im)?))
            }
        }
    };
}

impl_element_for_complex!(f32, "complex64");
impl_element_for_complex!(f64, "complex128");

#[cfg(feature = "half")]
impl Element for half::f16
{
    const DTYPE: &'static str = "float16";
    const KIND: ElementKind = ElementKind::Float;
    const SIZE: usize = 2;

    fn write_le(&self, out: &mut Vec<u8>)
    {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Option<Self>
    {
        bytes.try_into().ok().map(half::f16::from_le_bytes)
    }
}

/// The element type of a chunked array: the Rust element type together with
/// the shape of each cell (every chunk axis beyond the first).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementType
{
    pub name: &'static str,
    pub shape: Vec<usize>,
}

impl ElementType
{
    /// Number of scalar values per cell.
    pub fn cell_size(&self) -> usize
    {
        self.shape.iter().product()
    }
}

impl fmt::Display for ElementType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.shape.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "({}, {:?})", self.name, self.shape)
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn encode<A: Element>(values: &[A]) -> Vec<u8>
    {
        let mut out = Vec::new();
        for v in values {
            v.write_le(&mut out);
        }
        out
    }

    #[test]
    fn little_endian_layout()
    {
        assert_eq!(encode(&[1i32, -2]), vec![1, 0, 0, 0, 0xfe, 0xff, 0xff, 0xff]);
        assert_eq!(encode(&[true, false]), vec![1, 0]);
        assert_eq!(encode(&[Complex::new(1.0f32, 0.)]).len(), Complex::<f32>::SIZE);
    }

    #[test]
    fn rejects_bad_widths()
    {
        assert_eq!(i64::read_le(&[0; 4]), None);
        assert_eq!(bool::read_le(&[7]), None);
        assert_eq!(u16::read_le(&[1, 1]), Some(257));
        assert_eq!(Complex::<f64>::read_le(&encode(&[Complex::new(2.5, -1.)])), Some(Complex::new(2.5, -1.)));
    }

    #[test]
    fn display_cell_type()
    {
        let t = ElementType { name: "f64", shape: vec![2, 3] };
        assert_eq!(t.cell_size(), 6);
        assert_eq!(t.to_string(), "(f64, [2, 3])");
    }
}
