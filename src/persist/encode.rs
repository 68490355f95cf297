// Copyright 2026 ndarray-chunked developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::any::type_name;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use ndarray::{aview1, ArrayBase, Data, Dimension};
use serde_json::{json, Value};
use tracing::{debug, trace};

use super::{PersistError, SerializeOptions, Sink, CRATE_PATH, FORMAT};
use crate::chunk_seq::ChunkSeq;
use crate::chunked::ChunkedArray;
use crate::element::Element;

/// Context of the chunks of a chunked array.
const CHUNKS_CONTEXT: &str = "ChunkedArray.chunks";

/// A value that can describe itself as a recipe.
pub trait Persist
{
    /// Address used to detect objects reached more than once.
    ///
    /// Smart pointers and references report the address of their target.
    fn identity(&self) -> usize
    {
        self as *const Self as *const () as usize
    }

    /// Produce the recipe of `self`, writing buffers through `encoder`.
    ///
    /// `ident` is the id assigned to `self`; recipes that can be referred to
    /// later must record it under `"id"`.
    fn persist(&self, ident: usize, context: &str, encoder: &mut Encoder<'_>) -> Result<Value, PersistError>;
}

/// Recipe builder: assigns ids, tracks objects already written and writes
/// buffers to the sink.
pub struct Encoder<'s>
{
    sink: &'s mut dyn Sink,
    prefix: String,
    options: &'s SerializeOptions,
    seen: HashMap<(usize, &'static str), usize>,
}

impl<'s> Encoder<'s>
{
    pub fn new(sink: &'s mut dyn Sink, prefix: &str, options: &'s SerializeOptions) -> Self
    {
        Encoder {
            sink,
            prefix: prefix.to_owned(),
            options,
            seen: HashMap::new(),
        }
    }

    /// Recipe for `obj`: a back-reference if it was written before,
    /// otherwise its full recipe under a fresh id.
    pub fn fill<P>(&mut self, obj: &P, context: &str) -> Result<Value, PersistError>
    where P: Persist + ?Sized
    {
        let key = (obj.identity(), type_name::<P>());
        if let Some(&ident) = self.seen.get(&key) {
            trace!(ident, context, "back-reference");
            return Ok(json!({ "ref": ident }));
        }
        let ident = self.seen.len();
        self.seen.insert(key, ident);
        obj.persist(ident, context, self)
    }

    /// Write the elements of `array` in logical order as one buffer and
    /// return its `frombuffer` recipe.
    pub fn write_array<A, S, D>(&mut self, ident: usize, array: &ArrayBase<S, D>, context: &str) -> Result<Value, PersistError>
    where
        A: Element,
        S: Data<Elem = A>,
        D: Dimension,
    {
        let mut raw = Vec::with_capacity(array.len() * A::SIZE);
        for elt in array.iter() {
            elt.write_le(&mut raw);
        }
        let name = ident.to_string();
        let key = format!("{}{}", self.prefix, name);
        let rule = self
            .options
            .compression
            .iter()
            .find(|rule| rule.applies(raw.len(), A::KIND, context));
        let buffer = match rule {
            Some(rule) => {
                let packed = rule.codec.compress(&raw)?;
                debug!(blob = %key, raw = raw.len(), packed = packed.len(), codec = ?rule.codec, "compressed buffer");
                let path = rule.codec.decompress_path();
                self.sink.put(&key, packed)?;
                json!({ "call": path, "args": [{ "read": name }] })
            }
            None => {
                trace!(blob = %key, bytes = raw.len(), "raw buffer");
                self.sink.put(&key, raw)?;
                json!({ "read": name })
            }
        };
        Ok(json!({
            "id": ident,
            "call": [CRATE_PATH, "frombuffer"],
            "args": [buffer, A::DTYPE, array.shape()],
        }))
    }
}

/// Write `obj` to `sink`: the recipe document under `name` and each buffer
/// under `name` followed by its id.
///
/// **Errors** from the sink, from compression, or from encoding the recipe.
pub fn serialize<P>(obj: &P, sink: &mut dyn Sink, name: &str, options: &SerializeOptions) -> Result<(), PersistError>
where P: Persist + ?Sized
{
    let mut encoder = Encoder::new(sink, name, options);
    let schema = encoder.fill(obj, "")?;
    debug!(name, objects = encoder.seen.len(), "serialized");
    let document = json!({
        "format": FORMAT,
        "prefix": name,
        "schema": schema,
    });
    encoder.sink.put(name, serde_json::to_vec(&document)?)
}

impl<A, S, D> Persist for ArrayBase<S, D>
where
    A: Element,
    S: Data<Elem = A>,
    D: Dimension,
{
    fn persist(&self, ident: usize, context: &str, encoder: &mut Encoder<'_>) -> Result<Value, PersistError>
    {
        encoder.write_array(ident, self, context)
    }
}

impl<A: Element> Persist for Vec<A>
{
    fn persist(&self, ident: usize, context: &str, encoder: &mut Encoder<'_>) -> Result<Value, PersistError>
    {
        encoder.write_array(ident, &aview1(self), context)
    }
}

impl<A: Element> Persist for [A]
{
    fn persist(&self, ident: usize, context: &str, encoder: &mut Encoder<'_>) -> Result<Value, PersistError>
    {
        encoder.write_array(ident, &aview1(self), context)
    }
}

impl<'p, P> Persist for &'p P
where P: Persist + ?Sized
{
    fn identity(&self) -> usize
    {
        (**self).identity()
    }

    fn persist(&self, ident: usize, context: &str, encoder: &mut Encoder<'_>) -> Result<Value, PersistError>
    {
        (**self).persist(ident, context, encoder)
    }
}

macro_rules! forward_persist {
    ($($ptr:ident)*) => {
        $(
        impl<P> Persist for $ptr<P>
        where P: Persist + ?Sized
        {
            fn identity(&self) -> usize
            {
                (**self).identity()
            }

            fn persist(&self, ident: usize, context: &str, encoder: &mut Encoder<'_>) -> Result<Value, PersistError>
            {
                (**self).persist(ident, context, encoder)
            }
        }
        )*
    };
}

forward_persist!(Box Rc Arc);

/// Recipe `ndarray_chunked.ChunkedArray(list of chunks, options)`.
impl<S> Persist for ChunkedArray<S>
where
    S: ChunkSeq,
    S::Chunk: Persist,
{
    fn persist(&self, ident: usize, _context: &str, encoder: &mut Encoder<'_>) -> Result<Value, PersistError>
    {
        let chunks = self
            .chunks()
            .chunks()
            .map(|chunk| encoder.fill(chunk, CHUNKS_CONTEXT))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(json!({
            "id": ident,
            "call": [CRATE_PATH, "ChunkedArray"],
            "args": [{ "list": chunks }, serde_json::to_value(self.options())?],
        }))
    }
}
