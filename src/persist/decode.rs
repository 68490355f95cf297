// Copyright 2026 ndarray-chunked developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;
use std::sync::Arc;

use ndarray::{ArrayD, IxDyn};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use super::{Codec, PersistError, Source, Whitelist, CRATE_PATH, FORMAT};
use crate::chunked::{ChunkedArray, ChunkedOptions};
use crate::element::Element;
use crate::error::ChunkedError;

/// A reconstructed value.
#[derive(Clone, Debug)]
pub enum Restored<A>
{
    /// literal JSON that is not a recipe
    Value(Value),
    /// a blob, possibly decompressed
    Bytes(Vec<u8>),
    Array(Arc<ArrayD<A>>),
    Chunked(ChunkedArray<Vec<Arc<ArrayD<A>>>>),
    List(Vec<Restored<A>>),
}

impl<A> Restored<A>
{
    fn describe(&self) -> &'static str
    {
        match self {
            Restored::Value(_) => "value",
            Restored::Bytes(_) => "bytes",
            Restored::Array(_) => "array",
            Restored::Chunked(_) => "chunked array",
            Restored::List(_) => "list",
        }
    }

    /// **Errors** if `self` is not an array.
    pub fn into_array(self) -> Result<Arc<ArrayD<A>>, PersistError>
    {
        match self {
            Restored::Array(array) => Ok(array),
            other => Err(PersistError::malformed(format!("expected an array, found {}", other.describe()))),
        }
    }

    /// **Errors** if `self` is not a chunked array.
    pub fn into_chunked(self) -> Result<ChunkedArray<Vec<Arc<ArrayD<A>>>>, PersistError>
    {
        match self {
            Restored::Chunked(chunked) => Ok(chunked),
            other => Err(PersistError::malformed(format!(
                "expected a chunked array, found {}",
                other.describe()
            ))),
        }
    }
}

/// Reconstruction function: receives the restored arguments of a call.
pub type Reconstruct<A> = fn(Vec<Restored<A>>) -> Result<Restored<A>, PersistError>;

/// Recipe interpreter.
///
/// Calls are looked up by dotted path among the registered reconstruction
/// functions after the path passed the whitelist. The built-in functions are
/// `zlib.decompress`, `ndarray_chunked.frombuffer` and
/// `ndarray_chunked.ChunkedArray`.
pub struct Decoder<'s, A>
{
    source: &'s dyn Source,
    whitelist: &'s Whitelist,
    calls: HashMap<String, Reconstruct<A>>,
    prefix: String,
    seen: HashMap<u64, Restored<A>>,
}

impl<'s, A: Element> Decoder<'s, A>
{
    pub fn new(source: &'s dyn Source, whitelist: &'s Whitelist) -> Self
    {
        let mut decoder = Decoder {
            source,
            whitelist,
            calls: HashMap::new(),
            prefix: String::new(),
            seen: HashMap::new(),
        };
        decoder
            .register(&Codec::Zlib.decompress_path(), zlib_decompress)
            .register(&[CRATE_PATH, "frombuffer"], frombuffer)
            .register(&[CRATE_PATH, "ChunkedArray"], chunked_array);
        decoder
    }

    /// Register (or replace) the reconstruction function for `path`.
    ///
    /// It is still only reachable if the whitelist permits `path`.
    pub fn register(&mut self, path: &[&str], call: Reconstruct<A>) -> &mut Self
    {
        self.calls.insert(path.join("."), call);
        self
    }

    /// Read the recipe document `name` and reconstruct its value.
    ///
    /// **Errors** if a blob is missing, the recipe is malformed, or a call
    /// is not whitelisted or not registered.
    pub fn decode(&mut self, name: &str) -> Result<Restored<A>, PersistError>
    {
        let document: Value = serde_json::from_slice(&self.source.get(name)?)?;
        match document.get("format").and_then(Value::as_str) {
            Some(format) if format != FORMAT => debug!(format, expected = FORMAT, "recipe format differs"),
            _ => {}
        }
        self.prefix = document
            .get("prefix")
            .and_then(Value::as_str)
            .ok_or_else(|| PersistError::malformed("missing prefix"))?
            .to_owned();
        let schema = document
            .get("schema")
            .ok_or_else(|| PersistError::malformed("missing schema"))?;
        self.seen.clear();
        let restored = self.unfill(schema)?;
        debug!(name, objects = self.seen.len(), "deserialized");
        Ok(restored)
    }

    fn unfill(&mut self, schema: &Value) -> Result<Restored<A>, PersistError>
    {
        let object = match schema {
            Value::Object(object) => object,
            _ => return Ok(Restored::Value(schema.clone())),
        };
        if let Some(path) = call_path(object) {
            return self.call(object, path);
        }
        if let Some(read) = object.get("read") {
            let name = read
                .as_str()
                .ok_or_else(|| PersistError::malformed("read expects a blob name"))?;
            let absolute = object
                .get("absolute")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let key = if absolute {
                name.to_owned()
            } else {
                format!("{}{}", self.prefix, name)
            };
            trace!(blob = %key, "read");
            return Ok(Restored::Bytes(self.source.get(&key)?));
        }
        if let Some(reference) = object.get("ref") {
            let ident = reference
                .as_u64()
                .ok_or_else(|| PersistError::malformed("ref expects an id"))?;
            return self
                .seen
                .get(&ident)
                .cloned()
                .ok_or(PersistError::UnknownReference(ident));
        }
        if let Some(Value::Array(items)) = object.get("list") {
            let items = items
                .iter()
                .map(|item| self.unfill(item))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Restored::List(items));
        }
        Ok(Restored::Value(schema.clone()))
    }

    fn call(&mut self, object: &Map<String, Value>, path: Vec<&str>) -> Result<Restored<A>, PersistError>
    {
        let dotted = path.join(".");
        if !self.whitelist.permits(path.as_slice()) {
            warn!(call = %dotted, "refused reconstruction outside the whitelist");
            return Err(PersistError::DisallowedReconstruction(dotted));
        }
        let call = match self.calls.get(&dotted) {
            Some(&call) => call,
            None => return Err(PersistError::UnknownCall(dotted)),
        };
        let args = match object.get("args") {
            Some(Value::Array(args)) => args
                .iter()
                .map(|arg| self.unfill(arg))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(PersistError::malformed("args must be a list")),
            None => Vec::new(),
        };
        trace!(call = %dotted, nargs = args.len(), "call");
        let restored = call(args)?;
        if let Some(ident) = object.get("id").and_then(Value::as_u64) {
            self.seen.insert(ident, restored.clone());
        }
        Ok(restored)
    }
}

/// The call path of a recipe object: a non-empty list of strings under
/// `"call"`.
fn call_path(object: &Map<String, Value>) -> Option<Vec<&str>>
{
    let parts = object.get("call")?.as_array()?;
    if parts.is_empty() {
        return None;
    }
    parts.iter().map(Value::as_str).collect()
}

/// Read the recipe `name` from `source` and reconstruct it.
pub fn deserialize<A: Element>(source: &dyn Source, name: &str, whitelist: &Whitelist) -> Result<Restored<A>, PersistError>
{
    Decoder::new(source, whitelist).decode(name)
}

/// Like [`deserialize`], for a recipe that describes a chunked array.
pub fn deserialize_chunked<A: Element>(
    source: &dyn Source, name: &str, whitelist: &Whitelist,
) -> Result<ChunkedArray<Vec<Arc<ArrayD<A>>>>, PersistError>
{
    deserialize(source, name, whitelist)?.into_chunked()
}

fn zlib_decompress<A>(args: Vec<Restored<A>>) -> Result<Restored<A>, PersistError>
{
    match args.into_iter().next() {
        Some(Restored::Bytes(packed)) => match Codec::Zlib.decompress(&packed) {
            Err(PersistError::TooLarge { limit }) => {
                warn!(packed = packed.len(), limit, "refused oversized zlib blob");
                Err(PersistError::TooLarge { limit })
            }
            result => Ok(Restored::Bytes(result?)),
        },
        _ => Err(PersistError::malformed("zlib.decompress expects bytes")),
    }
}

fn frombuffer<A: Element>(args: Vec<Restored<A>>) -> Result<Restored<A>, PersistError>
{
    let mut args = args.into_iter();
    let (bytes, dtype, shape) = match (args.next(), args.next(), args.next()) {
        (Some(Restored::Bytes(bytes)), Some(Restored::Value(Value::String(dtype))), Some(Restored::Value(shape))) => {
            (bytes, dtype, shape)
        }
        _ => return Err(PersistError::malformed("frombuffer expects bytes, a dtype and a shape")),
    };
    if dtype != A::DTYPE {
        return Err(PersistError::DtypeMismatch {
            expected: A::DTYPE,
            found: dtype,
        });
    }
    let shape: Vec<usize> = serde_json::from_value(shape)?;
    let count = shape
        .iter()
        .try_fold(1usize, |acc, &len| acc.checked_mul(len))
        .ok_or_else(|| PersistError::malformed("shape overflows"))?;
    if count.checked_mul(A::SIZE) != Some(bytes.len()) {
        return Err(PersistError::malformed(format!(
            "buffer of {} bytes does not hold {} elements of {}",
            bytes.len(),
            count,
            A::DTYPE
        )));
    }
    let elements = bytes
        .chunks_exact(A::SIZE)
        .map(A::read_le)
        .collect::<Option<Vec<A>>>()
        .ok_or_else(|| PersistError::malformed(format!("invalid {} encoding", A::DTYPE)))?;
    let array = ArrayD::from_shape_vec(IxDyn(&shape), elements).map_err(ChunkedError::from)?;
    Ok(Restored::Array(Arc::new(array)))
}

fn chunked_array<A: Element>(args: Vec<Restored<A>>) -> Result<Restored<A>, PersistError>
{
    let mut args = args.into_iter();
    let chunks = match args.next() {
        Some(Restored::List(chunks)) => chunks
            .into_iter()
            .map(Restored::into_array)
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(PersistError::malformed("ChunkedArray expects a list of chunks")),
    };
    let options = match args.next() {
        Some(Restored::Value(options)) => serde_json::from_value(options)?,
        Some(other) => {
            return Err(PersistError::malformed(format!(
                "ChunkedArray options must be a value, found {}",
                other.describe()
            )))
        }
        None => ChunkedOptions::default(),
    };
    Ok(Restored::Chunked(ChunkedArray::with_options(chunks, options)?))
}
