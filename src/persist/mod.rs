// Copyright 2026 ndarray-chunked developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Persistence of chunked arrays as a JSON reconstruction recipe plus named
//! raw buffers.
//!
//! [`serialize`] writes the recipe under `name` and every array buffer under
//! `name` followed by the buffer's id. An object reached twice (by address)
//! is written once and referred to by id afterwards. Buffers matching a
//! [`CompressionRule`] are zlib compressed.
//!
//! [`deserialize`] replays the recipe. Each call in it names a dotted path
//! that must match an entry of the [`Whitelist`] and a registered
//! reconstruction function; anything else is refused.
//!
//! ```
//! use std::collections::HashMap;
//!
//! use ndarray::array;
//! use ndarray_chunked::persist::{deserialize_chunked, serialize, SerializeOptions, Whitelist};
//! use ndarray_chunked::ChunkedArray;
//!
//! let a = ChunkedArray::new(vec![array![1i64, 2, 3], array![4, 5]]);
//! let mut store: HashMap<String, Vec<u8>> = HashMap::new();
//! serialize(&a, &mut store, "a", &SerializeOptions::default()).unwrap();
//!
//! let b = deserialize_chunked::<i64>(&store, "a", &Whitelist::default()).unwrap();
//! assert_eq!(b.to_array().unwrap(), array![1, 2, 3, 4, 5].into_dyn());
//! ```

use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use glob::Pattern;

use crate::element::ElementKind;
use crate::error::ChunkedError;

mod decode;
mod encode;

pub use self::decode::{deserialize, deserialize_chunked, Decoder, Reconstruct, Restored};
pub use self::encode::{serialize, Encoder, Persist};

/// Value of the `"format"` field of every recipe.
pub const FORMAT: &str = concat!("ndarray-chunked/", env!("CARGO_PKG_VERSION"));

/// First component of the call paths of this crate's reconstruction
/// functions.
pub const CRATE_PATH: &str = "ndarray_chunked";

/// Largest buffer, in bytes, that decompressing a blob may produce.
pub const MAX_DECOMPRESSED_BYTES: u64 = 1 << 30;

/// Error from serializing or deserializing.
#[derive(Debug)]
pub enum PersistError
{
    /// a recipe call whose path matches no whitelist entry
    DisallowedReconstruction(String),
    /// a whitelisted call path with no reconstruction function
    UnknownCall(String),
    /// a back-reference to an id that was not reconstructed (yet)
    UnknownReference(u64),
    /// a blob name absent from the source
    MissingBlob(String),
    /// a blob name the store cannot represent
    InvalidName(String),
    /// a recipe that does not have the expected structure
    Malformed(String),
    /// a compressed blob that expands past the decompression limit
    TooLarge
    {
        limit: u64,
    },
    /// a buffer whose element type differs from the requested one
    DtypeMismatch
    {
        expected: &'static str,
        found: String,
    },
    Pattern(glob::PatternError),
    Json(serde_json::Error),
    Io(io::Error),
    Chunked(ChunkedError),
}

impl PersistError
{
    pub(crate) fn malformed(what: impl Into<String>) -> Self
    {
        PersistError::Malformed(what.into())
    }
}

impl fmt::Display for PersistError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            PersistError::DisallowedReconstruction(path) => write!(f, "call {} is not in the whitelist", path),
            PersistError::UnknownCall(path) => write!(f, "no reconstruction function registered for {}", path),
            PersistError::UnknownReference(id) => write!(f, "reference to unknown id {}", id),
            PersistError::MissingBlob(name) => write!(f, "blob {:?} not found", name),
            PersistError::InvalidName(name) => write!(f, "invalid blob name {:?}", name),
            PersistError::Malformed(what) => write!(f, "malformed recipe: {}", what),
            PersistError::TooLarge { limit } => write!(f, "blob decompresses to more than {} bytes", limit),
            PersistError::DtypeMismatch { expected, found } => {
                write!(f, "buffer holds {} elements, expected {}", found, expected)
            }
            PersistError::Pattern(err) => write!(f, "invalid pattern: {}", err),
            PersistError::Json(err) => write!(f, "json: {}", err),
            PersistError::Io(err) => write!(f, "io: {}", err),
            PersistError::Chunked(err) => write!(f, "{}", err),
        }
    }
}

impl Error for PersistError
{
    fn source(&self) -> Option<&(dyn Error + 'static)>
    {
        match self {
            PersistError::Pattern(err) => Some(err),
            PersistError::Json(err) => Some(err),
            PersistError::Io(err) => Some(err),
            PersistError::Chunked(err) => Some(err),
            _ => None,
        }
    }
}

macro_rules! impl_from_error {
    ($($err:ty => $variant:ident),*) => {
        $(
        impl From<$err> for PersistError
        {
            fn from(err: $err) -> Self
            {
                PersistError::$variant(err)
            }
        }
        )*
    };
}

impl_from_error!(
    glob::PatternError => Pattern,
    serde_json::Error => Json,
    io::Error => Io,
    ChunkedError => Chunked
);

/// Destination of named blobs.
pub trait Sink
{
    fn put(&mut self, name: &str, blob: Vec<u8>) -> Result<(), PersistError>;
}

/// Origin of named blobs.
pub trait Source
{
    fn get(&self, name: &str) -> Result<Vec<u8>, PersistError>;
}

impl Sink for HashMap<String, Vec<u8>>
{
    fn put(&mut self, name: &str, blob: Vec<u8>) -> Result<(), PersistError>
    {
        self.insert(name.to_owned(), blob);
        Ok(())
    }
}

impl Source for HashMap<String, Vec<u8>>
{
    fn get(&self, name: &str) -> Result<Vec<u8>, PersistError>
    {
        HashMap::get(self, name)
            .cloned()
            .ok_or_else(|| PersistError::MissingBlob(name.to_owned()))
    }
}

impl Sink for BTreeMap<String, Vec<u8>>
{
    fn put(&mut self, name: &str, blob: Vec<u8>) -> Result<(), PersistError>
    {
        self.insert(name.to_owned(), blob);
        Ok(())
    }
}

impl Source for BTreeMap<String, Vec<u8>>
{
    fn get(&self, name: &str) -> Result<Vec<u8>, PersistError>
    {
        BTreeMap::get(self, name)
            .cloned()
            .ok_or_else(|| PersistError::MissingBlob(name.to_owned()))
    }
}

/// Blob store keeping one file per blob in a directory.
///
/// Names must be non-empty and free of path separators.
#[derive(Clone, Debug)]
pub struct DirStore
{
    root: PathBuf,
}

impl DirStore
{
    pub fn new(root: impl Into<PathBuf>) -> Self
    {
        DirStore { root: root.into() }
    }

    fn path(&self, name: &str) -> Result<PathBuf, PersistError>
    {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(PersistError::InvalidName(name.to_owned()));
        }
        Ok(self.root.join(name))
    }
}

impl Sink for DirStore
{
    fn put(&mut self, name: &str, blob: Vec<u8>) -> Result<(), PersistError>
    {
        let path = self.path(name)?;
        fs::create_dir_all(&self.root)?;
        fs::write(path, blob)?;
        Ok(())
    }
}

impl Source for DirStore
{
    fn get(&self, name: &str) -> Result<Vec<u8>, PersistError>
    {
        match fs::read(self.path(name)?) {
            Ok(blob) => Ok(blob),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(PersistError::MissingBlob(name.to_owned())),
            Err(err) => Err(err.into()),
        }
    }
}

/// Allow-list of reconstruction call paths.
///
/// An entry is a list of wildcard patterns matched component by component
/// against a call path such as `["ndarray_chunked", "frombuffer"]`; matching
/// stops at the end of the shorter of the two.
#[derive(Clone, Debug)]
pub struct Whitelist
{
    entries: Vec<Vec<Pattern>>,
}

impl Whitelist
{
    /// A whitelist that permits nothing.
    pub fn empty() -> Self
    {
        Whitelist { entries: Vec::new() }
    }

    /// **Errors** if a pattern is not a valid wildcard pattern.
    pub fn new<I, E, P>(entries: I) -> Result<Self, PersistError>
    where
        I: IntoIterator<Item = E>,
        E: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        entries
            .into_iter()
            .try_fold(Whitelist::empty(), |list, entry| list.allow(entry))
    }

    /// Add an entry.
    pub fn allow<E, P>(mut self, entry: E) -> Result<Self, PersistError>
    where
        E: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let entry = entry
            .into_iter()
            .map(|p| Pattern::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.entries.push(entry);
        Ok(self)
    }

    /// Whether `path` matches some entry.
    pub fn permits<P: AsRef<str>>(&self, path: &[P]) -> bool
    {
        self.entries.iter().any(|entry| {
            entry
                .iter()
                .zip(path)
                .all(|(pattern, part)| pattern.matches(part.as_ref()))
        })
    }
}

/// `zlib.decompress` and everything under `ndarray_chunked`.
impl Default for Whitelist
{
    fn default() -> Self
    {
        // constant patterns; an error would leave the list closed
        Whitelist::new([["zlib", "decompress"], [CRATE_PATH, "*"]]).unwrap_or_else(|_| Whitelist::empty())
    }
}

/// Compression codec for array buffers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Codec
{
    Zlib,
}

impl Codec
{
    /// Path of the reconstruction call that undoes this codec.
    pub fn decompress_path(self) -> [&'static str; 2]
    {
        match self {
            Codec::Zlib => ["zlib", "decompress"],
        }
    }

    pub fn compress(self, raw: &[u8]) -> Result<Vec<u8>, PersistError>
    {
        match self {
            Codec::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(raw)?;
                Ok(encoder.finish()?)
            }
        }
    }

    /// Decompress `packed`, producing at most [`MAX_DECOMPRESSED_BYTES`].
    pub fn decompress(self, packed: &[u8]) -> Result<Vec<u8>, PersistError>
    {
        self.decompress_bounded(packed, MAX_DECOMPRESSED_BYTES)
    }

    /// Decompress `packed`, failing with `TooLarge` as soon as the output
    /// would exceed `limit` bytes.
    pub fn decompress_bounded(self, packed: &[u8], limit: u64) -> Result<Vec<u8>, PersistError>
    {
        match self {
            Codec::Zlib => {
                let mut raw = Vec::new();
                // one byte past the limit tells an exact fit from an overflow
                ZlibDecoder::new(packed)
                    .take(limit.saturating_add(1))
                    .read_to_end(&mut raw)?;
                if raw.len() as u64 > limit {
                    return Err(PersistError::TooLarge { limit });
                }
                Ok(raw)
            }
        }
    }
}

/// Compress buffers of at least `min_bytes` bytes whose element kind is in
/// `kinds` and whose context matches one of `contexts`.
///
/// The context of a buffer names where it sits in the object graph, e.g.
/// `"ChunkedArray.chunks"`; a top-level buffer has the empty context. A rule
/// without context patterns applies in every context.
#[derive(Clone, Debug)]
pub struct CompressionRule
{
    pub min_bytes: usize,
    pub kinds: Vec<ElementKind>,
    pub contexts: Vec<Pattern>,
    pub codec: Codec,
}

impl CompressionRule
{
    /// **Errors** if a context pattern is not a valid wildcard pattern.
    pub fn new<P: AsRef<str>>(
        min_bytes: usize, kinds: &[ElementKind], contexts: &[P], codec: Codec,
    ) -> Result<Self, PersistError>
    {
        Ok(CompressionRule {
            min_bytes,
            kinds: kinds.to_vec(),
            contexts: contexts
                .iter()
                .map(|p| Pattern::new(p.as_ref()))
                .collect::<Result<_, _>>()?,
            codec,
        })
    }

    pub fn applies(&self, nbytes: usize, kind: ElementKind, context: &str) -> bool
    {
        nbytes >= self.min_bytes
            && self.kinds.contains(&kind)
            && (self.contexts.is_empty() || self.contexts.iter().any(|p| p.matches(context)))
    }
}

const ALL_KINDS: [ElementKind; 5] = [
    ElementKind::Bool,
    ElementKind::Int,
    ElementKind::UInt,
    ElementKind::Float,
    ElementKind::Complex,
];

/// Options for [`serialize`]. The first applicable compression rule wins.
#[derive(Clone, Debug)]
pub struct SerializeOptions
{
    pub compression: Vec<CompressionRule>,
}

impl SerializeOptions
{
    /// Write every buffer raw.
    pub fn uncompressed() -> Self
    {
        SerializeOptions { compression: Vec::new() }
    }

    /// Compress every buffer with `codec`.
    pub fn compress_all(codec: Codec) -> Self
    {
        SerializeOptions {
            compression: vec![CompressionRule {
                min_bytes: 0,
                kinds: ALL_KINDS.to_vec(),
                contexts: Vec::new(),
                codec,
            }],
        }
    }
}

/// Zlib for boolean and integer buffers of 8192 bytes or more.
impl Default for SerializeOptions
{
    fn default() -> Self
    {
        SerializeOptions {
            compression: vec![CompressionRule {
                min_bytes: 8192,
                kinds: vec![ElementKind::Bool, ElementKind::Int, ElementKind::UInt],
                contexts: Vec::new(),
                codec: Codec::Zlib,
            }],
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn whitelist_matches_by_component()
    {
        let list = Whitelist::default();
        assert!(list.permits(&["zlib", "decompress"]));
        assert!(list.permits(&["ndarray_chunked", "frombuffer"]));
        assert!(!list.permits(&["zlib", "compress"]));
        assert!(!list.permits(&["std", "process", "exit"]));
        assert!(!Whitelist::empty().permits(&["ndarray_chunked", "frombuffer"]));
    }

    #[test]
    fn whitelist_wildcards()
    {
        let list = Whitelist::new([vec!["ndarray_*", "Chunked?rray"]]).unwrap();
        assert!(list.permits(&["ndarray_chunked", "ChunkedArray"]));
        assert!(!list.permits(&["ndarray_chunked", "frombuffer"]));
        assert!(Whitelist::new([["[unclosed"]]).is_err());
    }

    #[test]
    fn compression_rule_filters()
    {
        let rule = CompressionRule::new(16, &[ElementKind::Int], &["ChunkedArray.*"], Codec::Zlib).unwrap();
        assert!(rule.applies(16, ElementKind::Int, "ChunkedArray.chunks"));
        assert!(!rule.applies(15, ElementKind::Int, "ChunkedArray.chunks"));
        assert!(!rule.applies(64, ElementKind::Float, "ChunkedArray.chunks"));
        assert!(!rule.applies(64, ElementKind::Int, ""));

        let default = &SerializeOptions::default().compression[0];
        assert!(default.applies(8192, ElementKind::Bool, "anywhere"));
        assert!(!default.applies(8192, ElementKind::Float, ""));
    }

    #[test]
    fn zlib_codec()
    {
        let raw: Vec<u8> = (0..4096u32).map(|i| (i % 7) as u8).collect();
        let packed = Codec::Zlib.compress(&raw).unwrap();
        assert!(packed.len() < raw.len());
        assert_eq!(Codec::Zlib.decompress(&packed).unwrap(), raw);
        assert!(Codec::Zlib.decompress(b"not zlib").is_err());
    }

    #[test]
    fn zlib_output_is_bounded()
    {
        let raw = vec![0u8; 1 << 16];
        let packed = Codec::Zlib.compress(&raw).unwrap();
        assert_eq!(Codec::Zlib.decompress_bounded(&packed, raw.len() as u64).unwrap(), raw);
        assert!(matches!(
            Codec::Zlib.decompress_bounded(&packed, 1024),
            Err(PersistError::TooLarge { limit: 1024 })
        ));
        assert!(matches!(
            Codec::Zlib.decompress_bounded(&packed, raw.len() as u64 - 1),
            Err(PersistError::TooLarge { .. })
        ));
    }

    #[test]
    fn dir_store_rejects_path_names()
    {
        let store = DirStore::new(std::env::temp_dir().join("ndarray-chunked-names"));
        assert!(matches!(store.get(""), Err(PersistError::InvalidName(_))));
        assert!(matches!(store.get("../x"), Err(PersistError::InvalidName(_))));
    }
}
