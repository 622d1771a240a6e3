//! Deterministic hash-based identity for native types and callables.
//!
//! [`TypeHash`] is a 64-bit hash computed from a dotted native type name, or from
//! a callable's owner, name and parameter signature. The same input always yields
//! the same hash, so identities can be computed before a type is ever loaded and
//! every cache in the engine can key on a single `u64`.
//!
//! # Hash Computation
//!
//! Uses XXHash64 with domain-specific mixing constants so that a type, a method and
//! an argument shape sharing the same text never collide.
//!
//! # Examples
//!
//! ```
//! use crossbind_core::TypeHash;
//!
//! let a = TypeHash::from_name("com.example.Point");
//! let b = TypeHash::from_name("com.example.Point");
//! assert_eq!(a, b);
//!
//! let m1 = TypeHash::from_callable(a, "move", &[TypeHash::from_name("int")]);
//! let m2 = TypeHash::from_callable(a, "move", &[TypeHash::from_name("long")]);
//! assert_ne!(m1, m2);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Separator constant for path components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for methods (instance and static).
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for constructors.
    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;

    /// Domain marker for argument-shape codes.
    pub const SHAPE: u64 = 0x1a095090689d4647;

    /// Parameter position mixing constants.
    ///
    /// Each position gets its own constant so that order matters; positions past
    /// the table wrap around and are additionally mixed with the index.
    pub const PARAM_MARKERS: [u64; 16] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
        0x7c3e9f2a5b8d1403,
        0x5d8c7b4a3e9f2106,
        0x3f1e9d8c7b5a4203,
        0x1a2b3c4d5e6f7089,
        0x9f8e7d6c5b4a3210,
        0x2468ace013579bdf,
        0xfdb97531eca86420,
        0x0f1e2d3c4b5a6978,
    ];
}

use hash_constants::*;

/// A deterministic 64-bit hash identifying a native type, callable, or argument shape.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a dotted native type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(TYPE ^ xxh64(name.as_bytes(), TYPE))
    }

    /// Create a hash for a method on `owner`.
    pub fn from_callable(owner: TypeHash, name: &str, params: &[TypeHash]) -> Self {
        let base = owner.0 ^ xxh64(name.as_bytes(), METHOD);
        TypeHash(mix_params(METHOD ^ base, params))
    }

    /// Create a hash for a constructor of `owner`.
    pub fn from_constructor(owner: TypeHash, params: &[TypeHash]) -> Self {
        TypeHash(mix_params(CONSTRUCTOR ^ owner.0, params))
    }

    /// Combine an ordered list of per-argument codes into a single shape code.
    ///
    /// Used as the resolved-signature cache key, so it must be order sensitive.
    pub fn from_shape_codes(codes: &[u64]) -> Self {
        let mut hash = SHAPE ^ (codes.len() as u64).wrapping_mul(SEP);
        for (i, code) in codes.iter().enumerate() {
            hash = hash.rotate_left(5) ^ code.wrapping_mul(marker(i));
        }
        TypeHash(hash)
    }

    /// Check if this is the empty hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

#[inline]
fn marker(index: usize) -> u64 {
    let base = PARAM_MARKERS[index % PARAM_MARKERS.len()];
    base.wrapping_add((index / PARAM_MARKERS.len()) as u64 * SEP)
}

fn mix_params(seed: u64, params: &[TypeHash]) -> u64 {
    let mut hash = seed;
    for (i, param) in params.iter().enumerate() {
        hash ^= param.0.wrapping_mul(marker(i));
    }
    hash
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash(0x{:016x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl From<u64> for TypeHash {
    fn from(value: u64) -> Self {
        TypeHash(value)
    }
}
