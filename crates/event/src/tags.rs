//! Tag sets - named event traits with O(1) overlap tests
//!
//! A `TagSet` is a 64-bit mask. Names are bound to bits through a
//! process-wide registry; registering the same name twice yields the same
//! bit, so tags compare and combine cheaply across crates.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// A set of named event traits
///
/// Overlap tests are a single AND, which is what the dispatcher uses to
/// spot identity-card payload events on the hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TagSet(u64);

struct TagRegistry {
    bits: HashMap<String, u64>,
    next_bit: u32,
    exhausted_warned: bool,
}

fn registry() -> &'static Mutex<TagRegistry> {
    static REGISTRY: OnceLock<Mutex<TagRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        Mutex::new(TagRegistry {
            bits: HashMap::new(),
            next_bit: 0,
            exhausted_warned: false,
        })
    })
}

impl TagSet {
    /// The empty set
    pub const EMPTY: TagSet = TagSet(0);

    /// Register a named tag, returning its singleton set
    ///
    /// The registry holds at most 64 distinct names. Registration past that
    /// point returns `EMPTY` (which overlaps nothing) and warns once.
    pub fn register(name: &str) -> TagSet {
        let mut reg = registry().lock().unwrap_or_else(|p| p.into_inner());
        if let Some(&bit) = reg.bits.get(name) {
            return TagSet(bit);
        }
        if reg.next_bit >= 64 {
            if !reg.exhausted_warned {
                reg.exhausted_warned = true;
                tracing::warn!(tag = name, "tag registry exhausted, returning empty set");
            }
            return TagSet::EMPTY;
        }
        let bit = 1u64 << reg.next_bit;
        reg.next_bit += 1;
        reg.bits.insert(name.to_owned(), bit);
        TagSet(bit)
    }

    /// Whether the two sets share any tag
    #[inline]
    pub fn overlaps(self, other: TagSet) -> bool {
        self.0 & other.0 != 0
    }

    /// Union of two sets
    #[inline]
    #[must_use]
    pub fn union(self, other: TagSet) -> TagSet {
        TagSet(self.0 | other.0)
    }

    /// Whether the set is empty
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The raw mask, for binary encoders
    #[inline]
    pub fn bits(self) -> u64 {
        self.0
    }

    /// Rebuild a set from a raw mask
    #[inline]
    pub fn from_bits(bits: u64) -> TagSet {
        TagSet(bits)
    }
}

impl TagSet {
    /// Well-known tag: identity-card payload update
    ///
    /// The dispatcher merges such events into the process identity card
    /// instead of (or before) fanning them out.
    pub fn identity_card_update() -> TagSet {
        static TAG: OnceLock<TagSet> = OnceLock::new();
        *TAG.get_or_init(|| TagSet::register("identity-card-update"))
    }

    /// Well-known tag: full identity-card broadcast
    pub fn identity_card_full() -> TagSet {
        static TAG: OnceLock<TagSet> = OnceLock::new();
        *TAG.get_or_init(|| TagSet::register("identity-card-full"))
    }
}
