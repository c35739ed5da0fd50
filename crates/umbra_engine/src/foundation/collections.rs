//! Specialized collection types

pub use slotmap::{new_key_type, Key, SlotMap};

/// Handle-based map using slot map for stable references
///
/// Keys stay valid across insertions and removals, which makes them safe to
/// hold as non-owning back-references (a bone pointing at its skin, a virtual
/// light pointing at its source) without keeping the target alive.
pub type HandleMap<K, V> = SlotMap<K, V>;
