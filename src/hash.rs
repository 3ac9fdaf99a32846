//! Hash map alias for the hot per-tick tables. The hasher is selected at
//! build time; `rustc-hash` is the default, `ahash` an alternative, and
//! `std-hash` forces the standard SipHash tables.

#[cfg(all(feature = "rustc-hash", not(feature = "std-hash")))]
pub type FastMap<K, V> = rustc_hash::FxHashMap<K, V>;

#[cfg(all(
    feature = "ahash",
    not(feature = "rustc-hash"),
    not(feature = "std-hash")
))]
pub type FastMap<K, V> = ahash::AHashMap<K, V>;

#[cfg(any(
    feature = "std-hash",
    not(any(feature = "rustc-hash", feature = "ahash"))
))]
pub type FastMap<K, V> = std::collections::HashMap<K, V>;
