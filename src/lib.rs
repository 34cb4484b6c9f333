#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod control;
mod group;

pub mod hash;
pub mod hash_map;
pub mod hash_set;

pub use hash::RandomState;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
