//! Generational object identifiers.
//!
//! u64 layout: low 32 bits = slot index, high 32 bits = generation.
//! Removing an object bumps its slot's generation, so ids held elsewhere
//! (parent links, relative-heading references, script handles) resolve to
//! "no longer present" instead of aliasing whatever reuses the slot.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle to a [`MoveObject`](super::MoveObject) inside a [`MoveWorld`](super::MoveWorld)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    #[inline]
    pub const fn from_parts(index: u32, generation: u32) -> Self {
        Self((index as u64) | ((generation as u64) << 32))
    }

    #[inline]
    pub const fn index(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Opaque integer form handed to the scripting layer
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}:{})", self.index(), self.generation())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index(), self.generation())
    }
}
