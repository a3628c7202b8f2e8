use std::fmt;

/// Identifier of a remote resource: a slot plus a generation counter, so that a slot reused
/// after a removal doesn't alias the old resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ResourceId {
    pub slot: u32,
    pub gen: u32,
}

impl ResourceId {
    #[inline]
    pub const fn new(slot: u32, gen: u32) -> Self {
        Self { slot, gen }
    }
}

impl From<(u32, u32)> for ResourceId {
    fn from((slot, gen): (u32, u32)) -> Self {
        Self { slot, gen }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.slot, self.gen)
    }
}
