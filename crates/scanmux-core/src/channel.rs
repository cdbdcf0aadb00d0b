//! Composition channel ids and channel pools.
//!
//! The composer owns a small fixed set of hardware FIFOs ("channels"), each
//! able to feed one display output. Channel sets are represented as bitmasks
//! so pool arithmetic stays branch-free.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of composition channels in the composer.
pub const CHANNEL_COUNT: u8 = 3;

/// One composition FIFO, identified by its index (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelId(u8);

impl ChannelId {
    /// Create a channel id, if `index` names an existing channel.
    #[inline]
    pub fn new(index: u8) -> Option<Self> {
        (index < CHANNEL_COUNT).then_some(Self(index))
    }

    /// The channel's index.
    #[inline]
    pub fn index(self) -> u8 {
        self.0
    }

    /// The register field encoding for the ownership field of the
    /// color-transform unit, which is 1-based (0 there means "disabled").
    #[inline]
    pub fn fifo_field(self) -> u32 {
        u32::from(self.0) + 1
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// A set of composition channels, stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChannelMask(u8);

impl ChannelMask {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Every channel the composer has.
    pub const ALL: Self = Self((1 << CHANNEL_COUNT) - 1);

    /// A mask from a raw bit pattern; bits past `CHANNEL_COUNT` are dropped.
    #[inline]
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// A mask holding exactly one channel.
    #[inline]
    pub fn single(channel: ChannelId) -> Self {
        Self(1 << channel.index())
    }

    /// Raw bit pattern.
    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn contains(self, channel: ChannelId) -> bool {
        self.0 & (1 << channel.index()) != 0
    }

    /// Add `channel` to the set.
    #[inline]
    pub fn insert(&mut self, channel: ChannelId) {
        self.0 |= 1 << channel.index();
    }

    /// Remove `channel` from the set.
    #[inline]
    pub fn remove(&mut self, channel: ChannelId) {
        self.0 &= !(1 << channel.index());
    }

    /// Channels present in both sets.
    #[inline]
    pub fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Number of channels in the set.
    #[inline]
    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// The lowest-numbered channel in the set, if any. Allocation always
    /// takes this one so assignments are deterministic.
    #[inline]
    pub fn lowest(self) -> Option<ChannelId> {
        if self.0 == 0 {
            None
        } else {
            Some(ChannelId(self.0.trailing_zeros() as u8))
        }
    }

    /// Iterate channels in ascending index order.
    pub fn iter(self) -> impl Iterator<Item = ChannelId> {
        (0..CHANNEL_COUNT).filter_map(move |i| {
            let id = ChannelId(i);
            self.contains(id).then_some(id)
        })
    }
}

impl FromIterator<ChannelId> for ChannelMask {
    fn from_iter<I: IntoIterator<Item = ChannelId>>(iter: I) -> Self {
        let mut mask = Self::EMPTY;
        for ch in iter {
            mask.insert(ch);
        }
        mask
    }
}

impl fmt::Display for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for ch in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{ch}")?;
            first = false;
        }
        write!(f, "}}")
    }
}
