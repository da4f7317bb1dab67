use std::fmt;

use serde::{Deserialize, Serialize};

use crate::category::{Categories, Category};

/// An inclusive run of block addresses, `start..=end`.
///
/// Reversed ranges (`start > end`) are representable, because the dump is taken literally; the
/// renderer refuses them.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(from = "(u64, u64)", into = "(u64, u64)")]
pub struct BlockRange {
    pub start: u64,
    pub end: u64,
}

impl BlockRange {
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }
    pub const fn single(baddr: u64) -> Self {
        Self { start: baddr, end: baddr }
    }
    pub fn is_reversed(&self) -> bool {
        self.start > self.end
    }
    /// The number of blocks covered, zero for reversed ranges.
    pub fn len(&self) -> u64 {
        if self.is_reversed() {
            0
        } else {
            self.end - self.start + 1
        }
    }
    pub fn contains(&self, baddr: u64) -> bool {
        self.start <= baddr && baddr <= self.end
    }
    pub fn checked_offset(self, base: u64) -> Option<Self> {
        Some(Self::new(
            self.start.checked_add(base)?,
            self.end.checked_add(base)?,
        ))
    }
}

impl From<(u64, u64)> for BlockRange {
    fn from((start, end): (u64, u64)) -> Self {
        Self::new(start, end)
    }
}
impl From<BlockRange> for (u64, u64) {
    fn from(range: BlockRange) -> Self {
        (range.start, range.end)
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// The parsed allocation state of one filesystem.
///
/// Every block not covered by any range is implicitly [`Category::Used`]. Ranges may overlap,
/// both within and across categories; which category a block finally shows is decided by the
/// renderer's paint order.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct AllocationReport {
    total_blocks: u64,
    free: Vec<BlockRange>,
    superblock: Vec<BlockRange>,
    group_descriptor: Vec<BlockRange>,
    inode_table: Vec<BlockRange>,
}

impl AllocationReport {
    pub fn new(total_blocks: u64) -> Self {
        Self {
            total_blocks,
            ..Self::default()
        }
    }
    /// Builder-style helper for assembling a report by hand. Ranges for the implicit categories
    /// (`used`, `border`) have nowhere to go and are dropped.
    pub fn with_ranges<I>(mut self, category: Category, ranges: I) -> Self
    where
        I: IntoIterator<Item = BlockRange>,
    {
        match self.ranges_mut(category) {
            Some(list) => list.extend(ranges),
            None => log::warn!("ignoring explicit ranges for implicit category {}", category),
        }
        self
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }
    pub(crate) fn set_total_blocks(&mut self, total_blocks: u64) {
        self.total_blocks = total_blocks;
    }
    /// The ranges parsed for `category`, in input order. Always empty for `used` and `border`.
    pub fn ranges(&self, category: Category) -> &[BlockRange] {
        match category {
            Category::Free => &self.free,
            Category::Superblock => &self.superblock,
            Category::GroupDescriptor => &self.group_descriptor,
            Category::InodeTable => &self.inode_table,
            Category::Used | Category::Border => &[],
        }
    }
    pub(crate) fn ranges_mut(&mut self, category: Category) -> Option<&mut Vec<BlockRange>> {
        Some(match category {
            Category::Free => &mut self.free,
            Category::Superblock => &mut self.superblock,
            Category::GroupDescriptor => &mut self.group_descriptor,
            Category::InodeTable => &mut self.inode_table,
            Category::Used | Category::Border => return None,
        })
    }
    /// The categories that have at least one range.
    pub fn populated(&self) -> Categories {
        Category::PAINT_ORDER
            .iter()
            .copied()
            .filter(|&category| !self.ranges(category).is_empty())
            .fold(Categories::empty(), |set, category| set | category.flag())
    }
    /// Sum of the range lengths for `category`. Overlapping ranges are counted twice.
    pub fn block_count(&self, category: Category) -> u64 {
        self.ranges(category).iter().map(BlockRange::len).sum()
    }
}
