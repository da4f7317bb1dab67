use std::{fmt, str::FromStr};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// What a block is used for, as far as the visualization cares.
///
/// The set is closed. `Used` is never produced by the parser; it is the implicit state of every
/// block that no parsed range covers. `Border` only exists in the Hilbert layout, where it marks
/// the cells of the square grid that lie past the last block.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Border,
    Used,
    Free,
    Superblock,
    GroupDescriptor,
    InodeTable,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Border,
        Category::Used,
        Category::Free,
        Category::Superblock,
        Category::GroupDescriptor,
        Category::InodeTable,
    ];

    /// The categories the parser fills, in the order they are painted. Later entries win where
    /// ranges overlap.
    pub const PAINT_ORDER: [Category; 4] = [
        Category::Free,
        Category::Superblock,
        Category::GroupDescriptor,
        Category::InodeTable,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Border => "border",
            Self::Used => "used",
            Self::Free => "free",
            Self::Superblock => "superblock",
            Self::GroupDescriptor => "group_descriptor",
            Self::InodeTable => "inode_table",
        }
    }
    pub fn flag(self) -> Categories {
        match self {
            Self::Border => Categories::BORDER,
            Self::Used => Categories::USED,
            Self::Free => Categories::FREE,
            Self::Superblock => Categories::SUPERBLOCK,
            Self::GroupDescriptor => Categories::GROUP_DESCRIPTOR,
            Self::InodeTable => Categories::INODE_TABLE,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, PartialEq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown block category: `{}`", self.0)
    }
}
impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.key() == string)
            .ok_or_else(|| UnknownCategory(string.to_owned()))
    }
}

bitflags! {
    pub struct Categories: u8 {
        const BORDER = 0x01;
        const USED = 0x02;
        const FREE = 0x04;
        const SUPERBLOCK = 0x08;
        const GROUP_DESCRIPTOR = 0x10;
        const INODE_TABLE = 0x20;
    }
}

impl Categories {
    /// Iterates over the members of the set, in palette order.
    pub fn iter(self) -> impl Iterator<Item = Category> {
        Category::ALL
            .iter()
            .copied()
            .filter(move |category| self.contains(category.flag()))
    }
}

impl From<Category> for Categories {
    fn from(category: Category) -> Self {
        category.flag()
    }
}
