use std::fmt;

use crate::{
    category::{Categories, Category},
    render::Layout,
    report::AllocationReport,
};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const BLACK: Rgb = Rgb([0x00, 0x00, 0x00]);
    pub const GRAY: Rgb = Rgb([0x80, 0x80, 0x80]);
    pub const WHITE: Rgb = Rgb([0xff, 0xff, 0xff]);
    pub const BLUE: Rgb = Rgb([0x00, 0x00, 0xff]);
    pub const GREEN: Rgb = Rgb([0x00, 0xff, 0x00]);
    pub const YELLOW: Rgb = Rgb([0xff, 0xff, 0x00]);

    /// Parses `RRGGBB`, optionally prefixed with `#`.
    pub fn from_hex(string: &str) -> Option<Self> {
        let digits = string.strip_prefix('#').unwrap_or(string);
        if digits.len() != 6 || !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |index: usize| u8::from_str_radix(&digits[index * 2..index * 2 + 2], 16).ok();
        Some(Rgb([channel(0)?, channel(1)?, channel(2)?]))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}

pub fn default_color(category: Category) -> Rgb {
    match category {
        Category::Border => Rgb::BLACK,
        Category::Used => Rgb::GRAY,
        Category::Free => Rgb::WHITE,
        Category::Superblock => Rgb::BLUE,
        Category::GroupDescriptor => Rgb::GREEN,
        Category::InodeTable => Rgb::YELLOW,
    }
}

/// An indexed color table.
///
/// A raster stores one small integer per pixel; that integer is the position of the pixel's
/// category in the palette. Codes are handed out in [`Category::ALL`] order, restricted to the
/// categories the palette was built for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Palette {
    entries: Vec<(Category, Rgb)>,
}

impl Palette {
    pub fn new(categories: Categories) -> Self {
        Self {
            entries: categories
                .iter()
                .map(|category| (category, default_color(category)))
                .collect(),
        }
    }
    /// `used`, `free`, `superblock`, `group_descriptor`, `inode_table`.
    pub fn linear() -> Self {
        Self::new(Categories::all() - Categories::BORDER)
    }
    /// Every category, `border` first.
    pub fn hilbert() -> Self {
        Self::new(Categories::all())
    }

    /// The smallest palette able to render `report`: `used`, whatever the parser populated, and
    /// `border` when the layout needs it.
    pub fn for_report(report: &AllocationReport, layout: Layout) -> Self {
        let mut categories = report.populated() | Categories::USED;
        if layout == Layout::Hilbert {
            categories |= Categories::BORDER;
        }
        Self::new(categories)
    }

    /// Replaces the color of `category`, if the palette has it.
    pub fn with_color(mut self, category: Category, color: Rgb) -> Self {
        match self.entries.iter_mut().find(|(c, _)| *c == category) {
            Some(entry) => entry.1 = color,
            None => log::warn!("palette has no {} entry to recolor", category),
        }
        self
    }

    pub fn categories(&self) -> Categories {
        self.entries
            .iter()
            .fold(Categories::empty(), |set, (category, _)| set | category.flag())
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn code(&self, category: Category) -> Option<u8> {
        self.entries
            .iter()
            .position(|(c, _)| *c == category)
            .map(|index| index as u8)
    }
    pub fn category(&self, code: u8) -> Option<Category> {
        self.entries.get(usize::from(code)).map(|(category, _)| *category)
    }
    pub fn color(&self, code: u8) -> Option<Rgb> {
        self.entries.get(usize::from(code)).map(|(_, color)| *color)
    }
    pub fn entries(&self) -> &[(Category, Rgb)] {
        &self.entries
    }
    /// The table as a flat list of RGB triples, for indexed image formats.
    pub fn to_rgb_table(&self) -> Vec<u8> {
        self.entries.iter().flat_map(|(_, Rgb(rgb))| rgb.iter().copied()).collect()
    }
}
