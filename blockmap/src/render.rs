//! Turning an [`AllocationReport`] into a grid of palette codes.
//!
//! Rendering always starts by painting a flat buffer with one cell per block. Every cell starts
//! out as `used`, then the parsed ranges are painted over it in [`Category::PAINT_ORDER`], so
//! the rarer metadata categories win over free space wherever ranges overlap. The buffer is then
//! laid out either row by row, or along a Hilbert curve.

use std::{convert::TryFrom, fmt, str::FromStr};

use quick_error::quick_error;

use crate::{
    category::Category,
    hilbert::HilbertCurve,
    palette::{Palette, Rgb},
    report::{AllocationReport, BlockRange},
};

quick_error! {
    #[derive(Debug, PartialEq)]
    pub enum RenderError {
        InvalidDimensions(total_blocks: u64) {
            description("the report does not describe a drawable number of blocks")
            display("cannot lay out a raster for {} blocks", total_blocks)
        }
        TooLarge(total_blocks: u64) {
            description("too many blocks to hold in memory")
            display("{} blocks do not fit in an in-memory raster", total_blocks)
        }
        ReversedRange(category: Category, range: BlockRange) {
            description("block range ends before it starts")
            display("{} range {}-{} ends before it starts", category, range.start, range.end)
        }
        RangeOutOfBounds(category: Category, range: BlockRange, total_blocks: u64) {
            description("block range exceeds the block count")
            display("{} range {} exceeds the block count of {}", category, range, total_blocks)
        }
        UnmappedCategory(category: Category) {
            description("category missing from the palette")
            display("the palette has no entry for {}", category)
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Layout {
    /// Row-major, with the width chosen for a roughly 16:9 image. Cells past the last full row
    /// are dropped.
    Linear,
    /// Along a Hilbert curve on the smallest power-of-two square holding every block. Cells past
    /// the last block are `border`.
    Hilbert,
}

#[derive(Debug, PartialEq)]
pub struct UnknownLayout(pub String);

impl fmt::Display for UnknownLayout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown layout: `{}` (expected `linear` or `hilbert`)", self.0)
    }
}
impl std::error::Error for UnknownLayout {}

impl FromStr for Layout {
    type Err = UnknownLayout;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string {
            "linear" => Ok(Self::Linear),
            "hilbert" => Ok(Self::Hilbert),
            other => Err(UnknownLayout(other.to_owned())),
        }
    }
}

/// A `width * height` grid of palette codes, row-major.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    codes: Vec<u8>,
    palette: Palette,
}

impl Raster {
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
    pub fn codes(&self) -> &[u8] {
        &self.codes
    }
    pub fn palette(&self) -> &Palette {
        &self.palette
    }
    pub fn code_at(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.codes
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
    pub fn category_at(&self, x: u32, y: u32) -> Option<Category> {
        self.palette.category(self.code_at(x, y)?)
    }
    /// Number of cells showing `category`.
    pub fn count(&self, category: Category) -> usize {
        match self.palette.code(category) {
            Some(code) => self.codes.iter().filter(|&&c| c == code).count(),
            None => 0,
        }
    }
    /// The raster with every code replaced by its color, three bytes per pixel.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.codes.len() * 3);
        for &code in &self.codes {
            let Rgb(rgb) = self.palette.color(code).unwrap_or(Rgb::BLACK);
            bytes.extend_from_slice(&rgb);
        }
        bytes
    }
}

#[derive(Clone, Debug)]
pub struct Renderer {
    layout: Layout,
    palette: Option<Palette>,
}

impl Renderer {
    /// A renderer whose palette is derived from each report it renders.
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            palette: None,
        }
    }
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }
    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn render(&self, report: &AllocationReport) -> Result<Raster, RenderError> {
        let palette = match self.palette {
            Some(ref palette) => palette.clone(),
            None => Palette::for_report(report, self.layout),
        };
        let cells = paint(report, &palette)?;

        let raster = match self.layout {
            Layout::Linear => lay_out_linear(report.total_blocks(), cells, palette)?,
            Layout::Hilbert => lay_out_hilbert(report.total_blocks(), cells, palette)?,
        };
        log::debug!(
            "rendered {} blocks as a {}x{} {:?} raster",
            report.total_blocks(),
            raster.width,
            raster.height,
            self.layout,
        );
        Ok(raster)
    }
}

pub fn render(report: &AllocationReport, layout: Layout) -> Result<Raster, RenderError> {
    Renderer::new(layout).render(report)
}

fn code(palette: &Palette, category: Category) -> Result<u8, RenderError> {
    palette
        .code(category)
        .ok_or(RenderError::UnmappedCategory(category))
}

/// Paints one cell per block.
fn paint(report: &AllocationReport, palette: &Palette) -> Result<Vec<u8>, RenderError> {
    let total_blocks = report.total_blocks();
    if total_blocks == 0 {
        return Err(RenderError::InvalidDimensions(total_blocks));
    }
    let len = usize::try_from(total_blocks).map_err(|_| RenderError::TooLarge(total_blocks))?;

    let mut cells = vec![code(palette, Category::Used)?; len];

    for &category in Category::PAINT_ORDER.iter() {
        let ranges = report.ranges(category);
        if ranges.is_empty() {
            continue;
        }
        let painted = code(palette, category)?;

        for &range in ranges {
            if range.is_reversed() {
                return Err(RenderError::ReversedRange(category, range));
            }
            if range.end >= total_blocks {
                return Err(RenderError::RangeOutOfBounds(category, range, total_blocks));
            }
            // Both bounds are below `len`, which is a usize.
            cells[range.start as usize..=range.end as usize]
                .iter_mut()
                .for_each(|cell| *cell = painted);
        }
    }
    Ok(cells)
}

/// `floor(sqrt(total_blocks * 16 / 9))`, computed without rounding errors.
pub fn aspect_width(total_blocks: u64) -> u64 {
    let target = u128::from(total_blocks) * 16;
    let mut width = (total_blocks as f64 * 16.0 / 9.0).sqrt() as u128;

    while width > 0 && 9 * width * width > target {
        width -= 1;
    }
    while 9 * (width + 1) * (width + 1) <= target {
        width += 1;
    }
    width as u64
}

/// The linear layout's `(width, height)` for `total_blocks`.
pub fn linear_dimensions(total_blocks: u64) -> Result<(u32, u32), RenderError> {
    let width = aspect_width(total_blocks);
    if width == 0 {
        return Err(RenderError::InvalidDimensions(total_blocks));
    }
    let height = total_blocks / width;
    if height == 0 {
        return Err(RenderError::InvalidDimensions(total_blocks));
    }
    let too_large = |_| RenderError::TooLarge(total_blocks);
    Ok((
        u32::try_from(width).map_err(too_large)?,
        u32::try_from(height).map_err(too_large)?,
    ))
}

fn lay_out_linear(
    total_blocks: u64,
    mut cells: Vec<u8>,
    palette: Palette,
) -> Result<Raster, RenderError> {
    let (width, height) = linear_dimensions(total_blocks)?;
    let placed = width as usize * height as usize;

    if placed < cells.len() {
        log::debug!(
            "{} trailing blocks do not fill a row and are left out",
            cells.len() - placed
        );
    }
    cells.truncate(placed);

    Ok(Raster {
        width,
        height,
        codes: cells,
        palette,
    })
}

fn lay_out_hilbert(
    total_blocks: u64,
    cells: Vec<u8>,
    palette: Palette,
) -> Result<Raster, RenderError> {
    let curve = HilbertCurve::covering(total_blocks).ok_or(RenderError::TooLarge(total_blocks))?;
    let side = u32::try_from(curve.side()).map_err(|_| RenderError::TooLarge(total_blocks))?;
    let area = usize::try_from(curve.len()).map_err(|_| RenderError::TooLarge(total_blocks))?;

    let mut codes = vec![code(&palette, Category::Border)?; area];

    for (&code, (x, y)) in cells.iter().zip(curve.points()) {
        codes[y as usize * side as usize + x as usize] = code;
    }

    Ok(Raster {
        width: side,
        height: side,
        codes,
        palette,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{category::Categories, parser};

    fn sample_report() -> AllocationReport {
        AllocationReport::new(40)
            .with_ranges(Category::Free, vec![BlockRange::new(0, 19), BlockRange::new(30, 39)])
            .with_ranges(Category::Superblock, vec![BlockRange::single(0)])
            .with_ranges(Category::GroupDescriptor, vec![BlockRange::new(1, 2)])
            .with_ranges(Category::InodeTable, vec![BlockRange::new(2, 5)])
    }

    #[test]
    fn half_free_linear() {
        let report = parser::parse("Block count: 100\nFree blocks: 0-49\n").unwrap();
        let raster = Renderer::new(Layout::Linear)
            .with_palette(Palette::linear())
            .render(&report)
            .unwrap();

        assert_eq!((raster.width(), raster.height()), (13, 7));
        assert_eq!(raster.codes().len(), 91);

        let free = raster.palette().code(Category::Free).unwrap();
        let used = raster.palette().code(Category::Used).unwrap();
        assert!(raster.codes()[..50].iter().all(|&code| code == free));
        assert!(raster.codes()[50..].iter().all(|&code| code == used));
        assert_eq!(raster.category_at(10, 3), Some(Category::Free));
        assert_eq!(raster.category_at(11, 3), Some(Category::Used));
        assert_eq!(raster.category_at(13, 0), None);
    }

    #[test]
    fn later_categories_win() {
        let raster = render(&sample_report(), Layout::Linear).unwrap();
        let at = |index: usize| raster.palette().category(raster.codes()[index]);

        assert_eq!(at(0), Some(Category::Superblock));
        assert_eq!(at(1), Some(Category::GroupDescriptor));
        // Claimed by both the group descriptors and the inode table.
        assert_eq!(at(2), Some(Category::InodeTable));
        assert_eq!(at(5), Some(Category::InodeTable));
        assert_eq!(at(6), Some(Category::Free));
        assert_eq!(at(20), Some(Category::Used));
    }

    #[test]
    fn rendering_is_deterministic() {
        let report = sample_report();
        for &layout in [Layout::Linear, Layout::Hilbert].iter() {
            assert_eq!(render(&report, layout), render(&report, layout));
        }
    }

    #[test]
    fn dimensions() {
        assert_eq!(aspect_width(100), 13);
        assert_eq!(aspect_width(1), 1);
        assert_eq!(aspect_width(9), 4);
        assert_eq!(aspect_width(0), 0);
        assert_eq!(linear_dimensions(100), Ok((13, 7)));
        assert_eq!(linear_dimensions(2), Ok((1, 2)));
        assert_eq!(linear_dimensions(0), Err(RenderError::InvalidDimensions(0)));
    }

    #[test]
    fn empty_report_is_rejected() {
        let report = AllocationReport::new(0);
        assert_eq!(
            render(&report, Layout::Linear),
            Err(RenderError::InvalidDimensions(0))
        );
        assert_eq!(
            render(&report, Layout::Hilbert),
            Err(RenderError::InvalidDimensions(0))
        );
    }

    #[test]
    fn bad_ranges_are_rejected() {
        let report =
            AllocationReport::new(10).with_ranges(Category::Free, vec![BlockRange::new(5, 10)]);
        assert_eq!(
            render(&report, Layout::Linear),
            Err(RenderError::RangeOutOfBounds(
                Category::Free,
                BlockRange::new(5, 10),
                10
            ))
        );

        let report = AllocationReport::new(10)
            .with_ranges(Category::InodeTable, vec![BlockRange::new(7, 3)]);
        assert_eq!(
            render(&report, Layout::Hilbert),
            Err(RenderError::ReversedRange(
                Category::InodeTable,
                BlockRange::new(7, 3)
            ))
        );
    }

    #[test]
    fn palette_must_cover_populated_categories() {
        let palette = Palette::new(Categories::USED | Categories::FREE);
        let result = Renderer::new(Layout::Linear)
            .with_palette(palette)
            .render(&sample_report());
        assert_eq!(result, Err(RenderError::UnmappedCategory(Category::Superblock)));

        let result = Renderer::new(Layout::Hilbert)
            .with_palette(Palette::linear())
            .render(&sample_report());
        assert_eq!(result, Err(RenderError::UnmappedCategory(Category::Border)));
    }

    #[test]
    fn derived_palette_only_has_what_is_needed() {
        let report =
            AllocationReport::new(8).with_ranges(Category::Free, vec![BlockRange::single(3)]);

        let raster = render(&report, Layout::Linear).unwrap();
        assert_eq!(raster.palette().categories(), Categories::USED | Categories::FREE);

        let raster = render(&report, Layout::Hilbert).unwrap();
        assert_eq!(
            raster.palette().categories(),
            Categories::BORDER | Categories::USED | Categories::FREE
        );
    }

    #[test]
    fn hilbert_layout_follows_the_curve() {
        let report = sample_report();
        let raster = Renderer::new(Layout::Hilbert)
            .with_palette(Palette::hilbert())
            .render(&report)
            .unwrap();

        // 40 blocks need an 8x8 square.
        assert_eq!((raster.width(), raster.height()), (8, 8));
        assert_eq!(raster.count(Category::Border), 64 - 40);
        assert_eq!(raster.count(Category::Free), 20 - 6 + 10);

        let curve = HilbertCurve::new(3).unwrap();
        let expected = paint(&report, &Palette::hilbert()).unwrap();
        for (index, &code) in expected.iter().enumerate() {
            let (x, y) = curve.index_to_point(index as u64).unwrap();
            assert_eq!(raster.code_at(x as u32, y as u32), Some(code));
        }
        for index in 40..64 {
            let (x, y) = curve.index_to_point(index).unwrap();
            assert_eq!(raster.category_at(x as u32, y as u32), Some(Category::Border));
        }
    }

    #[test]
    fn single_block_hilbert() {
        let report = AllocationReport::new(1);
        let raster = render(&report, Layout::Hilbert).unwrap();
        assert_eq!((raster.width(), raster.height()), (1, 1));
        assert_eq!(raster.category_at(0, 0), Some(Category::Used));
    }

    #[test]
    fn rgb_bytes() {
        let report =
            AllocationReport::new(3).with_ranges(Category::Free, vec![BlockRange::single(1)]);
        let raster = Renderer::new(Layout::Linear)
            .with_palette(Palette::linear())
            .render(&report)
            .unwrap();

        // Three blocks lay out as a single row of two; the last block is cut.
        assert_eq!((raster.width(), raster.height()), (2, 1));
        assert_eq!(raster.to_rgb_bytes(), vec![0x80, 0x80, 0x80, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn layout_names() {
        assert_eq!("hilbert".parse::<Layout>(), Ok(Layout::Hilbert));
        assert_eq!("linear".parse::<Layout>(), Ok(Layout::Linear));
        assert_eq!(
            "zorder".parse::<Layout>(),
            Err(UnknownLayout("zorder".to_owned()))
        );
    }
}
