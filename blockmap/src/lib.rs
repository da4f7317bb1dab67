//! Visualization of ext2/3/4 block allocation.
//!
//! A `dumpe2fs` listing is parsed into an [`AllocationReport`], which is then painted into a
//! [`Raster`] of palette codes, one pixel per block. Producing the listing and encoding the raster
//! into an image file are left to the caller.

use quick_error::quick_error;

pub mod category;
pub mod hilbert;
pub mod palette;
pub mod parser;
pub mod render;
pub mod report;

pub use category::{Categories, Category};
pub use hilbert::HilbertCurve;
pub use palette::{Palette, Rgb};
pub use parser::{parse, MalformedInput, Parser};
pub use render::{render, Layout, Raster, RenderError, Renderer};
pub use report::{AllocationReport, BlockRange};

quick_error! {
    #[derive(Debug, PartialEq)]
    pub enum Error {
        Parse(err: MalformedInput) {
            from()
            cause(err)
            description("malformed dumpe2fs output")
            display("malformed dumpe2fs output: {}", err)
        }
        Render(err: RenderError) {
            from()
            cause(err)
            description("rendering failed")
            display("rendering failed: {}", err)
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Parses `dump` and renders it with `renderer`, handing back both stages.
pub fn visualize(dump: &str, renderer: &Renderer) -> Result<(AllocationReport, Raster)> {
    let report = parse(dump)?;
    let raster = renderer.render(&report)?;
    Ok((report, raster))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_from_either_stage() {
        let renderer = Renderer::new(Layout::Linear);

        assert_eq!(
            visualize("Free blocks: 1-2\n", &renderer).unwrap_err(),
            Error::Parse(MalformedInput::MissingBlockCount)
        );
        assert_eq!(
            visualize("Block count: 0\n", &renderer).unwrap_err(),
            Error::Render(RenderError::InvalidDimensions(0))
        );
        assert_eq!(
            visualize("Block count: 4\nFree blocks: 2-4\n", &renderer).unwrap_err(),
            Error::Render(RenderError::RangeOutOfBounds(
                Category::Free,
                BlockRange::new(2, 4),
                4
            ))
        );
    }

    #[test]
    fn end_to_end() {
        let dump = "\
Block count:              64
Group 0: (Blocks 0-63)
  Primary superblock at 0, Group descriptors at 1-1
  Block bitmap at 2 (+2)
  Inode bitmap at 3 (+3)
  Inode table at 4-7
  Free blocks: 8-31, 40-63
";
        let (report, raster) = visualize(dump, &Renderer::new(Layout::Hilbert)).unwrap();

        assert_eq!(report.total_blocks(), 64);
        assert_eq!((raster.width(), raster.height()), (8, 8));
        assert_eq!(raster.count(Category::Border), 0);
        assert_eq!(raster.count(Category::Superblock), 1);
        assert_eq!(raster.count(Category::GroupDescriptor), 3);
        assert_eq!(raster.count(Category::InodeTable), 4);
        assert_eq!(raster.count(Category::Free), 48);
        assert_eq!(raster.count(Category::Used), 8);
        assert_eq!(raster.category_at(0, 0), Some(Category::Superblock));
    }
}
