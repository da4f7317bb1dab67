use std::{
    fmt,
    fs::{self, File},
    io::{self, prelude::*},
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};

use blockmap::{AllocationReport, Category, Layout, Palette, Raster, Renderer, Rgb};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("failed to run dumpe2fs: {0}")]
    Spawn(#[source] io::Error),
    #[error("dumpe2fs exited with {status}: {stderr}")]
    DumpFailed { status: ExitStatus, stderr: String },
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Blockmap(#[from] blockmap::Error),
    #[error("a {width}x{height} raster does not match its pixel buffer")]
    RasterSize { width: u32, height: u32 },
    #[error("failed to write the image: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to write the report: {0}")]
    Report(#[from] serde_json::Error),
    #[error("failed to create {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Where the `dumpe2fs` listing comes from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Source {
    /// Run `dumpe2fs` on a block device or image, optionally through `sudo`.
    Device { path: PathBuf, sudo: bool },
    /// A listing saved earlier.
    File(PathBuf),
    Stdin,
}

pub fn dumpe2fs_command(device: &Path, sudo: bool) -> Command {
    let mut command = if sudo {
        let mut command = Command::new("sudo");
        command.arg("dumpe2fs");
        command
    } else {
        Command::new("dumpe2fs")
    };
    command.arg(device);
    command
}

impl Source {
    pub fn read(&self) -> Result<String, FrontendError> {
        let bytes = match self {
            Self::Device { path, sudo } => {
                log::info!("running dumpe2fs on {}", path.display());

                let output = dumpe2fs_command(path, *sudo)
                    .output()
                    .map_err(FrontendError::Spawn)?;
                if !output.status.success() {
                    return Err(FrontendError::DumpFailed {
                        status: output.status,
                        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
                    });
                }
                output.stdout
            }
            Self::File(path) => fs::read(path).map_err(|source| FrontendError::Read {
                path: path.clone(),
                source,
            })?,
            Self::Stdin => {
                let mut bytes = Vec::new();
                io::stdin()
                    .read_to_end(&mut bytes)
                    .map_err(|source| FrontendError::Read {
                        path: PathBuf::from("<stdin>"),
                        source,
                    })?;
                bytes
            }
        };
        // Volume names and mount paths are not guaranteed to be UTF-8, and none of the lines that
        // matter contain anything but ASCII.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[derive(Debug, PartialEq)]
pub enum OptionsParseError<'a> {
    MissingColor(&'a str),
    UnknownCategory(&'a str),
    InvalidColor(&'a str),
}
impl fmt::Display for OptionsParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MissingColor(option) => write!(f, "expected `category=RRGGBB`, got `{}`", option),
            Self::UnknownCategory(category) => write!(f, "unknown block category: `{}`", category),
            Self::InvalidColor(color) => write!(f, "invalid color `{}`, expected `RRGGBB`", color),
        }
    }
}
impl std::error::Error for OptionsParseError<'_> {}

/// Parses palette overrides such as `free=ffffff,inode_table=#ff8000`.
pub fn parse_colors<'a>(
    colors_str: &'a str,
) -> Result<Vec<(Category, Rgb)>, OptionsParseError<'a>> {
    let mut colors = Vec::new();

    for option in colors_str.split(',').map(str::trim).filter(|option| !option.is_empty()) {
        let (key, value) = option
            .split_once('=')
            .ok_or(OptionsParseError::MissingColor(option))?;
        let (key, value) = (key.trim(), value.trim());

        let category = key
            .parse::<Category>()
            .map_err(|_| OptionsParseError::UnknownCategory(key))?;
        let color = Rgb::from_hex(value).ok_or(OptionsParseError::InvalidColor(value))?;

        colors.push((category, color));
    }
    Ok(colors)
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReportTarget {
    Stdout,
    File(PathBuf),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    pub source: Source,
    pub layout: Layout,
    pub output: PathBuf,
    pub colors: Vec<(Category, Rgb)>,
    pub report: Option<ReportTarget>,
}

impl Options {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            layout: Layout::Hilbert,
            output: PathBuf::from("blockmap.png"),
            colors: Vec::new(),
            report: None,
        }
    }
}

pub fn palette(report: &AllocationReport, options: &Options) -> Palette {
    options
        .colors
        .iter()
        .fold(Palette::for_report(report, options.layout), |palette, &(category, color)| {
            palette.with_color(category, color)
        })
}

pub fn write_report(report: &AllocationReport, target: &ReportTarget) -> Result<(), FrontendError> {
    match target {
        ReportTarget::Stdout => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, report)?;
            writeln!(lock)?;
        }
        ReportTarget::File(path) => {
            let file = File::create(path).map_err(|source| FrontendError::Create {
                path: path.clone(),
                source,
            })?;
            let mut writer = io::BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, report)?;
            writer.flush()?;
        }
    }
    Ok(())
}

pub fn to_image(raster: &Raster) -> Result<image::RgbImage, FrontendError> {
    image::RgbImage::from_raw(raster.width(), raster.height(), raster.to_rgb_bytes()).ok_or(
        FrontendError::RasterSize {
            width: raster.width(),
            height: raster.height(),
        },
    )
}

pub fn run(options: &Options) -> Result<(), FrontendError> {
    let dump = options.source.read()?;
    let report = blockmap::parse(&dump).map_err(blockmap::Error::from)?;

    for &category in Category::PAINT_ORDER.iter() {
        log::debug!(
            "{}: {} ranges, {} blocks",
            category,
            report.ranges(category).len(),
            report.block_count(category),
        );
    }
    if let Some(ref target) = options.report {
        write_report(&report, target)?;
    }

    let renderer = Renderer::new(options.layout).with_palette(palette(&report, options));
    let raster = renderer.render(&report).map_err(blockmap::Error::from)?;

    to_image(&raster)?.save(&options.output)?;
    log::info!(
        "wrote a {}x{} image of {} blocks to {}",
        raster.width(),
        raster.height(),
        report.total_blocks(),
        options.output.display(),
    );
    Ok(())
}
