use clap::{crate_authors, crate_version, App, Arg, ArgMatches};
use std::path::PathBuf;

use blockmap_frontend_image::{parse_colors, run, Options, ReportTarget, Source};

fn options(matches: &ArgMatches) -> Result<Options, String> {
    let source = matches.value_of("SOURCE").unwrap_or("-");

    let source = if source == "-" {
        Source::Stdin
    } else if matches.is_present("DUMP") {
        Source::File(PathBuf::from(source))
    } else {
        Source::Device {
            path: PathBuf::from(source),
            sudo: matches.is_present("SUDO"),
        }
    };
    let mut options = Options::new(source);

    if let Some(layout) = matches.value_of("LAYOUT") {
        options.layout = layout.parse().map_err(|err| format!("{}", err))?;
    }
    if let Some(output) = matches.value_of("OUTPUT") {
        options.output = PathBuf::from(output);
    }
    if let Some(colors) = matches.value_of("COLORS") {
        options.colors = parse_colors(colors).map_err(|err| format!("{}", err))?;
    }
    options.report = matches.value_of("JSON").map(|target| match target {
        "-" => ReportTarget::Stdout,
        path => ReportTarget::File(PathBuf::from(path)),
    });

    Ok(options)
}

fn main() {
    env_logger::init();
    let app = App::new("blockmap")
        .author(crate_authors!())
        .version(crate_version!())
        .about("Draw the block allocation of an ext2/3/4 filesystem, one pixel per block")
        .arg(
            Arg::with_name("SOURCE")
                .required(true)
                .index(1)
                .help("Block device or image to run dumpe2fs on, or `-` to read a dump from stdin"),
        )
        .arg(
            Arg::with_name("DUMP")
                .long("dump")
                .help("Treat SOURCE as saved dumpe2fs output instead of a device"),
        )
        .arg(
            Arg::with_name("SUDO")
                .long("sudo")
                .help("Run dumpe2fs through sudo")
                .conflicts_with("DUMP"),
        )
        .arg(
            Arg::with_name("LAYOUT")
                .short("l")
                .long("layout")
                .takes_value(true)
                .possible_values(&["linear", "hilbert"])
                .default_value("hilbert")
                .help("Place blocks row by row, or along a Hilbert curve"),
        )
        .arg(
            Arg::with_name("OUTPUT")
                .short("o")
                .long("output")
                .takes_value(true)
                .default_value("blockmap.png")
                .help("Image file to write; the format follows the extension"),
        )
        .arg(
            Arg::with_name("COLORS")
                .short("c")
                .long("colors")
                .takes_value(true)
                .help("Palette overrides, e.g. `free=ffffff,inode_table=ff8000`"),
        )
        .arg(
            Arg::with_name("JSON")
                .long("json")
                .takes_value(true)
                .help("Also write the parsed report as JSON to this file, or `-` for stdout"),
        );

    let matches = app.get_matches();

    let options = match options(&matches) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("error: {}", message);
            std::process::exit(2);
        }
    };

    if let Err(err) = run(&options) {
        log::error!("{}", err);
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
