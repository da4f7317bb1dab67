//! Parsing of `dumpe2fs` output into an [`AllocationReport`].
//!
//! The dump is read one line at a time, with surrounding whitespace stripped. Only a handful of
//! line shapes carry information the visualization needs; everything else is skipped. The only
//! state that survives from one line to the next is the declared block count and the base block
//! of the group section currently being read.

use std::num::ParseIntError;

use quick_error::quick_error;

use crate::{
    category::Category,
    report::{AllocationReport, BlockRange},
};

quick_error! {
    #[derive(Debug, PartialEq)]
    pub enum MalformedInput {
        DuplicateBlockCount(line: usize, value: u64) {
            description("block count declared more than once")
            display("line {}: block count declared more than once (again as {})", line, value)
        }
        MissingBlockCount {
            description("the dump never declares a block count")
        }
        InvalidNumber(line: usize, token: String) {
            description("invalid block number")
            display("line {}: `{}` is not a valid block number", line, token)
        }
    }
}

/// How the numbers following a recognized phrase are to be read.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Addressing {
    /// Block addresses, used as they are.
    Absolute,
    /// Offsets from the first block of the current group, unless the number is followed by a
    /// parenthesized annotation such as `(+257)` or `(bg #0 + 258)`. dumpe2fs only annotates
    /// absolute addresses, so an annotated number is used as it is.
    GroupRelative,
}

struct Recognizer {
    phrase: &'static str,
    category: Category,
    addressing: Addressing,
}

// Matched case-insensitively anywhere in the line. All of them are tried on every line, because
// dumpe2fs packs several facts into one line (`Primary superblock at 0, Group descriptors at
// 1-1`). Block and inode bitmaps deliberately land in the group descriptor category.
const RECOGNIZERS: &[Recognizer] = &[
    Recognizer {
        phrase: "superblock at ",
        category: Category::Superblock,
        addressing: Addressing::Absolute,
    },
    Recognizer {
        phrase: "group descriptors at ",
        category: Category::GroupDescriptor,
        addressing: Addressing::Absolute,
    },
    Recognizer {
        phrase: "bitmap at ",
        category: Category::GroupDescriptor,
        addressing: Addressing::GroupRelative,
    },
    Recognizer {
        phrase: "inode table at ",
        category: Category::InodeTable,
        addressing: Addressing::Absolute,
    },
    Recognizer {
        phrase: "inode tables at ",
        category: Category::InodeTable,
        addressing: Addressing::Absolute,
    },
];

const BLOCK_COUNT_PREFIX: &str = "Block count:";
const FREE_BLOCKS_PREFIX: &str = "Free blocks:";
const GROUP_PREFIX: &str = "Group ";
const GROUP_BLOCKS_PREFIX: &str = "(Blocks ";

/// The group section the parser is currently inside of.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GroupContext {
    pub index: Option<u64>,
    pub base: u64,
}

/// Incremental parser, fed one line at a time.
#[derive(Debug, Default)]
pub struct Parser {
    total_blocks: Option<u64>,
    group: GroupContext,
    report: AllocationReport,
    line_number: usize,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn group(&self) -> GroupContext {
        self.group
    }
    pub fn total_blocks(&self) -> Option<u64> {
        self.total_blocks
    }

    pub fn feed_line(&mut self, line: &str) -> Result<(), MalformedInput> {
        self.line_number += 1;
        let line = line.trim();
        let number = self.line_number;

        if let Some(rest) = line.strip_prefix(BLOCK_COUNT_PREFIX) {
            let value = parse_number(rest.trim(), number)?;
            if self.total_blocks.is_some() {
                return Err(MalformedInput::DuplicateBlockCount(number, value));
            }
            log::trace!("line {}: block count {}", number, value);
            self.total_blocks = Some(value);
        }

        if let Some(group) = parse_group_header(line, number)? {
            log::trace!("line {}: entering group {:?}", number, group);
            self.group = group;
        }

        let lowercase = line.to_ascii_lowercase();
        for recognizer in RECOGNIZERS {
            let mut search_from = 0;
            while let Some(found) = lowercase[search_from..].find(recognizer.phrase) {
                let field_start = search_from + found + recognizer.phrase.len();
                search_from = field_start;

                let field = &line[field_start..];
                let list = leading(field, |c| c.is_ascii_digit() || c == '-');

                let ranges = match recognizer.addressing {
                    Addressing::Absolute => parse_list(list, number)?,
                    Addressing::GroupRelative if is_annotated(&field[list.len()..]) => {
                        parse_list(list, number)?
                    }
                    Addressing::GroupRelative => {
                        let offsets = parse_list(list, number)?;
                        if self.group.index.is_none() && !offsets.is_empty() {
                            log::warn!(
                                "line {}: group-relative {} outside of any group, assuming base 0",
                                number,
                                recognizer.category,
                            );
                        }
                        offsets
                            .into_iter()
                            .map(|range| {
                                range.checked_offset(self.group.base).ok_or_else(|| {
                                    MalformedInput::InvalidNumber(number, range.to_string())
                                })
                            })
                            .collect::<Result<Vec<_>, _>>()?
                    }
                };
                self.push(recognizer.category, ranges);
            }
        }

        if let Some(rest) = line.strip_prefix(FREE_BLOCKS_PREFIX) {
            let list = leading(rest, |c| c.is_ascii_digit() || c == '-' || c == ',' || c == ' ');
            if self.group.index.is_none() && is_summary_count(list) {
                // The superblock summary uses the same label for the number of free blocks.
                log::debug!("line {}: free block count {}, not a list", number, list.trim());
            } else {
                let ranges = parse_list(list, number)?;
                self.push(Category::Free, ranges);
            }
        }

        Ok(())
    }

    fn push(&mut self, category: Category, ranges: Vec<BlockRange>) {
        if ranges.is_empty() {
            return;
        }
        log::trace!("line {}: {} {:?}", self.line_number, category, ranges);
        if let Some(list) = self.report.ranges_mut(category) {
            list.extend(ranges);
        }
    }

    pub fn finish(self) -> Result<AllocationReport, MalformedInput> {
        let total_blocks = self.total_blocks.ok_or(MalformedInput::MissingBlockCount)?;

        let mut report = self.report;
        report.set_total_blocks(total_blocks);

        log::debug!(
            "parsed {} lines, {} blocks: {} free, {} superblock, {} descriptor, {} inode ranges",
            self.line_number,
            total_blocks,
            report.ranges(Category::Free).len(),
            report.ranges(Category::Superblock).len(),
            report.ranges(Category::GroupDescriptor).len(),
            report.ranges(Category::InodeTable).len(),
        );
        Ok(report)
    }
}

/// Parses a whole dump.
pub fn parse(text: &str) -> Result<AllocationReport, MalformedInput> {
    let mut parser = Parser::new();
    for line in text.lines() {
        parser.feed_line(line)?;
    }
    parser.finish()
}

#[derive(Debug, PartialEq)]
pub struct InvalidToken(pub String);

/// Parses a comma separated block list such as `12,15-17, 20`.
///
/// Bare numbers become single-block ranges and `A-B` pairs are taken as they are, even when
/// reversed. Empty entries are skipped.
pub fn parse_range_list(list: &str) -> Result<Vec<BlockRange>, InvalidToken> {
    let mut ranges = Vec::new();

    for token in list.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        let invalid = |_: ParseIntError| InvalidToken(token.to_owned());

        let range = match token.split_once('-') {
            Some((start, end)) => BlockRange::new(
                start.trim().parse().map_err(invalid)?,
                end.trim().parse().map_err(invalid)?,
            ),
            None => BlockRange::single(token.parse().map_err(invalid)?),
        };
        ranges.push(range);
    }
    Ok(ranges)
}

fn parse_list(list: &str, line: usize) -> Result<Vec<BlockRange>, MalformedInput> {
    parse_range_list(list).map_err(|InvalidToken(token)| MalformedInput::InvalidNumber(line, token))
}

fn parse_number(string: &str, line: usize) -> Result<u64, MalformedInput> {
    string
        .parse()
        .map_err(|_| MalformedInput::InvalidNumber(line, string.to_owned()))
}

/// Recognizes `Group 3: (Blocks 98304-131071) ...`.
fn parse_group_header(line: &str, number: usize) -> Result<Option<GroupContext>, MalformedInput> {
    let rest = match line.strip_prefix(GROUP_PREFIX) {
        Some(rest) => rest,
        None => return Ok(None),
    };
    let index = leading(rest, |c| c.is_ascii_digit());
    let rest = match rest[index.len()..]
        .strip_prefix(':')
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix(GROUP_BLOCKS_PREFIX))
    {
        Some(rest) => rest,
        None => return Ok(None),
    };
    let base = leading(rest, |c| c.is_ascii_digit());

    Ok(Some(GroupContext {
        index: if index.is_empty() {
            None
        } else {
            Some(parse_number(index, number)?)
        },
        base: parse_number(base, number)?,
    }))
}

/// Whether a number is followed by `(+N)`, `(bg #N + M)` or another parenthesized note.
fn is_annotated(rest: &str) -> bool {
    rest.trim_start().starts_with('(')
}

/// A lone number, as in the superblock summary's `Free blocks: 1000`.
fn is_summary_count(list: &str) -> bool {
    let list = list.trim();
    !list.is_empty() && list.bytes().all(|byte| byte.is_ascii_digit())
}

fn leading(string: &str, predicate: impl Fn(char) -> bool) -> &str {
    let end = string
        .char_indices()
        .find(|&(_, c)| !predicate(c))
        .map(|(index, _)| index)
        .unwrap_or(string.len());
    &string[..end]
}
