//! Line classification and block grouping.
//!
//! A file is read as a sequence of physical lines. Each line is either data,
//! a comment (trimmed text starts with a configured prefix) or blank. Runs of
//! data lines form blocks; any run of comment/blank lines that follows data
//! closes the current block.

/// Classification of one physical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Data,
    Comment,
    Blank,
}

/// A physical line of input, remembered with its 1-based number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLine<'a> {
    pub number: usize,
    /// The line as it appears in the file, minus the terminator.
    pub raw: &'a str,
}

impl<'a> SourceLine<'a> {
    /// The line with surrounding whitespace removed; this is what gets split
    /// into fields.
    pub fn content(&self) -> &'a str {
        self.raw.trim()
    }
}

/// A contiguous run of data lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block<'a> {
    pub lines: Vec<SourceLine<'a>>,
}

impl<'a> Block<'a> {
    pub fn first_line(&self) -> Option<usize> {
        self.lines.first().map(|l| l.number)
    }
}

/// Classify a line given the configured comment prefixes.
pub fn classify(line: &str, comment_prefixes: &[String]) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        LineKind::Blank
    } else if comment_prefixes
        .iter()
        .any(|p| !p.is_empty() && trimmed.starts_with(p.as_str()))
    {
        LineKind::Comment
    } else {
        LineKind::Data
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BetweenBlocks,
    InBlock,
}

/// Group the data lines of `text` into blocks.
///
/// Leading, trailing and consecutive separator lines never produce empty
/// blocks; text without any data line yields no blocks at all.
pub fn split_blocks<'a>(text: &'a str, comment_prefixes: &[String]) -> Vec<Block<'a>> {
    let mut blocks = Vec::new();
    let mut current = Block::default();
    let mut state = State::BetweenBlocks;

    for (idx, raw) in text.lines().enumerate() {
        let line = SourceLine {
            number: idx + 1,
            raw,
        };
        let kind = classify(raw, comment_prefixes);

        state = match (state, kind) {
            (_, LineKind::Data) => {
                current.lines.push(line);
                State::InBlock
            }
            (State::InBlock, LineKind::Comment | LineKind::Blank) => {
                blocks.push(std::mem::take(&mut current));
                State::BetweenBlocks
            }
            (State::BetweenBlocks, LineKind::Comment | LineKind::Blank) => State::BetweenBlocks,
        };
    }

    if state == State::InBlock {
        blocks.push(current);
    }
    blocks
}

/// All data lines of `text` as a single block, skipping separators.
pub fn data_lines<'a>(text: &'a str, comment_prefixes: &[String]) -> Block<'a> {
    let lines = text
        .lines()
        .enumerate()
        .filter(|(_, raw)| classify(raw, comment_prefixes) == LineKind::Data)
        .map(|(idx, raw)| SourceLine {
            number: idx + 1,
            raw,
        })
        .collect();
    Block { lines }
}
