//! Screen output primitives
//!
//! Thin builders over [`Minitel::send`]: none of these wait for the terminal.

use super::capability::Color;
use super::constants::*;
use super::link::{Minitel, MinitelError, Result};
use super::sequence::{Item, Sequence};

/// Maximum count accepted by the REP run-length code
pub const MAX_REPEAT: u8 = 40;

/// Widest screen, in Mixed and TeleInformatique modes
pub const MAX_COLUMNS: u32 = 80;

/// Last column reachable with the one byte `0x40 + column` address
const MAX_BYTE_COLUMN: u8 = 0x3f;

/// Pixels in one redefinable character (8 columns x 10 rows)
const GLYPH_PIXELS: usize = 80;

/// Part of the screen cleared by [`Minitel::erase`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Erase {
    /// Whole screen, status line excluded
    All,
    /// Cursor to end of line
    EndOfLine,
    /// Cursor to bottom of screen
    EndOfScreen,
    /// Top of screen to cursor
    StartOfScreen,
    /// Start of line to cursor
    StartOfLine,
    /// Whole current line
    Line,
    /// Status line (row 0)
    StatusLine,
    /// Whole screen and status line
    Everything,
}

impl Erase {
    fn sequence(self) -> Vec<u8> {
        match self {
            Erase::All => vec![FF],
            Erase::EndOfLine => vec![CAN],
            Erase::EndOfScreen => vec![ESC, 0x5b, 0x4a],
            Erase::StartOfScreen => vec![ESC, 0x5b, 0x31, 0x4a],
            Erase::StartOfLine => vec![ESC, 0x5b, 0x31, 0x4b],
            Erase::Line => vec![ESC, 0x5b, 0x32, 0x4b],
            Erase::StatusLine => vec![US, 0x40, 0x41, CAN, LF],
            Erase::Everything => vec![FF, US, 0x40, 0x41, CAN, LF],
        }
    }
}

/// Redefinable character set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharSet {
    G0,
    G1,
}

/// CSI sequence with a decimal parameter, e.g. `ESC [ 12 B`
fn csi(n: u32, command: u8) -> Sequence {
    let mut seq = Sequence::from(CSI);
    seq.push_str(&n.to_string()).push(command);
    seq
}

/// Short relative move: repeat `short` for 1..=4 steps, otherwise a CSI move
fn relative_move(delta: i32, forward: (u8, u8), backward: (u8, u8)) -> Sequence {
    let (short, long) = if delta < 0 { backward } else { forward };
    let steps = delta.unsigned_abs();

    if steps <= 4 {
        Sequence::from(vec![short; steps as usize])
    } else {
        csi(steps, long)
    }
}

impl Minitel {
    /// Move the cursor
    ///
    /// Columns and rows start at 1; row 0 is the status line. Absolute
    /// addresses are `US row column` with one byte each, or two decimal
    /// digits each past column 63 where the byte form would need an eighth
    /// bit. Relative moves of up to four steps use single control codes,
    /// longer ones a CSI sequence, so the cost varies between 1 and 5 bytes.
    pub fn position(&self, column: i32, row: i32, relative: bool) -> Result<()> {
        if !relative {
            if column == 1 && row == 1 {
                return self.send(RS);
            }
            let row = u8::try_from(row)
                .ok()
                .filter(|r| *r <= 24)
                .ok_or_else(|| MinitelError::InvalidArgument(format!("row out of range: {}", row)))?;
            let column = u8::try_from(column)
                .ok()
                .filter(|c| (1..=MAX_COLUMNS).contains(&u32::from(*c)))
                .ok_or_else(|| {
                    MinitelError::InvalidArgument(format!("column out of range: {}", column))
                })?;

            if column <= MAX_BYTE_COLUMN {
                return self.send([US, 0x40 + row, 0x40 + column]);
            }
            let mut seq = Sequence::from(US);
            seq.push_str(&format!("{:02}{:02}", row, column));
            return self.send(seq);
        }

        let mut seq = Sequence::new();
        if row != 0 {
            seq.append(relative_move(row, (LF, b'B'), (VT, b'A')));
        }
        if column != 0 {
            seq.append(relative_move(column, (TAB, b'C'), (BS, b'D')));
        }
        self.send(seq)
    }

    /// Set colors for the following characters
    ///
    /// In Videotex the background only applies to delimiters (space and
    /// semigraphic characters). `None` leaves a color unchanged.
    pub fn color(&self, foreground: Option<Color>, background: Option<Color>) -> Result<()> {
        let mut seq = Sequence::new();
        if let Some(fg) = foreground {
            seq.append([ESC, 0x40 + fg.code()]);
        }
        if let Some(bg) = background {
            seq.append([ESC, 0x50 + bg.code()]);
        }
        self.send(seq)
    }

    /// Character size, `width` and `height` being 1 or 2 (Videotex only)
    pub fn size(&self, width: u8, height: u8) -> Result<()> {
        if !(1..=2).contains(&width) || !(1..=2).contains(&height) {
            return Err(MinitelError::InvalidArgument(format!(
                "size must be 1 or 2, got {}x{}",
                width, height
            )));
        }
        self.send([ESC, 0x4c + (height - 1) + (width - 1) * 2])
    }

    /// Toggle underline, blink and video inversion; `None` leaves as is
    pub fn effect(
        &self,
        underline: Option<bool>,
        blink: Option<bool>,
        invert: Option<bool>,
    ) -> Result<()> {
        let pick = |value: Option<bool>, on: u8, off: u8| {
            value.map(|v| Item::from([ESC, if v { on } else { off }]))
        };

        self.send(Item::list([
            pick(underline, 0x5a, 0x59),
            pick(blink, 0x48, 0x49),
            pick(invert, 0x5d, 0x5c),
        ]))
    }

    /// Show or hide the cursor
    pub fn cursor(&self, visible: bool) -> Result<()> {
        self.send(if visible { CON } else { COF })
    }

    pub fn erase(&self, scope: Erase) -> Result<()> {
        self.send(scope.sequence())
    }

    /// Display `ch` `count` times using the REP code
    pub fn repeat(&self, ch: impl Into<Item>, count: u8) -> Result<()> {
        if count == 0 || count > MAX_REPEAT {
            return Err(MinitelError::InvalidArgument(format!(
                "repeat count must be 1..={}, got {}",
                MAX_REPEAT, count
            )));
        }

        let ch = Sequence::from_item(ch, self.charset());
        if ch.len() != 1 {
            return Err(MinitelError::InvalidArgument(format!(
                "repeat needs a single byte character, got {:?}",
                ch
            )));
        }

        self.send(Item::list([Item::from(ch), Item::from([REP, 0x40 + count - 1])]))
    }

    pub fn beep(&self) -> Result<()> {
        self.send(BEL)
    }

    /// Move the cursor to the start of the current line
    pub fn line_start(&self) -> Result<()> {
        self.send(CR)
    }

    /// Delete characters after the cursor and/or lines below it
    pub fn delete(&self, columns: Option<u32>, rows: Option<u32>) -> Result<()> {
        let mut seq = Sequence::new();
        if let Some(n) = columns {
            seq.append(csi(n, b'P'));
        }
        if let Some(n) = rows {
            seq.append(csi(n, b'M'));
        }
        self.send(seq)
    }

    /// Insert blank characters at the cursor and/or lines below it
    ///
    /// At most one screen width of characters can be inserted.
    pub fn insert(&self, columns: Option<u32>, rows: Option<u32>) -> Result<()> {
        if let Some(n) = columns.filter(|n| *n > MAX_COLUMNS) {
            return Err(MinitelError::InvalidArgument(format!(
                "cannot insert {} characters on a {} column line",
                n, MAX_COLUMNS
            )));
        }

        let mut seq = Sequence::new();
        if let Some(n) = columns {
            // Insert mode on, spaces, insert mode off
            seq.append(CSI).push_str("4h");
            seq.append(vec![b' '; n as usize]);
            seq.append(CSI).push_str("4l");
        }
        if let Some(n) = rows {
            seq.append(csi(n, b'L'));
        }
        self.send(seq)
    }

    /// Switch between semigraphic and alphanumeric characters
    pub fn semigraphic(&self, active: bool) -> Result<()> {
        self.send(if active { SO } else { SI })
    }

    /// Redefine characters starting at `from` (Minitel 2 and later)
    ///
    /// `drawings` holds 8x10 pixel glyphs as `0`/`1` characters, one glyph
    /// after the other; anything else (newlines, comments) is ignored:
    ///
    /// ```text
    /// 11111111
    /// 10000001
    /// 10000001   a rectangle
    /// ...
    /// ```
    ///
    /// No spacing is added between glyphs. The redefined set is selected
    /// afterwards so the characters can be used right away.
    pub fn redefine(&self, from: char, drawings: &str, set: CharSet) -> Result<()> {
        let from = u8::try_from(from)
            .ok()
            .filter(|c| (0x20..0x80).contains(c))
            .ok_or_else(|| {
                MinitelError::InvalidArgument(format!("cannot redefine {:?}", from))
            })?;
        self.send(redefinition(from, drawings, set))
    }
}

/// DRCS download: load header, bit-packed glyphs, set selection
fn redefinition(from: u8, drawings: &str, set: CharSet) -> Sequence {
    let mut seq = Sequence::new();

    let designator = match set {
        CharSet::G0 => 0x42,
        CharSet::G1 => 0x43,
    };
    seq.append([US, 0x23, 0x20, 0x20, 0x20, designator, 0x49]);
    seq.append([US, 0x23, from, 0x30]);

    // Pixels are sent 6 bits at a time; 80 pixels leave 2 bits, padded to 6
    let mut bits: u8 = 0;
    let mut nbits = 0;
    let mut pixels = 0;
    for pixel in drawings.chars().filter(|c| *c == '0' || *c == '1') {
        bits = (bits << 1) | u8::from(pixel == '1');
        nbits += 1;
        pixels += 1;

        if nbits == 6 {
            seq.push(0x40 + bits);
            bits = 0;
            nbits = 0;
        }

        if pixels == GLYPH_PIXELS {
            seq.push(0x40 + (bits << (6 - nbits)));
            seq.push(0x30);
            bits = 0;
            nbits = 0;
            pixels = 0;
        }
    }

    // Leave definition mode
    seq.append([US, 0x41, 0x41]);

    match set {
        CharSet::G0 => seq.append([ESC, 0x28, 0x20, 0x42]),
        CharSet::G1 => seq.append([ESC, 0x29, 0x20, 0x43]),
    };
    seq
}
