//! Unicode to Minitel character translation
//!
//! The Minitel has no notion of Unicode. Accented letters and a few symbols
//! are reachable through escape forms that differ between the Videotex
//! character set (SS2 prefixed G2 codes) and the ASCII-like set used in Mixed
//! and TeleInformatique modes (SO/SI shifted national codes). Anything else is
//! approximated by stripping diacritics.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::capability::Mode;

/// Placeholder emitted for characters with no ASCII approximation
const REPLACEMENT: u8 = b'?';

/// Character set used to translate text into Minitel bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CharacterSet {
    /// Videotex mode: G2 supplementary set reached through SS2
    #[default]
    Videotex,
    /// Mixed and TeleInformatique modes: shifted national characters
    Ascii,
}

impl From<Mode> for CharacterSet {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Videotex => CharacterSet::Videotex,
            Mode::Mixed | Mode::TeleInformatique => CharacterSet::Ascii,
        }
    }
}

impl CharacterSet {
    /// Translate a single character, appending the resulting bytes to `out`
    pub fn encode_char(self, ch: char, out: &mut Vec<u8>) {
        let mapped = match self {
            CharacterSet::Videotex => videotex(ch),
            CharacterSet::Ascii => ascii(ch),
        };

        match mapped {
            Some(bytes) => out.extend_from_slice(bytes),
            None => approximate(ch, out),
        }
    }

    /// Translate a whole string
    pub fn encode_str(self, text: &str, out: &mut Vec<u8>) {
        for ch in text.chars() {
            self.encode_char(ch, out);
        }
    }
}

/// Fall back to the decomposed base letters of `ch`
fn approximate(ch: char, out: &mut Vec<u8>) {
    if ch.is_ascii() {
        out.push(ch as u8);
        return;
    }

    for decomposed in std::iter::once(ch).nfkd() {
        if is_combining_mark(decomposed) {
            continue;
        }
        if decomposed.is_ascii() {
            out.push(decomposed as u8);
        } else {
            out.push(REPLACEMENT);
        }
    }
}

fn videotex(ch: char) -> Option<&'static [u8]> {
    let bytes: &'static [u8] = match ch {
        '£' => &[0x19, 0x23],
        '°' => &[0x19, 0x30],
        '±' => &[0x19, 0x31],
        '←' => &[0x19, 0x2c],
        '↑' => &[0x19, 0x2d],
        '→' => &[0x19, 0x2e],
        '↓' => &[0x19, 0x2f],
        '¼' => &[0x19, 0x3c],
        '½' => &[0x19, 0x3d],
        '¾' => &[0x19, 0x3e],
        'ç' => &[0x19, 0x4b, 0x63],
        '’' => &[0x19, 0x4b, 0x27],
        'à' => &[0x19, 0x41, 0x61],
        'á' => &[0x19, 0x42, 0x61],
        'â' => &[0x19, 0x43, 0x61],
        'ä' => &[0x19, 0x48, 0x61],
        'è' => &[0x19, 0x41, 0x65],
        'é' => &[0x19, 0x42, 0x65],
        'ê' => &[0x19, 0x43, 0x65],
        'ë' => &[0x19, 0x48, 0x65],
        'ì' => &[0x19, 0x41, 0x69],
        'í' => &[0x19, 0x42, 0x69],
        'î' => &[0x19, 0x43, 0x69],
        'ï' => &[0x19, 0x48, 0x69],
        'ò' => &[0x19, 0x41, 0x6f],
        'ó' => &[0x19, 0x42, 0x6f],
        'ô' => &[0x19, 0x43, 0x6f],
        'ö' => &[0x19, 0x48, 0x6f],
        'ù' => &[0x19, 0x41, 0x75],
        'ú' => &[0x19, 0x42, 0x75],
        'û' => &[0x19, 0x43, 0x75],
        'ü' => &[0x19, 0x48, 0x75],
        'Œ' => &[0x19, 0x6a],
        'œ' => &[0x19, 0x7a],
        'ß' | 'β' => &[0x19, 0x7b],
        _ => return None,
    };
    Some(bytes)
}

fn ascii(ch: char) -> Option<&'static [u8]> {
    let bytes: &'static [u8] = match ch {
        '£' => &[0x0e, 0x23, 0x0f],
        '°' => &[0x0e, 0x5b, 0x0f],
        'ç' => &[0x0e, 0x5c, 0x0f],
        '’' => &[0x27],
        '`' => &[0x60],
        '§' => &[0x0e, 0x5d, 0x0f],
        'à' => &[0x0e, 0x40, 0x0f],
        'è' => &[0x0e, 0x7f, 0x0f],
        'é' => &[0x0e, 0x7b, 0x0f],
        'ù' => &[0x0e, 0x7c, 0x0f],
        _ => return None,
    };
    Some(bytes)
}
