//! Terminal modes, speeds, colors and capability tables

use std::fmt;
use std::str::FromStr;

use super::constants::{B1200, B300, B4800, B9600};
use super::link::MinitelError;

/// Display/protocol mode of the terminal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// 40 columns, Videotex control codes (power-on mode)
    #[default]
    Videotex,
    /// 80 columns, Videotex control codes
    Mixed,
    /// 80 columns, ASCII/ISO 6429 control codes
    TeleInformatique,
}

impl Mode {
    pub fn name(self) -> &'static str {
        match self {
            Mode::Videotex => "videotex",
            Mode::Mixed => "mixte",
            Mode::TeleInformatique => "teleinformatique",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = MinitelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "videotex" => Ok(Mode::Videotex),
            "mixte" | "mixed" => Ok(Mode::Mixed),
            "teleinformatique" | "tele-informatique" | "teleinfo" => Ok(Mode::TeleInformatique),
            _ => Err(MinitelError::InvalidArgument(format!("unknown mode: {}", s))),
        }
    }
}

/// Link speeds known to Minitels up to the Minitel 2, fastest first
pub const SPEEDS: [u32; 4] = [9600, 4800, 1200, 300];

/// Power-on speed of every Minitel
pub const DEFAULT_SPEED: u32 = 1200;

/// Speed programming code sent after `PRO2 PROG`
pub fn speed_code(bps: u32) -> Option<u8> {
    match bps {
        300 => Some(B300),
        1200 => Some(B1200),
        4800 => Some(B4800),
        9600 => Some(B9600),
        _ => None,
    }
}

/// Keyboard fitted to the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    None,
    Abcd,
    Azerty,
}

/// What the connected terminal model supports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// Model name, e.g. "Minitel 2"
    pub name: String,
    /// Can be flipped over and used as a modem
    pub flippable: bool,
    pub keyboard: Keyboard,
    /// Maximum link speed in bps
    pub max_speed: u32,
    pub manufacturer: String,
    pub columns_80: bool,
    /// Supports DRCS character redefinition
    pub redefinable_chars: bool,
    /// Firmware version letter
    pub version: Option<char>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::basic()
    }
}

impl Capabilities {
    /// Assumed capabilities of an unidentified Minitel
    pub fn basic() -> Self {
        Self {
            name: "Minitel inconnu".to_string(),
            flippable: false,
            keyboard: Keyboard::Abcd,
            max_speed: 1200,
            manufacturer: "Inconnu".to_string(),
            columns_80: false,
            redefinable_chars: false,
            version: None,
        }
    }

    fn model(
        name: &str,
        flippable: bool,
        keyboard: Keyboard,
        max_speed: u32,
        columns_80: bool,
        redefinable_chars: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            flippable,
            keyboard,
            max_speed,
            columns_80,
            redefinable_chars,
            ..Self::basic()
        }
    }

    /// Look up the model code returned by ENQROM
    pub fn for_model(code: u8) -> Option<Self> {
        use Keyboard::*;

        let caps = match code {
            b'b' => Self::model("Minitel 1", false, Abcd, 1200, false, false),
            b'c' => Self::model("Minitel 1", false, Azerty, 1200, false, false),
            b'd' => Self::model("Minitel 10", false, Azerty, 1200, false, false),
            b'e' => Self::model("Minitel 1 couleur", false, Azerty, 1200, false, false),
            b'f' => Self::model("Minitel 10", true, Azerty, 1200, false, false),
            b'g' => Self::model("Émulateur", true, Azerty, 9600, true, true),
            b'j' => Self::model("Imprimante", false, None, 1200, false, false),
            b'r' => Self::model("Minitel 1", true, Azerty, 1200, false, false),
            b's' => Self::model("Minitel 1 couleur", true, Azerty, 1200, false, false),
            b't' => Self::model("Terminatel 252", false, None, 1200, false, false),
            b'u' => Self::model("Minitel 1B", true, Azerty, 4800, true, false),
            b'v' => Self::model("Minitel 2", true, Azerty, 9600, true, true),
            b'w' => Self::model("Minitel 10B", true, Azerty, 4800, true, false),
            b'y' => Self::model("Minitel 5", true, Azerty, 9600, true, true),
            b'z' => Self::model("Minitel 12", true, Azerty, 9600, true, true),
            _ => return Option::None,
        };
        Some(caps)
    }
}

/// Manufacturer name for an ENQROM manufacturer code
pub fn manufacturer(code: u8) -> Option<&'static str> {
    let name = match code {
        b'A' => "Matra",
        b'B' => "RTIC",
        b'C' => "Telic-Alcatel",
        b'D' => "Thomson",
        b'E' => "CCS",
        b'F' => "Fiet",
        b'G' => "Fime",
        b'H' => "Unitel",
        b'I' => "Option",
        b'J' => "Bull",
        b'K' => "Télématique",
        b'L' => "Desmet",
        _ => return None,
    };
    Some(name)
}

/// Minitel color
///
/// Parsed from a French or English color name, or from a grey level `0`
/// (black) to `7` (white) which is mapped by luminance on monochrome sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black = 0,
    Red = 1,
    Green = 2,
    Yellow = 3,
    Blue = 4,
    Magenta = 5,
    Cyan = 6,
    White = 7,
}

impl Color {
    /// Color code added to the attribute base byte
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Color rendered at grey `level` (0 black .. 7 white)
    pub fn grey(level: u8) -> Result<Self, MinitelError> {
        let color = match level {
            0 => Color::Black,
            1 => Color::Blue,
            2 => Color::Red,
            3 => Color::Magenta,
            4 => Color::Green,
            5 => Color::Cyan,
            6 => Color::Yellow,
            7 => Color::White,
            _ => {
                return Err(MinitelError::InvalidArgument(format!(
                    "grey level out of range: {}",
                    level
                )))
            }
        };
        Ok(color)
    }
}

impl FromStr for Color {
    type Err = MinitelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        if let Ok(level) = name.parse::<u8>() {
            return Color::grey(level);
        }

        match name.as_str() {
            "noir" | "black" => Ok(Color::Black),
            "rouge" | "red" => Ok(Color::Red),
            "vert" | "green" => Ok(Color::Green),
            "jaune" | "yellow" => Ok(Color::Yellow),
            "bleu" | "blue" => Ok(Color::Blue),
            "magenta" => Ok(Color::Magenta),
            "cyan" => Ok(Color::Cyan),
            "blanc" | "white" => Ok(Color::White),
            _ => Err(MinitelError::InvalidArgument(format!("unknown color: {}", s))),
        }
    }
}
