//! minitel - Drive a Minitel videotex terminal over a serial link
//!
//! The Minitel is the French videotex terminal of the Teletel network. Its
//! peripheral socket is a plain serial port: plug a USB-TTL cable in and the
//! terminal can be used as a character display with keyboard.
//!
//! # Features
//!
//! - **Threaded link**: sends never block, received bytes are buffered
//! - **Framing**: received bytes grouped into key/acknowledgment frames
//! - **Negotiation**: speed detection, mode switching, identification
//! - **Display**: positioning, colors, sizes, erase, repeat, custom glyphs
//!
//! # Quick Start
//!
//! ```no_run
//! use minitel::{Color, Minitel};
//!
//! # fn main() -> minitel::Result<()> {
//! let mut minitel = Minitel::open("/dev/ttyUSB0")?;
//! minitel.detect_speed()?;
//! minitel.identify()?;
//!
//! minitel.position(1, 1, false)?;
//! minitel.color(Some(Color::Yellow), None)?;
//! minitel.send("Bonjour !")?;
//! minitel.close();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;

pub use crate::core::capability::{Capabilities, Color, Keyboard, Mode};
pub use crate::core::charset::CharacterSet;
pub use crate::core::display::{CharSet, Erase};
pub use crate::core::link::{Minitel, MinitelError, Result};
pub use crate::core::protocol::KeyboardMode;
pub use crate::core::sequence::{Item, Sequence};
pub use crate::core::transport::{SerialTransport, Transport, TransportError};
