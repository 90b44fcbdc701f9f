//! Protocol negotiation: modes, speed, identification, keyboard
//!
//! Every operation here is a transaction built on [`Minitel::call`]. A
//! terminal that does not answer, or answers with the wrong acknowledgment,
//! is reported as `Ok(false)`/`Ok(None)`; only link failures are errors.

use bitflags::bitflags;
use tracing::{debug, info, warn};

use super::capability::{manufacturer, speed_code, Capabilities, Mode, SPEEDS};
use super::constants::*;
use super::link::{Minitel, Result};
use super::sequence::{Item, Sequence};

bitflags! {
    /// Keyboard behavior toggled by [`Minitel::configure_keyboard`]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct KeyboardMode: u8 {
        /// Extended keyboard codes
        const EXTENDED    = 0b001;
        /// Cursor keys send CSI sequences
        const CURSOR_KEYS = 0b010;
        /// Letters are lowercase without Shift
        const LOWERCASE   = 0b100;
    }
}

/// Firmware versions of the Telic-built sets actually made by Matra
const TELIC_MATRA_VERSIONS: [u8; 4] = [b'4', b'5', b';', b'<'];

/// One mode transition: command, reply length, expected acknowledgment
struct Transition {
    command: Sequence,
    reply_len: usize,
    ack: Sequence,
}

impl Transition {
    fn new(command: impl Into<Item>, reply_len: usize, ack: impl Into<Item>) -> Self {
        Self {
            command: Sequence::from(command.into()),
            reply_len,
            ack: Sequence::from(ack.into()),
        }
    }
}

/// Direct transition from `from` to `to`, if the terminal has one
fn transition(from: Mode, to: Mode) -> Option<Transition> {
    let to_videotex = || Transition::new(Item::list([&CSI[..], &[0x3f, 0x7b]]), 2, [SEP, 0x5e]);
    let to_mixed = || Transition::new(Item::list([PRO2, MIXTE1]), 2, [SEP, 0x70]);
    let to_teleinfo = || {
        Transition::new(
            Item::list([PRO2, TELINFO]),
            4,
            Item::list([&CSI[..], &[0x3f, 0x7a]]),
        )
    };

    match (from, to) {
        (Mode::TeleInformatique, Mode::Videotex) => Some(to_videotex()),
        (Mode::Videotex, Mode::Mixed) => Some(to_mixed()),
        (Mode::Videotex, Mode::TeleInformatique) => Some(to_teleinfo()),
        (Mode::Mixed, Mode::Videotex) => {
            Some(Transition::new(Item::list([PRO2, MIXTE2]), 2, [SEP, 0x71]))
        }
        (Mode::Mixed, Mode::TeleInformatique) => Some(to_teleinfo()),
        // No direct path from TeleInformatique to Mixed
        _ => None,
    }
}

impl Minitel {
    /// Switch the terminal to `target` mode
    ///
    /// TeleInformatique to Mixed has no direct command and goes through
    /// Videotex; if the first hop fails the mode is left untouched. Asking for
    /// the current mode succeeds without talking to the terminal.
    pub fn set_mode(&mut self, target: Mode) -> Result<bool> {
        if self.mode == target {
            return Ok(true);
        }

        if self.mode == Mode::TeleInformatique && target == Mode::Mixed {
            if !self.switch_mode(Mode::Videotex)? {
                return Ok(false);
            }
            return self.switch_mode(Mode::Mixed);
        }

        self.switch_mode(target)
    }

    fn switch_mode(&mut self, target: Mode) -> Result<bool> {
        let Some(step) = transition(self.mode, target) else {
            return Ok(false);
        };

        let reply = self.call(step.command, step.reply_len)?;
        let accepted = reply.equals(&step.ack);

        if accepted {
            info!("Mode changed from {} to {}", self.mode, target);
            self.mode = target;
        } else {
            warn!("Mode change {} -> {} refused: {:?}", self.mode, target, reply);
        }
        Ok(accepted)
    }

    /// Find the speed the terminal is currently set to
    ///
    /// Tries 9600, 4800, 1200 and 300 bps in turn with a terminal status
    /// request and keeps the first speed that gets a full PRO2 reply. The
    /// serial link is left at that speed. `None` if nothing answered, in which
    /// case the link goes back to the speed it had before the sweep.
    pub fn detect_speed(&mut self) -> Result<Option<u32>> {
        for bps in SPEEDS {
            self.set_link_speed(bps)?;

            let reply = self.call(Item::list([&PRO1[..], &[STATUS_TERMINAL]]), LONGUEUR_PRO2)?;
            if reply.len() == LONGUEUR_PRO2 {
                info!("Minitel answers at {} bps", bps);
                self.speed = bps;
                return Ok(Some(bps));
            }
            debug!("No answer at {} bps", bps);
        }

        warn!("Minitel speed could not be detected");
        self.set_link_speed(self.speed)?;
        Ok(None)
    }

    /// Program the terminal and the serial link for `bps`
    ///
    /// Only 300, 1200, 4800 and 9600 bps are valid, and never more than the
    /// identified model supports, so call [`identify`](Self::identify) first.
    /// A terminal that accepts the change switches speed before answering, so
    /// a readable acknowledgment means the request was refused.
    pub fn set_speed(&mut self, bps: u32) -> Result<bool> {
        let Some(code) = speed_code(bps) else {
            return Ok(false);
        };
        if bps > self.capabilities.max_speed {
            warn!(
                "{} bps exceeds the {} bps supported by this Minitel",
                bps, self.capabilities.max_speed
            );
            return Ok(false);
        }

        let reply = self.call(Item::list([&PRO2[..], &[PROG, code]]), LONGUEUR_PRO2)?;
        if reply.len() == LONGUEUR_PRO2 {
            warn!("Minitel refused {} bps", bps);
            return Ok(false);
        }

        self.set_link_speed(bps)?;
        self.speed = bps;
        info!("Link speed set to {} bps", bps);
        Ok(true)
    }

    /// Identify the terminal model and current mode
    ///
    /// Fills [`capabilities`](Self::capabilities) from the ENQROM answer and
    /// queries the operating status to learn the mode. Returns `false` when
    /// the identification envelope is missing or malformed, in which case the
    /// basic capabilities are kept.
    pub fn identify(&mut self) -> Result<bool> {
        self.capabilities = Capabilities::basic();

        let reply = self.call(Item::list([&PRO1[..], &[ENQROM]]), LONGUEUR_ENQROM)?;
        let Some(caps) = parse_identification(reply.as_bytes()) else {
            warn!("Invalid identification reply: {:?}", reply);
            return Ok(false);
        };
        info!(
            "Identified {} by {} (version {:?})",
            caps.name, caps.manufacturer, caps.version
        );
        self.capabilities = caps;

        // A terminal in TeleInformatique ignores protocol commands
        let status = self.call(Item::list([&PRO1[..], &[STATUS_FONCTIONNEMENT]]), LONGUEUR_PRO2)?;
        self.mode = if status.len() != LONGUEUR_PRO2 {
            Mode::TeleInformatique
        } else if status.as_bytes()[3] & 1 == 1 {
            Mode::Mixed
        } else {
            Mode::Videotex
        };
        debug!("Current mode: {}", self.mode);

        Ok(true)
    }

    /// Set the keyboard behavior
    ///
    /// Sends the three toggles in order and stops at the first one the
    /// terminal does not acknowledge.
    pub fn configure_keyboard(&mut self, mode: KeyboardMode) -> Result<bool> {
        let toggle = |flag: KeyboardMode| if mode.contains(flag) { START } else { STOP };

        let calls = [
            (
                Item::list([&PRO3[..], &[toggle(KeyboardMode::EXTENDED), RCPT_CLAVIER, ETEN]]),
                LONGUEUR_PRO3,
            ),
            (
                Item::list([&PRO3[..], &[toggle(KeyboardMode::CURSOR_KEYS), RCPT_CLAVIER, C0]]),
                LONGUEUR_PRO3,
            ),
            (
                Item::list([&PRO2[..], &[toggle(KeyboardMode::LOWERCASE), MINUSCULES]]),
                LONGUEUR_PRO2,
            ),
        ];

        for (command, len) in calls {
            let reply = self.call(command, len)?;
            if reply.len() != len {
                warn!("Keyboard configuration refused: {:?}", reply);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Turn local echo of typed keys on the screen on or off
    pub fn echo(&mut self, enabled: bool) -> Result<bool> {
        let switch = if enabled { AIGUILLAGE_ON } else { AIGUILLAGE_OFF };
        let reply = self.call(
            Item::list([&PRO3[..], &[switch, RCPT_ECRAN, EMET_MODEM]]),
            LONGUEUR_PRO3,
        )?;
        Ok(reply.len() == LONGUEUR_PRO3)
    }
}

/// Decode `SOH manufacturer model version EOT`
fn parse_identification(reply: &[u8]) -> Option<Capabilities> {
    let &[SOH, maker, model, version, EOT] = reply else {
        return None;
    };

    let mut caps = Capabilities::for_model(model).unwrap_or_else(Capabilities::basic);
    if let Some(name) = manufacturer(maker) {
        caps.manufacturer = name.to_string();
    }
    caps.version = Some(version as char);

    // Known mislabelled manufacturer codes
    if maker == b'B' && model == b'v' {
        caps.manufacturer = "Philips".to_string();
    } else if maker == b'C' && TELIC_MATRA_VERSIONS.contains(&version) {
        caps.manufacturer = "Telic ou Matra".to_string();
    }

    Some(caps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mock::MockDevice;

    const STATUS_QUERY: [u8; 3] = [ESC, 0x39, STATUS_TERMINAL];
    const STATUS_REPLY: [u8; 4] = [ESC, 0x3a, REP_STATUS_TERMINAL, 0x40];
    const ENQ_ROM: [u8; 3] = [ESC, 0x39, ENQROM];
    const OPERATING: [u8; 3] = [ESC, 0x39, STATUS_FONCTIONNEMENT];

    fn engine(device: &MockDevice) -> Minitel {
        Minitel::with_transport(device.boxed()).unwrap()
    }

    #[test]
    fn test_set_mode_noop() {
        let device = MockDevice::new();
        let mut minitel = engine(&device);

        assert!(minitel.set_mode(Mode::Videotex).unwrap());
        assert!(device.written().is_empty());
    }

    #[test]
    fn test_videotex_to_mixed() {
        let device = MockDevice::new();
        device.on(&[ESC, 0x3a, 0x32, 0x7d], &[SEP, 0x70]);
        let mut minitel = engine(&device);

        assert!(minitel.set_mode(Mode::Mixed).unwrap());
        assert_eq!(minitel.mode(), Mode::Mixed);
    }

    #[test]
    fn test_wrong_ack_keeps_mode() {
        let device = MockDevice::new();
        device.on(&[ESC, 0x3a, 0x32, 0x7d], &[SEP, 0x71]);
        let mut minitel = engine(&device);

        assert!(!minitel.set_mode(Mode::Mixed).unwrap());
        assert_eq!(minitel.mode(), Mode::Videotex);
    }

    #[test]
    fn test_mixed_to_videotex() {
        let device = MockDevice::new();
        device.on(&[ESC, 0x3a, 0x32, 0x7e], &[SEP, 0x71]);
        let mut minitel = engine(&device);
        minitel.mode = Mode::Mixed;

        assert!(minitel.set_mode(Mode::Videotex).unwrap());
        assert_eq!(minitel.mode(), Mode::Videotex);
        assert_eq!(device.matched(), vec![vec![ESC, 0x3a, 0x32, 0x7e]]);
    }

    #[test]
    fn test_mixed_to_videotex_wrong_ack() {
        let device = MockDevice::new();
        // Acknowledgment of the opposite switch
        device.on(&[ESC, 0x3a, 0x32, 0x7e], &[SEP, 0x70]);
        let mut minitel = engine(&device);
        minitel.mode = Mode::Mixed;

        assert!(!minitel.set_mode(Mode::Videotex).unwrap());
        assert_eq!(minitel.mode(), Mode::Mixed);
    }

    #[test]
    fn test_videotex_to_teleinformatique() {
        let device = MockDevice::new();
        device.on(&[ESC, 0x3a, 0x31, 0x7d], &[ESC, 0x5b, 0x3f, 0x7a]);
        let mut minitel = engine(&device);

        assert!(minitel.set_mode(Mode::TeleInformatique).unwrap());
        assert_eq!(minitel.mode(), Mode::TeleInformatique);
        assert_eq!(minitel.charset(), crate::core::charset::CharacterSet::Ascii);
    }

    #[test]
    fn test_mixed_to_teleinformatique() {
        let device = MockDevice::new();
        device.on(&[ESC, 0x3a, 0x31, 0x7d], &[ESC, 0x5b, 0x3f, 0x7a]);
        let mut minitel = engine(&device);
        minitel.mode = Mode::Mixed;

        assert!(minitel.set_mode(Mode::TeleInformatique).unwrap());
        assert_eq!(minitel.mode(), Mode::TeleInformatique);
    }

    #[test]
    fn test_teleinformatique_to_mixed_two_hops() {
        let device = MockDevice::new();
        device.on(&[ESC, 0x5b, 0x3f, 0x7b], &[SEP, 0x5e]);
        device.on(&[ESC, 0x3a, 0x32, 0x7d], &[SEP, 0x70]);
        let mut minitel = engine(&device);
        minitel.mode = Mode::TeleInformatique;

        assert!(minitel.set_mode(Mode::Mixed).unwrap());
        assert_eq!(minitel.mode(), Mode::Mixed);
        assert_eq!(
            device.matched(),
            vec![vec![ESC, 0x5b, 0x3f, 0x7b], vec![ESC, 0x3a, 0x32, 0x7d]]
        );
    }

    #[test]
    fn test_teleinformatique_to_mixed_first_hop_fails() {
        let device = MockDevice::new();
        device.on(&[ESC, 0x5b, 0x3f, 0x7b], &[SEP, 0x00]);
        device.on(&[ESC, 0x3a, 0x32, 0x7d], &[SEP, 0x70]);
        let mut minitel = engine(&device);
        minitel.mode = Mode::TeleInformatique;

        assert!(!minitel.set_mode(Mode::Mixed).unwrap());
        assert_eq!(minitel.mode(), Mode::TeleInformatique);
        // The Mixed command was never sent
        assert_eq!(device.matched().len(), 1);
        assert!(!device
            .written()
            .windows(4)
            .any(|w| w == [ESC, 0x3a, 0x32, 0x7d]));
    }

    #[test]
    fn test_detect_speed_at_1200() {
        let device = MockDevice::new();
        device.on_at(1200, &STATUS_QUERY, &STATUS_REPLY);
        let mut minitel = engine(&device);

        assert_eq!(minitel.detect_speed().unwrap(), Some(1200));
        assert_eq!(minitel.speed(), 1200);
        assert_eq!(device.current_baud(), 1200);
        assert_eq!(device.baud_history(), vec![9600, 4800, 1200]);
    }

    #[test]
    fn test_detect_speed_fails() {
        let device = MockDevice::new();
        let mut minitel = engine(&device);

        assert_eq!(minitel.detect_speed().unwrap(), None);
        assert_eq!(device.baud_history(), vec![9600, 4800, 1200, 300, 1200]);
    }

    #[test]
    fn test_failed_detection_restores_link_speed() {
        let device = MockDevice::new();
        let mut minitel = engine(&device);
        minitel.capabilities = Capabilities::for_model(b'v').unwrap();
        assert!(minitel.set_speed(4800).unwrap());

        assert_eq!(minitel.detect_speed().unwrap(), None);
        assert_eq!(minitel.speed(), 4800);
        assert_eq!(device.current_baud(), 4800);
    }

    #[test]
    fn test_set_speed_requires_capability() {
        let device = MockDevice::new();
        let mut minitel = engine(&device);

        // Basic capabilities top out at 1200 bps
        assert!(!minitel.set_speed(4800).unwrap());
        assert!(!minitel.set_speed(2400).unwrap());
        assert!(device.written().is_empty());
    }

    #[test]
    fn test_set_speed_silence_means_accepted() {
        let device = MockDevice::new();
        let mut minitel = engine(&device);
        minitel.capabilities = Capabilities::for_model(b'v').unwrap();

        assert!(minitel.set_speed(4800).unwrap());
        assert_eq!(minitel.speed(), 4800);
        assert_eq!(device.current_baud(), 4800);
        assert_eq!(device.written(), vec![ESC, 0x3a, PROG, B4800]);
    }

    #[test]
    fn test_set_speed_ack_means_refused() {
        let device = MockDevice::new();
        device.on(&[ESC, 0x3a, PROG, B9600], &[ESC, 0x3a, REP_STATUS_VITESSE, 0x64]);
        let mut minitel = engine(&device);
        minitel.capabilities = Capabilities::for_model(b'v').unwrap();

        assert!(!minitel.set_speed(9600).unwrap());
        assert_eq!(minitel.speed(), 1200);
        assert!(device.baud_history().is_empty());
    }

    #[test]
    fn test_identify_minitel_2() {
        let device = MockDevice::new();
        device.on(&ENQ_ROM, &[SOH, b'B', b'v', b'4', EOT]);
        device.on(&OPERATING, &[ESC, 0x3a, REP_STATUS_FONCTIONNEMENT, 0x41]);
        let mut minitel = engine(&device);

        assert!(minitel.identify().unwrap());
        let caps = minitel.capabilities();
        assert_eq!(caps.name, "Minitel 2");
        assert_eq!(caps.manufacturer, "Philips");
        assert_eq!(caps.version, Some('4'));
        assert_eq!(minitel.mode(), Mode::Mixed);
    }

    #[test]
    fn test_identify_silent_status_means_teleinformatique() {
        let device = MockDevice::new();
        device.on(&ENQ_ROM, &[SOH, b'D', b'c', b'2', EOT]);
        let mut minitel = engine(&device);

        assert!(minitel.identify().unwrap());
        assert_eq!(minitel.capabilities().manufacturer, "Thomson");
        assert_eq!(minitel.mode(), Mode::TeleInformatique);
    }

    #[test]
    fn test_identify_bad_envelope() {
        let device = MockDevice::new();
        device.on(&ENQ_ROM, &[SOH, b'B', b'v', b'4', b'x']);
        let mut minitel = engine(&device);

        assert!(!minitel.identify().unwrap());
        assert_eq!(minitel.capabilities(), &Capabilities::basic());
    }

    #[test]
    fn test_manufacturer_corrections() {
        let caps = parse_identification(&[SOH, b'C', b'b', b';', EOT]).unwrap();
        assert_eq!(caps.manufacturer, "Telic ou Matra");

        let caps = parse_identification(&[SOH, b'C', b'b', b'1', EOT]).unwrap();
        assert_eq!(caps.manufacturer, "Telic-Alcatel");

        // Unknown model keeps the basic record but the manufacturer
        let caps = parse_identification(&[SOH, b'A', b'?', b'1', EOT]).unwrap();
        assert_eq!(caps.name, "Minitel inconnu");
        assert_eq!(caps.manufacturer, "Matra");
    }

    #[test]
    fn test_configure_keyboard_stops_on_failure() {
        let device = MockDevice::new();
        device.on(&[ESC, 0x3b, START, RCPT_CLAVIER, ETEN], &[ESC, 0x3b, 0x63, 0x59, 0x41]);
        let mut minitel = engine(&device);

        assert!(!minitel.configure_keyboard(KeyboardMode::EXTENDED).unwrap());
        // Second toggle was sent and went unanswered, third never sent
        assert!(!device
            .written()
            .windows(2)
            .any(|w| w == [STOP, MINUSCULES]));
    }

    #[test]
    fn test_configure_keyboard_all_acknowledged() {
        let device = MockDevice::new();
        device.on(&[ESC, 0x3b, START, RCPT_CLAVIER, ETEN], &[0; 5]);
        device.on(&[ESC, 0x3b, START, RCPT_CLAVIER, C0], &[0; 5]);
        device.on(&[ESC, 0x3a, START, MINUSCULES], &[0; 4]);
        let mut minitel = engine(&device);

        assert!(minitel.configure_keyboard(KeyboardMode::all()).unwrap());
        assert_eq!(device.matched().len(), 3);
    }

    #[test]
    fn test_echo() {
        let device = MockDevice::new();
        device.on(&[ESC, 0x3b, AIGUILLAGE_OFF, RCPT_ECRAN, EMET_MODEM], &[0; 5]);
        let mut minitel = engine(&device);

        assert!(minitel.echo(false).unwrap());
        assert!(!minitel.echo(true).unwrap());
    }
}
