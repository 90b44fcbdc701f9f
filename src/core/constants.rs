//! Minitel wire protocol constants
//!
//! Control codes (C0 set) and the protocol command codes exchanged with the
//! terminal. Values follow the Teletel STUM 1B documents.

// C0 control codes
pub const NUL: u8 = 0x00;
pub const SOH: u8 = 0x01;
pub const EOT: u8 = 0x04;
pub const ENQ: u8 = 0x05;
pub const BEL: u8 = 0x07;
pub const BS: u8 = 0x08;
pub const TAB: u8 = 0x09;
pub const LF: u8 = 0x0a;
pub const VT: u8 = 0x0b;
pub const FF: u8 = 0x0c;
pub const CR: u8 = 0x0d;
pub const SO: u8 = 0x0e;
pub const SI: u8 = 0x0f;
pub const DLE: u8 = 0x10;
pub const CON: u8 = 0x11;
pub const REP: u8 = 0x12;
pub const SEP: u8 = 0x13;
pub const COF: u8 = 0x14;
pub const NAK: u8 = 0x15;
pub const SYN: u8 = 0x16;
pub const CAN: u8 = 0x18;
pub const SS2: u8 = 0x19;
pub const SUB: u8 = 0x1a;
pub const ESC: u8 = 0x1b;
pub const SS3: u8 = 0x1d;
pub const RS: u8 = 0x1e;
pub const US: u8 = 0x1f;

/// Software flow control aliases (share codes with CON / SEP)
pub const XON: u8 = CON;
pub const XOFF: u8 = SEP;

// Introducers
pub const PRO1: [u8; 2] = [ESC, 0x39];
pub const PRO2: [u8; 2] = [ESC, 0x3a];
pub const PRO3: [u8; 2] = [ESC, 0x3b];
pub const CSI: [u8; 2] = [ESC, 0x5b];

// Protocol requests
pub const ENQROM: u8 = 0x7b;
pub const STATUS_TERMINAL: u8 = 0x70;
pub const REP_STATUS_TERMINAL: u8 = 0x71;
pub const STATUS_FONCTIONNEMENT: u8 = 0x72;
pub const REP_STATUS_FONCTIONNEMENT: u8 = 0x73;
pub const STATUS_VITESSE: u8 = 0x74;
pub const REP_STATUS_VITESSE: u8 = 0x75;
pub const STATUS_PROTOCOLE: u8 = 0x76;
pub const REP_STATUS_PROTOCOLE: u8 = 0x77;

// Programming and toggles
pub const PROG: u8 = 0x6b;
pub const START: u8 = 0x69;
pub const STOP: u8 = 0x6a;

// Mode switching (follow PRO2)
pub const MIXTE1: [u8; 2] = [0x32, 0x7d];
pub const MIXTE2: [u8; 2] = [0x32, 0x7e];
pub const TELINFO: [u8; 2] = [0x31, 0x7d];

// Keyboard functions
pub const ETEN: u8 = 0x41;
pub const C0: u8 = 0x43;
pub const MINUSCULES: u8 = 0x45;

// Routing (aiguillage) modules
pub const RCPT_ECRAN: u8 = 0x58;
pub const RCPT_CLAVIER: u8 = 0x59;
pub const RCPT_MODEM: u8 = 0x5a;
pub const RCPT_PRISE: u8 = 0x5b;
pub const EMET_ECRAN: u8 = 0x50;
pub const EMET_CLAVIER: u8 = 0x51;
pub const EMET_MODEM: u8 = 0x52;
pub const EMET_PRISE: u8 = 0x53;
pub const AIGUILLAGE_OFF: u8 = 0x60;
pub const AIGUILLAGE_ON: u8 = 0x61;

// Speed programming codes (follow PRO2 PROG)
pub const B300: u8 = 0x52;
pub const B1200: u8 = 0x64;
pub const B4800: u8 = 0x76;
pub const B9600: u8 = 0x7f;

/// Reply length of a PRO2 acknowledgment
pub const LONGUEUR_PRO2: usize = 4;
/// Reply length of a PRO3 acknowledgment
pub const LONGUEUR_PRO3: usize = 5;
/// Reply length of the ENQROM identification envelope
pub const LONGUEUR_ENQROM: usize = 5;

/// CSI parameter bytes that announce one extra byte in an inbound frame
pub const CSI_EXTENDED: [u8; 2] = [0x32, 0x34];
