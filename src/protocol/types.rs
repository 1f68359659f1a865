//! Core X11 protocol types
//!
//! These types represent the fundamental data types seen during connection
//! setup. They are kept minimal and close to the wire protocol.

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use std::fmt;

/// X11 resource ID - used for windows, pixmaps, graphics contexts, etc.
/// In X11, all objects are identified by 29-bit IDs.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XID(pub u32);

impl XID {
    pub const NONE: XID = XID(0);

    pub fn new(id: u32) -> Self {
        XID(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for XID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Window ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window(pub XID);

impl Window {
    pub const NONE: Window = Window(XID::NONE);

    pub fn new(id: u32) -> Self {
        Window(XID::new(id))
    }

    pub fn id(&self) -> XID {
        self.0
    }
}

/// Visual ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualID(pub u32);

impl VisualID {
    pub fn new(id: u32) -> Self {
        VisualID(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for VisualID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Byte order
///
/// The client announces one of these in the first byte of the setup
/// request, and the server uses it for every multi-byte field it sends back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    LSBFirst = 0,
    MSBFirst = 1,
}

impl ByteOrder {
    /// Marker byte sent in the setup request ('l' or 'B')
    pub fn marker(self) -> u8 {
        match self {
            ByteOrder::LSBFirst => b'l',
            ByteOrder::MSBFirst => b'B',
        }
    }

    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            b'l' => Some(ByteOrder::LSBFirst),
            b'B' => Some(ByteOrder::MSBFirst),
            _ => None,
        }
    }

    // Callers guarantee the slice lengths; see `setup::field_u16`/`field_u32`
    // for the checked variants used on server data.
    pub(crate) fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LSBFirst => LittleEndian::read_u16(bytes),
            ByteOrder::MSBFirst => BigEndian::read_u16(bytes),
        }
    }

    pub(crate) fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LSBFirst => LittleEndian::read_u32(bytes),
            ByteOrder::MSBFirst => BigEndian::read_u32(bytes),
        }
    }

    pub(crate) fn write_u16(self, bytes: &mut [u8], value: u16) {
        match self {
            ByteOrder::LSBFirst => LittleEndian::write_u16(bytes, value),
            ByteOrder::MSBFirst => BigEndian::write_u16(bytes, value),
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::LSBFirst => write!(f, "LSBFirst"),
            ByteOrder::MSBFirst => write!(f, "MSBFirst"),
        }
    }
}
