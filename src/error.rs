//! Fatal, load-time error conditions. Step-time opcode failures keep using
//! `cpu::CpuResult<T>` (a plain `String`), unchanged from how the CPU already reported them.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// ROM too small to contain a header, or too small to fill bank 0.
    RomTooSmall { len: usize, required: usize },
    /// MBC0 cartridge whose length isn't exactly 32 KiB.
    BadMbc0Size { len: usize },
    /// MBC3 cartridge whose length isn't a multiple of 16 KiB.
    BadMbc3Size { len: usize },
    /// Cartridge-type byte (0x0147) this crate doesn't recognise at all.
    UnknownCartridgeType { code: u8 },
    /// ROM/RAM size byte (0x0148/0x0149) outside the documented table.
    UnknownSizeCode { code: u8 },
    /// Boot firmware image of the wrong length (must be exactly 256 bytes).
    BadBootRomSize { len: usize },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::RomTooSmall { len, required } => write!(
                f,
                "ROM image is only {len} bytes, need at least {required} to read the header and bank 0"
            ),
            CoreError::BadMbc0Size { len } => {
                write!(f, "MBC0 cartridge must be exactly 32768 bytes, got {len}")
            }
            CoreError::BadMbc3Size { len } => write!(
                f,
                "MBC3 cartridge length must be a multiple of 16384 bytes, got {len}"
            ),
            CoreError::UnknownCartridgeType { code } => {
                write!(f, "unrecognised cartridge type byte {code:#04X}")
            }
            CoreError::UnknownSizeCode { code } => {
                write!(f, "unrecognised ROM/RAM size code {code:#04X}")
            }
            CoreError::BadBootRomSize { len } => {
                write!(f, "boot ROM image must be exactly 256 bytes, got {len}")
            }
        }
    }
}

impl std::error::Error for CoreError {}
