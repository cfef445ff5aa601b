//! A Game Boy (DMG) core: CPU interpreter, PPU scanline renderer, memory bus,
//! cartridge/MBC handling, timer, and joypad, assembled into a single steppable
//! [`Machine`].
//!
//! This crate has no notion of a window, an audio device, or wall-clock time; those
//! are the embedding application's job. See [`Machine`] for the entry point.

pub mod cartridge;
pub mod cpu;
pub mod error;
pub mod instruction;
pub mod joypad;
pub mod machine;
pub mod memory_bus;
pub mod memory_map;
pub mod ppu;
pub mod rtc;
pub mod timer;

pub use cartridge::Cartridge;
pub use error::CoreError;
pub use joypad::ButtonState;
pub use machine::{DebugSnapshot, Machine, CPU_HZ, CYCLES_PER_FRAME};
