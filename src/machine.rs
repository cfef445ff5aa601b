//! The orchestrator: owns the CPU, memory bus, and PPU, and drives them in the fixed
//! tick order from §5 (joypad poll -> CPU step -> PPU step -> Timer step -> IF merge).

use crate::cartridge::Cartridge;
use crate::cpu::Cpu;
use crate::error::CoreError;
use crate::joypad::{ButtonState, Joypad};
use crate::memory_bus::MemoryBus;
use crate::ppu::{Ppu, GB_HEIGHT, GB_WIDTH};

/// Machine clock rate, in Hz (4.19 MHz, the DMG's nominal clock speed).
pub const CPU_HZ: u64 = 4_194_304;

/// T-cycles in one full PPU frame: 456 dots/scanline * 154 scanlines/frame.
/// See SPEC_FULL.md §9 for why this supersedes the reference's approximate 69905.
pub const CYCLES_PER_FRAME: u32 = 456 * 154;

/// Owns a complete, runnable Game Boy core: CPU + bus (cartridge, timer, joypad) + PPU.
pub struct Machine {
    cpu: Cpu,
    bus: MemoryBus,
    ppu: Ppu,
    cycles_this_frame: u32,
}

impl Machine {
    /// `boot_rom` is the optional 256-byte DMG boot firmware image; when present the CPU
    /// starts at PC=0 with IME set and the overlay enabled, per §9's "Boot firmware" note.
    /// When absent, the CPU starts at the well-known post-boot register state.
    pub fn new(
        rom: Vec<u8>,
        boot_rom: Option<Vec<u8>>,
        poll_fn: Box<dyn FnMut() -> ButtonState>,
    ) -> Result<Self, CoreError> {
        let boot_rom_enabled = boot_rom.is_some();
        let boot_rom_image = match boot_rom {
            Some(image) => {
                let len = image.len();
                let array: [u8; 256] = image
                    .try_into()
                    .map_err(|_| CoreError::BadBootRomSize { len })?;
                Some(array)
            }
            None => None,
        };

        let cartridge = Cartridge::from_bytes(rom)?;
        let mut bus = MemoryBus::new(cartridge, boot_rom_image);
        bus.set_joypad(Joypad::new(poll_fn));

        Ok(Machine {
            cpu: Cpu::new(!boot_rom_enabled),
            bus,
            ppu: Ppu::new(),
            cycles_this_frame: 0,
        })
    }

    pub fn cartridge(&self) -> &Cartridge {
        self.bus.cartridge()
    }

    pub fn cartridge_mut(&mut self) -> &mut Cartridge {
        self.bus.cartridge_mut()
    }

    /// The rendered screen as a row-major, one-byte-per-pixel buffer (§6 output (a)).
    pub fn frame_buffer(&self) -> &[u8; GB_WIDTH * GB_HEIGHT] {
        self.ppu.get_frame_buffer()
    }

    /// Runs one fixed-order tick: poll the joypad, step the CPU one instruction
    /// (or one HALT/STOP tick), then step the PPU and timer by the same number of
    /// cycles, merging any interrupts either component raised into IF (§5).
    ///
    /// Returns the number of T-cycles the CPU instruction consumed.
    pub fn step(&mut self) -> Result<u16, String> {
        self.bus.poll_joypad();

        let cycles = self.cpu.step(&mut self.bus)?;

        self.ppu.step(cycles as u32, &mut self.bus);
        self.bus.step_timer(cycles as u8);

        self.cycles_this_frame = self.cycles_this_frame.wrapping_add(cycles as u32);
        Ok(cycles)
    }

    /// Steps the machine until at least one full frame's worth of cycles (§9) has
    /// elapsed, then resets the frame counter. Stops early (propagating the error) if
    /// a step fails.
    pub fn run_frame(&mut self) -> Result<(), String> {
        self.cycles_this_frame = 0;
        while self.cycles_this_frame < CYCLES_PER_FRAME {
            self.step()?;
        }
        Ok(())
    }

    /// A snapshot of CPU state and the next instruction about to execute, for a
    /// caller building a debugger or trace log (§6 output (b)).
    pub fn debug_snapshot(&self) -> DebugSnapshot {
        let (mnemonic, length) = self.cpu.disassemble_instruction(self.cpu.pc, &self.bus);
        DebugSnapshot {
            pc: self.cpu.pc,
            sp: self.cpu.sp,
            a: self.cpu.a,
            f: self.cpu.f,
            bc: u16::from_be_bytes([self.cpu.b, self.cpu.c]),
            de: u16::from_be_bytes([self.cpu.d, self.cpu.e]),
            hl: u16::from_be_bytes([self.cpu.h, self.cpu.l]),
            ime: self.cpu.ime,
            halted: self.cpu.halted,
            next_instruction: mnemonic,
            next_instruction_length: length,
        }
    }
}

/// Point-in-time CPU state plus the disassembly of the instruction at PC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSnapshot {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub f: u8,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,
    pub ime: bool,
    pub halted: bool,
    pub next_instruction: String,
    pub next_instruction_length: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_rom() -> Vec<u8> {
        let mut rom = vec![0u8; 32 * 1024];
        rom[0x0147] = 0x00;
        rom
    }

    fn no_input() -> Box<dyn FnMut() -> ButtonState> {
        Box::new(|| ButtonState::default())
    }

    #[test]
    fn boots_post_boot_state_with_ime_disabled() {
        let machine = Machine::new(blank_rom(), None, no_input()).unwrap();
        let snap = machine.debug_snapshot();
        assert_eq!(snap.pc, 0x0100);
        assert!(!snap.ime);
    }

    #[test]
    fn boot_rom_overlay_starts_at_zero_with_ime_enabled() {
        let boot = vec![0u8; 256];
        let machine = Machine::new(blank_rom(), Some(boot), no_input()).unwrap();
        let snap = machine.debug_snapshot();
        assert_eq!(snap.pc, 0x0000);
        assert!(snap.ime);
    }

    #[test]
    fn rejects_wrong_sized_boot_rom() {
        let boot = vec![0u8; 100];
        assert!(matches!(
            Machine::new(blank_rom(), Some(boot), no_input()),
            Err(CoreError::BadBootRomSize { len: 100 })
        ));
    }

    #[test]
    fn run_frame_advances_at_least_one_frame_of_cycles() {
        let mut machine = Machine::new(blank_rom(), None, no_input()).unwrap();
        machine.run_frame().unwrap();
        assert!(machine.cycles_this_frame >= CYCLES_PER_FRAME);
    }
}
