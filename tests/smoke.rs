//! End-to-end smoke tests exercising the crate from outside, the way an embedding
//! application would: load a cartridge, drive the machine, read back its outputs.

use pocketcore::{ButtonState, Cartridge, Machine, CPU_HZ, CYCLES_PER_FRAME};

fn minimal_rom() -> Vec<u8> {
    let mut rom = vec![0x00u8; 32 * 1024];
    rom[0x100] = 0x00; // NOP
    rom[0x101] = 0xC3; // JP 0x0150
    rom[0x102] = 0x50;
    rom[0x103] = 0x01;
    rom[0x147] = 0x00; // MBC0
    rom[0x148] = 0x00; // 32 KiB ROM
    rom[0x149] = 0x00; // no RAM
    rom
}

fn no_input() -> Box<dyn FnMut() -> ButtonState> {
    Box::new(|| ButtonState::default())
}

#[test]
fn cartridge_parses_from_the_public_api() {
    let cart = Cartridge::from_bytes(minimal_rom()).unwrap();
    assert!(!cart.has_battery());
}

#[test]
fn clock_and_frame_constants_match_the_reference_timing() {
    assert_eq!(CPU_HZ, 4_194_304);
    assert_eq!(CYCLES_PER_FRAME, 70224);
}

#[test]
fn machine_steps_one_instruction_and_advances_pc() {
    let mut machine = Machine::new(minimal_rom(), None, no_input()).unwrap();
    let cycles = machine.step().unwrap();
    assert_eq!(cycles, 4); // NOP
    assert_eq!(machine.debug_snapshot().pc, 0x0101);
}

#[test]
fn machine_runs_whole_frames_and_produces_a_full_screen_buffer() {
    let mut machine = Machine::new(minimal_rom(), None, no_input()).unwrap();
    for _ in 0..2 {
        machine.run_frame().unwrap();
    }
    assert_eq!(machine.frame_buffer().len(), 160 * 144);
}

#[test]
fn joypad_input_is_sampled_through_the_injected_callback() {
    let mut pressed = false;
    let poll: Box<dyn FnMut() -> ButtonState> = Box::new(move || {
        let state = ButtonState {
            a: pressed,
            ..Default::default()
        };
        pressed = true;
        state
    });
    let mut machine = Machine::new(minimal_rom(), None, poll).unwrap();
    machine.step().unwrap();
    machine.step().unwrap();
    machine.step().unwrap();
    // No direct IF accessor is exposed; this mainly proves the callback gets
    // invoked every tick without panicking across several steps.
    assert!(machine.debug_snapshot().pc >= 0x0100);
}
