//! The joypad register (0xFF00) and the button-state callback that feeds it.
//!
//! Real hardware reads button state off physical switches; here that role is
//! played by an injected polling callback so the core never depends on a
//! windowing toolkit's event types.

/// Pressed/released state of the eight Game Boy buttons. `true` = pressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonState {
    pub right: bool,
    pub left: bool,
    pub up: bool,
    pub down: bool,
    pub a: bool,
    pub b: bool,
    pub select: bool,
    pub start: bool,
}

/// Manages the P1 register and the button-state callback it's read from.
pub struct Joypad {
    poll_fn: Box<dyn FnMut() -> ButtonState>,
    state: ButtonState,
    // Only bits 4 and 5 of P1 are writable by the program.
    selection: u8,
}

impl Joypad {
    /// `poll_fn` is invoked once per [`Joypad::poll`] call (the orchestrator calls this
    /// once per tick) to obtain the current pressed/released state of all 8 buttons.
    pub fn new(poll_fn: Box<dyn FnMut() -> ButtonState>) -> Self {
        Joypad {
            poll_fn,
            state: ButtonState::default(),
            selection: 0x30,
        }
    }

    /// A joypad with no input source; every button always reads released.
    pub fn disconnected() -> Self {
        Joypad::new(Box::new(|| ButtonState::default()))
    }

    /// Samples the input callback and latches the result. Returns `true` if a
    /// currently-selected button transitioned from released to pressed (the
    /// condition under which real hardware raises the Joypad interrupt).
    pub fn poll(&mut self) -> bool {
        let new_state = (self.poll_fn)();
        let pressed_edge = |was: bool, now: bool, selected: bool| selected && now && !was;

        let dirs_selected = self.selection & 0x10 == 0;
        let actions_selected = self.selection & 0x20 == 0;

        let rising = pressed_edge(self.state.right, new_state.right, dirs_selected)
            || pressed_edge(self.state.left, new_state.left, dirs_selected)
            || pressed_edge(self.state.up, new_state.up, dirs_selected)
            || pressed_edge(self.state.down, new_state.down, dirs_selected)
            || pressed_edge(self.state.a, new_state.a, actions_selected)
            || pressed_edge(self.state.b, new_state.b, actions_selected)
            || pressed_edge(self.state.select, new_state.select, actions_selected)
            || pressed_edge(self.state.start, new_state.start, actions_selected);

        self.state = new_state;
        rising
    }

    /// Reads the P1 (joypad) register based on the latched state and selection.
    pub fn read_p1(&self) -> u8 {
        let mut nibble = 0x0F;

        if self.selection & 0x20 == 0 {
            // Action buttons selected.
            if self.state.a {
                nibble &= 0b1110;
            }
            if self.state.b {
                nibble &= 0b1101;
            }
            if self.state.select {
                nibble &= 0b1011;
            }
            if self.state.start {
                nibble &= 0b0111;
            }
        }
        if self.selection & 0x10 == 0 {
            // D-pad selected.
            if self.state.right {
                nibble &= 0b1110;
            }
            if self.state.left {
                nibble &= 0b1101;
            }
            if self.state.up {
                nibble &= 0b1011;
            }
            if self.state.down {
                nibble &= 0b0111;
            }
        }

        nibble | self.selection | 0xC0
    }

    /// Writes to P1; only bits 4 and 5 are writable.
    pub fn write_p1(&mut self, value: u8) {
        self.selection = value & 0x30;
    }
}

impl std::fmt::Debug for Joypad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Joypad")
            .field("state", &self.state)
            .field("selection", &format_args!("{:#04X}", self.selection))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_reads_all_ones_in_selected_nibble() {
        let mut jp = Joypad::disconnected();
        jp.write_p1(0x00); // select both groups
        jp.poll();
        assert_eq!(jp.read_p1() & 0x0F, 0x0F);
    }

    #[test]
    fn pressed_button_clears_its_bit_when_group_selected() {
        let state = std::cell::Cell::new(ButtonState {
            a: true,
            ..Default::default()
        });
        let mut jp = Joypad::new(Box::new(move || state.get()));
        jp.write_p1(0x10); // select action buttons (bit 5 low)
        jp.poll();
        assert_eq!(jp.read_p1() & 0b0001, 0);
    }

    #[test]
    fn press_edge_while_selected_requests_interrupt() {
        let pressed = std::rc::Rc::new(std::cell::Cell::new(false));
        let pressed_clone = pressed.clone();
        let mut jp = Joypad::new(Box::new(move || ButtonState {
            start: pressed_clone.get(),
            ..Default::default()
        }));
        jp.write_p1(0x20); // select action buttons
        assert!(!jp.poll());
        pressed.set(true);
        assert!(jp.poll());
        assert!(!jp.poll()); // already pressed, no new edge
    }

    #[test]
    fn press_edge_while_unselected_group_does_not_interrupt() {
        let mut jp = Joypad::new(Box::new(|| ButtonState {
            a: true,
            ..Default::default()
        }));
        jp.write_p1(0x30); // neither group selected
        assert!(!jp.poll());
    }
}
