//! Keycode to keysym translation.
//!
//! A small subset of the core-protocol lookup rules: group 1 only, with
//! Shift, Lock and NumLock choosing between the first two columns.

use scrlock_core::key::keysym;

/// NoSymbol.
const NO_SYMBOL: u32 = 0;

const SHIFT_MASK: u16 = 1 << 0;
const LOCK_MASK: u16 = 1 << 1;
/// Control modifier bit in a key event state.
pub const CONTROL_MASK: u16 = 1 << 2;

/// Keyboard mapping snapshot from the server.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    min_keycode: u8,
    per_keycode: usize,
    keysyms: Vec<u32>,
    num_lock_mask: u16,
}

impl Keymap {
    /// Build from a `GetKeyboardMapping` reply and the modifier mask that
    /// carries NumLock (0 if none).
    pub fn new(min_keycode: u8, per_keycode: u8, keysyms: Vec<u32>, num_lock_mask: u16) -> Self {
        Self { min_keycode, per_keycode: usize::from(per_keycode), keysyms, num_lock_mask }
    }

    /// Keysyms bound to `keycode`, all columns.
    fn row(&self, keycode: u8) -> &[u32] {
        if self.per_keycode == 0 || keycode < self.min_keycode {
            return &[];
        }
        let start = usize::from(keycode - self.min_keycode) * self.per_keycode;
        self.keysyms.get(start..start + self.per_keycode).unwrap_or(&[])
    }

    /// Modifier bit whose keycodes include one bound to NumLock.
    ///
    /// `modifiers` is the flattened modifier map: eight groups of
    /// `keycodes.len() / 8` keycodes each.
    pub fn num_lock_mask(&self, modifiers: &[u8]) -> u16 {
        let per_modifier = modifiers.len() / 8;
        if per_modifier == 0 {
            return 0;
        }
        modifiers
            .chunks(per_modifier)
            .enumerate()
            .find(|(_, codes)| {
                codes.iter().any(|&code| code != 0 && self.row(code).contains(&keysym::NUM_LOCK))
            })
            .map_or(0, |(index, _)| 1 << index)
    }

    /// Replace the NumLock modifier bit.
    pub fn set_num_lock_mask(&mut self, mask: u16) {
        self.num_lock_mask = mask;
    }

    /// Keysym for `keycode` under modifier `state`.
    pub fn lookup(&self, keycode: u8, state: u16) -> u32 {
        let row = self.row(keycode);
        let first = row.first().copied().unwrap_or(NO_SYMBOL);
        let second = match row.get(1).copied().unwrap_or(NO_SYMBOL) {
            NO_SYMBOL => upper(first),
            sym => sym,
        };
        let shift = state & SHIFT_MASK != 0;

        if state & self.num_lock_mask != 0 && self.num_lock_mask != 0 && is_keypad(second) {
            return if shift { first } else { second };
        }
        match (shift, state & LOCK_MASK != 0) {
            (false, false) => first,
            (false, true) => upper(first),
            (true, _) => second,
        }
    }
}

fn is_keypad(sym: u32) -> bool {
    (keysym::KP_SPACE..=keysym::KP_EQUAL).contains(&sym)
}

/// Uppercase a Latin-1 letter keysym; others unchanged.
fn upper(sym: u32) -> u32 {
    match sym {
        0x61..=0x7a => sym - 0x20,
        0xe0..=0xfe if sym != 0xf7 => sym - 0x20,
        _ => sym,
    }
}
