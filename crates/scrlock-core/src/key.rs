//! Key press normalization.
//!
//! The windowing layer reports a raw [`KeyPress`] (keysym, the Latin-1 text it
//! produces, and whether Control was held). [`Key::from_press`] folds keypad
//! keys onto their main-keyboard counterparts and drops every key that must
//! never reach the buffers (modifiers, function keys, navigation).

/// Keysym values used by normalization (X11 keysym space).
pub mod keysym {
    /// Space
    pub const SPACE: u32 = 0x0020;
    /// BackSpace
    pub const BACKSPACE: u32 = 0xff08;
    /// Return
    pub const RETURN: u32 = 0xff0d;
    /// Escape
    pub const ESCAPE: u32 = 0xff1b;
    /// KP_Space
    pub const KP_SPACE: u32 = 0xff80;
    /// KP_Enter
    pub const KP_ENTER: u32 = 0xff8d;
    /// KP_Multiply
    pub const KP_MULTIPLY: u32 = 0xffaa;
    /// KP_Divide
    pub const KP_DIVIDE: u32 = 0xffaf;
    /// KP_0
    pub const KP_0: u32 = 0xffb0;
    /// KP_9
    pub const KP_9: u32 = 0xffb9;
    /// KP_Equal
    pub const KP_EQUAL: u32 = 0xffbd;
    /// F1, start of the function key block
    pub const F1: u32 = 0xffbe;
    /// F35, end of the function key block
    pub const F35: u32 = 0xffe0;
    /// Shift_L, start of the modifier block
    pub const SHIFT_L: u32 = 0xffe1;
    /// Hyper_R, end of the modifier block
    pub const HYPER_R: u32 = 0xffee;
    /// ISO_Lock, start of the ISO modifier block
    pub const ISO_LOCK: u32 = 0xfe01;
    /// ISO_Level5_Lock, end of the ISO modifier block
    pub const ISO_LEVEL5_LOCK: u32 = 0xfe13;
    /// Mode_switch
    pub const MODE_SWITCH: u32 = 0xff7e;
    /// Num_Lock
    pub const NUM_LOCK: u32 = 0xff7f;
    /// KP_F1
    pub const KP_F1: u32 = 0xff91;
    /// KP_F4
    pub const KP_F4: u32 = 0xff94;
}

/// Raw key press as reported by the windowing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    /// Resolved keysym
    pub keysym: u32,
    /// Latin-1 text the key produces, empty for non-printing keys
    pub text: Vec<u8>,
    /// Control modifier held
    pub ctrl: bool,
}

impl KeyPress {
    /// Key press with the text a plain keysym produces on its own.
    ///
    /// Latin-1 keysyms map onto their own byte value; keypad keys produce
    /// nothing here, [`Key::from_press`] folds them.
    pub fn plain(keysym: u32) -> Self {
        let text = match keysym {
            0x20..=0x7e | 0xa0..=0xff => vec![keysym as u8],
            _ => Vec::new(),
        };
        Self { keysym, text, ctrl: false }
    }

    /// Same key with Control held.
    #[must_use]
    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }
}

/// Normalized key understood by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// Printable text to append
    Printable(Vec<u8>),
    /// Remove the last character
    Backspace,
    /// Clear the active buffer
    Cancel,
    /// Submit the active buffer
    Submit,
    /// Switch between password and message mode
    ToggleMode,
}

impl Key {
    /// Normalize a raw key press. Returns `None` for keys the session ignores.
    pub fn from_press(press: &KeyPress) -> Option<Self> {
        use keysym::{
            BACKSPACE, ESCAPE, F1, F35, HYPER_R, ISO_LEVEL5_LOCK, ISO_LOCK, KP_0, KP_9, KP_ENTER,
            KP_F1, KP_F4, MODE_SWITCH, NUM_LOCK, RETURN, SHIFT_L, SPACE,
        };

        let sym = press.keysym;
        match sym {
            SHIFT_L..=HYPER_R
            | ISO_LOCK..=ISO_LEVEL5_LOCK
            | MODE_SWITCH
            | NUM_LOCK
            | F1..=F35
            | KP_F1..=KP_F4 => return None,
            _ => {},
        }

        if press.ctrl {
            return (sym == SPACE).then_some(Self::ToggleMode);
        }

        match sym {
            RETURN | KP_ENTER => Some(Self::Submit),
            ESCAPE => Some(Self::Cancel),
            BACKSPACE => Some(Self::Backspace),
            KP_0..=KP_9 => Some(Self::Printable(vec![b'0' + (sym - KP_0) as u8])),
            _ => {
                if let Some(byte) = keypad_char(sym) {
                    return Some(Self::Printable(vec![byte]));
                }
                if press.text.is_empty() {
                    None
                } else {
                    Some(Self::Printable(press.text.clone()))
                }
            },
        }
    }
}

/// Main-keyboard character for a keypad symbol other than digits.
fn keypad_char(sym: u32) -> Option<u8> {
    use keysym::{KP_DIVIDE, KP_EQUAL, KP_MULTIPLY, KP_SPACE};

    match sym {
        KP_SPACE => Some(b' '),
        KP_EQUAL => Some(b'='),
        // KP_Multiply, KP_Add, KP_Separator, KP_Subtract, KP_Decimal, KP_Divide
        // sit in keysym order matching ASCII '*' '+' ',' '-' '.' '/'.
        KP_MULTIPLY..=KP_DIVIDE => Some(b'*' + (sym - KP_MULTIPLY) as u8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        keysym::{
            BACKSPACE, ESCAPE, F1, F35, HYPER_R, KP_0, KP_DIVIDE, KP_ENTER, MODE_SWITCH, NUM_LOCK,
            RETURN, SHIFT_L, SPACE,
        },
        *,
    };

    #[test]
    fn enter_variants_submit() {
        assert_eq!(Key::from_press(&KeyPress::plain(RETURN)), Some(Key::Submit));
        assert_eq!(Key::from_press(&KeyPress::plain(KP_ENTER)), Some(Key::Submit));
    }

    #[test]
    fn keypad_digits_become_digits() {
        for (offset, digit) in (b'0'..=b'9').enumerate() {
            let press = KeyPress::plain(KP_0 + offset as u32);
            assert_eq!(Key::from_press(&press), Some(Key::Printable(vec![digit])));
        }
    }

    #[test]
    fn keypad_operators_become_ascii() {
        assert_eq!(Key::from_press(&KeyPress::plain(0xffab)), Some(Key::Printable(vec![b'+'])));
        assert_eq!(Key::from_press(&KeyPress::plain(0xffad)), Some(Key::Printable(vec![b'-'])));
        assert_eq!(Key::from_press(&KeyPress::plain(0xffae)), Some(Key::Printable(vec![b'.'])));
        assert_eq!(Key::from_press(&KeyPress::plain(KP_DIVIDE)), Some(Key::Printable(vec![b'/'])));
    }

    #[test]
    fn modifiers_and_function_keys_are_ignored() {
        for sym in [SHIFT_L, 0xffe3, HYPER_R, NUM_LOCK, MODE_SWITCH, F1, 0xffc9, F35, 0xfe03] {
            assert_eq!(Key::from_press(&KeyPress::plain(sym)), None, "keysym {sym:#x}");
        }
    }

    #[test]
    fn navigation_keys_without_text_are_ignored() {
        // Left arrow, Home
        assert_eq!(Key::from_press(&KeyPress::plain(0xff51)), None);
        assert_eq!(Key::from_press(&KeyPress::plain(0xff50)), None);
    }

    #[test]
    fn ctrl_space_toggles_and_other_ctrl_keys_are_ignored() {
        assert_eq!(Key::from_press(&KeyPress::plain(SPACE).with_ctrl()), Some(Key::ToggleMode));
        assert_eq!(Key::from_press(&KeyPress::plain(u32::from(b'a')).with_ctrl()), None);
        assert_eq!(Key::from_press(&KeyPress::plain(RETURN).with_ctrl()), None);
    }

    #[test]
    fn editing_keys() {
        assert_eq!(Key::from_press(&KeyPress::plain(BACKSPACE)), Some(Key::Backspace));
        assert_eq!(Key::from_press(&KeyPress::plain(ESCAPE)), Some(Key::Cancel));
    }

    #[test]
    fn printable_latin1() {
        assert_eq!(Key::from_press(&KeyPress::plain(0xe9)), Some(Key::Printable(vec![0xe9])));
        assert_eq!(Key::from_press(&KeyPress::plain(SPACE)), Some(Key::Printable(vec![b' '])));
    }

    proptest::proptest! {
        #[test]
        fn ctrl_only_ever_toggles(sym in proptest::prelude::any::<u32>()) {
            let key = Key::from_press(&KeyPress::plain(sym).with_ctrl());
            proptest::prop_assert!(key.is_none() || key == Some(Key::ToggleMode));
        }

        #[test]
        fn printable_keys_carry_no_control_bytes(sym in 0u32..0x1_0000) {
            if let Some(Key::Printable(bytes)) = Key::from_press(&KeyPress::plain(sym)) {
                proptest::prop_assert_eq!(bytes.len(), 1);
                proptest::prop_assert!(!bytes[0].is_ascii_control());
            }
        }
    }
}
