//! Toggle hotkey description, parsed from strings like `ctrl+o` or `super+F12`.
//!
//! Modifier bits and keysym values use the X11 core protocol encoding so the
//! display layer can hand them to the server unchanged.

use anyhow::{anyhow, bail, Result};
use std::fmt;

pub const MOD_SHIFT: u16 = 1 << 0;
pub const MOD_LOCK: u16 = 1 << 1;
pub const MOD_CONTROL: u16 = 1 << 2;
pub const MOD_ALT: u16 = 1 << 3;
/// NumLock on nearly every keymap.
pub const MOD_NUM_LOCK: u16 = 1 << 4;
pub const MOD_SUPER: u16 = 1 << 6;

const KEYSYM_F1: u32 = 0xffbe;

const NAMED_KEYS: &[(&str, u32)] = &[
    ("grave", 0x0060),
    ("space", 0x0020),
    ("minus", 0x002d),
    ("equal", 0x003d),
    ("tab", 0xff09),
    ("return", 0xff0d),
    ("enter", 0xff0d),
    ("escape", 0xff1b),
    ("esc", 0xff1b),
    ("pause", 0xff13),
    ("scroll_lock", 0xff14),
    ("insert", 0xff63),
    ("home", 0xff50),
    ("end", 0xff57),
];

/// A key plus the modifiers that must be held with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkey {
    pub modifiers: u16,
    pub keysym: u32,
}

impl Default for Hotkey {
    fn default() -> Self {
        Self {
            modifiers: MOD_CONTROL,
            keysym: u32::from(b'o'),
        }
    }
}

impl Hotkey {
    /// Parse a `+`-separated key description. The last component is the key,
    /// everything before it a modifier. Case is ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split('+').map(str::trim).collect();
        let Some((key, mods)) = parts.split_last() else {
            bail!("empty hotkey");
        };
        if key.is_empty() {
            bail!("hotkey is missing a key after the last '+'");
        }

        let mut modifiers = 0u16;
        for name in mods {
            let bit = modifier_bit(name).ok_or_else(|| anyhow!("unknown modifier '{name}'"))?;
            if modifiers & bit != 0 {
                bail!("modifier '{name}' given twice");
            }
            modifiers |= bit;
        }

        let keysym = keysym_for(key).ok_or_else(|| anyhow!("unknown key '{key}'"))?;
        Ok(Self { modifiers, keysym })
    }

    /// Modifier combinations to grab so the hotkey still fires with CapsLock
    /// or NumLock engaged.
    pub fn grab_variants(&self) -> [u16; 4] {
        [
            self.modifiers,
            self.modifiers | MOD_LOCK,
            self.modifiers | MOD_NUM_LOCK,
            self.modifiers | MOD_LOCK | MOD_NUM_LOCK,
        ]
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (bit, name) in [
            (MOD_CONTROL, "ctrl"),
            (MOD_SHIFT, "shift"),
            (MOD_ALT, "alt"),
            (MOD_SUPER, "super"),
        ] {
            if self.modifiers & bit != 0 {
                write!(f, "{name}+")?;
            }
        }
        match key_name(self.keysym) {
            Some(name) => f.write_str(&name),
            None => write!(f, "0x{:04x}", self.keysym),
        }
    }
}

fn modifier_bit(name: &str) -> Option<u16> {
    match name.to_ascii_lowercase().as_str() {
        "ctrl" | "control" => Some(MOD_CONTROL),
        "shift" => Some(MOD_SHIFT),
        "alt" | "mod1" => Some(MOD_ALT),
        "super" | "win" | "mod4" => Some(MOD_SUPER),
        _ => None,
    }
}

fn keysym_for(key: &str) -> Option<u32> {
    let mut chars = key.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        // Latin-1 keysyms equal their code points; X keymaps list the lowercase form.
        if ch.is_ascii_alphanumeric() {
            return Some(u32::from(ch.to_ascii_lowercase()));
        }
        return match ch {
            '`' => Some(0x0060),
            '-' => Some(0x002d),
            '=' => Some(0x003d),
            _ => None,
        };
    }

    if let Some(num) = key.strip_prefix(['F', 'f']) {
        if let Ok(n) = num.parse::<u32>() {
            if (1..=12).contains(&n) {
                return Some(KEYSYM_F1 + n - 1);
            }
        }
    }

    let lower = key.to_ascii_lowercase();
    NAMED_KEYS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, sym)| *sym)
}

fn key_name(keysym: u32) -> Option<String> {
    if (KEYSYM_F1..KEYSYM_F1 + 12).contains(&keysym) {
        return Some(format!("F{}", keysym - KEYSYM_F1 + 1));
    }
    if let Some(ch) = char::from_u32(keysym).filter(|c| c.is_ascii_alphanumeric()) {
        return Some(ch.to_string());
    }
    NAMED_KEYS
        .iter()
        .find(|(_, sym)| *sym == keysym)
        .map(|(name, _)| (*name).to_string())
}
