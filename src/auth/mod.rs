//! PIN entry and credential routing.
//!
//! The keypad buffer is zeroized whenever it is cleared or dropped. The two
//! configured secrets are only held as blake3 digests and a candidate is
//! always compared against both before the result is known.

mod store;

pub use store::{default_root, VaultStore};

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{VaultError, VaultResult};
use crate::session::Mode;

pub const PIN_LENGTH: usize = 4;

/// One keypad press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit(u8),
    Clear,
    Backspace,
}

impl Key {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "clear" | "c" => Some(Key::Clear),
            "backspace" | "back" | "del" => Some(Key::Backspace),
            s if s.len() == 1 => {
                let d = s.chars().next()?.to_digit(10)?;
                Some(Key::Digit(d as u8))
            }
            _ => None,
        }
    }
}

/// A complete 4-digit entry taken out of the keypad.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Pin(String);

impl Pin {
    pub fn new(digits: impl Into<String>) -> VaultResult<Self> {
        let digits = digits.into();
        if digits.len() != PIN_LENGTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(VaultError::validation(format!("PIN must be {PIN_LENGTH} digits")));
        }
        Ok(Self(digits))
    }

    pub(crate) fn digest(&self) -> blake3::Hash { hash_pin(&self.0) }
}

impl std::fmt::Debug for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Pin(****)")
    }
}

/// Digit accumulator behind the keypad.
#[derive(Default, Zeroize, ZeroizeOnDrop)]
pub struct PinPad {
    digits: String,
}

impl PinPad {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.digits.len() }
    pub fn is_empty(&self) -> bool { self.digits.is_empty() }
    pub fn is_full(&self) -> bool { self.digits.len() == PIN_LENGTH }

    /// Returns false when the digit was ignored (buffer already full).
    pub fn push(&mut self, digit: u8) -> bool {
        if self.is_full() || digit > 9 {
            return false;
        }
        self.digits.push(char::from(b'0' + digit));
        true
    }

    pub fn backspace(&mut self) {
        self.digits.pop();
    }

    pub fn clear(&mut self) { self.digits.zeroize(); }

    /// Move a full buffer out as a `Pin`, leaving the pad empty.
    pub fn take(&mut self) -> Option<Pin> {
        if !self.is_full() {
            return None;
        }
        let pin = Pin(std::mem::take(&mut self.digits));
        Some(pin)
    }
}

impl std::fmt::Debug for PinPad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinPad").field("len", &self.len()).finish()
    }
}

/// The primary and duress secrets, as digests.
#[derive(Clone)]
pub struct Credentials {
    primary: blake3::Hash,
    duress: blake3::Hash,
}

impl Credentials {
    pub fn from_pins(primary: &str, duress: &str) -> VaultResult<Self> {
        let primary = Pin::new(primary).map_err(|_| VaultError::Config("primary PIN must be 4 digits".into()))?;
        let duress = Pin::new(duress).map_err(|_| VaultError::Config("duress PIN must be 4 digits".into()))?;
        if primary == duress {
            return Err(VaultError::Config("primary and duress PINs must differ".into()));
        }
        Ok(Self { primary: primary.digest(), duress: duress.digest() })
    }

    /// Which ledger a candidate unlocks, if any.
    pub fn classify(&self, candidate: &Pin) -> Option<Mode> {
        let digest = candidate.digest();
        // blake3::Hash equality is constant time; evaluate both.
        let is_primary = digest == self.primary;
        let is_duress = digest == self.duress;
        match (is_primary, is_duress) {
            (true, _) => Some(Mode::Real),
            (false, true) => Some(Mode::Duress),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credentials(..)")
    }
}

fn hash_pin(pin: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"mimivault-pin");
    hasher.update(pin.as_bytes());
    hasher.finalize()
}
