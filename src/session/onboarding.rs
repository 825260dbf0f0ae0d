//! Vault identifiers and recovery phrases issued during onboarding.

use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::{VaultError, VaultResult};

/// Shown when an authenticated session has no stored identifier.
pub const FALLBACK_VAULT_ID: &str = "8829 1029 3847";

pub const SEED_WORDS: usize = 12;

pub const DICTIONARY: [&str; 50] = [
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet",
    "kilo", "lima", "mike", "november", "oscar", "papa", "quebec", "romeo", "sierra", "tango",
    "uniform", "victor", "whiskey", "xray", "yankee", "zulu", "atom", "bamboo", "cave", "dune",
    "eagle", "fame", "gate", "hawk", "icon", "jazz", "kite", "laser", "moon", "neon",
    "ocean", "pixel", "quest", "radio", "star", "token", "ultra", "vault", "wave", "zero",
];

/// How the user chose to set up a new vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupKind {
    /// Identifier and recovery phrase only.
    Standard,
    /// Identifier, face enrollment, then recovery phrase.
    Guided,
}

/// Three space-separated groups, each in 1000..=9999.
pub fn generate_vault_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..3)
        .map(|_| rng.gen_range(1000..=9999).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Words may repeat.
pub fn generate_seed_phrase<R: Rng + ?Sized>(rng: &mut R) -> Vec<String> {
    (0..SEED_WORDS)
        .filter_map(|_| DICTIONARY.choose(rng).map(|w| w.to_string()))
        .collect()
}

/// Accepts `dddd dddd dddd` with any (or no) whitespace between groups and
/// returns the canonical single-spaced form.
pub fn validate_vault_id(input: &str) -> VaultResult<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"^([1-9]\d{3})\s*([1-9]\d{3})\s*([1-9]\d{3})$").ok())
        .as_ref()
        .ok_or_else(|| VaultError::Config("vault id pattern".into()))?;

    let caps = pattern
        .captures(input.trim())
        .ok_or_else(|| VaultError::validation("Vault ID must be three groups of four digits"))?;
    Ok(format!("{} {} {}", &caps[1], &caps[2], &caps[3]))
}
