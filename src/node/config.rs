//! Vault configuration - built by the CLI or an embedding host.

use std::path::PathBuf;
use std::time::Duration;

use crate::enrollment::DEFAULT_MOTION_THRESHOLD;
use crate::error::{VaultError, VaultResult};

pub const DEFAULT_APP: &str = "mimivault";
pub const DEFAULT_PRIMARY_PIN: &str = "1234";
pub const DEFAULT_DURESS_PIN: &str = "8888";
pub const DEFAULT_PIN_DELAY_MS: u64 = 600;
pub const DEFAULT_BOOT_DELAY_MS: u64 = 800;
pub const DEFAULT_ENCLAVE_TIMEOUT_MS: u64 = 10_000;

#[derive(Clone)]
pub struct VaultConfig {
    pub app: String,
    /// Storage root. `None` falls back to `$MIMI_ROOT` / the platform data dir.
    pub root: Option<PathBuf>,
    pub primary_pin: String,
    pub duress_pin: String,
    pub pin_delay: Duration,
    pub boot_delay: Duration,
    pub enclave_url: Option<String>,
    pub enclave_timeout: Duration,
    pub motion_threshold: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            app: DEFAULT_APP.into(),
            root: None,
            primary_pin: DEFAULT_PRIMARY_PIN.into(),
            duress_pin: DEFAULT_DURESS_PIN.into(),
            pin_delay: Duration::from_millis(DEFAULT_PIN_DELAY_MS),
            boot_delay: Duration::from_millis(DEFAULT_BOOT_DELAY_MS),
            enclave_url: None,
            enclave_timeout: Duration::from_millis(DEFAULT_ENCLAVE_TIMEOUT_MS),
            motion_threshold: DEFAULT_MOTION_THRESHOLD,
        }
    }
}

impl VaultConfig {
    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into(), ..Default::default() }
    }
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self { self.root = Some(root.into()); self }
    pub fn with_pins(mut self, primary: impl Into<String>, duress: impl Into<String>) -> Self {
        self.primary_pin = primary.into();
        self.duress_pin = duress.into();
        self
    }
    pub fn with_pin_delay(mut self, d: Duration) -> Self { self.pin_delay = d; self }
    pub fn with_boot_delay(mut self, d: Duration) -> Self { self.boot_delay = d; self }
    pub fn with_enclave(mut self, url: impl Into<String>) -> Self { self.enclave_url = Some(url.into()); self }
    pub fn with_enclave_timeout(mut self, d: Duration) -> Self { self.enclave_timeout = d; self }
    pub fn with_motion_threshold(mut self, t: u32) -> Self { self.motion_threshold = t; self }

    /// Read `MIMI_*` variables over the defaults.
    pub fn from_env() -> VaultResult<Self> {
        let mut config = Self::new(env_str("MIMI_APP").unwrap_or_else(|| DEFAULT_APP.into()));
        if let Some(root) = env_str("MIMI_ROOT") {
            config.root = Some(PathBuf::from(root));
        }
        if let Some(pin) = env_str("MIMI_PRIMARY_PIN") {
            config.primary_pin = pin;
        }
        if let Some(pin) = env_str("MIMI_DURESS_PIN") {
            config.duress_pin = pin;
        }
        if let Some(ms) = env_parse::<u64>("MIMI_PIN_DELAY_MS")? {
            config.pin_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("MIMI_BOOT_DELAY_MS")? {
            config.boot_delay = Duration::from_millis(ms);
        }
        config.enclave_url = env_str("MIMI_ENCLAVE_URL");
        if let Some(ms) = env_parse::<u64>("MIMI_ENCLAVE_TIMEOUT_MS")? {
            config.enclave_timeout = Duration::from_millis(ms);
        }
        if let Some(t) = env_parse::<u32>("MIMI_MOTION_THRESHOLD")? {
            config.motion_threshold = t;
        }
        Ok(config)
    }

    pub fn resolved_root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(crate::auth::default_root)
    }
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field("app", &self.app)
            .field("root", &self.root)
            .field("pin_delay", &self.pin_delay)
            .field("boot_delay", &self.boot_delay)
            .field("enclave_url", &self.enclave_url)
            .field("enclave_timeout", &self.enclave_timeout)
            .field("motion_threshold", &self.motion_threshold)
            .finish_non_exhaustive()
    }
}

fn env_str(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> VaultResult<Option<T>> {
    match env_str(key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| VaultError::Config(format!("{key}={raw} is not a valid number"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const KEYS: &[&str] = &[
        "MIMI_APP",
        "MIMI_ROOT",
        "MIMI_PRIMARY_PIN",
        "MIMI_DURESS_PIN",
        "MIMI_PIN_DELAY_MS",
        "MIMI_BOOT_DELAY_MS",
        "MIMI_ENCLAVE_URL",
        "MIMI_ENCLAVE_TIMEOUT_MS",
        "MIMI_MOTION_THRESHOLD",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        clear_env();
        let config = VaultConfig::from_env().unwrap();
        assert_eq!(config.app, "mimivault");
        assert_eq!(config.primary_pin, "1234");
        assert_eq!(config.duress_pin, "8888");
        assert_eq!(config.pin_delay, Duration::from_millis(600));
        assert_eq!(config.motion_threshold, 800);
        assert!(config.enclave_url.is_none());
    }

    #[test]
    fn env_overrides() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        clear_env();
        std::env::set_var("MIMI_APP", "vault-test");
        std::env::set_var("MIMI_DURESS_PIN", "4444");
        std::env::set_var("MIMI_PIN_DELAY_MS", "5");
        std::env::set_var("MIMI_ENCLAVE_URL", "enclave.local");
        let config = VaultConfig::from_env().unwrap();
        assert_eq!(config.app, "vault-test");
        assert_eq!(config.duress_pin, "4444");
        assert_eq!(config.pin_delay, Duration::from_millis(5));
        assert_eq!(config.enclave_url.as_deref(), Some("enclave.local"));
        clear_env();
    }

    #[test]
    fn bad_number_is_config_error() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        clear_env();
        std::env::set_var("MIMI_MOTION_THRESHOLD", "lots");
        assert!(matches!(VaultConfig::from_env(), Err(VaultError::Config(_))));
        clear_env();
    }

    #[test]
    fn debug_hides_pins() {
        let rendered = format!("{:?}", VaultConfig::new("x").with_pins("1357", "2468"));
        assert!(!rendered.contains("1357"));
        assert!(!rendered.contains("2468"));
    }
}
