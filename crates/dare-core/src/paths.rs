//! Standard paths used by DARE tools

use std::path::PathBuf;

/// File name of the local store inside the home directory
pub const STORE_FILE: &str = ".dare";

/// Standard DARE paths
pub struct Paths {
    /// Home directory (~)
    pub home: PathBuf,
    /// Config directory (~/.config/dare)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        let config = dirs::config_dir()
            .unwrap_or_else(|| home.join(".config"))
            .join("dare");

        Self { home, config }
    }

    /// Local store file (~/.dare)
    pub fn store(&self) -> PathBuf {
        self.home.join(STORE_FILE)
    }

    /// User configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }
}
