/// Config file loading and creation for the crowdrank CLI.
///
/// Config lives at ~/.config/crowdrank/config.toml.
/// All fields are optional — CLI args override config values.
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::bail;

#[derive(Deserialize, Default)]
pub struct CrowdrankConfig {
    pub items: Option<usize>,
    pub judges: Option<usize>,
    pub votes: Option<usize>,
    pub noisy: Option<f64>,
    pub skip_rate: Option<f64>,
    pub seed: Option<u64>,
}

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# crowdrank configuration
# All values here can be overridden by CLI flags.

# Number of items in the simulated pool
# items = 20

# Number of judges driving comparisons
# judges = 5

# Stop after this many recorded decisions
# votes = 200

# Fraction of judges that vote near-randomly
# noisy = 0.2

# Probability a judge skips a comparison instead of voting
# skip_rate = 0.05

# RNG seed for reproducible runs (omit for a random seed)
# seed = 42
";

/// Returns the default config path: ~/.config/crowdrank/config.toml
pub fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| bail("HOME environment variable not set"));
    PathBuf::from(home).join(".config").join("crowdrank").join("config.toml")
}

/// Load config from a file path. Returns default (all None) if file doesn't exist.
pub fn load_config(path: &Path) -> CrowdrankConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)
            .unwrap_or_else(|e| bail(format!("Failed to parse config at {}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CrowdrankConfig::default(),
        Err(e) => bail(format!("Failed to read config at {}: {e}", path.display())),
    }
}

/// Create the default config file. Errors if it already exists.
pub fn create_default_config() -> PathBuf {
    let path = config_path();

    if path.exists() {
        bail(format!("Config file already exists at {}", path.display()));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .unwrap_or_else(|e| bail(format!("Failed to create directory {}: {e}", parent.display())));
    }

    std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE)
        .unwrap_or_else(|e| bail(format!("Failed to write config to {}: {e}", path.display())));

    path
}
