//! Environment constants and path utilities.
//!
//! Centralizes the file names and directories used by configuration discovery
//! and the default log filter.

use std::path::{Path, PathBuf};

/// Per-user application directory name
pub const DOCKGATE_DIR_NAME: &str = ".dockgate";

/// Configuration file name inside an application directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name looked up in the working directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "dockgate.toml";

/// System-wide configuration directory (Unix-like systems)
pub const SYSTEM_CONFIG_DIR: &str = "/etc/dockgate";

/// Log filter used when neither `RUST_LOG` nor `--log-level` is given
pub const DEFAULT_LOG_FILTER: &str = "dockgate=info,tower_http=info";

/// Build the local config file path from a working directory
pub fn local_config_file_path(dir: &Path) -> PathBuf {
    dir.join(LOCAL_CONFIG_FILE_NAME)
}

/// Build the user config directory path from a home directory
pub fn user_config_dir_path(home_dir: &Path) -> PathBuf {
    home_dir.join(DOCKGATE_DIR_NAME)
}

/// Build the user config file path from a home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    user_config_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// System config file path
pub fn system_config_file_path() -> PathBuf {
    Path::new(SYSTEM_CONFIG_DIR).join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_construction() {
        let home = Path::new("/home/user");

        assert_eq!(
            user_config_file_path(home),
            PathBuf::from("/home/user/.dockgate/config.toml")
        );
        assert_eq!(
            local_config_file_path(Path::new("/srv")),
            PathBuf::from("/srv/dockgate.toml")
        );
        assert_eq!(
            system_config_file_path(),
            PathBuf::from("/etc/dockgate/config.toml")
        );
    }
}
