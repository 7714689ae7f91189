// ABOUTME: Per-user config file location resolved through the XDG base directories.
// ABOUTME: Last stop in the config search after THREADLINE_CONFIG_PATH and ./config.toml.

use directories::ProjectDirs;
use std::path::PathBuf;

const CONFIG_FILE_NAME: &str = "config.toml";

/// ~/.config/threadline/ on Linux; the current directory when no home is known
pub fn config_dir() -> PathBuf {
    ProjectDirs::from("com", "threadline", "threadline")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_file() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_lives_in_config_dir() {
        let file = config_file();
        assert_eq!(file.file_name().and_then(|n| n.to_str()), Some("config.toml"));
        assert_eq!(file.parent(), Some(config_dir().as_path()));
    }
}
