// ABOUTME: Where the bot looks for config.toml and writes its rolling log files
// ABOUTME: Resolves platform directories once, with working-directory fallbacks for headless hosts

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.toml";
const LOG_SUBDIR: &str = "logs";

/// The two roots the bot touches on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineDirs {
    config: PathBuf,
    data: PathBuf,
}

impl MachineDirs {
    /// Platform locations (`~/.config/slack-machine`, `~/.local/share/slack-machine`
    /// on Linux). Without a home directory, config is read from `.` and data
    /// goes to `./data`.
    pub fn discover() -> Self {
        match ProjectDirs::from("io", "machine", "slack-machine") {
            Some(dirs) => Self {
                config: dirs.config_dir().to_path_buf(),
                data: dirs.data_dir().to_path_buf(),
            },
            None => Self::rooted_at(Path::new(".")),
        }
    }

    /// Config in `root`, data in `root/data`
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            config: root.to_path_buf(),
            data: root.join("data"),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config.join(CONFIG_FILE_NAME)
    }

    /// Daily-rotated `machine.*.log` files land here
    pub fn log_dir(&self) -> PathBuf {
        self.data.join(LOG_SUBDIR)
    }
}

/// Last entry in the config search order
pub fn config_file() -> PathBuf {
    MachineDirs::discover().config_file()
}

pub fn log_dir() -> PathBuf {
    MachineDirs::discover().log_dir()
}
