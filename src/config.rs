use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_POLL_SECONDS: u64 = 1;
const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DEFAULT_FILE_COMMAND: &str = "xdg-open %p";
const CONFIG_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub schema_version: u32,
    pub keys: Vec<KeyBindingEntry>,
    pub bookmarks: Vec<String>,
    pub poll_interval_secs: u64,
    pub time_format: String,
    /// Template spawned when a non-directory entry is activated; `%p` is
    /// replaced with the entry's absolute path.
    pub file_command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyBindingEntry {
    pub chord: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
}

impl KeyBindingEntry {
    fn new(chord: &str, action: &str, arg: Option<&str>) -> Self {
        Self {
            chord: chord.to_string(),
            action: action.to_string(),
            arg: arg.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub poll_interval: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            keys: default_keys(),
            bookmarks: default_bookmarks(),
            poll_interval_secs: DEFAULT_POLL_SECONDS,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            file_command: DEFAULT_FILE_COMMAND.to_string(),
        }
    }
}

fn default_keys() -> Vec<KeyBindingEntry> {
    let mut keys = vec![
        // Movement
        KeyBindingEntry::new("ctrl+j", "move_cursor", Some("down")),
        KeyBindingEntry::new("ctrl+k", "move_cursor", Some("up")),
        KeyBindingEntry::new("ctrl+shift+j", "move_cursor", Some("page_down")),
        KeyBindingEntry::new("ctrl+shift+k", "move_cursor", Some("page_up")),
        KeyBindingEntry::new("ctrl+g", "move_cursor", Some("home")),
        KeyBindingEntry::new("ctrl+shift+g", "move_cursor", Some("end")),
        KeyBindingEntry::new("down", "move_cursor", Some("down")),
        KeyBindingEntry::new("up", "move_cursor", Some("up")),
        KeyBindingEntry::new("pagedown", "move_cursor", Some("page_down")),
        KeyBindingEntry::new("pageup", "move_cursor", Some("page_up")),
        KeyBindingEntry::new("home", "move_cursor", Some("home")),
        KeyBindingEntry::new("end", "move_cursor", Some("end")),
        // Windows
        KeyBindingEntry::new("ctrl+w", "new_window", None),
        KeyBindingEntry::new("ctrl+q", "close_window", None),
        KeyBindingEntry::new("tab", "focus_next", None),
        // Go up one level
        KeyBindingEntry::new("ctrl+h", "open_path", Some("..")),
        KeyBindingEntry::new("backspace", "open_path", Some("..")),
        // Open the selected entry
        KeyBindingEntry::new("enter", "activate_entry", None),
        // Terminal launch
        KeyBindingEntry::new("ctrl+x", "run_command", Some("xterm")),
        // Set path
        KeyBindingEntry::new("ctrl+l", "set_path", None),
        // Preferences
        KeyBindingEntry::new("ctrl+shift+h", "toggle_pref", Some("dotfiles")),
    ];

    for index in 0..10u32 {
        let chord = format!("ctrl+{}", (index + 1) % 10);
        keys.push(KeyBindingEntry {
            chord,
            action: "bookmark".to_string(),
            arg: Some(index.to_string()),
        });
    }
    keys
}

fn default_bookmarks() -> Vec<String> {
    let mut bookmarks = vec!["/".to_string()];
    if let Some(home) = dirs::home_dir() {
        bookmarks.push(home.to_string_lossy().into_owned());
    }
    bookmarks
}

impl BrowserConfig {
    pub fn load_or_init() -> Result<Self> {
        let cfg_path = config_path();
        if let Some(parent) = cfg_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory {}", parent.display())
            })?;
        }

        if cfg_path.exists() {
            let raw = fs::read_to_string(&cfg_path)
                .with_context(|| format!("failed to read {}", cfg_path.display()))?;
            let mut parsed: BrowserConfig = serde_json::from_str(&raw)
                .with_context(|| format!("invalid JSON in {}", cfg_path.display()))?;
            if parsed.normalize() {
                parsed.save()?;
            }
            Ok(parsed)
        } else {
            let cfg = BrowserConfig::default();
            cfg.save()?;
            Ok(cfg)
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory {}", parent.display())
            })?;
        }

        let data = serde_json::to_string_pretty(self)?;
        fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    fn normalize(&mut self) -> bool {
        let mut changed = false;

        if self.schema_version < CONFIG_SCHEMA_VERSION {
            self.schema_version = CONFIG_SCHEMA_VERSION;
            changed = true;
        }
        if self.poll_interval_secs == 0 {
            self.poll_interval_secs = DEFAULT_POLL_SECONDS;
            changed = true;
        }
        if self.time_format.trim().is_empty() {
            self.time_format = DEFAULT_TIME_FORMAT.to_string();
            changed = true;
        }
        if self.file_command.trim().is_empty() {
            self.file_command = DEFAULT_FILE_COMMAND.to_string();
            changed = true;
        }

        let before = self.bookmarks.len();
        self.bookmarks.retain(|bookmark| !bookmark.trim().is_empty());
        if self.bookmarks.len() != before {
            changed = true;
        }

        changed
    }
}

pub fn runtime_settings(config: &BrowserConfig) -> RuntimeSettings {
    RuntimeSettings {
        poll_interval: Duration::from_secs(env_u64(
            "DIRWIN_POLL_SECONDS",
            config.poll_interval_secs.max(1),
        )),
    }
}

pub fn config_home() -> PathBuf {
    if let Ok(custom) = env::var("DIRWIN_CONFIG_DIR") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dirwin")
}

pub fn config_path() -> PathBuf {
    config_home().join("config.json")
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}
