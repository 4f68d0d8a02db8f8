use std::time::SystemTime;

use chrono::{DateTime, Local};
use tracing_subscriber::{EnvFilter, fmt};

pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}

const PERM_TRIPLES: [&str; 8] = ["---", "--x", "-w-", "-wx", "r--", "r-x", "rw-", "rwx"];

/// Render the low nine mode bits as three rwx triples.
pub fn permission_string(mode: u32) -> String {
    format!(
        "{}{}{}",
        PERM_TRIPLES[(mode >> 6 & 7) as usize],
        PERM_TRIPLES[(mode >> 3 & 7) as usize],
        PERM_TRIPLES[(mode & 7) as usize]
    )
}

pub fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    }
}

/// Format a modification time with a strftime-style format string in local time.
pub fn format_mtime(format: &str, time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(format).to_string()
}

pub fn truncate(input: &str, max_len: usize) -> String {
    if input.chars().count() <= max_len {
        return input.to_string();
    }
    if max_len <= 3 {
        return input.chars().take(max_len).collect();
    }
    let head: String = input.chars().take(max_len - 3).collect();
    format!("{head}...")
}
