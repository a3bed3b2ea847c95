// src/logging.rs
//
// `tlog!` writes timestamped lines to stderr and, once a session log has been
// started, to a log file as well. Session logs are named by start time and
// only the newest few are kept.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

const LOG_SUFFIX: &str = "-leddot.log";
const LATEST_LINK: &str = "leddot.log";

/// Session log file. When `Some`, `tlog!` also appends here.
#[doc(hidden)]
pub static LOG_FILE: Mutex<Option<std::fs::File>> = Mutex::new(None);

#[doc(hidden)]
pub fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}

/// Timestamped logging macro.
/// Prepends `HH:MM:SS.mmm` local time; messages start with a `[component]` tag.
#[macro_export]
macro_rules! tlog {
    ($($arg:tt)*) => {{
        use std::io::Write as _;
        let msg = format!("{} {}", $crate::logging::timestamp(), format_args!($($arg)*));
        eprintln!("{}", msg);
        if let Ok(mut guard) = $crate::logging::LOG_FILE.lock() {
            if let Some(ref mut f) = *guard {
                let _ = writeln!(f, "{}", msg);
            }
        }
    }};
}

/// Start a session log in `log_dir`, keeping at most `keep` session logs
/// (the new one included). Returns the path of the new log.
///
/// On Unix `leddot.log` is pointed at the newest session.
pub fn init_file_logging(log_dir: &Path, keep: usize) -> Result<PathBuf, String> {
    std::fs::create_dir_all(log_dir).map_err(|e| format!("Failed to create log dir: {}", e))?;

    let filename = format!("{}{}", chrono::Local::now().format("%Y%m%d-%H%M%S"), LOG_SUFFIX);
    let log_path = log_dir.join(&filename);

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| format!("Failed to create log file: {}", e))?;

    #[cfg(unix)]
    {
        let link = log_dir.join(LATEST_LINK);
        let _ = std::fs::remove_file(&link);
        if let Err(e) = std::os::unix::fs::symlink(&filename, &link) {
            eprintln!("{} [logging] Failed to link {}: {}", timestamp(), LATEST_LINK, e);
        }
    }

    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = Some(file);
    }

    tlog!("[logging] leddot {} logging to {}", env!("CARGO_PKG_VERSION"), log_path.display());

    for stale in stale_logs(session_logs(log_dir), keep.max(1)) {
        match std::fs::remove_file(log_dir.join(&stale)) {
            Ok(()) => tlog!("[logging] Removed old log {}", stale),
            Err(e) => tlog!("[logging] Failed to remove old log {}: {}", stale, e),
        }
    }

    Ok(log_path)
}

/// Stop file logging and close the log file.
pub fn stop_file_logging() {
    if let Ok(mut guard) = LOG_FILE.lock() {
        if guard.take().is_some() {
            eprintln!("{} [logging] File logging stopped", timestamp());
        }
    }
}

/// File names of the session logs in `log_dir`.
fn session_logs(log_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(log_dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map_or(false, |t| t.is_file()))
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(LOG_SUFFIX))
        .collect()
}

/// Everything but the newest `keep` names. Names start with the session
/// timestamp, so name order is age order.
fn stale_logs(mut names: Vec<String>, keep: usize) -> Vec<String> {
    names.sort();
    let excess = names.len().saturating_sub(keep);
    names.truncate(excess);
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_logs_keeps_newest() {
        let names = vec![
            "20240103-090000-leddot.log".to_string(),
            "20240101-090000-leddot.log".to_string(),
            "20240102-090000-leddot.log".to_string(),
        ];
        assert_eq!(
            stale_logs(names.clone(), 2),
            vec!["20240101-090000-leddot.log".to_string()]
        );
        assert!(stale_logs(names.clone(), 3).is_empty());
        assert_eq!(stale_logs(names, 0).len(), 3);
    }

    #[test]
    fn test_file_logging_writes_and_prunes() {
        let dir = std::env::temp_dir().join(format!("leddot-logging-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for day in 1..=3 {
            std::fs::write(dir.join(format!("2020010{}-000000-leddot.log", day)), "old\n").unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "keep me").unwrap();

        let path = init_file_logging(&dir, 2).unwrap();
        tlog!("[test] hello from the log");
        stop_file_logging();

        let mut logs = session_logs(&dir);
        logs.sort();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0], "20200103-000000-leddot.log");
        assert!(dir.join("notes.txt").exists());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[test] hello from the log"));
        assert!(content.contains("[logging] leddot"));

        #[cfg(unix)]
        assert_eq!(
            std::fs::read_link(dir.join(LATEST_LINK)).unwrap(),
            PathBuf::from(path.file_name().unwrap())
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
