//! Run log for filter sessions.
//!
//! Nothing is recorded until [`init`] or [`init_at`] attaches a file, so the
//! library on its own stays silent. The batch binary attaches one per launch
//! and truncates whatever the previous launch left there.
//!
//! Besides free-form `log_info!` / `log_warn!` / `log_err!` lines, every
//! filter invocation is written as one `RUN` line carrying its dimensions,
//! timing and full settings:
//!
//! ```text
//! 14:03:27.512 INFO  cli      batch: shadow on 3 file(s)
//! 14:03:27.530 RUN   shadow   in=640x480 out=651x489 ms=12.41 angle=2.7488935 distance=5 ...
//! ```
//!
//! The default location is `pixelops/session.log` under the platform data
//! directory; `PIXELOPS_LOG` overrides it.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Environment variable naming the log file.
pub const LOG_ENV: &str = "PIXELOPS_LOG";

struct Session {
    path: PathBuf,
    file: Mutex<File>,
}

static SESSION: OnceLock<Session> = OnceLock::new();
static WARNINGS: AtomicUsize = AtomicUsize::new(0);
static ERRORS: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    /// A finished filter invocation.
    Run,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Run => "RUN",
        }
    }
}

pub fn log_path() -> Option<&'static Path> {
    SESSION.get().map(|s| s.path.as_path())
}

pub fn is_enabled() -> bool {
    SESSION.get().is_some()
}

/// Warnings and errors reported this process, attached or not.
pub fn counts() -> (usize, usize) {
    (WARNINGS.load(Ordering::Relaxed), ERRORS.load(Ordering::Relaxed))
}

/// Record one line. `target` is a module path or a filter name; only its
/// last `::` segment is printed.
pub fn write(level: Level, target: &str, msg: fmt::Arguments<'_>) {
    match level {
        Level::Warn => {
            WARNINGS.fetch_add(1, Ordering::Relaxed);
        }
        Level::Error => {
            ERRORS.fetch_add(1, Ordering::Relaxed);
        }
        Level::Info | Level::Run => {}
    }
    let Some(session) = SESSION.get() else {
        return;
    };
    let line = format_line(&clock(), level, target, msg);
    if let Ok(mut file) = session.file.lock() {
        let _ = writeln!(file, "{}", line);
    }
}

/// Record a finished filter invocation with the settings it ran with.
pub fn run(
    name: &str,
    input: (u32, u32),
    output: (u32, u32),
    elapsed: Duration,
    settings: &[(&'static str, String)],
) {
    if !is_enabled() {
        return;
    }
    let fields = run_fields(input, output, elapsed, settings);
    write(Level::Run, name, format_args!("{}", fields));
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, module_path!(), format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, module_path!(), format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, module_path!(), format_args!($($arg)*))
    };
}

/// Attach the log at `$PIXELOPS_LOG`, or the platform default.
pub fn init() -> Option<&'static Path> {
    let path = std::env::var_os(LOG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(default_path);
    init_at(&path)
}

/// Attach the log at `path`, truncating it, and mirror panics into it.
///
/// The first successful call wins; later calls return the path already in
/// use. Returns `None` if the file cannot be opened.
pub fn init_at(path: &Path) -> Option<&'static Path> {
    if let Some(existing) = log_path() {
        return Some(existing);
    }
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let file = match OpenOptions::new().create(true).write(true).truncate(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("warning: cannot open log file {}: {}", path.display(), e);
            return None;
        }
    };

    let session = Session { path: path.to_path_buf(), file: Mutex::new(file) };
    if SESSION.set(session).is_err() {
        return log_path();
    }

    let started = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    if let Some(session) = SESSION.get()
        && let Ok(mut file) = session.file.lock()
    {
        let _ = writeln!(
            file,
            "# pixelops {} session, unix time {}",
            env!("CARGO_PKG_VERSION"),
            started
        );
    }

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write(Level::Error, "panic", format_args!("{}", info));
        prev(info);
    }));

    log_path()
}

fn format_line(clock: &str, level: Level, target: &str, msg: fmt::Arguments<'_>) -> String {
    let target = target.rsplit("::").next().unwrap_or(target);
    format!("{} {:<5} {:<8} {}", clock, level.tag(), target, msg)
}

fn run_fields(
    input: (u32, u32),
    output: (u32, u32),
    elapsed: Duration,
    settings: &[(&'static str, String)],
) -> String {
    let mut out = format!(
        "in={}x{} out={}x{} ms={:.2}",
        input.0,
        input.1,
        output.0,
        output.1,
        elapsed.as_secs_f64() * 1000.0
    );
    for (key, value) in settings {
        out.push(' ');
        out.push_str(key);
        out.push('=');
        out.push_str(value);
    }
    out
}

fn default_path() -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let base = if cfg!(target_os = "windows") {
        std::env::var_os("APPDATA").map(PathBuf::from)
    } else if cfg!(target_os = "macos") {
        home.map(|h| h.join("Library").join("Application Support"))
    } else {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| home.map(|h| h.join(".local").join("share")))
    };
    base.unwrap_or_else(std::env::temp_dir).join("pixelops").join("session.log")
}

/// `HH:MM:SS.mmm`, UTC.
fn clock() -> String {
    let Ok(d) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return "??:??:??.???".to_string();
    };
    let secs = d.as_secs() % 86_400;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        secs / 3600,
        secs % 3600 / 60,
        secs % 60,
        d.subsec_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_aligned_and_use_the_last_path_segment() {
        let line = format_line("01:02:03.004", Level::Warn, "pixelops::ops", format_args!("{} rejected", "blur"));
        assert_eq!(line, "01:02:03.004 WARN  ops      blur rejected");
        let line = format_line("01:02:03.004", Level::Run, "shadow", format_args!("x"));
        assert_eq!(line, "01:02:03.004 RUN   shadow   x");
    }

    #[test]
    fn run_fields_list_dimensions_timing_and_settings() {
        let settings = vec![("radius", "2".to_string()), ("edge_action", "clamp".to_string())];
        let fields = run_fields((8, 6), (10, 7), Duration::from_micros(1500), &settings);
        assert_eq!(fields, "in=8x6 out=10x7 ms=1.50 radius=2 edge_action=clamp");
    }

    #[test]
    fn clock_has_millisecond_resolution() {
        let c = clock();
        assert_eq!(c.len(), 12);
        assert_eq!(&c[8..9], ".");
    }

    #[test]
    fn default_location_ends_in_the_crate_folder() {
        assert!(default_path().ends_with("pixelops/session.log"));
    }
}
