// src/config/validate.rs

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::errors::{PollwatchError, Result};

/// Resolve the watched root into an absolute, existing directory.
///
/// Relative paths are joined onto `cwd`, then `.` and `..` are folded
/// lexically. Symlinks are left alone.
pub fn resolve_root(raw: &str, cwd: &Path) -> Result<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PollwatchError::Config("watch path is empty".to_string()));
    }

    let joined = cwd.join(raw);
    let path = normalize(&joined);

    let meta = std::fs::metadata(&path).map_err(|e| PollwatchError::InvalidPath {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    if !meta.is_dir() {
        return Err(PollwatchError::InvalidPath {
            path,
            reason: "not a directory".to_string(),
        });
    }

    Ok(path)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                // `pop` refuses to go above the root, which matches how the OS
                // resolves `/..`.
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Parse a duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration too large: '{}'", s))
}

/// Parse a duration setting and reject zero.
pub fn positive_duration(key: &str, raw: &str) -> Result<Duration> {
    let dur = parse_duration(raw).map_err(|e| PollwatchError::Config(format!("{key}: {e}")))?;
    if dur.is_zero() {
        return Err(PollwatchError::Config(format!("{key} must be greater than zero")));
    }
    Ok(dur)
}
