//! Virtual path helpers
//!
//! Virtual paths are always absolute, `/`-separated and free of `.`/`..`
//! segments. None of these functions touch the file system.

/// Collapses `.`/`..` segments and duplicate separators into an absolute path.
///
/// `..` never climbs above the root.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Appends `arg` to `base` verbatim, then normalizes.
pub fn join(base: &str, arg: &str) -> String {
    normalize(&format!("{}/{}", base, arg))
}

/// Directory part of `path`, or an empty string when `path` has none.
pub fn parent(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[..idx],
        None => "",
    }
}

/// Last segment of a normalized path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}
