//! Path normalization.

use std::sync::LazyLock;

use regex::Regex;

use crate::context::ContextStack;
use crate::error::UrlError;

/// Runs of forward or backward slashes.
static SLASH_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\\/]+").expect("invalid slash regex"));

/// Normalize a decoded path, placing relative input in the current context.
///
/// The result always starts with `/`, has no `.` or `..` segments and no
/// repeated slashes. A trailing `/index.html` becomes `/`.
pub(crate) fn normalize(input: &str, contexts: &ContextStack) -> Result<String, UrlError> {
    let collapsed = SLASH_RUNS.replace_all(input, "/");
    let collapsed = match collapsed.strip_suffix("/index.html") {
        Some(dir) => format!("{dir}/"),
        None => collapsed.into_owned(),
    };

    let segments: Vec<&str> = collapsed.split('/').filter(|s| *s != ".").collect();

    let mut placed: Vec<String> = Vec::with_capacity(segments.len() + 4);
    if segments.first().is_some_and(|s| !s.is_empty()) {
        let context = contexts
            .context()
            .ok_or_else(|| UrlError::NoContext(input.to_owned()))?;
        let directory = context.path_directory();
        let directory = directory.strip_suffix('/').unwrap_or(directory);
        placed.extend(directory.split('/').map(str::to_owned));
    }
    placed.extend(segments.iter().map(|s| (*s).to_owned()));

    let mut resolved: Vec<String> = Vec::with_capacity(placed.len());
    for segment in placed {
        if segment == ".." {
            // The leading empty segment is the root and is never removed.
            if resolved.len() > 1 || resolved.first().is_some_and(|s| !s.is_empty()) {
                resolved.pop();
            }
        } else {
            resolved.push(segment);
        }
    }

    let joined = resolved.join("/");
    let joined = SLASH_RUNS.replace_all(&joined, "/");
    if joined.is_empty() {
        Ok("/".to_owned())
    } else if joined.starts_with('/') {
        Ok(joined.into_owned())
    } else {
        Ok(format!("/{joined}"))
    }
}
