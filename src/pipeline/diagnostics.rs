//! Compiler diagnostics: surface the first LaTeX error from captured output.
//!
//! TeX engines report fatal errors as a line starting with `! ` followed,
//! a few lines later, by `l.<N>` naming the offending source line. Only the
//! first error matters: with `-halt-on-error` the compiler stops there.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_ERROR_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^! (.+?)\s*$").unwrap());

static RE_SOURCE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^l\.(\d+)").unwrap());

/// Extract `"! <message>"` (plus `" (line N)"` when known) from compiler output.
///
/// Returns `None` when the output contains no TeX error marker, e.g. when
/// the executable was missing or the failure came from elsewhere.
pub fn extract_latex_error(output: &str) -> Option<String> {
    let caps = RE_ERROR_LINE.captures(output)?;
    let whole = caps.get(0)?;
    let message = caps[1].trim();

    let line = RE_SOURCE_LINE
        .captures(&output[whole.end()..])
        .map(|c| c[1].to_string());

    Some(match line {
        Some(n) => format!("! {message} (line {n})"),
        None => format!("! {message}"),
    })
}
