use std::time::Duration;

/// Format a conversion time for log output.
///
/// Precision shrinks as the duration grows: `123us`, `1.23ms`, `12.3ms`,
/// `123ms`, `1.23s`, `12.3s`, `1min5s`, `1h2min3s`.
pub fn format_duration(duration: Duration) -> String {
    let sec = duration.as_secs_f64();
    if sec >= 3600.0 {
        let whole = sec.round() as u64;
        format!("{}h{}min{}s", whole / 3600, whole / 60 % 60, whole % 60)
    } else if sec >= 60.0 {
        let whole = sec.round() as u64;
        format!("{}min{}s", whole / 60, whole % 60)
    } else if sec >= 10.0 {
        format!("{sec:.1}s")
    } else if sec >= 1.0 {
        format!("{sec:.2}s")
    } else if sec >= 1e-1 {
        format!("{:.0}ms", sec * 1e3)
    } else if sec >= 1e-2 {
        format!("{:.1}ms", sec * 1e3)
    } else if sec >= 1e-3 {
        format!("{:.2}ms", sec * 1e3)
    } else if sec >= 1e-6 {
        format!("{:.0}us", sec * 1e6)
    } else {
        "<1us".to_string()
    }
}
