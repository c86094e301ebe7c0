use std::time::Duration;

pub(crate) fn format_bytes(b: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;

    match b {
        b if b >= GIB => format!("{:.2}GiB", (b as f64) / (GIB as f64)),
        b if b >= MIB => format!("{:.2}MiB", (b as f64) / (MIB as f64)),
        b if b >= KIB => format!("{:.2}KiB", (b as f64) / (KIB as f64)),
        b => format!("{b}B"),
    }
}

pub(crate) fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.1}")
    } else {
        "0".to_string()
    }
}

pub(crate) fn format_percent(ratio: f64) -> String {
    if ratio.is_finite() {
        format!("{:.2}%", ratio * 100.0)
    } else {
        "0.00%".to_string()
    }
}

/// Latency in the largest unit that keeps the value >= 1 (us, ms, s), two decimals.
pub(crate) fn format_micros(us: f64) -> String {
    if !us.is_finite() || us < 0.0 {
        return "-".to_string();
    }
    if us >= 1_000_000.0 {
        return format!("{:.2}s", us / 1_000_000.0);
    }
    if us >= 1_000.0 {
        return format!("{:.2}ms", us / 1_000.0);
    }
    format!("{us:.0}us")
}

/// Whole seconds above a minute, otherwise one unit with two decimals.
pub(crate) fn format_duration(d: Duration) -> String {
    if d >= Duration::from_secs(60) {
        return humantime::format_duration(Duration::from_secs(d.as_secs())).to_string();
    }
    format_micros(d.as_secs_f64() * 1_000_000.0)
}

pub(crate) fn format_tags_inline(tags: &[(String, String)]) -> String {
    if tags.is_empty() {
        return String::new();
    }

    let mut sorted = tags.to_vec();
    sorted.sort();

    let inner = sorted
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ");

    format!(" {{{inner}}}")
}
