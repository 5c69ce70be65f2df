//! String helpers shared by the formatter, the chart builder and the renderers.

/// Turns a camelCase (or snake_case) metric key into a display label.
///
/// A space goes before an upper-case letter that follows a lower-case letter
/// or digit, and before the last capital of an acronym run when a lower-case
/// letter follows it, so `debtToEBITDA` reads `Debt To EBITDA`. Digits never
/// start a new word. Underscores count as spaces, whitespace runs collapse to
/// one space and every word starts upper-case, unless that letter only
/// upper-cases to several characters (`ß`), in which case it is kept.
pub fn to_title(key: &str) -> String {
    let chars: Vec<char> = key
        .chars()
        .map(|ch| if ch == '_' { ' ' } else { ch })
        .collect();
    let mut spaced = String::with_capacity(key.len() + 8);
    for (idx, &ch) in chars.iter().enumerate() {
        if idx > 0 && ch.is_uppercase() {
            let prev = chars[idx - 1];
            let next_is_lower = chars.get(idx + 1).is_some_and(|c| c.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                spaced.push(' ');
            }
        }
        spaced.push(ch);
    }

    let mut out = String::with_capacity(spaced.len());
    for word in spaced.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        let mut rest = word.chars();
        if let Some(first) = rest.next() {
            out.push(capitalize(first));
            out.push_str(rest.as_str());
        }
    }
    out
}

/// Upper-case form of `ch` when it is a single character; otherwise `ch`.
fn capitalize(ch: char) -> char {
    let mut upper = ch.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(single), None) => single,
        _ => ch,
    }
}

pub fn format_fixed(value: f64) -> String {
    format!("{value:.2}")
}

pub fn format_optional_fixed(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format_fixed(v),
        _ => "-".to_string(),
    }
}

/// Badge text for a metric change: magnitude only, one decimal.
pub fn format_change(change: f64) -> String {
    format!("{:.1}%", change.abs())
}

/// Signed percentage difference with one decimal, `+` only when positive.
pub fn format_difference(difference: Option<f64>) -> String {
    difference.map_or_else(
        || "-".to_string(),
        |value| {
            let normalized = if value.abs() < 0.05 { 0.0 } else { value };
            if normalized > 0.0 {
                format!("+{normalized:.1}%")
            } else {
                format!("{normalized:.1}%")
            }
        },
    )
}
