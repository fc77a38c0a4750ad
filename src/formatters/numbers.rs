// ABOUTME: Number rendering shared by the report commands
// ABOUTME: Converts micros and ratios and groups thousands

const MICROS_PER_UNIT: f64 = 1_000_000.0;

pub fn micros_to_units(micros: f64) -> f64 {
    micros / MICROS_PER_UNIT
}

/// Ratio as a percentage with two decimals, e.g. `0.0543` -> `5.43%`
pub fn percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

/// Integer with comma grouping
pub fn thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let sign = if value < 0 { "-" } else { "" };
    format!("{sign}{}", group(&digits))
}

/// Two decimals with comma grouping
pub fn money(value: f64) -> String {
    let rendered = format!("{:.2}", value.abs());
    let (whole, fraction) = rendered.split_once('.').unwrap_or((rendered.as_str(), "00"));
    let sign = if value < 0.0 && rendered != "0.00" { "-" } else { "" };
    format!("{sign}{}.{fraction}", group(whole))
}

fn group(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
