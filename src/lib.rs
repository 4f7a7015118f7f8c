#![deny(rust_2018_idioms)]

pub mod record;
pub use record::function::{normalize, read};

pub mod aggregate;
pub use aggregate::function::{aggregate, overall, summarize};

pub mod distribution;

pub mod rank;

pub mod period;
pub use period::function::trend;

pub mod geo;

pub mod view;

pub mod series;

pub mod pipeline;

pub mod report;

/// Parse a numeric CSV field permissively: surrounding whitespace is ignored, and anything that
/// isn't a number, including the empty string, becomes NaN for consumers to filter out.
pub fn parse_number(field: &str) -> f64 {
    let field = field.trim();
    if field.is_empty() {
        return f64::NAN;
    }
    field.parse().unwrap_or(f64::NAN)
}

/// Format `value` as Brazilian Real, like `R$ 1.234,56`, or as `no data` if there is none.
pub fn format_brl(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(value) => {
            let localized = localize_number(group_thousands(value), b'.', b',');
            format!("R$ {}", String::from_utf8_lossy(&localized))
        }
        None => "no data".into(),
    }
}

/// Render `value` with two decimals and `,` as thousands separator, like `1,234.56`.
fn group_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut out = String::with_capacity(fixed.len() + integer.len() / 3 + 1);
    if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        out.push('-');
    }
    for (idx, digit) in integer.chars().enumerate() {
        if idx > 0 && (integer.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out.push('.');
    out.push_str(fraction);
    out
}

/// Change the thousands and decimal separators of a number with exactly two decimals
/// as produced by [`group_thousands()`].
fn localize_number(number: impl Into<Vec<u8>>, thousands_separator: u8, decimal_separator: u8) -> Vec<u8> {
    fn is_separator(b: &&mut u8) -> bool {
        **b == b'.' || **b == b','
    }
    let mut number = number.into();
    let mut b = number.iter_mut().rev();
    let mut next_thousands_ofs = 3;
    if let Some(b) = b.nth(2).filter(is_separator) {
        *b = decimal_separator;
    } else {
        next_thousands_ofs = 0;
    }

    while let Some(b) = b.nth(next_thousands_ofs) {
        if is_separator(&b) {
            *b = thousands_separator;
        }
        next_thousands_ofs = 3;
    }
    number
}
