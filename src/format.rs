// src/format.rs
//
// Display strings for tiles, tables and exports.

fn group_thousands(value: f64, sep: char) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}

/// "Rp 1.234.567" (whole rupiah, Indonesian grouping)
pub fn rupiah(value: f64) -> String {
    match group_thousands(value, '.') {
        s if s.starts_with('-') => format!("-Rp {}", &s[1..]),
        s => format!("Rp {s}"),
    }
}

/// "IDR 1,234,567", used by the table and ranking cells.
pub fn idr(value: f64) -> String {
    match group_thousands(value, ',') {
        s if s.starts_with('-') => format!("-IDR {}", &s[1..]),
        s => format!("IDR {s}"),
    }
}

/// "1,234"
pub fn count(value: i64) -> String {
    group_thousands(value as f64, ',')
}

/// Value already in percent: 12.3456 → "12.35%"
pub fn percent(value: f64) -> String {
    format!("{value:.2}%")
}

/// Fraction of one: 0.1234 → "12.34%"
pub fn ratio(value: f64) -> String {
    percent(value * 100.0)
}

pub fn days(value: f64) -> String {
    format!("{value:.1} days")
}

/// Table label: id 0 is "Valdo", the "Internal - " prefix is dropped.
pub fn department_name(dept_id: u32, name: Option<&str>) -> String {
    if dept_id == 0 {
        return "Valdo".to_string();
    }
    match name.filter(|n| !n.is_empty()) {
        Some(n) => n.strip_prefix("Internal - ").unwrap_or(n).to_string(),
        None => format!("Department {dept_id}"),
    }
}

/// Dropdown label: upper-cased, id 0 is "VALDO".
pub fn department_option_label(dept_id: u32, name: Option<&str>) -> String {
    if dept_id == 0 {
        return "VALDO".to_string();
    }
    match name.filter(|n| !n.is_empty()) {
        Some(n) => n.to_uppercase(),
        None => format!("DEPARTMENT {dept_id}"),
    }
}

/// "Clients by Total Requests" → "clients-by-total-requests"
pub fn kebab(title: &str) -> String {
    title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
