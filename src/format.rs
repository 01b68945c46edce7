/// Group the digits of an integer with thousands separators
pub fn format_grouped_int(value: i64) -> String {
    let grouped = group_digits(&value.unsigned_abs().to_string());
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Insert a comma every three digits, counting from the right
fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format an amount with two decimal places and thousands separators
pub fn format_amount(value: f64) -> String {
    let rounded = format!("{:.2}", value);
    let (whole, frac) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let negative = whole.starts_with('-');
    let digits = whole.trim_start_matches('-');
    let grouped = group_digits(digits);

    // "-0.00" is not worth a sign
    if negative && (digits != "0" || frac != "00") {
        format!("-{}.{}", grouped, frac)
    } else {
        format!("{}.{}", grouped, frac)
    }
}

/// Amount prefixed with a currency symbol
pub fn format_money(value: f64, currency_symbol: &str) -> String {
    let formatted = format_amount(value);
    match formatted.strip_prefix('-') {
        Some(rest) => format!("-{}{}", currency_symbol, rest),
        None => format!("{}{}", currency_symbol, formatted),
    }
}

/// Render a number the way a JavaScript `String(n)` would: `100`, `100.5`
pub fn js_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
