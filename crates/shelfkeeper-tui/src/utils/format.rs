/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Truncate or right-pad with spaces to exactly `width` characters
pub fn pad_to_width(s: &str, width: usize) -> String {
    let truncated = truncate_string(s, width);
    let len = truncated.chars().count();
    format!("{}{}", truncated, " ".repeat(width.saturating_sub(len)))
}

/// Format a price with thousands separators. Whole amounts drop the decimals.
pub fn format_price(value: f64) -> String {
    let negative = value < 0.0;
    let abs = value.abs();
    let whole = abs.trunc() as u64;
    let cents = ((abs - abs.trunc()) * 100.0).round() as u64;

    // Rounding can carry into the whole part
    let (whole, cents) = if cents >= 100 { (whole + 1, 0) } else { (whole, cents) };

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    if cents == 0 {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{:02}", sign, grouped, cents)
    }
}
