/// Renders an amount held in minor units (cents) as `"USD 12.34"`, or just
/// `"12.34"` when no currency is known.
pub fn format_minor_units(amount: i64, currency: Option<&str>) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    let value = format!("{}{}.{:02}", sign, abs / 100, abs % 100);

    match currency.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => format!("{} {}", code.to_uppercase(), value),
        None => value,
    }
}
