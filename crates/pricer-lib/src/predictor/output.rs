//! Prediction output post-processing
//!
//! Prices are rounded half-to-even, matching how the training stack rounds
//! and formats currency.

/// Currency suffix for formatted prices
pub const CURRENCY: &str = "SAR";

/// Round a raw model output to whole currency units
pub fn round_price(raw: f64) -> f64 {
    raw.round_ties_even()
}

/// Thousands-separated price with no decimals, e.g. `"123,457 SAR"`
pub fn format_price(price: f64) -> String {
    let rounded = round_price(price);
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{}{} {}", sign, grouped, CURRENCY)
}
