//! Supported quote currencies, display symbols and region mapping

pub const DEFAULT_CURRENCY: &str = "usd";

/// (code, display symbol)
const CURRENCIES: &[(&str, &str)] = &[
    ("usd", "$"),
    ("cad", "CA$"),
    ("eur", "€"),
    ("gbp", "£"),
    ("ngn", "₦"),
    ("jpy", "¥"),
    ("aud", "A$"),
    ("nzd", "NZ$"),
    ("chf", "CHF"),
    ("zar", "R"),
    ("kes", "KSh"),
    ("ghs", "GH₵"),
    ("brl", "R$"),
    ("mxn", "MX$"),
    ("sgd", "S$"),
    ("hkd", "HK$"),
    ("inr", "₹"),
];

const EURO_AREA: &[&str] = &[
    "IE", "DE", "FR", "NL", "IT", "ES", "PT", "BE", "AT", "FI", "GR", "SK", "SI", "EE", "LV",
    "LT", "CY", "MT",
];

/// Whether `code` is a supported lowercase currency code
pub fn is_supported(code: &str) -> bool {
    CURRENCIES.iter().any(|(c, _)| *c == code)
}

/// All supported currency codes
pub fn supported() -> impl Iterator<Item = &'static str> {
    CURRENCIES.iter().map(|(c, _)| *c)
}

/// Display symbol for a currency, empty for unknown codes
pub fn symbol_for(code: &str) -> &'static str {
    CURRENCIES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| *s)
        .unwrap_or("")
}

/// Map an ISO country code to its supported currency
pub fn currency_for_country(country: &str) -> Option<&'static str> {
    let country = country.trim().to_uppercase();
    if EURO_AREA.contains(&country.as_str()) {
        return Some("eur");
    }

    let code = match country.as_str() {
        "US" => "usd",
        "CA" => "cad",
        "NG" => "ngn",
        "GB" => "gbp",
        "AU" => "aud",
        "NZ" => "nzd",
        "JP" => "jpy",
        "CH" => "chf",
        "ZA" => "zar",
        "KE" => "kes",
        "GH" => "ghs",
        "BR" => "brl",
        "MX" => "mxn",
        "SG" => "sgd",
        "HK" => "hkd",
        "IN" => "inr",
        _ => return None,
    };
    Some(code)
}

/// Render a price with the currency symbol.
///
/// Amounts below 1 keep up to 6 fraction digits, others up to 2.
/// Trailing zeros are dropped and the integer part is grouped by thousands.
pub fn format_price(amount: Option<f64>, currency: &str) -> String {
    let Some(amount) = amount.filter(|a| a.is_finite()) else {
        return "N/A".to_string();
    };

    let precision = if amount.abs() < 1.0 { 6 } else { 2 };
    let fixed = format!("{:.*}", precision, amount.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (fixed.as_str(), ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };

    if frac_part.is_empty() {
        format!("{}{}{}", sign, symbol_for(currency), grouped)
    } else {
        format!("{}{}{}.{}", sign, symbol_for(currency), grouped, frac_part)
    }
}
