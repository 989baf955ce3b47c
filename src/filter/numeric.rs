/// Parses the first number in a displayed value
///
/// Handles the formats the supported sites print: German thousands dots and decimal
/// commas ("1.234,56 €", "42,5 m²"), plain integers ("650 €", "2 Zi."), English decimals
/// from JSON ("890.5") and thousands commas followed by a decimal dot ("1,234.5").
///
/// # Returns
///
/// * `Some(f64)` - The first number found
/// * `None` - If the text contains no digit
///
/// # Examples
///
/// ```
/// use flatwatch::filter::parse_number;
///
/// assert_eq!(parse_number("1.234,56 €"), Some(1234.56));
/// assert_eq!(parse_number("42,5 m²"), Some(42.5));
/// assert_eq!(parse_number("k.A."), None);
/// ```
pub fn parse_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let token: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let token = token.trim_end_matches(['.', ',']);

    let normalized = match (token.rfind('.'), token.rfind(',')) {
        // both present: the later one is the decimal separator
        (Some(dot), Some(comma)) if comma > dot => token.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => token.replace(',', ""),
        (None, Some(_)) => {
            if token.matches(',').count() > 1 {
                token.replace(',', "")
            } else {
                token.replace(',', ".")
            }
        }
        (Some(_), None) => {
            let groups: Vec<&str> = token.split('.').collect();
            if groups.len() > 2 || groups[1..].iter().all(|g| g.len() == 3) {
                token.replace('.', "")
            } else {
                token.to_string()
            }
        }
        (None, None) => token.to_string(),
    };

    normalized.parse().ok()
}
