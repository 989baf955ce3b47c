use crate::listing::Listing;

/// Renders notification text from a template with `{field}` placeholders
///
/// Field names are those of [`Listing::field`]. Unknown placeholders are kept verbatim so
/// that a typo shows up in the message instead of vanishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRenderer {
    template: String,
}

impl MessageRenderer {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn render(&self, listing: &Listing) -> String {
        render_message(&self.template, listing)
    }
}

/// Substitutes listing fields into `template`
///
/// # Examples
///
/// ```
/// use flatwatch::listing::Listing;
/// use flatwatch::output::render_message;
///
/// let mut listing = Listing::new(1, "immowelt");
/// listing.title = "Altbau".to_string();
/// assert_eq!(render_message("{title} ({source})", &listing), "Altbau (immowelt)");
/// ```
pub fn render_message(template: &str, listing: &Listing) -> String {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];

        if name.contains('{') {
            // stray brace, the placeholder starts later
            out.push('{');
            rest = after;
            continue;
        }

        match listing.field(name) {
            Some(value) => out.push_str(&value),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MESSAGE_TEMPLATE;

    fn listing() -> Listing {
        let mut listing = Listing::new(42, "wg-gesucht");
        listing.title = "Sonniges WG-Zimmer".to_string();
        listing.rooms = "1".to_string();
        listing.size = "18 m²".to_string();
        listing.price = "520 €".to_string();
        listing.url = "https://www.wg-gesucht.de/42.html".to_string();
        listing
    }

    #[test]
    fn test_default_template() {
        let text = MessageRenderer::new(DEFAULT_MESSAGE_TEMPLATE).render(&listing());
        assert_eq!(
            text,
            "Sonniges WG-Zimmer\nZimmer: 1\nGröße: 18 m²\nPreis: 520 €\n\nhttps://www.wg-gesucht.de/42.html"
        );
    }

    #[test]
    fn test_unknown_placeholder_is_kept() {
        assert_eq!(render_message("{title} {bogus}", &listing()), "Sonniges WG-Zimmer {bogus}");
    }

    #[test]
    fn test_unbalanced_braces() {
        assert_eq!(render_message("{ {id}", &listing()), "{ 42");
        assert_eq!(render_message("price {price", &listing()), "price {price");
        assert_eq!(render_message("no placeholders", &listing()), "no placeholders");
    }

    #[test]
    fn test_missing_values_render_empty() {
        assert_eq!(render_message("[{address}]", &listing()), "[]");
    }
}
