//! Declarative field-extraction rules
//!
//! A [`FieldRule`] describes how one value is read from an HTML element: which descendant to
//! select, whether to read text or an attribute, and how to clean the raw string up. Rules are
//! plain data so that a source's whole extraction table can live in the configuration file.
//! They are compiled once at startup into [`CompiledRule`]s; an invalid selector or pattern
//! is a configuration error, never a crawl-time failure.

use super::ExtractionError;
use crate::{ConfigError, ConfigResult};
use chrono::format::{Item, StrftimeItems};
use regex::Regex;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};

/// How to read one value from an element
///
/// Evaluation order:
/// 1. pick the element (`selector` relative to the scope, or the scope itself)
/// 2. read the first non-empty attribute from `attrs`, or the element text when `attrs` is empty
/// 3. collapse whitespace, drop every `remove` substring
/// 4. apply `pattern` (capture group 1 if present, else the whole match) at `occurrence`
/// 5. wrap the non-empty result in `prefix` / `suffix`
///
/// An empty result falls back to `fallback`; a `required` rule without a value rejects the
/// listing it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRule {
    /// CSS selector relative to the scope element, `None` for the scope itself
    pub selector: Option<String>,

    /// Which selector match to use; `None` uses the first match that yields a value
    pub index: Option<usize>,

    /// Attributes to try in order; empty reads the element text
    pub attrs: Vec<String>,

    /// Regular expression narrowing the value
    pub pattern: Option<String>,

    /// Which pattern match to use (0-based)
    pub occurrence: usize,

    /// Substrings deleted from the raw value
    pub remove: Vec<String>,

    pub prefix: String,
    pub suffix: String,

    /// Reject the whole listing when no value is found
    pub required: bool,

    /// Value used when nothing is found
    pub fallback: Option<String>,
}

impl FieldRule {
    /// Rule selecting the first descendant matching `selector`
    pub fn select(selector: &str) -> Self {
        Self {
            selector: Some(selector.to_string()),
            ..Self::default()
        }
    }

    /// Rule reading the scope element itself
    pub fn itself() -> Self {
        Self::default()
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn attr(mut self, attr: &str) -> Self {
        self.attrs.push(attr.to_string());
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn occurrence(mut self, occurrence: usize) -> Self {
        self.occurrence = occurrence;
        self
    }

    pub fn remove(mut self, text: &str) -> Self {
        self.remove.push(text.to_string());
        self
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn suffix(mut self, suffix: &str) -> Self {
        self.suffix = suffix.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn fallback(mut self, value: &str) -> Self {
        self.fallback = Some(value.to_string());
        self
    }

    /// Compiles the rule
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the value this rule produces, used in errors
    ///
    /// # Returns
    ///
    /// * `Ok(CompiledRule)` - Ready to evaluate
    /// * `Err(ConfigError)` - If the selector or the pattern does not compile
    pub fn compile(&self, name: &str) -> ConfigResult<CompiledRule> {
        let selector = match &self.selector {
            Some(css) => Some(compile_selector(css)?),
            None => None,
        };

        Ok(CompiledRule {
            name: name.to_string(),
            selector,
            index: self.index,
            attrs: self.attrs.clone(),
            refine: Refinement::new(
                self.pattern.as_deref(),
                self.occurrence,
                self.remove.clone(),
                &self.prefix,
                &self.suffix,
            )?,
            required: self.required,
            fallback: self.fallback.clone(),
        })
    }
}

/// Parses a CSS selector, mapping failures to a configuration error
pub fn compile_selector(css: &str) -> ConfigResult<Selector> {
    Selector::parse(css).map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", css, e)))
}

/// Compiles a regular expression, mapping failures to a configuration error
pub fn compile_pattern(pattern: &str) -> ConfigResult<Regex> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))
}

/// Checks a chrono display format, rejecting unknown `%` specifiers
pub fn compile_date_format(format: &str) -> ConfigResult<String> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::Validation(format!(
            "date-format '{}' is not a valid chrono format",
            format
        )));
    }
    Ok(format.to_string())
}

/// Collapses every run of whitespace into a single space and trims both ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text clean-up steps shared by HTML and JSON rules
#[derive(Debug, Clone)]
pub struct Refinement {
    pattern: Option<Regex>,
    occurrence: usize,
    remove: Vec<String>,
    prefix: String,
    suffix: String,
}

impl Refinement {
    pub fn new(
        pattern: Option<&str>,
        occurrence: usize,
        remove: Vec<String>,
        prefix: &str,
        suffix: &str,
    ) -> ConfigResult<Self> {
        Ok(Self {
            pattern: pattern.map(compile_pattern).transpose()?,
            occurrence,
            remove,
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Cleans up a raw value, returning `None` if nothing is left
    pub fn apply(&self, raw: &str) -> Option<String> {
        let mut text = normalize_whitespace(raw);
        if !self.remove.is_empty() {
            for needle in &self.remove {
                text = text.replace(needle.as_str(), "");
            }
            text = normalize_whitespace(&text);
        }

        if let Some(pattern) = &self.pattern {
            let caps = pattern.captures_iter(&text).nth(self.occurrence)?;
            let matched = caps.get(1).or_else(|| caps.get(0))?;
            text = matched.as_str().trim().to_string();
        }

        if text.is_empty() {
            return None;
        }
        Some(format!("{}{}{}", self.prefix, text, self.suffix))
    }
}

/// A [`FieldRule`] ready for evaluation
#[derive(Debug, Clone)]
pub struct CompiledRule {
    name: String,
    selector: Option<Selector>,
    index: Option<usize>,
    attrs: Vec<String>,
    refine: Refinement,
    required: bool,
    fallback: Option<String>,
}

impl CompiledRule {
    /// Name of the value this rule produces
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluates the rule inside `scope`, without fallback
    pub fn evaluate(&self, scope: ElementRef<'_>) -> Option<String> {
        match (&self.selector, self.index) {
            (None, _) => self.value_of(scope),
            (Some(selector), Some(index)) => scope
                .select(selector)
                .nth(index)
                .and_then(|element| self.value_of(element)),
            (Some(selector), None) => scope
                .select(selector)
                .find_map(|element| self.value_of(element)),
        }
    }

    /// Evaluates the rule on every selector match, in document order
    pub fn evaluate_all(&self, scope: ElementRef<'_>) -> Vec<String> {
        match &self.selector {
            None => self.value_of(scope).into_iter().collect(),
            Some(selector) => scope
                .select(selector)
                .filter_map(|element| self.value_of(element))
                .collect(),
        }
    }

    /// Reads the element that follows the selector match whose text equals `label`
    ///
    /// Definition-list style pages put a label ("Bezug") and its value in sibling elements.
    /// The label comparison ignores case and surrounding whitespace.
    pub fn evaluate_labelled(&self, scope: ElementRef<'_>, label: &str) -> Option<String> {
        let selector = self.selector.as_ref()?;
        let label = normalize_whitespace(label).to_lowercase();

        scope
            .select(selector)
            .filter(|element| {
                normalize_whitespace(&element.text().collect::<String>()).to_lowercase() == label
            })
            .find_map(|element| {
                element
                    .next_siblings()
                    .find_map(ElementRef::wrap)
                    .and_then(|value| self.value_of(value))
            })
    }

    /// Evaluates the rule and applies the fallback
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The value, the fallback, or an empty string for optional rules
    /// * `Err(ExtractionError::MissingField)` - If a required rule found nothing
    pub fn resolve(&self, scope: ElementRef<'_>) -> Result<String, ExtractionError> {
        if let Some(value) = self.evaluate(scope) {
            return Ok(value);
        }
        if let Some(fallback) = &self.fallback {
            return Ok(fallback.clone());
        }
        if self.required {
            return Err(ExtractionError::MissingField {
                field: self.name.clone(),
            });
        }
        Ok(String::new())
    }

    fn value_of(&self, element: ElementRef<'_>) -> Option<String> {
        let raw = if self.attrs.is_empty() {
            element.text().collect::<Vec<_>>().join(" ")
        } else {
            self.attrs
                .iter()
                .filter_map(|attr| element.value().attr(attr))
                .find(|value| !value.trim().is_empty())?
                .to_string()
        };
        self.refine.apply(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    const CARD: &str = r#"
        <html><body>
        <article class="card" data-adid="4711">
            <h2 class="title">  NEU  Helle
                Altbauwohnung </h2>
            <ul>
                <li class="tag">42 m²</li>
                <li class="tag">2 Zimmer</li>
            </ul>
            <div class="img" style="background-image: url(https://img.example/a.jpg);"></div>
            <img class="lazy" data-lazy-src="https://img.example/b.jpg">
            <dl><dt>Bezug</dt><dd>sofort</dd><dt>Etage</dt><dd>3</dd></dl>
        </article>
        </body></html>
    "#;

    fn with_card<F: FnOnce(ElementRef<'_>)>(f: F) {
        let document = Html::parse_document(CARD);
        let selector = Selector::parse("article.card").unwrap();
        let card = document.select(&selector).next().unwrap();
        f(card);
    }

    #[test]
    fn test_text_is_normalized_and_cleaned() {
        with_card(|card| {
            let rule = FieldRule::select("h2.title").remove("NEU").compile("title").unwrap();
            assert_eq!(rule.evaluate(card).as_deref(), Some("Helle Altbauwohnung"));
        });
    }

    #[test]
    fn test_attribute_on_scope() {
        with_card(|card| {
            let rule = FieldRule::itself().attr("data-adid").compile("id").unwrap();
            assert_eq!(rule.evaluate(card).as_deref(), Some("4711"));
        });
    }

    #[test]
    fn test_attribute_order_and_pattern() {
        with_card(|card| {
            let lazy = FieldRule::select("img.lazy")
                .attr("src")
                .attr("data-lazy-src")
                .compile("image")
                .unwrap();
            assert_eq!(lazy.evaluate(card).as_deref(), Some("https://img.example/b.jpg"));

            let styled = FieldRule::select("div.img")
                .attr("style")
                .pattern(r"background-image: url\((.*?)\)")
                .compile("image")
                .unwrap();
            assert_eq!(styled.evaluate(card).as_deref(), Some("https://img.example/a.jpg"));
        });
    }

    #[test]
    fn test_index_and_suffix() {
        with_card(|card| {
            let rooms = FieldRule::select("li.tag")
                .nth(1)
                .pattern(r"(\d+)")
                .suffix(" Zi.")
                .compile("rooms")
                .unwrap();
            assert_eq!(rooms.evaluate(card).as_deref(), Some("2 Zi."));

            let missing = FieldRule::select("li.tag").nth(5).compile("rooms").unwrap();
            assert_eq!(missing.evaluate(card), None);
        });
    }

    #[test]
    fn test_occurrence() {
        let refine = Refinement::new(
            Some(r"(\d{2}\.\d{2}\.\d{4})"),
            1,
            Vec::new(),
            "",
            "",
        )
        .unwrap();
        assert_eq!(
            refine.apply("01.05.2024 - 31.10.2024").as_deref(),
            Some("31.10.2024")
        );
        assert_eq!(refine.apply("ab 01.05.2024"), None);
    }

    #[test]
    fn test_labelled_value() {
        with_card(|card| {
            let rule = FieldRule::select("dt").compile("from").unwrap();
            assert_eq!(rule.evaluate_labelled(card, "bezug").as_deref(), Some("sofort"));
            assert_eq!(rule.evaluate_labelled(card, "Etage").as_deref(), Some("3"));
            assert_eq!(rule.evaluate_labelled(card, "Kaution"), None);
        });
    }

    #[test]
    fn test_resolve_fallback_and_required() {
        with_card(|card| {
            let optional = FieldRule::select(".nothing").compile("address").unwrap();
            assert_eq!(optional.resolve(card).unwrap(), "");

            let with_fallback = FieldRule::select(".nothing")
                .fallback("keine Angabe")
                .compile("address")
                .unwrap();
            assert_eq!(with_fallback.resolve(card).unwrap(), "keine Angabe");

            let required = FieldRule::select(".nothing").required().compile("size").unwrap();
            match required.resolve(card) {
                Err(ExtractionError::MissingField { field }) => assert_eq!(field, "size"),
                other => panic!("expected missing field, got {:?}", other),
            }
        });
    }

    #[test]
    fn test_evaluate_all() {
        with_card(|card| {
            let rule = FieldRule::select("li.tag").compile("tags").unwrap();
            assert_eq!(rule.evaluate_all(card), vec!["42 m²", "2 Zimmer"]);
        });
    }

    #[test]
    fn test_invalid_selector_and_pattern() {
        assert!(matches!(
            FieldRule::select("div[").compile("x"),
            Err(ConfigError::InvalidSelector(_))
        ));
        assert!(matches!(
            FieldRule::itself().pattern("(unclosed").compile("x"),
            Err(ConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_date_format_checked() {
        assert_eq!(compile_date_format("%d.%m.%Y").unwrap(), "%d.%m.%Y");
        assert!(compile_date_format("%B %Y").is_ok());
        assert!(matches!(
            compile_date_format("%Q"),
            Err(ConfigError::Validation(_))
        ));
        assert!(compile_date_format("%d.%").is_err());
    }

    #[test]
    fn test_rule_from_toml() {
        let rule: FieldRule = toml::from_str(
            r#"
            selector = "div.middle .col-xs-3"
            attrs = ["title"]
            index = 0
            required = true
            "#,
        )
        .unwrap();
        assert_eq!(rule.selector.as_deref(), Some("div.middle .col-xs-3"));
        assert_eq!(rule.index, Some(0));
        assert!(rule.required);
        assert!(rule.remove.is_empty());
    }
}
