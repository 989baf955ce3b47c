//! Listing detail pages
//!
//! Result cards rarely show when a flat becomes available. For sources that opt in, the
//! listing's own page is fetched and read with a [`DetailRule`] to fill `available_from`.

use super::rules::{compile_date_format, compile_pattern, CompiledRule, FieldRule};
use crate::listing::{format_date, today, DEFAULT_DATE_FORMAT};
use chrono::NaiveDate;
use crate::ConfigResult;
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

/// Wording that means "available now" on the supported sites
pub const IMMEDIATE_PATTERN: &str = r"(?i)sofort|nach vereinbarung|ab jetzt";

const GERMAN_MONTHS: [&str; 12] = [
    "januar",
    "februar",
    "märz",
    "april",
    "mai",
    "juni",
    "juli",
    "august",
    "september",
    "oktober",
    "november",
    "dezember",
];

/// How the availability date is read from a detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRule {
    /// Rule evaluated against the whole page
    #[serde(flatten)]
    pub rule: FieldRule,

    /// When set, the value is the element after the selector match whose text is `label`
    #[serde(default)]
    pub label: Option<String>,

    /// Values matching this pattern mean "available now"
    #[serde(default)]
    pub immediate: Option<String>,

    #[serde(rename = "date-format", default = "default_date_format")]
    pub date_format: String,
}

impl DetailRule {
    pub fn new(rule: FieldRule) -> Self {
        Self {
            rule,
            label: None,
            immediate: Some(IMMEDIATE_PATTERN.to_string()),
            date_format: default_date_format(),
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }
}

/// Compiled [`DetailRule`]
#[derive(Debug)]
pub struct DetailExtractor {
    rule: CompiledRule,
    label: Option<String>,
    immediate: Option<Regex>,
    month_year: Regex,
    date_format: String,
}

impl DetailExtractor {
    pub fn new(rule: &DetailRule) -> ConfigResult<Self> {
        Ok(Self {
            rule: rule.rule.compile("available-from")?,
            label: rule.label.clone(),
            immediate: rule.immediate.as_deref().map(compile_pattern).transpose()?,
            month_year: compile_pattern(&format!(
                r"(?i)\b({})\s+(\d{{4}})\b",
                GERMAN_MONTHS.join("|")
            ))?,
            date_format: compile_date_format(&rule.date_format)?,
        })
    }

    /// Reads the availability date from a listing's detail page
    ///
    /// # Returns
    ///
    /// * today's date if nothing is found or the value means "immediately"
    /// * the first of the month for a month-and-year value such as "Mai 2024"
    /// * the value as shown otherwise
    pub fn available_from(&self, page: &str) -> String {
        let document = Html::parse_document(page);
        let root = document.root_element();

        let value = match &self.label {
            Some(label) => self.rule.evaluate_labelled(root, label),
            None => self.rule.evaluate(root),
        };

        match value {
            None => today(&self.date_format),
            Some(text) => self.normalize(&text),
        }
    }

    fn normalize(&self, text: &str) -> String {
        if self
            .immediate
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(text))
        {
            return today(&self.date_format);
        }

        if let Some(caps) = self.month_year.captures(text) {
            let month = caps[1].to_lowercase();
            let date = GERMAN_MONTHS
                .iter()
                .position(|m| *m == month)
                .zip(caps[2].parse::<i32>().ok())
                .and_then(|(pos, year)| NaiveDate::from_ymd_opt(year, pos as u32 + 1, 1));
            if let Some(date) = date {
                return format_date(date, &self.date_format);
            }
        }

        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(detail: &str) -> String {
        format!(
            r#"<html><body><ul>
                 <li class="addetailslist--detail">Wohnfläche 40 m²</li>
                 <li class="addetailslist--detail">{detail}</li>
               </ul></body></html>"#
        )
    }

    fn kleinanzeigen() -> DetailExtractor {
        let rule = DetailRule::new(
            FieldRule::select("li.addetailslist--detail").pattern(r"Verfügbar ab\s*(.+)"),
        );
        DetailExtractor::new(&rule).unwrap()
    }

    #[test]
    fn test_month_year() {
        let extractor = kleinanzeigen();
        assert_eq!(extractor.available_from(&page("Verfügbar ab Mai 2024")), "01.05.2024");
        assert_eq!(extractor.available_from(&page("Verfügbar ab März 2025")), "01.03.2025");
    }

    #[test]
    fn test_month_year_uses_date_format() {
        let mut rule = DetailRule::new(
            FieldRule::select("li.addetailslist--detail").pattern(r"Verfügbar ab\s*(.+)"),
        );
        rule.date_format = "%Y-%m-%d".to_string();
        let extractor = DetailExtractor::new(&rule).unwrap();
        assert_eq!(extractor.available_from(&page("Verfügbar ab Mai 2024")), "2024-05-01");
    }

    #[test]
    fn test_bad_date_format_rejected() {
        let mut rule = DetailRule::new(FieldRule::select("li"));
        rule.date_format = "%Q".to_string();
        assert!(DetailExtractor::new(&rule).is_err());
    }

    #[test]
    fn test_exact_date_kept() {
        let extractor = kleinanzeigen();
        assert_eq!(
            extractor.available_from(&page("Verfügbar ab 15.07.2024")),
            "15.07.2024"
        );
    }

    #[test]
    fn test_missing_and_immediate_mean_today() {
        let extractor = kleinanzeigen();
        let today = today(DEFAULT_DATE_FORMAT);
        assert_eq!(extractor.available_from(&page("Etage 2")), today);
        assert_eq!(extractor.available_from(&page("Verfügbar ab sofort")), today);
    }

    #[test]
    fn test_labelled_detail() {
        let rule = DetailRule::new(FieldRule::select("div.equipment p")).label("Bezug");
        let extractor = DetailExtractor::new(&rule).unwrap();

        let page = r#"<div class="equipment"><p>Bezug</p><p>01.09.2024</p><p>Haustiere</p><p>Ja</p></div>"#;
        assert_eq!(extractor.available_from(page), "01.09.2024");

        let page = r#"<div class="equipment"><p>Bezug</p><p>Nach Vereinbarung</p></div>"#;
        assert_eq!(extractor.available_from(page), today(DEFAULT_DATE_FORMAT));
    }
}
