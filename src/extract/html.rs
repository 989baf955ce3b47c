//! HTML result-list extraction
//!
//! Each result card matched by the layout's `item` selector becomes one listing. All values are
//! read with [`FieldRule`]s scoped to that card.

use super::ids::{derive_id, IdRule};
use super::rules::{compile_date_format, compile_selector, CompiledRule, FieldRule};
use super::{
    finish_listing, parse_count, ExtractedPage, ExtractionError, ListingExtractor, ListingField,
    FALLBACK_IMAGE,
};
use crate::listing::{Listing, DEFAULT_DATE_FORMAT};
use crate::url::resolve_link;
use crate::{ConfigError, ConfigResult};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

/// One row of a layout's field table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field: ListingField,

    #[serde(flatten)]
    pub rule: FieldRule,
}

impl FieldSpec {
    pub fn new(field: ListingField, rule: FieldRule) -> Self {
        Self { field, rule }
    }
}

/// Declarative description of an HTML result list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlLayout {
    /// CSS selector matching one result card
    pub item: String,

    /// How the id is read from a card
    pub id: IdRule,

    /// Field table, evaluated in order inside each card
    #[serde(default)]
    pub fields: Vec<FieldSpec>,

    /// Gallery images inside a card; every match is collected
    #[serde(default)]
    pub images: Option<FieldRule>,

    /// Result count shown on the page, evaluated against the whole document
    #[serde(rename = "result-count", default)]
    pub result_count: Option<FieldRule>,

    /// Base for resolving relative links, normally the site root
    #[serde(rename = "base-url", default)]
    pub base_url: Option<String>,

    #[serde(rename = "fallback-image", default)]
    pub fallback_image: Option<String>,

    /// Display format of "today" when a card shows no start date
    #[serde(rename = "date-format", default = "default_date_format")]
    pub date_format: String,
}

impl HtmlLayout {
    /// Creates a layout with an item selector and id rule and nothing else
    pub fn new(item: &str, id: IdRule) -> Self {
        Self {
            item: item.to_string(),
            id,
            fields: Vec::new(),
            images: None,
            result_count: None,
            base_url: None,
            fallback_image: None,
            date_format: default_date_format(),
        }
    }

    pub fn field(mut self, field: ListingField, rule: FieldRule) -> Self {
        self.fields.push(FieldSpec::new(field, rule));
        self
    }

    pub fn images(mut self, rule: FieldRule) -> Self {
        self.images = Some(rule);
        self
    }

    pub fn result_count(mut self, rule: FieldRule) -> Self {
        self.result_count = Some(rule);
        self
    }

    pub fn base_url(mut self, base: &str) -> Self {
        self.base_url = Some(base.to_string());
        self
    }

    pub fn fallback_image(mut self, image: &str) -> Self {
        self.fallback_image = Some(image.to_string());
        self
    }
}

/// Compiled [`HtmlLayout`]
#[derive(Debug)]
pub struct HtmlExtractor {
    source: String,
    item: Selector,
    id: CompiledRule,
    hashed_id: bool,
    fields: Vec<(ListingField, CompiledRule)>,
    images: Option<CompiledRule>,
    result_count: Option<CompiledRule>,
    base_url: Option<Url>,
    fallback_image: String,
    date_format: String,
}

impl HtmlExtractor {
    /// Compiles `layout` for `source`
    ///
    /// # Returns
    ///
    /// * `Ok(HtmlExtractor)` - Ready to extract
    /// * `Err(ConfigError)` - If a selector, pattern or the base URL is invalid
    pub fn new(source: &str, layout: &HtmlLayout) -> ConfigResult<Self> {
        // the id is always required, whatever the table says
        let mut id_rule = layout.id.rule.clone();
        id_rule.required = true;

        let fields = layout
            .fields
            .iter()
            .map(|spec| Ok((spec.field, spec.rule.compile(spec.field.as_str())?)))
            .collect::<ConfigResult<Vec<_>>>()?;

        let base_url = layout
            .base_url
            .as_deref()
            .map(|base| {
                Url::parse(base).map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", base, e)))
            })
            .transpose()?;

        Ok(Self {
            source: source.to_string(),
            item: compile_selector(&layout.item)?,
            id: id_rule.compile("id")?,
            hashed_id: layout.id.hashed,
            fields,
            images: layout.images.as_ref().map(|r| r.compile("images")).transpose()?,
            result_count: layout
                .result_count
                .as_ref()
                .map(|r| r.compile("result-count"))
                .transpose()?,
            base_url,
            fallback_image: layout
                .fallback_image
                .clone()
                .unwrap_or_else(|| FALLBACK_IMAGE.to_string()),
            date_format: compile_date_format(&layout.date_format)?,
        })
    }

    fn extract_item(&self, card: ElementRef<'_>) -> Result<Listing, ExtractionError> {
        let raw_id = self.id.resolve(card)?;
        let id = derive_id(&raw_id, self.hashed_id)?;

        let mut listing = Listing::new(id, self.source.as_str());
        for (field, rule) in &self.fields {
            let value = rule.resolve(card)?;
            field.apply(&mut listing, value, self.base_url.as_ref());
        }

        if let Some(images) = &self.images {
            listing.images = images
                .evaluate_all(card)
                .iter()
                .map(|href| resolve_link(href, self.base_url.as_ref()))
                .filter(|href| !href.is_empty())
                .collect();
        }

        finish_listing(&mut listing, &self.fallback_image, &self.date_format);
        Ok(listing)
    }
}

impl ListingExtractor for HtmlExtractor {
    fn source(&self) -> &str {
        &self.source
    }

    fn extract(&self, page: &str) -> ExtractedPage {
        let document = Html::parse_document(page);

        let result_count = self
            .result_count
            .as_ref()
            .and_then(|rule| rule.evaluate(document.root_element()))
            .and_then(|text| parse_count(&text));

        let mut extracted = ExtractedPage {
            result_count,
            ..ExtractedPage::default()
        };

        for card in document.select(&self.item) {
            match self.extract_item(card) {
                Ok(listing) => extracted.listings.push(listing),
                Err(e) => {
                    warn!(source = %self.source, "Skipping listing: {}", e);
                    extracted.rejected += 1;
                }
            }
        }

        debug!(
            source = %self.source,
            listings = extracted.listings.len(),
            rejected = extracted.rejected,
            result_count = ?extracted.result_count,
            "Extracted page"
        );
        extracted
    }
}
