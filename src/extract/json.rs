//! Embedded-JSON result-list extraction
//!
//! Some result pages ship their data as a JSON document, either as the whole response or
//! embedded in a script. Entries are located by key anywhere in the document (like the
//! JSONPath `$..key`), and values are read from each entry with JSON pointers.

use super::ids::derive_id;
use super::rules::{compile_date_format, compile_pattern, compile_selector, Refinement};
use super::{
    finish_listing, parse_count, ExtractedPage, ExtractionError, ListingExtractor, ListingField,
    FALLBACK_IMAGE,
};
use crate::listing::{Listing, DEFAULT_DATE_FORMAT};
use crate::{ConfigError, ConfigResult};
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

/// Where the JSON document sits in the fetched page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum JsonEmbed {
    /// The page is the JSON document
    #[default]
    Document,

    /// The text of the first element matching `selector`, usually a script tag
    Script { selector: String },

    /// Capture group 1 of `pattern` applied to the raw page
    Pattern { pattern: String },
}

/// Pointer to the entry id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonIdRule {
    pub pointer: String,

    #[serde(default)]
    pub hashed: bool,
}

/// One row of a JSON layout's field table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonFieldSpec {
    pub field: ListingField,

    /// JSON pointer relative to the entry, e.g. `/price/value`
    pub pointer: String,

    #[serde(default)]
    pub pattern: Option<String>,

    #[serde(default)]
    pub suffix: String,
}

impl JsonFieldSpec {
    pub fn new(field: ListingField, pointer: &str) -> Self {
        Self {
            field,
            pointer: pointer.to_string(),
            pattern: None,
            suffix: String::new(),
        }
    }
}

/// Gallery image location inside an entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonImages {
    /// Key of the gallery container, searched anywhere in the entry
    pub within: String,

    /// Key of the image link, searched anywhere in the gallery
    pub key: String,

    /// Links are cut right after this marker, dropping size/format suffixes
    #[serde(rename = "cut-after", default)]
    pub cut_after: Option<String>,
}

/// Declarative description of an embedded JSON result list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonLayout {
    #[serde(default)]
    pub embed: JsonEmbed,

    /// Key whose values are the result entries; arrays are flattened
    #[serde(rename = "entries-key")]
    pub entries_key: String,

    pub id: JsonIdRule,

    #[serde(default)]
    pub fields: Vec<JsonFieldSpec>,

    #[serde(default)]
    pub images: Option<JsonImages>,

    /// Listing URL built from the id, e.g. `https://www.immobilienscout24.de/expose/{id}`
    #[serde(rename = "url-template", default)]
    pub url_template: Option<String>,

    /// Key of the total result count, searched anywhere in the document
    #[serde(rename = "result-count-key", default)]
    pub result_count_key: Option<String>,

    #[serde(rename = "fallback-image", default)]
    pub fallback_image: Option<String>,

    #[serde(rename = "date-format", default = "default_date_format")]
    pub date_format: String,
}

#[derive(Debug)]
enum CompiledEmbed {
    Document,
    Script(Selector),
    Pattern(Regex),
}

/// Compiled [`JsonLayout`]
#[derive(Debug)]
pub struct JsonExtractor {
    source: String,
    embed: CompiledEmbed,
    entries_key: String,
    id_pointer: String,
    hashed_id: bool,
    fields: Vec<(ListingField, String, Refinement)>,
    images: Option<JsonImages>,
    url_template: Option<String>,
    result_count_key: Option<String>,
    fallback_image: String,
    date_format: String,
}

fn check_pointer(pointer: &str) -> ConfigResult<()> {
    if pointer.is_empty() || pointer.starts_with('/') {
        Ok(())
    } else {
        Err(ConfigError::InvalidPattern(format!(
            "JSON pointer '{}' must start with '/'",
            pointer
        )))
    }
}

impl JsonExtractor {
    /// Compiles `layout` for `source`
    pub fn new(source: &str, layout: &JsonLayout) -> ConfigResult<Self> {
        let embed = match &layout.embed {
            JsonEmbed::Document => CompiledEmbed::Document,
            JsonEmbed::Script { selector } => CompiledEmbed::Script(compile_selector(selector)?),
            JsonEmbed::Pattern { pattern } => CompiledEmbed::Pattern(compile_pattern(pattern)?),
        };

        check_pointer(&layout.id.pointer)?;
        let mut fields = Vec::with_capacity(layout.fields.len());
        for spec in &layout.fields {
            check_pointer(&spec.pointer)?;
            let refine =
                Refinement::new(spec.pattern.as_deref(), 0, Vec::new(), "", &spec.suffix)?;
            fields.push((spec.field, spec.pointer.clone(), refine));
        }

        Ok(Self {
            source: source.to_string(),
            embed,
            entries_key: layout.entries_key.clone(),
            id_pointer: layout.id.pointer.clone(),
            hashed_id: layout.id.hashed,
            fields,
            images: layout.images.clone(),
            url_template: layout.url_template.clone(),
            result_count_key: layout.result_count_key.clone(),
            fallback_image: layout
                .fallback_image
                .clone()
                .unwrap_or_else(|| FALLBACK_IMAGE.to_string()),
            date_format: compile_date_format(&layout.date_format)?,
        })
    }

    /// Locates and parses the JSON document inside `page`
    fn document(&self, page: &str) -> Option<Value> {
        let text = match &self.embed {
            CompiledEmbed::Document => page.to_string(),
            CompiledEmbed::Script(selector) => {
                let html = Html::parse_document(page);
                let script = html.select(selector).next()?;
                script.text().collect::<String>()
            }
            CompiledEmbed::Pattern(pattern) => pattern.captures(page)?.get(1)?.as_str().to_string(),
        };

        match serde_json::from_str(text.trim()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(source = %self.source, "Embedded JSON is malformed: {}", e);
                None
            }
        }
    }

    fn extract_entry(&self, entry: &Value) -> Result<Listing, ExtractionError> {
        if !entry.is_object() {
            return Err(ExtractionError::Json(format!(
                "entry is not an object: {}",
                entry
            )));
        }

        let raw_id = entry
            .pointer(&self.id_pointer)
            .and_then(scalar_text)
            .ok_or_else(|| ExtractionError::MissingField {
                field: "id".to_string(),
            })?;
        let id = derive_id(&raw_id, self.hashed_id)?;

        let mut listing = Listing::new(id, self.source.as_str());
        if let Some(template) = &self.url_template {
            listing.url = template.replace("{id}", &id.to_string());
        }

        for (field, pointer, refine) in &self.fields {
            if let Some(value) = entry
                .pointer(pointer)
                .and_then(scalar_text)
                .and_then(|raw| refine.apply(&raw))
            {
                field.apply(&mut listing, value, None);
            }
        }

        if let Some(images) = &self.images {
            listing.images = gallery_images(entry, images);
        }

        finish_listing(&mut listing, &self.fallback_image, &self.date_format);
        Ok(listing)
    }
}

impl ListingExtractor for JsonExtractor {
    fn source(&self) -> &str {
        &self.source
    }

    fn extract(&self, page: &str) -> ExtractedPage {
        let Some(document) = self.document(page) else {
            debug!(source = %self.source, "No JSON document found on page");
            return ExtractedPage::default();
        };

        let result_count = self
            .result_count_key
            .as_deref()
            .and_then(|key| find_key(&document, key).into_iter().find_map(scalar_text))
            .and_then(|text| parse_count(&text));

        let mut extracted = ExtractedPage {
            result_count,
            ..ExtractedPage::default()
        };

        for entry in find_key(&document, &self.entries_key) {
            match self.extract_entry(entry) {
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
            "Extracted JSON page"
        );
        extracted
    }
}

/// Text of a scalar JSON value; objects, arrays and null have none
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Collects the values of every `key` member anywhere below `value`
///
/// Array values are flattened into their elements. The search does not descend into a
/// matched value.
fn find_key<'a>(value: &'a Value, key: &str) -> Vec<&'a Value> {
    let mut found = Vec::new();
    collect_key(value, key, &mut found);
    found
}

fn collect_key<'a>(value: &'a Value, key: &str, found: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (name, child) in map {
                if name == key {
                    match child {
                        Value::Array(items) => found.extend(items.iter()),
                        other => found.push(other),
                    }
                } else {
                    collect_key(child, key, found);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_key(item, key, found);
            }
        }
        _ => {}
    }
}

fn gallery_images(entry: &Value, images: &JsonImages) -> Vec<String> {
    find_key(entry, &images.within)
        .into_iter()
        .flat_map(|gallery| find_key(gallery, &images.key))
        .filter_map(scalar_text)
        .map(|link| match &images.cut_after {
            Some(marker) => match link.find(marker.as_str()) {
                Some(pos) => link[..pos + marker.len()].to_string(),
                None => link,
            },
            None => link,
        })
        .collect()
}
