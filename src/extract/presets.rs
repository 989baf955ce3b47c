//! Ready-made extraction tables for the supported marketplaces
//!
//! A source configured with `preset = "..."` gets its layout, host patterns, pagination
//! scheme and detail rule from here. Everything a preset provides can also be written out
//! by hand as a custom `html` or `json` layout.

use super::details::DetailRule;
use super::html::HtmlLayout;
use super::ids::IdRule;
use super::json::{JsonEmbed, JsonFieldSpec, JsonIdRule, JsonImages, JsonLayout};
use super::rules::FieldRule;
use super::{Layout, ListingField, FALLBACK_IMAGE};
use crate::listing::DEFAULT_DATE_FORMAT;
use crate::url::Pagination;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// ImmobilienScout24 server-rendered result list
    Immobilienscout,
    /// ImmobilienScout24 result list embedded as JSON
    ImmobilienscoutJson,
    Immowelt,
    WgGesucht,
    Kleinanzeigen,
}

impl Preset {
    /// All presets
    pub fn all() -> &'static [Preset] {
        &[
            Self::Immobilienscout,
            Self::ImmobilienscoutJson,
            Self::Immowelt,
            Self::WgGesucht,
            Self::Kleinanzeigen,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immobilienscout => "immobilienscout",
            Self::ImmobilienscoutJson => "immobilienscout-json",
            Self::Immowelt => "immowelt",
            Self::WgGesucht => "wg-gesucht",
            Self::Kleinanzeigen => "kleinanzeigen",
        }
    }

    /// Hosts search URLs of this preset may point to
    pub fn host_patterns(&self) -> &'static [&'static str] {
        match self {
            Self::Immobilienscout | Self::ImmobilienscoutJson => &["*.immobilienscout24.de"],
            Self::Immowelt => &["*.immowelt.de"],
            Self::WgGesucht => &["*.wg-gesucht.de"],
            Self::Kleinanzeigen => &["*.kleinanzeigen.de", "*.ebay-kleinanzeigen.de"],
        }
    }

    pub fn pagination(&self) -> Pagination {
        match self {
            Self::Immobilienscout | Self::ImmobilienscoutJson => Pagination::Query {
                param: "pagenumber".to_string(),
            },
            Self::Immowelt | Self::WgGesucht | Self::Kleinanzeigen => Pagination::Single,
        }
    }

    pub fn layout(&self) -> Layout {
        match self {
            Self::Immobilienscout => Layout::Html(immobilienscout()),
            Self::ImmobilienscoutJson => Layout::Json(immobilienscout_json()),
            Self::Immowelt => Layout::Html(immowelt()),
            Self::WgGesucht => Layout::Html(wg_gesucht()),
            Self::Kleinanzeigen => Layout::Html(kleinanzeigen()),
        }
    }

    /// Rule reading the availability date from a listing page, if the site shows one
    pub fn details(&self) -> Option<DetailRule> {
        match self {
            Self::Immobilienscout | Self::ImmobilienscoutJson => Some(DetailRule::new(
                FieldRule::select("dd.is24qa-bezugsfrei-ab"),
            )),
            Self::Immowelt => {
                Some(DetailRule::new(FieldRule::select("div.equipment p")).label("Bezug"))
            }
            Self::Kleinanzeigen => Some(DetailRule::new(
                FieldRule::select("li.addetailslist--detail").pattern(r"Verfügbar ab\s*(.+)"),
            )),
            // result cards already carry the dates
            Self::WgGesucht => None,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn immobilienscout() -> HtmlLayout {
    let attributes = r#"[data-is24-qa="attributes"] dd"#;
    let title = "a.result-list-entry__brand-title-container";

    HtmlLayout::new(
        "#resultListItems li.result-list__listing",
        IdRule::numeric(FieldRule::itself().attr("data-id")),
    )
    .field(ListingField::Title, FieldRule::select(title).remove("NEU").required())
    .field(ListingField::Url, FieldRule::select(title).attr("href"))
    .field(
        ListingField::Address,
        FieldRule::select(".result-list-entry__address").fallback("No address given"),
    )
    .field(
        ListingField::Price,
        FieldRule::select(attributes).nth(0).pattern(r"^(\S+)"),
    )
    .field(
        ListingField::Size,
        FieldRule::select(attributes)
            .nth(1)
            .pattern(r"^(\S+)")
            .suffix(" qm"),
    )
    .field(
        ListingField::Rooms,
        FieldRule::select(attributes).nth(2).pattern(r"^(\S+)"),
    )
    .images(
        FieldRule::select(".gallery-container img")
            .attr("src")
            .attr("data-lazy-src"),
    )
    .result_count(FieldRule::select(r#"[data-is24-qa="resultlist-resultCount"]"#))
    .base_url("https://www.immobilienscout24.de")
    .fallback_image(FALLBACK_IMAGE)
}

fn immobilienscout_json() -> JsonLayout {
    JsonLayout {
        embed: JsonEmbed::Pattern {
            pattern: r"(?sm)IS24\.resultList\s*=\s*(\{.*?\});\s*$".to_string(),
        },
        entries_key: "resultlist.realEstate".to_string(),
        id: JsonIdRule {
            pointer: "/@id".to_string(),
            hashed: false,
        },
        fields: vec![
            JsonFieldSpec::new(ListingField::Title, "/title"),
            JsonFieldSpec::new(ListingField::Address, "/address/description/text"),
            JsonFieldSpec::new(ListingField::Price, "/price/value"),
            JsonFieldSpec::new(ListingField::TotalPrice, "/calculatedTotalRent/totalRent/value"),
            JsonFieldSpec::new(ListingField::Size, "/livingSpace"),
            JsonFieldSpec::new(ListingField::Rooms, "/numberOfRooms"),
        ],
        images: Some(JsonImages {
            within: "galleryAttachments".to_string(),
            key: "@href".to_string(),
            cut_after: Some(".jpg".to_string()),
        }),
        url_template: Some("https://www.immobilienscout24.de/expose/{id}".to_string()),
        result_count_key: Some("numberOfHits".to_string()),
        fallback_image: Some(FALLBACK_IMAGE.to_string()),
        date_format: DEFAULT_DATE_FORMAT.to_string(),
    }
}

fn immowelt() -> HtmlLayout {
    HtmlLayout::new("main a[id]", IdRule::hashed(FieldRule::itself().attr("id")))
        .field(ListingField::Title, FieldRule::select("h2"))
        .field(ListingField::Url, FieldRule::itself().attr("href"))
        .field(
            ListingField::Price,
            FieldRule::select(r#"div[data-test="price"]"#),
        )
        .field(ListingField::Size, FieldRule::select(r#"div[data-test="area"]"#))
        .field(ListingField::Rooms, FieldRule::select(r#"div[data-test="rooms"]"#))
        .field(
            ListingField::Address,
            FieldRule::select(r#"div[class^="IconFact"] span"#),
        )
        .images(FieldRule::select("picture source").attr("data-srcset"))
        .base_url("https://www.immowelt.de")
}

fn wg_gesucht() -> HtmlLayout {
    let title = "h3.truncate_title";
    let link = "h3.truncate_title a";
    let dates = r"(\d{2}\.\d{2}\.\d{4})";

    HtmlLayout::new(
        r#"[id^="liste-"]:not(.display-none)"#,
        IdRule::numeric(FieldRule::select(link).attr("href").pattern(r"\.(\d+)\.html")),
    )
    .field(ListingField::Title, FieldRule::select(title).required())
    .field(ListingField::Url, FieldRule::select(link).attr("href"))
    .field(
        ListingField::Image,
        FieldRule::select("div.card_image a")
            .attr("style")
            .pattern(r"background-image: url\((.*?)\)"),
    )
    .field(ListingField::Price, FieldRule::select("div.middle div.col-xs-3"))
    .field(
        ListingField::Rooms,
        FieldRule::select("div.col-xs-11").pattern(r"(\d) Zimmer"),
    )
    .field(
        ListingField::Address,
        FieldRule::select("div.col-xs-11").pattern(r"\|\s*([^|]+)"),
    )
    .field(
        ListingField::Size,
        FieldRule::select("div.middle div.text-right")
            .pattern(r"(\d{1,4}\sm²)")
            .required(),
    )
    .field(
        ListingField::AvailableFrom,
        FieldRule::select("div.middle div.text-center")
            .pattern(dates)
            .required(),
    )
    .field(
        ListingField::AvailableTo,
        FieldRule::select("div.middle div.text-center")
            .pattern(dates)
            .occurrence(1),
    )
    .base_url("https://www.wg-gesucht.de/")
}

fn kleinanzeigen() -> HtmlLayout {
    let tags = ".simpletag.tag-small";

    HtmlLayout::new(
        "#srchrslt-adtable article.aditem",
        IdRule::numeric(FieldRule::itself().attr("data-adid")),
    )
    .field(ListingField::Title, FieldRule::select(".ellipsis").required())
    .field(ListingField::Url, FieldRule::select(".ellipsis").attr("href"))
    .field(
        ListingField::Price,
        FieldRule::select(".aditem-main--middle--price-shipping--price"),
    )
    .field(ListingField::Size, FieldRule::select(tags).nth(0))
    .field(
        ListingField::Rooms,
        FieldRule::select(tags).nth(1).pattern(r"(\d+)"),
    )
    .field(
        ListingField::Address,
        FieldRule::select("div.aditem-main--top--left"),
    )
    .field(
        ListingField::Image,
        FieldRule::select("div.galleryimage-element").attr("data-imgsrc"),
    )
    .base_url("https://www.kleinanzeigen.de")
}
