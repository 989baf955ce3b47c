use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

/// How a source's search results are split across pages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Pagination {
    /// The search URL shows all results; only page 1 is fetched
    #[default]
    Single,

    /// Later pages are selected with a query parameter, e.g. `pagenumber=2`
    Query { param: String },
}

impl Pagination {
    /// Returns true if the source never has more than one page
    pub fn is_single(&self) -> bool {
        matches!(self, Self::Single)
    }

    /// Derives the URL of page `page` (1-based) from the configured search URL
    ///
    /// The page parameter is rewritten in place wherever the search URL already carries it,
    /// page 1 included. Otherwise page 1 is the search URL as configured and later pages
    /// append the parameter. Every other query pair keeps its exact bytes.
    pub fn page_url(&self, search_url: &Url, page: u32) -> Url {
        let param = match self {
            Self::Query { param } => param,
            Self::Single => return search_url.clone(),
        };

        let page_pair = format!(
            "{}={}",
            form_urlencoded::byte_serialize(param.as_bytes()).collect::<String>(),
            page
        );
        let mut pairs: Vec<&str> = Vec::new();
        let mut replaced = false;
        for pair in search_url.query().unwrap_or("").split('&') {
            if pair.is_empty() {
                continue;
            }
            if !is_param(pair, param) {
                pairs.push(pair);
            } else if !replaced {
                pairs.push(&page_pair);
                replaced = true;
            }
        }

        if !replaced {
            if page <= 1 {
                return search_url.clone();
            }
            pairs.push(&page_pair);
        }

        let mut url = search_url.clone();
        url.set_query(Some(&pairs.join("&")));
        url
    }
}

/// Returns true if the raw `key=value` pair has the (decoded) key `param`
fn is_param(pair: &str, param: &str) -> bool {
    form_urlencoded::parse(pair.as_bytes())
        .next()
        .is_some_and(|(key, _)| key == param)
}
