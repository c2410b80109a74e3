//! arXiv discoverer
//!
//! Reads one category listing (`/list/<category>/recent`) and turns every
//! `/abs/<id>` anchor into `<base>/pdf/<id>.pdf`.

use std::collections::HashSet;

use async_trait::async_trait;
use scraper::Html;
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use super::{register_candidates, selector, Candidate, Discoverer, DiscoveryReport};
use crate::app::client::FetchClient;
use crate::app::ledger::Ledger;
use crate::constants::{catalogs, selectors};
use crate::errors::{DiscoveryError, DiscoveryResult};

pub const SOURCE: &str = "arxiv";

#[derive(Debug, Clone)]
pub struct ArxivDiscoverer {
    client: FetchClient,
    listing: Url,
    base: String,
}

impl ArxivDiscoverer {
    pub fn for_category(client: FetchClient, category: &str) -> DiscoveryResult<Self> {
        let listing = format!(
            "{}/list/{}/recent",
            catalogs::ARXIV_BASE_URL,
            category.trim()
        );
        let listing = Url::parse(&listing).map_err(|_| DiscoveryError::InvalidUrl { url: listing })?;
        Ok(Self::with_listing(client, listing))
    }

    pub fn with_listing(client: FetchClient, listing: Url) -> Self {
        Self {
            client,
            listing,
            base: catalogs::ARXIV_BASE_URL.to_string(),
        }
    }

    /// Serve PDFs from another host (e.g. `export.arxiv.org`)
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    pub fn download_url(&self, id: &str) -> String {
        format!("{}/pdf/{}.pdf", self.base.trim_end_matches('/'), id)
    }
}

#[async_trait]
impl Discoverer for ArxivDiscoverer {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn discover_content(
        &self,
        ledger: &Ledger,
        limit: usize,
    ) -> DiscoveryResult<DiscoveryReport> {
        let mut report = DiscoveryReport::default();
        if limit == 0 {
            return Ok(report);
        }

        debug!("Reading arXiv listing {}", self.listing);
        let html = self
            .client
            .get_page(&self.listing)
            .await
            .map_err(|source| DiscoveryError::Fetch {
                url: self.listing.to_string(),
                source,
            })?;

        let candidates = parse_listing(&html)?
            .into_iter()
            .map(|id| Candidate {
                url: self.download_url(&id),
                metadata: json!({ "id": id, "listing": self.listing.as_str() }),
            })
            .collect();
        register_candidates(SOURCE, ledger, candidates, limit, &mut report).await?;

        info!("arXiv discovery: {}", report);
        Ok(report)
    }
}

/// Paper identifiers in page order, without repeats
pub fn parse_listing(html: &str) -> DiscoveryResult<Vec<String>> {
    let document = Html::parse_document(html);
    let link_selector = selector(selectors::ARXIV_ABS_LINK)?;

    let mut seen = HashSet::new();
    Ok(document
        .select(&link_selector)
        .filter_map(|anchor| paper_id(anchor.value().attr("href")?))
        .filter(|id| seen.insert(id.clone()))
        .collect())
}

/// `/abs/2401.00001v2` → `2401.00001v2`; old-style `/abs/cs/0101001` keeps its slash
fn paper_id(href: &str) -> Option<String> {
    let id = href
        .strip_prefix("/abs/")?
        .split(['?', '#'])
        .next()?
        .trim_end_matches('/');
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '/'));
    valid.then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetcherConfig;
    use std::sync::Arc;

    const LISTING: &str = r#"
        <dl>
          <dt><a href="/abs/2401.00001" title="Abstract">arXiv:2401.00001</a>
              [<a href="/pdf/2401.00001" title="Download PDF">pdf</a>]</dt>
          <dt><a href="/abs/2401.00002v2" title="Abstract">arXiv:2401.00002</a></dt>
          <dt><a href="/abs/2401.00001" title="Abstract">arXiv:2401.00001</a></dt>
          <dt><a href="/abs/cs/0101001">cs/0101001</a></dt>
          <dt><a href="/abs/">broken</a></dt>
        </dl>
    "#;

    #[test]
    fn test_parse_listing_collects_unique_ids() {
        assert_eq!(
            parse_listing(LISTING).unwrap(),
            vec!["2401.00001", "2401.00002v2", "cs/0101001"]
        );
    }

    #[test]
    fn test_download_url_template() {
        let client = FetchClient::new(Arc::new(FetcherConfig::default())).unwrap();
        let discoverer = ArxivDiscoverer::for_category(client, "cs.DL").unwrap();
        assert_eq!(discoverer.listing.as_str(), "https://arxiv.org/list/cs.DL/recent");
        assert_eq!(
            discoverer.download_url("2401.00001"),
            "https://arxiv.org/pdf/2401.00001.pdf"
        );
        let mirrored = discoverer.base("http://export.arxiv.org/");
        assert_eq!(
            mirrored.download_url("cs/0101001"),
            "http://export.arxiv.org/pdf/cs/0101001.pdf"
        );
    }
}
