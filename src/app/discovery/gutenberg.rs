//! Project Gutenberg discoverer
//!
//! Listing pages (bookshelves, search results, subject pages) link each book
//! as `/ebooks/<number>`. Every number becomes a mirror download URL of the
//! form `<mirror>/cache/epub/<id>/pg<id>.<ext>`. Pagination follows the
//! "next page" link up to `max_pages`.

use std::collections::HashSet;

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use super::{register_candidates, selector, Candidate, Discoverer, DiscoveryReport};
use crate::app::client::FetchClient;
use crate::app::ledger::Ledger;
use crate::constants::{catalogs, selectors};
use crate::errors::{DiscoveryError, DiscoveryResult};

pub const SOURCE: &str = "gutenberg";

/// File flavour requested from the mirror
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookFormat {
    #[default]
    PlainText,
    Epub,
}

impl BookFormat {
    pub fn extension(self) -> &'static str {
        match self {
            BookFormat::PlainText => "txt",
            BookFormat::Epub => "epub",
        }
    }
}

/// One book reference on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookLink {
    pub id: u64,
    pub title: Option<String>,
}

/// What a single listing page yields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub books: Vec<BookLink>,
    pub next_page: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct GutenbergDiscoverer {
    client: FetchClient,
    listing: Url,
    mirror: String,
    format: BookFormat,
    max_pages: usize,
}

impl GutenbergDiscoverer {
    /// Discoverer over the most-downloaded listing
    pub fn new(client: FetchClient) -> DiscoveryResult<Self> {
        let listing = parse_listing_url(catalogs::GUTENBERG_DEFAULT_LISTING)?;
        Ok(Self::with_listing(client, listing))
    }

    /// A numeric category selects a bookshelf; anything else is a search term
    pub fn for_category(client: FetchClient, category: &str) -> DiscoveryResult<Self> {
        let category = category.trim();
        let listing = if !category.is_empty() && category.bytes().all(|b| b.is_ascii_digit()) {
            parse_listing_url(&format!(
                "{}/ebooks/bookshelf/{}",
                catalogs::GUTENBERG_BASE_URL,
                category
            ))?
        } else {
            let mut url = parse_listing_url(&format!(
                "{}/ebooks/search/",
                catalogs::GUTENBERG_BASE_URL
            ))?;
            url.query_pairs_mut()
                .append_pair("query", category)
                .append_pair("sort_order", "downloads");
            url
        };
        Ok(Self::with_listing(client, listing))
    }

    pub fn with_listing(client: FetchClient, listing: Url) -> Self {
        Self {
            client,
            listing,
            mirror: catalogs::GUTENBERG_BASE_URL.to_string(),
            format: BookFormat::default(),
            max_pages: catalogs::GUTENBERG_MAX_PAGES,
        }
    }

    /// Download from another mirror root
    pub fn mirror(mut self, mirror: impl Into<String>) -> Self {
        self.mirror = mirror.into();
        self
    }

    pub fn format(mut self, format: BookFormat) -> Self {
        self.format = format;
        self
    }

    pub fn max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages;
        self
    }

    /// Canonical download URL for a book
    pub fn download_url(&self, id: u64) -> String {
        format!(
            "{}/cache/epub/{id}/pg{id}.{}",
            self.mirror.trim_end_matches('/'),
            self.format.extension()
        )
    }

    fn candidate(&self, book: BookLink, listing: &Url) -> Candidate {
        Candidate {
            url: self.download_url(book.id),
            metadata: json!({
                "id": book.id,
                "title": book.title,
                "listing": listing.as_str(),
            }),
        }
    }
}

#[async_trait]
impl Discoverer for GutenbergDiscoverer {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn discover_content(
        &self,
        ledger: &Ledger,
        limit: usize,
    ) -> DiscoveryResult<DiscoveryReport> {
        let mut report = DiscoveryReport::default();
        let mut seen = HashSet::new();
        let mut next = Some(self.listing.clone());
        let mut pages = 0;

        while let Some(page_url) = next.take() {
            if pages >= self.max_pages || report.discovered >= limit {
                break;
            }
            pages += 1;

            debug!("Reading Gutenberg listing {}", page_url);
            let html = self
                .client
                .get_page(&page_url)
                .await
                .map_err(|source| DiscoveryError::Fetch {
                    url: page_url.to_string(),
                    source,
                })?;
            let page = parse_listing(&html, &page_url)?;

            let candidates = page
                .books
                .into_iter()
                .filter(|book| seen.insert(book.id))
                .map(|book| self.candidate(book, &page_url))
                .collect();
            register_candidates(SOURCE, ledger, candidates, limit, &mut report).await?;

            next = page.next_page;
        }

        info!("Gutenberg discovery over {} pages: {}", pages, report);
        Ok(report)
    }
}

/// Extract book links and the next-page link from a listing
///
/// Anchors that are not `/ebooks/<number>` (search, bookshelves, authors)
/// are ignored; repeated ids keep their first occurrence.
pub fn parse_listing(html: &str, page_url: &Url) -> DiscoveryResult<ListingPage> {
    let document = Html::parse_document(html);
    let link_selector = selector(selectors::GUTENBERG_BOOK_LINK)?;
    let title_selector = selector(selectors::GUTENBERG_BOOK_TITLE)?;
    let next_selector = selector(selectors::GUTENBERG_NEXT_PAGE)?;

    let mut seen = HashSet::new();
    let books = document
        .select(&link_selector)
        .filter_map(|anchor| {
            let id = book_id(anchor.value().attr("href")?)?;
            seen.insert(id).then(|| BookLink {
                id,
                title: book_title(anchor, &title_selector),
            })
        })
        .collect();

    let next_page = document
        .select(&next_selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .find_map(|href| page_url.join(href).ok());

    Ok(ListingPage { books, next_page })
}

/// `/ebooks/84` → 84
fn book_id(href: &str) -> Option<u64> {
    let rest = href.strip_prefix("/ebooks/")?;
    let id = rest.split(['?', '#']).next()?.trim_end_matches('/');
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id.parse().ok()
}

fn book_title(anchor: ElementRef<'_>, title_selector: &scraper::Selector) -> Option<String> {
    let text: String = match anchor.select(title_selector).next() {
        Some(title) => title.text().collect(),
        None => anchor.text().collect(),
    };
    let title = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!title.is_empty()).then_some(title)
}

fn parse_listing_url(url: &str) -> DiscoveryResult<Url> {
    Url::parse(url).map_err(|_| DiscoveryError::InvalidUrl {
        url: url.to_string(),
    })
}
