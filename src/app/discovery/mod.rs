//! Catalog discovery
//!
//! A [`Discoverer`] reads listing pages from one remote catalog, turns each
//! catalog identifier into a canonical download URL and registers it in the
//! ledger as a pending job. Fetching goes through the shared
//! [`FetchClient`]; discoverers only own the catalog-specific parsing.
//!
//! Registration is idempotent, so running discovery twice over the same
//! listing adds nothing the second time. Duplicates are counted in the
//! [`DiscoveryReport`], never reported as errors.

use std::fmt;

use async_trait::async_trait;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::client::FetchClient;
use crate::app::ledger::Ledger;
use crate::errors::{DiscoveryError, DiscoveryResult};

pub mod arxiv;
pub mod gutenberg;

pub use arxiv::ArxivDiscoverer;
pub use gutenberg::{BookFormat, GutenbergDiscoverer};

/// Catalog names accepted by [`discoverer_for`]
pub const KNOWN_SOURCES: &[&str] = &[gutenberg::SOURCE, arxiv::SOURCE];

/// A pluggable catalog crawler
#[async_trait]
pub trait Discoverer: Send + Sync {
    /// Source tag written to every job this discoverer registers
    fn source(&self) -> &str;

    /// Register up to `limit` candidates from the catalog
    async fn discover_content(&self, ledger: &Ledger, limit: usize)
        -> DiscoveryResult<DiscoveryReport>;
}

/// Counts from one discovery run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    /// Candidates found on listing pages (up to the limit)
    pub discovered: usize,
    /// Newly registered jobs
    pub added: usize,
    /// Candidates whose URL was already in the ledger
    pub duplicates: usize,
}

impl fmt::Display for DiscoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} discovered, {} added, {} already known",
            self.discovered, self.added, self.duplicates
        )
    }
}

/// A resource found on a listing page
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub url: String,
    pub metadata: serde_json::Value,
}

/// Register candidates in order, stopping once `limit` have been seen
pub(crate) async fn register_candidates(
    source: &str,
    ledger: &Ledger,
    candidates: Vec<Candidate>,
    limit: usize,
    report: &mut DiscoveryReport,
) -> DiscoveryResult<()> {
    for candidate in candidates {
        if report.discovered >= limit {
            break;
        }
        report.discovered += 1;

        let metadata = candidate.metadata.to_string();
        if ledger
            .add_download_entry(source, &candidate.url, Some(&metadata))
            .await?
        {
            report.added += 1;
        } else {
            debug!("Already known: {}", candidate.url);
            report.duplicates += 1;
        }
    }
    Ok(())
}

pub(crate) fn selector(css: &str) -> DiscoveryResult<Selector> {
    Selector::parse(css).map_err(|_| DiscoveryError::InvalidSelector {
        selector: css.to_string(),
    })
}

/// Build the discoverer for a catalog name
///
/// `category` narrows the listing: a bookshelf number or search term for
/// gutenberg, a subject class such as `cs.DL` for arxiv.
pub fn discoverer_for(
    name: &str,
    client: FetchClient,
    category: Option<&str>,
) -> DiscoveryResult<Box<dyn Discoverer>> {
    match name {
        gutenberg::SOURCE => {
            let discoverer = match category {
                Some(category) => GutenbergDiscoverer::for_category(client, category)?,
                None => GutenbergDiscoverer::new(client)?,
            };
            Ok(Box::new(discoverer))
        }
        arxiv::SOURCE => Ok(Box::new(ArxivDiscoverer::for_category(
            client,
            category.unwrap_or(crate::constants::catalogs::ARXIV_DEFAULT_CATEGORY),
        )?)),
        other => Err(DiscoveryError::UnknownSource {
            name: other.to_string(),
            known: KNOWN_SOURCES.join(", "),
        }),
    }
}
