use crate::error::ExtractionError;
use crate::scrapers::listing::selector;
use scraper::{Html, Selector};

/// Pulls listing links out of a search-results page
pub struct SearchResultExtractor {
    item_link: Selector,
}

impl SearchResultExtractor {
    pub fn new() -> Result<Self, ExtractionError> {
        // Promoted results carry a tally path; they are ads, not matches.
        Ok(Self {
            item_link: selector("a.item-link-container:not([data-tally-path])")?,
        })
    }

    /// Listing hrefs in document order, duplicates kept
    pub fn extract(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        document
            .select(&self.item_link)
            .filter_map(|link| link.value().attr("href"))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_and_duplicates_and_skips_promoted() {
        let html = r#"
            <ul id="search-results">
              <li><a class="item-link-container" href="/bostad/2">Two</a></li>
              <li><a class="item-link-container" href="/bostad/ad" data-tally-path="/t">Ad</a></li>
              <li><a class="item-link-container" href="/bostad/1">One</a></li>
              <li><a class="other" href="/bostad/9">Other</a></li>
              <li><a class="item-link-container" href="/bostad/2">Two again</a></li>
              <li><a class="item-link-container">No href</a></li>
            </ul>
        "#;
        let urls = SearchResultExtractor::new().unwrap().extract(html);
        assert_eq!(urls, vec!["/bostad/2", "/bostad/1", "/bostad/2"]);
    }

    #[test]
    fn empty_page_yields_nothing() {
        let urls = SearchResultExtractor::new().unwrap().extract("<html></html>");
        assert!(urls.is_empty());
    }
}
