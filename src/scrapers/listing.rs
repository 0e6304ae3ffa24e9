//! Listing page extraction.

use crate::error::ExtractionError;
use crate::models::ListingAttributes;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;

const LIVING_AREA: &str = "boarea";
const ANCILLARY_AREA: &str = "biarea";
const PLOT_AREA: &str = "tomtarea";
const ROOMS: &str = "antal rum";
const RUNNING_COST: &str = "driftkostnad";

/// Elements inside the location block that are decoration, not place names
const LOCATION_DECORATION: [&str; 2] = ["a", "span"];

pub(crate) fn selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::InvalidSelector(format!("{css}: {e}")))
}

/// Keep only ASCII digits and parse; empty or overflowing input is 0
pub fn clean_digits(text: &str) -> i64 {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text of `element` with the given child elements (and their subtrees) left out
///
/// Works on a borrowed tree; the document is never modified.
fn text_without(element: ElementRef<'_>, skipped: &[&str]) -> String {
    let mut out = String::new();
    collect_text(element, skipped, &mut out);
    out
}

fn collect_text(element: ElementRef<'_>, skipped: &[&str], out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if !skipped.contains(&child_element.value().name()) {
                collect_text(child_element, skipped, out);
            }
        } else if let Node::Text(text) = child.value() {
            out.push_str(text);
        }
    }
}

/// Parses listing pages into [`ListingAttributes`] and view counts
pub struct ListingExtractor {
    price: Selector,
    address: Selector,
    location: Selector,
    municipality: Selector,
    attributes: Selector,
    label: Selector,
    value: Selector,
    broker_link: Selector,
    agent: Selector,
    visits: Selector,
}

impl ListingExtractor {
    pub fn new() -> Result<Self, ExtractionError> {
        Ok(Self {
            price: selector(".property__price")?,
            address: selector(".property__address")?,
            location: selector(".property-location")?,
            municipality: selector(".property-location .mr2")?,
            attributes: selector(".property__attributes-container")?,
            label: selector("dt")?,
            value: selector("dd")?,
            broker_link: selector(".broker .broker-link")?,
            agent: selector(".broker p b")?,
            visits: selector(".property-stats__visits")?,
        })
    }

    pub fn extract(&self, html: &str) -> Result<ListingAttributes, ExtractionError> {
        let document = Html::parse_document(html);

        let price = self.required(&document, &self.price, "price block")?;
        let address = self.required(&document, &self.address, "address block")?;
        let location = self.required(&document, &self.location, "location block")?;
        let table = self.required(&document, &self.attributes, "attributes table")?;

        let locality = text_without(location, &LOCATION_DECORATION)
            .trim()
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        let municipality = document
            .select(&self.municipality)
            .next()
            .map(text_of)
            .unwrap_or_default();

        let agency = document
            .select(&self.broker_link)
            .find_map(|link| link.value().attr("href"))
            .unwrap_or_default()
            .to_string();

        let agent = document
            .select(&self.agent)
            .next()
            .map(text_of)
            .unwrap_or_default();

        let info = self.attribute_rows(table);
        let field = |label: &str| info.get(label).copied().unwrap_or(0);

        Ok(ListingAttributes {
            address: text_of(address),
            locality,
            municipality,
            agency,
            agent,
            asking_price: clean_digits(&text_of(price)),
            living_area: field(LIVING_AREA),
            ancillary_area: field(ANCILLARY_AREA),
            plot_area: field(PLOT_AREA),
            rooms: field(ROOMS),
            running_cost: field(RUNNING_COST),
        })
    }

    /// The listing's current view counter
    pub fn view_count(&self, html: &str) -> Result<i64, ExtractionError> {
        let document = Html::parse_document(html);
        let visits = self.required(&document, &self.visits, "view counter")?;
        Ok(clean_digits(&text_of(visits)))
    }

    fn required<'a>(
        &self,
        document: &'a Html,
        selector: &Selector,
        what: &'static str,
    ) -> Result<ElementRef<'a>, ExtractionError> {
        document
            .select(selector)
            .next()
            .ok_or(ExtractionError::MissingElement { what })
    }

    /// Label to value pairs of the attributes table, header and footer rows excluded
    fn attribute_rows(&self, table: ElementRef<'_>) -> HashMap<String, i64> {
        let labels: Vec<String> = table
            .select(&self.label)
            .map(|dt| text_of(dt).to_lowercase())
            .collect();
        let values: Vec<i64> = table
            .select(&self.value)
            .map(|dd| clean_digits(&text_of(dd)))
            .collect();

        inner(&labels)
            .iter()
            .cloned()
            .zip(inner(&values).iter().copied())
            .collect()
    }
}

/// Everything except the first and last item
fn inner<T>(items: &[T]) -> &[T] {
    if items.len() < 3 {
        &[]
    } else {
        &items[1..items.len() - 1]
    }
}
