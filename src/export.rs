//! Semicolon-separated exports of the store.
//!
//! Both exports are rebuilt from scratch on every call.

use std::collections::BTreeMap;

use crate::error::StoreResult;
use crate::models::Listing;
use crate::scrapers::PortalParams;
use crate::store::ListingStore;

const SEPARATOR: &str = ";";

pub struct Exporter<'a> {
    store: &'a ListingStore,
    params: &'a PortalParams,
}

impl<'a> Exporter<'a> {
    pub fn new(store: &'a ListingStore, params: &'a PortalParams) -> Self {
        Self { store, params }
    }

    /// One row per listing in insertion order, url made absolute
    pub fn export_listings(&self) -> StoreResult<String> {
        let rows: Vec<String> = self
            .store
            .listings()?
            .iter()
            .map(|listing| self.listing_row(listing).join(SEPARATOR))
            .collect();
        Ok(join_lines(rows))
    }

    fn listing_row(&self, listing: &Listing) -> Vec<String> {
        let attrs = &listing.attributes;
        vec![
            listing.id.to_string(),
            self.params.absolute(&listing.url),
            listing.first_seen.clone(),
            listing.last_seen.clone(),
            attrs.address.clone(),
            attrs.locality.clone(),
            attrs.municipality.clone(),
            attrs.agency.clone(),
            attrs.agent.clone(),
            attrs.asking_price.to_string(),
            attrs.living_area.to_string(),
            attrs.ancillary_area.to_string(),
            attrs.plot_area.to_string(),
            attrs.rooms.to_string(),
            attrs.running_cost.to_string(),
            u8::from(listing.alive).to_string(),
        ]
    }

    /// Date-by-listing matrix of view counts
    ///
    /// Column `n` (1-based, after the date) holds listing id `n`; the width is
    /// set by the largest listing id that has samples. Missing cells are blank.
    pub fn export_samples(&self) -> StoreResult<String> {
        let samples = self.store.samples()?;
        let Some(width) = samples.iter().map(|s| s.listing_id).max() else {
            return Ok(String::new());
        };
        let width = usize::try_from(width).unwrap_or(0);

        let mut matrix: BTreeMap<&str, Vec<Option<i64>>> = BTreeMap::new();
        for sample in &samples {
            let row = matrix
                .entry(sample.sampled_at.as_str())
                .or_insert_with(|| vec![None; width]);
            if let Some(cell) = usize::try_from(sample.listing_id)
                .ok()
                .and_then(|id| id.checked_sub(1))
                .and_then(|index| row.get_mut(index))
            {
                *cell = Some(sample.view_count);
            }
        }

        let rows: Vec<String> = matrix
            .into_iter()
            .map(|(date, cells)| {
                std::iter::once(date.to_string())
                    .chain(cells.into_iter().map(|cell| {
                        cell.map(|count| count.to_string()).unwrap_or_default()
                    }))
                    .collect::<Vec<_>>()
                    .join(SEPARATOR)
            })
            .collect();
        Ok(join_lines(rows))
    }
}

fn join_lines(rows: Vec<String>) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut out = rows.join("\n");
    out.push('\n');
    out
}
