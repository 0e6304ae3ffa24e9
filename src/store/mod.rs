//! SQLite-backed persistence for listings and their view-count samples.
//!
//! `ListingStore` owns both tables. Every statement is parameterized and
//! commits on its own; re-running any operation is safe.

use chrono::{DateTime, Local};
use indexmap::IndexSet;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::models::{hour_stamp, Listing, ListingAttributes, ViewSample};

pub const LISTINGS_TABLE: &str = "listings";
pub const SAMPLES_TABLE: &str = "view_samples";

const TABLES: [(&str, &str); 2] = [
    (
        LISTINGS_TABLE,
        "id INTEGER PRIMARY KEY AUTOINCREMENT,
         url TEXT NOT NULL UNIQUE,
         first_seen TEXT NOT NULL,
         last_seen TEXT NOT NULL,
         address TEXT NOT NULL,
         locality TEXT NOT NULL,
         municipality TEXT NOT NULL,
         agency TEXT NOT NULL,
         agent TEXT NOT NULL,
         asking_price INTEGER NOT NULL DEFAULT 0,
         living_area INTEGER NOT NULL DEFAULT 0,
         ancillary_area INTEGER NOT NULL DEFAULT 0,
         plot_area INTEGER NOT NULL DEFAULT 0,
         rooms INTEGER NOT NULL DEFAULT 0,
         running_cost INTEGER NOT NULL DEFAULT 0,
         alive INTEGER NOT NULL DEFAULT 1",
    ),
    (
        SAMPLES_TABLE,
        "id INTEGER PRIMARY KEY AUTOINCREMENT,
         listing_id INTEGER NOT NULL,
         sampled_at TEXT NOT NULL,
         view_count INTEGER NOT NULL,
         UNIQUE (listing_id, sampled_at),
         FOREIGN KEY (listing_id) REFERENCES listings(id)",
    ),
];

const LISTING_COLUMNS: &str = "id, url, first_seen, last_seen, address, locality, municipality, \
     agency, agent, asking_price, living_area, ancillary_area, plot_area, rooms, running_cost, alive";

/// Source of "now" for every timestamp the store writes
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// Wall-clock time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

pub struct ListingStore {
    conn: Connection,
    clock: Box<dyn Clock>,
}

impl ListingStore {
    /// Open (or create) the store file at `path`
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self::with_clock(conn, Box::new(SystemClock)))
    }

    #[cfg(test)]
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::with_clock(conn, Box::new(SystemClock)))
    }

    pub fn with_clock(conn: Connection, clock: Box<dyn Clock>) -> Self {
        Self { conn, clock }
    }

    fn now(&self) -> String {
        hour_stamp(self.clock.now())
    }

    fn table_exists(&self, name: &str) -> StoreResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Create any missing tables. Existing tables are left untouched.
    ///
    /// Returns the names of the tables that were created by this call.
    pub fn ensure_schema(&self) -> StoreResult<Vec<&'static str>> {
        let mut created = Vec::new();
        for (name, columns) in TABLES {
            if self.table_exists(name)? {
                continue;
            }
            self.conn
                .execute(&format!("CREATE TABLE {} ({})", name, columns), [])?;
            info!("Table: '{}' created", name);
            created.push(name);
        }
        Ok(created)
    }

    /// Insert a listing unless its URL is already known.
    ///
    /// Existing rows are never overwritten. Returns whether a row was inserted.
    pub fn upsert_listing(&self, url: &str, attrs: &ListingAttributes) -> StoreResult<bool> {
        let now = self.now();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO listings (url, first_seen, last_seen, address, locality,
                municipality, agency, agent, asking_price, living_area, ancillary_area,
                plot_area, rooms, running_cost, alive)
             VALUES (?1, ?2, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 1)",
            params![
                url,
                now,
                attrs.address,
                attrs.locality,
                attrs.municipality,
                attrs.agency,
                attrs.agent,
                attrs.asking_price,
                attrs.living_area,
                attrs.ancillary_area,
                attrs.plot_area,
                attrs.rooms,
                attrs.running_cost,
            ],
        )?;

        if inserted > 0 {
            info!("Added '{}' to table '{}'", url, LISTINGS_TABLE);
        } else {
            debug!("Listing '{}' already known", url);
        }
        Ok(inserted > 0)
    }

    /// Sweep every listing to not-alive, then mark the observed ones alive.
    ///
    /// URLs with no listing row are ignored. Returns how many rows were marked alive.
    pub fn reconcile_liveness<I, S>(&self, observed_urls: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let now = self.now();
        self.conn.execute("UPDATE listings SET alive = 0", [])?;

        let mut mark =
            self.conn
                .prepare("UPDATE listings SET alive = 1, last_seen = ?1 WHERE url = ?2")?;
        let mut marked = 0;
        for url in observed_urls {
            marked += mark.execute(params![now, url.as_ref()])?;
        }

        debug!("Reconciled liveness: {} listings alive", marked);
        Ok(marked)
    }

    /// URLs of every listing currently marked alive, in insertion order
    pub fn live_urls(&self) -> StoreResult<IndexSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM listings WHERE alive = 1 ORDER BY id")?;
        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<IndexSet<_>, _>>()?;
        Ok(urls)
    }

    pub fn contains(&self, url: &str) -> StoreResult<bool> {
        Ok(self.listing_id(url)?.is_some())
    }

    fn listing_id(&self, url: &str) -> StoreResult<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM listings WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Append a view-count sample stamped with the current hour.
    ///
    /// A second sample for the same listing within the same hour is ignored.
    /// Returns whether a row was inserted.
    pub fn record_sample(&self, url: &str, view_count: i64) -> StoreResult<bool> {
        let listing_id = self
            .listing_id(url)?
            .ok_or_else(|| StoreError::UnknownListing {
                url: url.to_string(),
            })?;

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO view_samples (listing_id, sampled_at, view_count)
             VALUES (?1, ?2, ?3)",
            params![listing_id, self.now(), view_count],
        )?;
        Ok(inserted > 0)
    }

    #[cfg(test)]
    pub fn get(&self, url: &str) -> StoreResult<Option<Listing>> {
        let listing = self
            .conn
            .query_row(
                &format!("SELECT {} FROM listings WHERE url = ?1", LISTING_COLUMNS),
                params![url],
                listing_from_row,
            )
            .optional()?;
        Ok(listing)
    }

    /// Every listing in insertion order
    pub fn listings(&self) -> StoreResult<Vec<Listing>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM listings ORDER BY id", LISTING_COLUMNS))?;
        let rows = stmt
            .query_map([], listing_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Every sample, oldest first
    pub fn samples(&self) -> StoreResult<Vec<ViewSample>> {
        let mut stmt = self.conn.prepare(
            "SELECT listing_id, sampled_at, view_count FROM view_samples
             ORDER BY sampled_at, listing_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ViewSample {
                    listing_id: row.get(0)?,
                    sampled_at: row.get(1)?,
                    view_count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<Listing> {
    Ok(Listing {
        id: row.get(0)?,
        url: row.get(1)?,
        first_seen: row.get(2)?,
        last_seen: row.get(3)?,
        attributes: ListingAttributes {
            address: row.get(4)?,
            locality: row.get(5)?,
            municipality: row.get(6)?,
            agency: row.get(7)?,
            agent: row.get(8)?,
            asking_price: row.get(9)?,
            living_area: row.get(10)?,
            ancillary_area: row.get(11)?,
            plot_area: row.get(12)?,
            rooms: row.get(13)?,
            running_cost: row.get(14)?,
        },
        alive: row.get(15)?,
    })
}


#[cfg(test)]
mod tests {
    use super::testing::{store_with_clock, ManualClock};
    use super::*;

    fn attrs(address: &str) -> ListingAttributes {
        ListingAttributes {
            address: address.to_string(),
            asking_price: 2_995_000,
            ..Default::default()
        }
    }

    #[test]
    fn ensure_schema_is_idempotent() {
        let store = ListingStore::in_memory().unwrap();
        assert_eq!(
            store.ensure_schema().unwrap(),
            vec![LISTINGS_TABLE, SAMPLES_TABLE]
        );
        assert!(store.ensure_schema().unwrap().is_empty());
        assert!(store.table_exists(LISTINGS_TABLE).unwrap());
        assert!(store.table_exists(SAMPLES_TABLE).unwrap());
    }

    #[test]
    fn ensure_schema_keeps_existing_rows() {
        let store = ListingStore::in_memory().unwrap();
        store.ensure_schema().unwrap();
        store.upsert_listing("/a/1", &attrs("Storgatan 1")).unwrap();
        store.ensure_schema().unwrap();
        assert_eq!(store.listings().unwrap().len(), 1);
    }

    #[test]
    fn upsert_keeps_first_attributes() {
        let clock = ManualClock::at(2024, 5, 1, 10);
        let store = store_with_clock(&clock);

        assert!(store.upsert_listing("/a/1", &attrs("Storgatan 1")).unwrap());
        clock.advance_hours(3);
        assert!(!store.upsert_listing("/a/1", &attrs("Lillgatan 2")).unwrap());

        let listings = store.listings().unwrap();
        assert_eq!(listings.len(), 1);
        let listing = &listings[0];
        assert_eq!(listing.attributes.address, "Storgatan 1");
        assert_eq!(listing.first_seen, "2024-05-01 10:00");
        assert_eq!(listing.last_seen, "2024-05-01 10:00");
        assert!(listing.alive);
    }

    #[test]
    fn upsert_stores_untrusted_text_verbatim() {
        let store = ListingStore::in_memory().unwrap();
        store.ensure_schema().unwrap();
        let sneaky = attrs("O'Brien; DROP TABLE listings; --");
        store.upsert_listing("/a/'1", &sneaky).unwrap();

        let listing = store.get("/a/'1").unwrap().unwrap();
        assert_eq!(listing.attributes.address, sneaky.address);
    }

    #[test]
    fn reconcile_sweeps_then_marks() {
        let clock = ManualClock::at(2024, 5, 1, 10);
        let store = store_with_clock(&clock);
        store.upsert_listing("A", &attrs("a")).unwrap();
        store.upsert_listing("B", &attrs("b")).unwrap();

        clock.advance_hours(2);
        let marked = store.reconcile_liveness(["B", "C"]).unwrap();
        assert_eq!(marked, 1);

        let live: Vec<_> = store.live_urls().unwrap().into_iter().collect();
        assert_eq!(live, vec!["B".to_string()]);

        let a = store.get("A").unwrap().unwrap();
        let b = store.get("B").unwrap().unwrap();
        assert!(!a.alive);
        assert_eq!(a.last_seen, "2024-05-01 10:00");
        assert!(b.alive);
        assert_eq!(b.last_seen, "2024-05-01 12:00");
        assert!(!store.contains("C").unwrap());
    }

    #[test]
    fn reconcile_with_duplicates_and_empty_set() {
        let store = ListingStore::in_memory().unwrap();
        store.ensure_schema().unwrap();
        store.upsert_listing("A", &attrs("a")).unwrap();

        store.reconcile_liveness(["A", "A"]).unwrap();
        assert!(store.live_urls().unwrap().contains("A"));

        store.reconcile_liveness(Vec::<String>::new()).unwrap();
        assert!(store.live_urls().unwrap().is_empty());
    }

    #[test]
    fn record_sample_requires_known_listing() {
        let store = ListingStore::in_memory().unwrap();
        store.ensure_schema().unwrap();
        let err = store.record_sample("/nope", 3).unwrap_err();
        assert!(matches!(err, StoreError::UnknownListing { url } if url == "/nope"));
    }

    #[test]
    fn record_sample_ignores_same_hour_duplicates() {
        let clock = ManualClock::at(2024, 5, 1, 10);
        let store = store_with_clock(&clock);
        store.upsert_listing("A", &attrs("a")).unwrap();

        assert!(store.record_sample("A", 5).unwrap());
        assert!(!store.record_sample("A", 6).unwrap());
        clock.advance_hours(1);
        assert!(store.record_sample("A", 8).unwrap());

        let samples = store.samples().unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].view_count, 5);
        assert_eq!(samples[1].sampled_at, "2024-05-01 11:00");
    }
}
