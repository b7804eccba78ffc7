//! SQLite-backed reconciliation store: tracks every listing ever seen and
//! answers "what is new and unnotified".

use crate::models::{ListingRecord, ListingStatus, PersistedListing, StoreStats};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, Row};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Resolve the stable identity of a listing.
///
/// The detail-page URL is the identity whenever one was discovered; it stays
/// stable even when cosmetic text changes. Without a URL the identity is a
/// content fingerprint over (title, price, location), which is deterministic
/// but deliberately sensitive to any edit of those fields.
pub fn resolve_listing_id(record: &ListingRecord) -> String {
    let url = record.url.trim();
    if !url.is_empty() {
        return url.to_string();
    }

    let combined = format!(
        "{}|{}|{}",
        record.title.trim(),
        record.price.trim(),
        record.location.trim()
    );
    let mut hasher = Sha256::new();
    hasher.update(combined.as_bytes());
    hex::encode(hasher.finalize())[..32].to_string()
}

/// Durable listing store keyed by listing id. Every operation runs in its
/// own implicit transaction; the runner is responsible for sequencing.
pub struct ListingStore {
    db_path: PathBuf,
}

impl ListingStore {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            db_path: db_path.as_ref().to_path_buf(),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .with_context(|| format!("opening database at {}", self.db_path.display()))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS listings (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                status TEXT,
                price TEXT,
                location TEXT,
                url TEXT,
                details_text TEXT,
                first_seen_at TEXT NOT NULL,
                last_seen_at TEXT NOT NULL,
                notified_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_notified_at
                ON listings(notified_at);
        "#,
        )
        .context("initializing database schema")?;
        debug!("Initialized database at {}", self.db_path.display());
        Ok(())
    }

    /// Insert a new listing or refresh an existing one. Identity,
    /// `first_seen_at` and `notified_at` are never touched on update, so the
    /// call is idempotent in the ways that matter.
    pub fn upsert(&self, record: &ListingRecord) -> Result<String> {
        let id = resolve_listing_id(record);
        let now = Utc::now().to_rfc3339();
        let status = record.status.map(|s| s.as_str()).unwrap_or("");
        let details_text = record.details.join("\n");

        let conn = self.connect()?;
        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM listings WHERE id = ?1",
                params![id],
                |row| row.get::<_, i64>(0),
            )
            .context("checking for existing listing")?
            > 0;

        if exists {
            conn.execute(
                r#"
                UPDATE listings
                SET title = ?1, status = ?2, price = ?3, location = ?4,
                    url = ?5, details_text = ?6, last_seen_at = ?7
                WHERE id = ?8
                "#,
                params![
                    record.title,
                    status,
                    record.price,
                    record.location,
                    record.url,
                    details_text,
                    now,
                    id
                ],
            )
            .context("updating listing")?;
        } else {
            conn.execute(
                r#"
                INSERT INTO listings (
                    id, title, status, price, location, url, details_text,
                    first_seen_at, last_seen_at, notified_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL)
                "#,
                params![
                    id,
                    record.title,
                    status,
                    record.price,
                    record.location,
                    record.url,
                    details_text,
                    now,
                    now
                ],
            )
            .context("inserting listing")?;
        }

        Ok(id)
    }

    /// Every listing never included in a successful notification, oldest
    /// discovery first.
    pub fn query_unnotified(&self, exclude_closed: bool) -> Result<Vec<PersistedListing>> {
        let conn = self.connect()?;
        let sql = if exclude_closed {
            r#"
            SELECT * FROM listings
            WHERE notified_at IS NULL
              AND (status IS NULL OR status != 'DRAWING CLOSED')
            ORDER BY first_seen_at ASC
            "#
        } else {
            r#"
            SELECT * FROM listings
            WHERE notified_at IS NULL
            ORDER BY first_seen_at ASC
            "#
        };

        let mut stmt = conn.prepare(sql).context("preparing unnotified query")?;
        let listings = stmt
            .query_map([], row_to_listing)
            .context("querying unnotified listings")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("reading unnotified listings")?;
        Ok(listings)
    }

    /// Set `notified_at` for the given ids. Rows already notified are left
    /// alone (the timestamp is set at most once); unknown ids are reported at
    /// warn level, not treated as an error. Returns the number of rows
    /// actually updated.
    pub fn mark_notified(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            warn!("mark_notified called with no ids");
            return Ok(0);
        }

        let conn = self.connect()?;
        let placeholders = vec!["?"; ids.len()].join(",");

        let mut stmt = conn
            .prepare(&format!(
                "SELECT id FROM listings WHERE id IN ({placeholders})"
            ))
            .context("preparing id existence query")?;
        let existing: Vec<String> = stmt
            .query_map(params_from_iter(ids.iter()), |row| row.get(0))
            .context("querying existing ids")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("reading existing ids")?;
        if existing.len() != ids.len() {
            let missing: Vec<&String> = ids.iter().filter(|id| !existing.contains(id)).collect();
            warn!("Some listing ids not found in database: {missing:?}");
        }

        let now = Utc::now().to_rfc3339();
        let updated = conn
            .execute(
                &format!(
                    "UPDATE listings SET notified_at = ? \
                     WHERE notified_at IS NULL AND id IN ({placeholders})"
                ),
                params_from_iter(std::iter::once(&now).chain(ids.iter())),
            )
            .context("marking listings notified")?;

        info!(
            "Marked {} listings as notified (requested {})",
            updated,
            ids.len()
        );
        Ok(updated)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.connect()?;
        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))
            .context("counting listings")?;
        let notified: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM listings WHERE notified_at IS NOT NULL",
                [],
                |row| row.get(0),
            )
            .context("counting notified listings")?;
        Ok(StoreStats {
            total: total as usize,
            notified: notified as usize,
            unnotified: (total - notified) as usize,
        })
    }
}

fn row_to_listing(row: &Row) -> rusqlite::Result<PersistedListing> {
    let status: Option<String> = row.get("status")?;
    let details_text: String = row.get::<_, Option<String>>("details_text")?.unwrap_or_default();
    let details = if details_text.is_empty() {
        Vec::new()
    } else {
        details_text.lines().map(str::to_string).collect()
    };

    Ok(PersistedListing {
        id: row.get("id")?,
        title: row.get("title")?,
        status: status.as_deref().and_then(ListingStatus::parse),
        price: row.get::<_, Option<String>>("price")?.unwrap_or_default(),
        location: row.get::<_, Option<String>>("location")?.unwrap_or_default(),
        details,
        url: row.get::<_, Option<String>>("url")?.unwrap_or_default(),
        first_seen_at: parse_timestamp(row, "first_seen_at")?,
        last_seen_at: parse_timestamp(row, "last_seen_at")?,
        notified_at: match row.get::<_, Option<String>>("notified_at")? {
            Some(raw) => Some(parse_raw_timestamp(&raw)?),
            None => None,
        },
    })
}

fn parse_timestamp(row: &Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    parse_raw_timestamp(&raw)
}

fn parse_raw_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::tempdir;

    fn record(title: &str, url: &str) -> ListingRecord {
        ListingRecord {
            title: title.to_string(),
            status: None,
            price: "$100,000".to_string(),
            location: "Fairfax, VA 22030".to_string(),
            details: vec!["Type: Condominium".to_string()],
            url: url.to_string(),
        }
    }

    fn temp_store() -> (tempfile::TempDir, ListingStore) {
        let dir = tempdir().expect("tempdir");
        let store = ListingStore::new(dir.path().join("listings.db")).expect("store");
        (dir, store)
    }

    #[test]
    fn url_identity_ignores_other_fields() {
        let a = record("Title A", "https://example.com/listing/1");
        let mut b = record("Completely different", "https://example.com/listing/1");
        b.price = "$999,999".to_string();
        assert_eq!(resolve_listing_id(&a), resolve_listing_id(&b));
        assert_eq!(resolve_listing_id(&a), "https://example.com/listing/1");
    }

    #[test]
    fn fingerprint_identity_is_deterministic_and_content_sensitive() {
        let a = record("Test Listing", "");
        let b = record("Test Listing", "");
        assert_eq!(resolve_listing_id(&a), resolve_listing_id(&b));
        assert_eq!(resolve_listing_id(&a).len(), 32);

        let mut c = record("Test Listing", "");
        c.price = "$100,001".to_string();
        assert_ne!(resolve_listing_id(&a), resolve_listing_id(&c));
    }

    #[test]
    fn fingerprint_trims_before_hashing() {
        let a = record("Test Listing", "");
        let mut b = record("  Test Listing  ", "");
        b.price = " $100,000 ".to_string();
        assert_eq!(resolve_listing_id(&a), resolve_listing_id(&b));
    }

    #[test]
    fn upsert_is_idempotent_on_identity_fields() {
        let (_dir, store) = temp_store();
        let rec = record("4420 C Groombridge Way", "https://example.com/listing/1");

        let id = store.upsert(&rec).unwrap();
        let first = store.query_unnotified(false).unwrap().remove(0);

        sleep(Duration::from_millis(10));
        let id_again = store.upsert(&rec).unwrap();
        let second = store.query_unnotified(false).unwrap().remove(0);

        assert_eq!(id, id_again);
        assert_eq!(first.first_seen_at, second.first_seen_at);
        assert!(second.last_seen_at > first.last_seen_at);
        assert_eq!(second.notified_at, None);
    }

    #[test]
    fn content_update_does_not_reset_notified_at() {
        let (_dir, store) = temp_store();
        let mut rec = record("Listing", "https://example.com/listing/1");
        let id = store.upsert(&rec).unwrap();
        assert_eq!(store.mark_notified(&[id.clone()]).unwrap(), 1);

        rec.price = "$123,456".to_string();
        rec.status = Some(ListingStatus::Available);
        store.upsert(&rec).unwrap();

        assert!(store.query_unnotified(false).unwrap().is_empty());

        // A second mark leaves the original timestamp alone.
        assert_eq!(store.mark_notified(&[id]).unwrap(), 0);
    }

    #[test]
    fn unnotified_are_ordered_by_first_seen() {
        let (_dir, store) = temp_store();
        for i in 0..3 {
            let rec = record(&format!("Listing {i}"), &format!("https://example.com/{i}"));
            store.upsert(&rec).unwrap();
            sleep(Duration::from_millis(10));
        }

        let unnotified = store.query_unnotified(false).unwrap();
        assert_eq!(unnotified.len(), 3);
        assert!(unnotified.windows(2).all(|w| w[0].first_seen_at <= w[1].first_seen_at));
        assert_eq!(unnotified[0].title, "Listing 0");
        assert_eq!(unnotified[2].title, "Listing 2");
    }

    #[test]
    fn exclude_closed_filters_drawing_closed_rows() {
        let (_dir, store) = temp_store();
        let mut open = record("Open", "https://example.com/open");
        open.status = Some(ListingStatus::Available);
        let mut closed = record("Closed", "https://example.com/closed");
        closed.status = Some(ListingStatus::DrawingClosed);
        store.upsert(&open).unwrap();
        store.upsert(&closed).unwrap();

        let all = store.query_unnotified(false).unwrap();
        assert_eq!(all.len(), 2);

        let filtered = store.query_unnotified(true).unwrap();
        assert_eq!(filtered.len(), 1);
        assert!(filtered
            .iter()
            .all(|l| l.status != Some(ListingStatus::DrawingClosed)));
    }

    #[test]
    fn mark_notified_tolerates_unknown_ids() {
        let (_dir, store) = temp_store();
        let id = store
            .upsert(&record("Listing", "https://example.com/1"))
            .unwrap();

        let updated = store
            .mark_notified(&[id, "https://example.com/ghost".to_string()])
            .unwrap();
        assert_eq!(updated, 1);
    }

    #[test]
    fn stats_count_notified_and_unnotified() {
        let (_dir, store) = temp_store();
        let id = store
            .upsert(&record("One", "https://example.com/1"))
            .unwrap();
        store
            .upsert(&record("Two", "https://example.com/2"))
            .unwrap();
        store.mark_notified(&[id]).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(
            stats,
            StoreStats {
                total: 2,
                notified: 1,
                unnotified: 1
            }
        );
    }

    #[test]
    fn details_round_trip_through_storage() {
        let (_dir, store) = temp_store();
        let mut rec = record("Listing", "https://example.com/1");
        rec.details = vec![
            "Type: Condominium".to_string(),
            "Household: 1 to 4 people".to_string(),
            "Beds/Baths: 2 Bedrooms / 1 Bathroom".to_string(),
        ];
        store.upsert(&rec).unwrap();

        let stored = store.query_unnotified(false).unwrap().remove(0);
        assert_eq!(stored.details, rec.details);
    }
}
