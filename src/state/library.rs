use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::data::{GalleryEntry, Owner, OwnerId};
use super::{normalize_owner_names, GalleryStore};
use crate::error::{GalleryError, Result};

const ENTRY_COLUMNS: &str = "owner_id, name, image_ref, width, height, artist_name, price, \
     tags_json, is_important, important_index, average_hue, date_added";

/// The Library manages the SQLite gallery database.
/// It stores owners and their galleries, one row per entry.
pub struct Library {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Library {
    /// Open (or create) the gallery database at `db_path`.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&db_path)?;
        info!(path = %db_path.display(), "gallery database opened");

        let library = Library {
            conn: Mutex::new(conn),
            db_path,
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Open a private in-memory database (nothing is written to disk)
    pub fn open_in_memory() -> Result<Self> {
        let library = Library {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: PathBuf::from(":memory:"),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Initialize the database schema.
    /// Creates all necessary tables and indexes if they don't exist.
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS owners (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name      TEXT NOT NULL,
                last_name       TEXT NOT NULL,
                created_at      TEXT NOT NULL
            )",
            [],
        )?;

        // One row per artwork; rowid order is gallery display order
        conn.execute(
            "CREATE TABLE IF NOT EXISTS gallery_entries (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id        INTEGER NOT NULL,
                name            TEXT NOT NULL,
                image_ref       TEXT NOT NULL,
                width           INTEGER NOT NULL,
                height          INTEGER NOT NULL,
                artist_name     TEXT NOT NULL,
                price           REAL NOT NULL,
                tags_json       TEXT NOT NULL DEFAULT '[]',
                is_important    INTEGER NOT NULL DEFAULT 0,
                important_index INTEGER,
                date_added      TEXT NOT NULL,
                UNIQUE(owner_id, image_ref),
                FOREIGN KEY(owner_id) REFERENCES owners(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_gallery_entries_owner
             ON gallery_entries(owner_id, id)",
            [],
        )?;

        // Galleries written before hue extraction existed get hue 0
        ignore_duplicate_column(conn.execute(
            "ALTER TABLE gallery_entries ADD COLUMN average_hue INTEGER NOT NULL DEFAULT 0",
            [],
        ))?;

        debug!("gallery schema initialized");
        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Get a count of entries across every gallery
    pub fn entry_count(&self) -> Result<i64> {
        let count: i64 =
            self.conn()?
                .query_row("SELECT COUNT(*) FROM gallery_entries", [], |row| row.get(0))?;
        Ok(count)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| GalleryError::upstream_message("gallery store", "connection lock poisoned"))
    }

    fn load_gallery(conn: &Connection, owner: OwnerId) -> Result<Vec<GalleryEntry>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM gallery_entries WHERE owner_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map([owner], row_to_entry)?;

        let mut gallery = Vec::new();
        for row in rows {
            gallery.push(row?.1);
        }
        Ok(gallery)
    }

    fn owner_exists(tx: &Transaction<'_>, owner: OwnerId) -> Result<bool> {
        let found = tx
            .query_row("SELECT 1 FROM owners WHERE id = ?1", [owner], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_entries(tx: &Transaction<'_>, owner: OwnerId, entries: &[GalleryEntry]) -> Result<()> {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO gallery_entries ({ENTRY_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ))?;

        for entry in entries {
            stmt.execute(params![
                owner,
                entry.name,
                entry.image_ref,
                entry.width,
                entry.height,
                entry.artist_name,
                entry.price,
                serde_json::to_string(&entry.tags)?,
                entry.is_important,
                entry.important_index,
                entry.average_hue,
                entry.date_added.to_rfc3339_opts(SecondsFormat::Nanos, true),
            ])?;
        }
        Ok(())
    }
}

impl GalleryStore for Library {
    fn create_owner(&self, first_name: &str, last_name: &str) -> Result<Owner> {
        let (first_name, last_name) = normalize_owner_names(first_name, last_name);
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO owners (first_name, last_name, created_at) VALUES (?1, ?2, ?3)",
            params![first_name, last_name, Utc::now().to_rfc3339()],
        )?;

        let owner = Owner {
            id: conn.last_insert_rowid(),
            first_name,
            last_name,
            gallery: Vec::new(),
        };
        info!(owner = owner.id, "owner created");
        Ok(owner)
    }

    fn fetch_owner(&self, id: OwnerId) -> Result<Option<Owner>> {
        let conn = self.conn()?;
        let names: Option<(String, String)> = conn
            .query_row(
                "SELECT first_name, last_name FROM owners WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((first_name, last_name)) = names else {
            return Ok(None);
        };

        Ok(Some(Owner {
            id,
            first_name,
            last_name,
            gallery: Self::load_gallery(&conn, id)?,
        }))
    }

    fn fetch_all_owners(&self) -> Result<Vec<Owner>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare("SELECT id, first_name, last_name FROM owners ORDER BY id")?;
        let mut owners: Vec<Owner> = stmt
            .query_map([], |row| {
                Ok(Owner {
                    id: row.get(0)?,
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                    gallery: Vec::new(),
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        // One scan for every entry, then distribute by owner
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM gallery_entries ORDER BY owner_id, id"
        ))?;
        let rows = stmt.query_map([], row_to_entry)?;
        for row in rows {
            let (owner_id, entry) = row?;
            if let Ok(pos) = owners.binary_search_by_key(&owner_id, |o| o.id) {
                owners[pos].gallery.push(entry);
            }
        }

        Ok(owners)
    }

    fn append_entries(&self, owner: OwnerId, entries: &[GalleryEntry]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if !Self::owner_exists(&tx, owner)? {
            return Err(GalleryError::not_found(format!("Owner {}", owner)));
        }
        Self::insert_entries(&tx, owner, entries)?;

        tx.commit()?;
        debug!(owner, count = entries.len(), "entries appended");
        Ok(())
    }

    fn update_entry(&self, owner: OwnerId, entry: &GalleryEntry) -> Result<()> {
        let changed = self.conn()?.execute(
            "UPDATE gallery_entries
             SET name = ?1, price = ?2, tags_json = ?3, is_important = ?4, important_index = ?5
             WHERE owner_id = ?6 AND image_ref = ?7",
            params![
                entry.name,
                entry.price,
                serde_json::to_string(&entry.tags)?,
                entry.is_important,
                entry.important_index,
                owner,
                entry.image_ref,
            ],
        )?;

        if changed == 0 {
            return Err(GalleryError::not_found(format!("Image {}", entry.image_ref)));
        }
        Ok(())
    }

    fn save_owner(&self, owner: &Owner) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let changed = tx.execute(
            "UPDATE owners SET first_name = ?1, last_name = ?2 WHERE id = ?3",
            params![owner.first_name, owner.last_name, owner.id],
        )?;
        if changed == 0 {
            return Err(GalleryError::not_found(format!("Owner {}", owner.id)));
        }

        // Rewrite the gallery so stored order matches the document exactly
        tx.execute("DELETE FROM gallery_entries WHERE owner_id = ?1", [owner.id])?;
        Self::insert_entries(&tx, owner.id, &owner.gallery)?;

        tx.commit()?;
        Ok(())
    }

    fn rename_owner(&self, id: OwnerId, first_name: &str, last_name: &str) -> Result<()> {
        let (first_name, last_name) = normalize_owner_names(first_name, last_name);
        let changed = self.conn()?.execute(
            "UPDATE owners SET first_name = ?1, last_name = ?2 WHERE id = ?3",
            params![first_name, last_name, id],
        )?;

        if changed == 0 {
            return Err(GalleryError::not_found(format!("Owner {}", id)));
        }
        Ok(())
    }
}

/// Treat "column already exists" from an `ADD COLUMN` migration as success
fn ignore_duplicate_column(result: rusqlite::Result<usize>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(_, Some(message)))
            if message.contains("duplicate column") =>
        {
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Map one `ENTRY_COLUMNS` row to its owner id and entry
fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<(OwnerId, GalleryEntry)> {
    let tags_json: String = row.get(7)?;
    let tags = serde_json::from_str(&tags_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    let date_added: String = row.get(11)?;
    let date_added = DateTime::parse_from_rfc3339(&date_added)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(11, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok((
        row.get(0)?,
        GalleryEntry {
            name: row.get(1)?,
            image_ref: row.get(2)?,
            width: row.get(3)?,
            height: row.get(4)?,
            artist_name: row.get(5)?,
            price: row.get(6)?,
            tags,
            is_important: row.get(8)?,
            important_index: row.get(9)?,
            average_hue: row.get(10)?,
            date_added,
        },
    ))
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(image_ref: &str, hue: u16) -> GalleryEntry {
        GalleryEntry {
            name: format!("Piece {}", image_ref),
            image_ref: image_ref.to_string(),
            width: 640,
            height: 480,
            artist_name: "Frida Kahlo".to_string(),
            price: 12.5,
            tags: vec!["oil".to_string(), "portrait".to_string()],
            is_important: false,
            important_index: None,
            average_hue: hue,
            date_added: Utc::now(),
        }
    }

    #[test]
    fn test_append_preserves_order_and_fields() {
        let library = Library::open_in_memory().unwrap();
        let owner = library.create_owner("Frida", "Kahlo").unwrap();

        let batch = vec![entry("b", 200), entry("a", 10), entry("c", 359)];
        library.append_entries(owner.id, &batch).unwrap();

        let stored = library.fetch_owner(owner.id).unwrap().unwrap();
        assert_eq!(stored.gallery, batch);
        assert_eq!(library.entry_count().unwrap(), 3);
    }

    #[test]
    fn test_append_to_missing_owner_fails_without_rows() {
        let library = Library::open_in_memory().unwrap();
        let err = library.append_entries(99, &[entry("a", 1)]).unwrap_err();
        assert!(matches!(err, GalleryError::NotFound { .. }));
        assert_eq!(library.entry_count().unwrap(), 0);
    }

    #[test]
    fn test_duplicate_reference_rolls_back_whole_batch() {
        let library = Library::open_in_memory().unwrap();
        let owner = library.create_owner("Frida", "Kahlo").unwrap();

        let err = library
            .append_entries(owner.id, &[entry("x", 1), entry("x", 2)])
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert!(library.fetch_owner(owner.id).unwrap().unwrap().gallery.is_empty());
    }

    #[test]
    fn test_update_entry_and_missing_reference() {
        let library = Library::open_in_memory().unwrap();
        let owner = library.create_owner("Frida", "Kahlo").unwrap();
        library.append_entries(owner.id, &[entry("a", 1)]).unwrap();

        let mut updated = entry("a", 1);
        updated.is_important = true;
        updated.important_index = Some(0);
        library.update_entry(owner.id, &updated).unwrap();

        let stored = library.fetch_owner(owner.id).unwrap().unwrap();
        assert!(stored.gallery[0].is_important);
        assert_eq!(stored.gallery[0].important_index, Some(0));

        let err = library.update_entry(owner.id, &entry("zzz", 1)).unwrap_err();
        assert!(matches!(err, GalleryError::NotFound { .. }));
    }

    #[test]
    fn test_save_owner_rewrites_gallery() {
        let library = Library::open_in_memory().unwrap();
        let owner = library.create_owner("Frida", "Kahlo").unwrap();
        library
            .append_entries(owner.id, &[entry("a", 1), entry("b", 2), entry("c", 3)])
            .unwrap();

        let mut doc = library.fetch_owner(owner.id).unwrap().unwrap();
        doc.gallery.retain(|e| e.image_ref != "b");
        library.save_owner(&doc).unwrap();

        let stored = library.fetch_owner(owner.id).unwrap().unwrap();
        let refs: Vec<_> = stored.gallery.iter().map(|e| e.image_ref.as_str()).collect();
        assert_eq!(refs, ["a", "c"]);
    }

    #[test]
    fn test_fetch_all_groups_by_owner() {
        let library = Library::open_in_memory().unwrap();
        let first = library.create_owner("A", "One").unwrap();
        let second = library.create_owner("", "").unwrap();
        library.append_entries(second.id, &[entry("s1", 5)]).unwrap();
        library.append_entries(first.id, &[entry("f1", 6), entry("f2", 7)]).unwrap();

        let owners = library.fetch_all_owners().unwrap();
        assert_eq!(owners.len(), 2);
        assert_eq!(owners[0].gallery.len(), 2);
        assert_eq!(owners[1].first_name, "User");
        assert_eq!(owners[1].gallery[0].image_ref, "s1");
    }

    #[test]
    fn test_reopen_keeps_data_and_tolerates_migration() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("gallery.db");

        let owner_id = {
            let library = Library::open(&path).unwrap();
            let owner = library.create_owner("Frida", "Kahlo").unwrap();
            library.append_entries(owner.id, &[entry("a", 77)]).unwrap();
            owner.id
        };

        // Second open re-runs the ALTER TABLE, which must be a no-op
        let library = Library::open(&path).unwrap();
        let owner = library.fetch_owner(owner_id).unwrap().unwrap();
        assert_eq!(owner.gallery[0].average_hue, 77);
    }

    #[test]
    fn test_migration_only_ignores_duplicate_column() {
        let duplicate = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(1),
            Some("duplicate column name: average_hue".to_string()),
        );
        assert!(ignore_duplicate_column(Err(duplicate)).is_ok());

        let readonly = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(8),
            Some("attempt to write a readonly database".to_string()),
        );
        let err = ignore_duplicate_column(Err(readonly)).unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_legacy_rows_default_to_zero_hue() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.db");

        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE owners (id INTEGER PRIMARY KEY AUTOINCREMENT, first_name TEXT NOT NULL,
                     last_name TEXT NOT NULL, created_at TEXT NOT NULL);
                 CREATE TABLE gallery_entries (id INTEGER PRIMARY KEY AUTOINCREMENT,
                     owner_id INTEGER NOT NULL, name TEXT NOT NULL, image_ref TEXT NOT NULL,
                     width INTEGER NOT NULL, height INTEGER NOT NULL, artist_name TEXT NOT NULL,
                     price REAL NOT NULL, tags_json TEXT NOT NULL DEFAULT '[]',
                     is_important INTEGER NOT NULL DEFAULT 0, important_index INTEGER,
                     date_added TEXT NOT NULL, UNIQUE(owner_id, image_ref));
                 INSERT INTO owners (first_name, last_name, created_at)
                     VALUES ('Old', 'Timer', '2020-01-01T00:00:00Z');
                 INSERT INTO gallery_entries (owner_id, name, image_ref, width, height,
                     artist_name, price, date_added)
                     VALUES (1, 'Artwork 1', 'legacy.png', 1, 1, 'Old Timer', 3.0,
                     '2020-01-01T00:00:00Z');",
            )
            .unwrap();
        }

        let library = Library::open(&path).unwrap();
        let owner = library.fetch_owner(1).unwrap().unwrap();
        assert_eq!(owner.gallery[0].average_hue, 0);
        assert!(owner.gallery[0].tags.is_empty());
    }
}
