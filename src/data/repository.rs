use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::error::AppError;
use crate::models::entry::{Entry, SavedSearch};
use crate::models::event::parse_flexible_timestamp;

pub fn upsert_entry(conn: &Connection, entry: &Entry) -> Result<(), AppError> {
    conn.execute(
        "INSERT OR REPLACE INTO entries (path, text, created_at, updated_at, tags, urls, emails, pinned, custom_tags)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            entry.path,
            entry.text,
            entry.created_at.to_rfc3339(),
            Utc::now().to_rfc3339(),
            serde_json::to_string(&entry.tags)?,
            serde_json::to_string(&entry.urls)?,
            serde_json::to_string(&entry.emails)?,
            entry.pinned,
            serde_json::to_string(&entry.custom_tags)?,
        ],
    )?;
    Ok(())
}

pub fn delete_by_path(conn: &Connection, path: &str) -> Result<usize, AppError> {
    let count = conn.execute("DELETE FROM entries WHERE path = ?1", params![path])?;
    Ok(count)
}

/// Bulk load at startup. A record is never dropped for one bad field:
/// malformed JSON list columns default to empty and an unreadable timestamp
/// defaults to the epoch (loads, sorts last).
pub fn load_all_entries(conn: &Connection) -> Result<Vec<Entry>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT path, text, created_at, tags, urls, emails, pinned, custom_tags
         FROM entries ORDER BY created_at DESC",
    )?;

    let entries = stmt
        .query_map([], |row| {
            let created_raw: String = row.get(2)?;
            let tags_raw: Option<String> = row.get(3)?;
            let urls_raw: Option<String> = row.get(4)?;
            let emails_raw: Option<String> = row.get(5)?;
            let custom_raw: Option<String> = row.get(7)?;

            Ok(Entry {
                path: row.get(0)?,
                text: row.get(1)?,
                created_at: parse_created_at(&created_raw),
                tags: parse_list(tags_raw),
                urls: parse_list(urls_raw),
                emails: parse_list(emails_raw),
                pinned: row.get(6)?,
                custom_tags: parse_list(custom_raw),
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(entries)
}

pub fn set_pinned(conn: &Connection, path: &str, pinned: bool) -> Result<usize, AppError> {
    let count = conn.execute(
        "UPDATE entries SET pinned = ?2 WHERE path = ?1",
        params![path, pinned],
    )?;
    Ok(count)
}

pub fn set_custom_tags(conn: &Connection, path: &str, tags: &[String]) -> Result<usize, AppError> {
    let count = conn.execute(
        "UPDATE entries SET custom_tags = ?2 WHERE path = ?1",
        params![path, serde_json::to_string(tags)?],
    )?;
    Ok(count)
}

/// Distinct union of every entry's custom tags, sorted, for the tag picker.
pub fn all_custom_tags(conn: &Connection) -> Result<Vec<String>, AppError> {
    let mut stmt = conn.prepare("SELECT custom_tags FROM entries WHERE custom_tags IS NOT NULL")?;
    let mut tags: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .filter_map(|r| r.ok())
        .flat_map(|raw| serde_json::from_str::<Vec<String>>(&raw).unwrap_or_default())
        .collect();
    tags.sort();
    tags.dedup();
    Ok(tags)
}

pub fn insert_saved_search(conn: &Connection, search: &SavedSearch) -> Result<(), AppError> {
    conn.execute(
        "INSERT OR REPLACE INTO saved_searches (search_id, name, query, collection_filter)
         VALUES (?1, ?2, ?3, ?4)",
        params![search.id, search.name, search.query, search.collection_filter],
    )?;
    Ok(())
}

pub fn delete_saved_search(conn: &Connection, id: &str) -> Result<usize, AppError> {
    let count = conn.execute(
        "DELETE FROM saved_searches WHERE search_id = ?1",
        params![id],
    )?;
    Ok(count)
}

pub fn load_saved_searches(conn: &Connection) -> Result<Vec<SavedSearch>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT search_id, name, query, collection_filter FROM saved_searches ORDER BY name ASC",
    )?;
    let searches = stmt
        .query_map([], |row| {
            Ok(SavedSearch {
                id: row.get(0)?,
                name: row.get(1)?,
                query: row.get(2)?,
                collection_filter: row.get(3)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();
    Ok(searches)
}

fn parse_created_at(raw: &str) -> DateTime<Utc> {
    parse_flexible_timestamp(raw).unwrap_or(DateTime::UNIX_EPOCH)
}

fn parse_list(raw: Option<String>) -> Vec<String> {
    raw.map(|r| serde_json::from_str(&r).unwrap_or_default())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::migrations::run_migrations;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn sample_entry() -> Entry {
        let mut entry = Entry::new(
            "/shots/meeting.png",
            "standup notes",
            DateTime::parse_from_rfc3339("2026-02-01T09:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        entry.tags = vec!["Messages".to_string()];
        entry.urls = vec!["https://cal.example.com".to_string()];
        entry
    }

    #[test]
    fn entry_roundtrip() {
        let conn = setup_db();
        let entry = sample_entry();
        upsert_entry(&conn, &entry).unwrap();

        let loaded = load_all_entries(&conn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].path, entry.path);
        assert_eq!(loaded[0].text, "standup notes");
        assert_eq!(loaded[0].created_at, entry.created_at);
        assert_eq!(loaded[0].tags, vec!["Messages"]);
        assert!(!loaded[0].pinned);
    }

    #[test]
    fn upsert_replaces_same_path() {
        let conn = setup_db();
        let mut entry = sample_entry();
        upsert_entry(&conn, &entry).unwrap();
        entry.text = "standup notes plus action items".to_string();
        upsert_entry(&conn, &entry).unwrap();

        let loaded = load_all_entries(&conn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].text, "standup notes plus action items");
    }

    #[test]
    fn malformed_list_columns_default_to_empty() {
        let conn = setup_db();
        conn.execute(
            "INSERT INTO entries (path, text, created_at, tags, urls, custom_tags)
             VALUES ('/bad.png', 'still here', '2026-01-01T00:00:00Z', '{not json', NULL, '42')",
            [],
        )
        .unwrap();

        let loaded = load_all_entries(&conn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].text, "still here");
        assert!(loaded[0].tags.is_empty());
        assert!(loaded[0].urls.is_empty());
        assert!(loaded[0].custom_tags.is_empty());
    }

    #[test]
    fn epoch_millis_created_at_still_loads() {
        let conn = setup_db();
        conn.execute(
            "INSERT INTO entries (path, text, created_at) VALUES ('/old.png', '', '1700000000000')",
            [],
        )
        .unwrap();

        let loaded = load_all_entries(&conn).unwrap();
        assert_eq!(
            loaded[0].created_at,
            DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
        );
    }

    #[test]
    fn unreadable_created_at_defaults_to_epoch() {
        let conn = setup_db();
        conn.execute(
            "INSERT INTO entries (path, text, created_at) VALUES ('/junk.png', '', 'garbage')",
            [],
        )
        .unwrap();

        let loaded = load_all_entries(&conn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].created_at, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn pin_and_custom_tags_update_in_place() {
        let conn = setup_db();
        upsert_entry(&conn, &sample_entry()).unwrap();

        assert_eq!(set_pinned(&conn, "/shots/meeting.png", true).unwrap(), 1);
        set_custom_tags(
            &conn,
            "/shots/meeting.png",
            &["work".to_string(), "standup".to_string()],
        )
        .unwrap();

        let loaded = load_all_entries(&conn).unwrap();
        assert!(loaded[0].pinned);
        assert_eq!(loaded[0].custom_tags, vec!["work", "standup"]);

        let all = all_custom_tags(&conn).unwrap();
        assert_eq!(all, vec!["standup", "work"]);
    }

    #[test]
    fn saved_search_crud() {
        let conn = setup_db();
        let search = SavedSearch::new("receipts this month", "total", Some("Receipts".to_string()));
        insert_saved_search(&conn, &search).unwrap();

        let loaded = load_saved_searches(&conn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "receipts this month");
        assert_eq!(loaded[0].collection_filter.as_deref(), Some("Receipts"));

        assert_eq!(delete_saved_search(&conn, &search.id).unwrap(), 1);
        assert!(load_saved_searches(&conn).unwrap().is_empty());
    }
}
