//! SQLite storage for the song catalog and quiz results.
//!
//! One database file holds four tables:
//!
//! - `songs`: the catalog, genres stored as a JSON array
//! - `responses`: every answer, keyed by session id and position
//! - `sessions`: one summary row per finished session
//! - `session_feedback`: free-text comments left after a session

use crate::catalog::{matches_preferences, region_filter, CatalogSource};
use crate::session::Preferences;
use crate::song::{Response, ResponseRow, Song, DEFAULT_TIER};
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::Path;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS songs (
        id          TEXT PRIMARY KEY,
        title       TEXT    NOT NULL DEFAULT '',
        artist      TEXT    NOT NULL DEFAULT '',
        genres      TEXT    NOT NULL DEFAULT '[]',
        tier        INTEGER,
        popularity  INTEGER NOT NULL DEFAULT 0,
        region      TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_songs_tier ON songs(tier);

    CREATE TABLE IF NOT EXISTS responses (
        id          INTEGER PRIMARY KEY,
        session_id  TEXT    NOT NULL,
        song_id     TEXT    NOT NULL,
        known       INTEGER NOT NULL,
        position    INTEGER NOT NULL,
        created_at  TEXT    NOT NULL DEFAULT (datetime('now')),
        UNIQUE(session_id, position)
    );

    CREATE TABLE IF NOT EXISTS sessions (
        session_id  TEXT PRIMARY KEY,
        estimate    INTEGER NOT NULL,
        known_count INTEGER NOT NULL,
        total       INTEGER NOT NULL,
        created_at  TEXT    NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS session_feedback (
        id          INTEGER PRIMARY KEY,
        session_id  TEXT    NOT NULL,
        feedback    TEXT    NOT NULL,
        created_at  TEXT    NOT NULL DEFAULT (datetime('now'))
    );
";

/// Where finished sessions are recorded.
pub trait ResultSink {
    /// Store a finished session's answers, in order, and its estimate.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; nothing is stored in that case.
    fn record_session(&mut self, session_id: &str, rows: &[ResponseRow], estimate: u64) -> Result<()>;

    /// Store free-text feedback. Returns `false` if the text was blank and
    /// nothing was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn record_feedback(&mut self, session_id: &str, feedback: &str) -> Result<bool>;
}

/// Summary row of a stored session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: String,
    pub estimate: u64,
    pub known_count: u32,
    pub total: u32,
}

/// Catalog and result store backed by one SQLite connection.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and make sure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Self::with_connection(conn)
    }

    /// Throwaway database, mostly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot create the schema.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create database schema")?;
        Ok(Self { conn })
    }

    /// Create a fresh database at `path`. Refuses to touch an existing file
    /// unless `force` is set, in which case the old file is removed first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database exists and `force` is false, or if
    /// the file cannot be replaced.
    pub fn init(path: &Path, force: bool) -> Result<Self> {
        if path.exists() {
            if !force {
                bail!(
                    "Database already exists at {}. Use --force to recreate it.",
                    path.display()
                );
            }
            warn!("Removing existing database at {}", path.display());
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        info!("Creating database at {}", path.display());
        Self::open(path)
    }

    /// Insert or replace catalog songs in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; the transaction is then rolled back.
    pub fn import_songs(&mut self, songs: &[Song]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO songs (id, title, artist, genres, tier, popularity, region)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for song in songs {
                let genres = serde_json::to_string(&song.genres)?;
                stmt.execute(params![
                    song.id,
                    song.title,
                    song.artist,
                    genres,
                    song.tier,
                    song.popularity,
                    song.region,
                ])
                .with_context(|| format!("Failed to insert song `{}'", song.id))?;
            }
        }
        tx.commit().context("Committing song import failed")?;
        info!("Imported {} songs", songs.len());
        Ok(songs.len())
    }

    /// Every catalog song, easiest tier first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed.
    pub fn all_songs(&self) -> Result<Vec<Song>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, artist, genres, tier, popularity, region FROM songs
             ORDER BY COALESCE(tier, ?1) ASC, rowid ASC",
        )?;
        let songs = stmt
            .query_map([DEFAULT_TIER], song_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read songs")?;
        Ok(songs)
    }

    /// Look up one song by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn song_by_id(&self, id: &str) -> Result<Option<Song>> {
        self.conn
            .query_row(
                "SELECT id, title, artist, genres, tier, popularity, region FROM songs WHERE id = ?1",
                [id],
                song_from_row,
            )
            .optional()
            .with_context(|| format!("Failed to look up song `{id}'"))
    }

    /// Number of catalog songs.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn song_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Answers of a stored session, rebuilt against the current catalog.
    /// Answers whose song has since left the catalog are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is unknown or the query fails.
    pub fn session_responses(&self, session_id: &str) -> Result<Vec<Response>> {
        let mut stmt = self.conn.prepare(
            "SELECT song_id, known FROM responses WHERE session_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt
            .query_map([session_id], |row| {
                Ok(ResponseRow {
                    song_id: row.get(0)?,
                    known: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read responses of {session_id}"))?;

        if rows.is_empty() {
            bail!("No responses stored for session {session_id}");
        }

        let mut responses = Vec::with_capacity(rows.len());
        for row in rows {
            match self.song_by_id(&row.song_id)? {
                Some(song) => responses.push(Response::new(song, row.known)),
                None => warn!("Song `{}' from {session_id} is no longer in the catalog", row.song_id),
            }
        }
        Ok(responses)
    }

    /// Summary row written when the session finished.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn session_summary(&self, session_id: &str) -> Result<Option<SessionSummary>> {
        self.conn
            .query_row(
                "SELECT session_id, estimate, known_count, total FROM sessions WHERE session_id = ?1",
                [session_id],
                |row| {
                    Ok(SessionSummary {
                        session_id: row.get(0)?,
                        estimate: row.get::<_, i64>(1)?.try_into().unwrap_or(0),
                        known_count: row.get(2)?,
                        total: row.get(3)?,
                    })
                },
            )
            .optional()
            .context("Failed to read session summary")
    }

    /// Feedback left for a session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn session_feedback(&self, session_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT feedback FROM session_feedback WHERE session_id = ?1 ORDER BY id")?;
        let feedback = stmt
            .query_map([session_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(feedback)
    }
}

fn song_from_row(row: &Row<'_>) -> rusqlite::Result<Song> {
    let genres_json: String = row.get(3)?;
    let genres: Vec<String> = serde_json::from_str(&genres_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    let id: String = row.get(0)?;
    let tier = match row.get::<_, Option<i64>>(4)? {
        None => DEFAULT_TIER,
        Some(raw) => u8::try_from(raw).unwrap_or_else(|_| {
            warn!("Song `{id}' has stored tier {raw}, using {DEFAULT_TIER}");
            DEFAULT_TIER
        }),
    };

    Ok(Song {
        id,
        title: row.get(1)?,
        artist: row.get(2)?,
        genres,
        tier,
        popularity: row.get(5)?,
        region: row.get(6)?,
    })
}

impl CatalogSource for SqliteStore {
    fn candidate_pool(&self, preferences: &Preferences, limit: usize) -> Result<Vec<Song>> {
        let regions = region_filter(&preferences.languages);
        let pool: Vec<Song> = self
            .all_songs()?
            .into_iter()
            .filter(|song| matches_preferences(song, &preferences.genres, regions.as_deref()))
            .take(limit)
            .collect();
        debug!("Fetched {} candidate songs (limit {limit})", pool.len());
        Ok(pool)
    }
}

impl ResultSink for SqliteStore {
    fn record_session(&mut self, session_id: &str, rows: &[ResponseRow], estimate: u64) -> Result<()> {
        let known_count = rows.iter().filter(|r| r.known).count();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO responses (session_id, song_id, known, position) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, row) in rows.iter().enumerate() {
                stmt.execute(params![session_id, row.song_id, row.known, position])
                    .with_context(|| format!("Failed to store response for `{}'", row.song_id))?;
            }
        }
        tx.execute(
            "INSERT INTO sessions (session_id, estimate, known_count, total) VALUES (?1, ?2, ?3, ?4)",
            params![session_id, i64::try_from(estimate)?, known_count, rows.len()],
        )
        .with_context(|| format!("Failed to store session {session_id}"))?;
        tx.commit().context("Committing session results failed")?;

        info!("Saved {} responses for {session_id}", rows.len());
        Ok(())
    }

    fn record_feedback(&mut self, session_id: &str, feedback: &str) -> Result<bool> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Ok(false);
        }
        self.conn
            .execute(
                "INSERT INTO session_feedback (session_id, feedback) VALUES (?1, ?2)",
                params![session_id, feedback],
            )
            .context("Failed to store feedback")?;
        info!("Saved feedback for {session_id}");
        Ok(true)
    }
}
