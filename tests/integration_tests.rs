//! # Integration Tests for Songquiz
//!
//! End-to-end tests exercising the library the way the binary does: a
//! catalog imported into SQLite, a scripted quiz run, stored results read
//! back and re-estimated, plus a few CLI smoke tests.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use songquiz::catalog::{self, CatalogSource, StaticCatalog};
use songquiz::config::QuizConfig;
use songquiz::db::SqliteStore;
use songquiz::estimator::{self, TierPopulation};
use songquiz::guard::OVER_TEST_CAP;
use songquiz::interactive::{self, QuizOutcome};
use songquiz::session::{Preferences, QuizSession, QuizState};
use songquiz::song::Song;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

const CATALOG_JSON: &str = r#"[
    {"spotify_id": "s1", "title": "Yellow", "artist": "Coldplay", "genres": ["pop", "rock"], "tier": 1, "popularity": 95, "region": null},
    {"spotify_id": "s2", "title": "Creep", "artist": "Radiohead", "genres": ["rock"], "tier": 1, "popularity": 90},
    {"spotify_id": "s3", "title": "So What", "artist": "Miles Davis", "genres": ["jazz"], "tier": 2, "popularity": 70},
    {"spotify_id": "s4", "title": "Gangnam Style", "artist": "PSY", "genres": ["k-pop"], "tier": 1, "popularity": 88, "region": "KR"},
    {"spotify_id": "s5", "title": "Aguas de Marco", "artist": "Elis Regina", "genres": ["jazz"], "tier": 3, "popularity": 60, "region": "BR"},
    {"spotify_id": "s6", "title": "Obscure Demo", "artist": "Nobody", "genres": null, "tier": null, "popularity": 3},
    {"spotify_id": "s7", "title": "Teardrop", "artist": "Massive Attack", "genres": ["electronic"], "tier": 2, "popularity": 75}
]"#;

/// Test helper to create a temporary database loaded with the sample catalog
fn create_test_database() -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_songs.db");

    let songs = catalog::parse_songs(CATALOG_JSON)?;
    let mut store = SqliteStore::init(&db_path, false)?;
    store.import_songs(&songs)?;

    Ok((temp_dir, db_path))
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn songquiz() -> Command {
        Command::new(env!("CARGO_BIN_EXE_songquiz"))
    }

    #[test]
    fn test_cli_help_displays_correctly() {
        let output = songquiz()
            .arg("--help")
            .output()
            .expect("Failed to run help command");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("songquiz"));
        assert!(stdout.contains("quiz"));
        assert!(stdout.contains("import"));
        assert!(stdout.contains("estimate"));
    }

    #[test]
    fn test_completion_generation() {
        let output = songquiz()
            .args(["completion", "bash"])
            .output()
            .expect("Failed to run completion command");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("_songquiz"));
        assert!(stdout.contains("complete"));
    }

    #[test]
    fn test_list_reads_database_override() -> Result<()> {
        let (_temp_dir, db_path) = create_test_database()?;

        let output = songquiz()
            .arg("--db")
            .arg(&db_path)
            .args(["list", "--tier", "1"])
            .output()?;

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Yellow"));
        assert!(!stdout.contains("So What"));
        assert!(stdout.contains("3 songs"));
        Ok(())
    }

    #[test]
    fn test_quiz_requires_preferences() -> Result<()> {
        let (_temp_dir, db_path) = create_test_database()?;

        let output = songquiz().arg("--db").arg(&db_path).arg("quiz").output()?;

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("--genre"));
        Ok(())
    }
}

#[cfg(test)]
mod database_integration_tests {
    use super::*;

    #[test]
    fn test_import_defaults_missing_fields() -> Result<()> {
        let (_temp_dir, db_path) = create_test_database()?;
        let store = SqliteStore::open(&db_path)?;

        assert_eq!(store.song_count()?, 7);

        let demo = store.song_by_id("s6")?.expect("s6 was imported");
        assert_eq!(demo.tier, 5);
        assert!(demo.genres.is_empty());
        assert_eq!(store.song_by_id("missing")?, None);
        Ok(())
    }

    #[test]
    fn test_init_refuses_existing_database() -> Result<()> {
        let (_temp_dir, db_path) = create_test_database()?;

        assert!(SqliteStore::init(&db_path, false).is_err());

        let store = SqliteStore::init(&db_path, true)?;
        assert_eq!(store.song_count()?, 0);
        Ok(())
    }

    #[test]
    fn test_candidate_pool_filters_by_language() -> Result<()> {
        let (_temp_dir, db_path) = create_test_database()?;
        let store = SqliteStore::open(&db_path)?;

        let korean = Preferences::new(Vec::<String>::new(), ["Korean"]);
        let pool = store.candidate_pool(&korean, 100)?;
        let ids: Vec<&str> = pool.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s4"]);

        // English first means no regional restriction
        let english_jazz = Preferences::new(["jazz"], ["English", "Korean"]);
        let pool = store.candidate_pool(&english_jazz, 100)?;
        assert_eq!(pool.len(), 2);
        Ok(())
    }

    #[test]
    fn test_database_and_file_catalogs_agree() -> Result<()> {
        let (_temp_dir, db_path) = create_test_database()?;
        let store = SqliteStore::open(&db_path)?;
        let file = StaticCatalog::new(catalog::parse_songs(CATALOG_JSON)?);

        let prefs = Preferences::new(["rock", "jazz"], Vec::<String>::new());
        let from_db = store.candidate_pool(&prefs, 100)?;
        let from_file = file.candidate_pool(&prefs, 100)?;

        assert_eq!(from_db, from_file);
        Ok(())
    }
}

#[cfg(test)]
mod quiz_integration_tests {
    use super::*;

    #[test]
    fn test_full_quiz_is_stored_and_re_estimated() -> Result<()> {
        let (_temp_dir, db_path) = create_test_database()?;
        let source = SqliteStore::open(&db_path)?;
        let mut sink = SqliteStore::open(&db_path)?;
        let config = QuizConfig::default();
        let mut rng = StdRng::seed_from_u64(42);

        // Seven songs, every one answered, then feedback
        let mut input = Cursor::new("y\nn\ny\ny\nn\nn\ny\nFun!\n");
        let mut out = Vec::new();

        let outcome = interactive::play(
            &source,
            &mut sink,
            &config,
            Preferences::new(Vec::<String>::new(), ["English"]),
            &mut rng,
            &mut input,
            &mut out,
            false,
        )?;

        let QuizOutcome::Completed { session_id, estimate } = outcome else {
            panic!("quiz should have completed");
        };

        let text = String::from_utf8(out)?;
        assert!(text.contains("Quiz Complete!"));
        assert!(text.contains("Results saved!"));
        assert!(text.contains("Thank you for your feedback!"));

        let responses = sink.session_responses(&session_id)?;
        assert_eq!(responses.len(), 7);
        assert_eq!(responses.iter().filter(|r| r.known).count(), 4);
        assert_eq!(estimator::estimate(&responses, &config.populations), estimate);

        let summary = sink.session_summary(&session_id)?.expect("session row");
        assert_eq!(summary.estimate, estimate);
        assert_eq!(sink.session_feedback(&session_id)?, vec!["Fun!".to_string()]);
        Ok(())
    }

    #[test]
    fn test_same_seed_same_quiz() -> Result<()> {
        let source = StaticCatalog::new(catalog::parse_songs(CATALOG_JSON)?);
        let config = QuizConfig::default();
        let prefs = Preferences::new(["pop", "jazz"], Vec::<String>::new());

        let run = |seed: u64| -> Result<Vec<String>> {
            let mut rng = StdRng::seed_from_u64(seed);
            let songs = catalog::working_set(&source, &prefs, config.fetch_limit, config.sample_size, &mut rng)?;
            let mut session = QuizSession::new(config.max_responses, config.populations.clone());
            session.begin(prefs.clone(), songs)?;
            let mut asked = Vec::new();
            while let Some(song) = session.next_song() {
                asked.push(song.id.clone());
                let known = asked.len() % 2 == 1;
                session.record_answer(known)?;
            }
            Ok(asked)
        };

        assert_eq!(run(9)?, run(9)?);
        Ok(())
    }

    #[test]
    fn test_session_over_large_catalog_respects_cap_and_guard() -> Result<()> {
        let genres = ["pop", "rock", "jazz", "metal"];
        let songs: Vec<Song> = (0..200u32)
            .map(|i| {
                let genre = genres[(i % 4) as usize];
                Song::new(format!("song{i:03}"), Some((i % 5) as u8 + 1), &[genre])
            })
            .collect();

        let mut session = QuizSession::default();
        session.begin(Preferences::new(["pop"], Vec::<String>::new()), songs)?;

        let mut answers = 0;
        while session.next_song().is_some() {
            session.record_answer(answers % 3 != 0)?;
            answers += 1;
        }

        assert_eq!(session.state(), QuizState::Finished);
        assert_eq!(session.responses().len(), 30);

        let mut per_bucket: HashMap<(String, u8), u32> = HashMap::new();
        for response in session.responses() {
            for genre in &response.song.genres {
                *per_bucket.entry((genre.clone(), response.song.tier)).or_default() += 1;
            }
        }
        assert!(per_bucket.values().all(|&n| n <= OVER_TEST_CAP));

        let expected = estimator::estimate(session.responses(), &TierPopulation::default());
        assert_eq!(session.final_estimate(), Some(expected));
        Ok(())
    }
}
