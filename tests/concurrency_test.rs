//! Concurrency tests for clipshelf.
//!
//! These tests race uploads and deletes across threads and check that the
//! library ends in a consistent state: no empty category directories, no
//! temporary files, and every surviving file complete.

use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::TempDir;

use clipshelf::FileRepository;

fn setup_repo() -> (TempDir, Arc<FileRepository>) {
    let temp_dir = TempDir::new().unwrap();
    let repo = FileRepository::new(temp_dir.path().join("audio_files")).unwrap();
    (temp_dir, Arc::new(repo))
}

/// Every category directory is non-empty and holds no temporary files.
fn assert_consistent(repo: &FileRepository) {
    for category in repo.list_categories().unwrap() {
        let dir = repo.storage_root().join(&category);
        let entries: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();

        assert!(!entries.is_empty(), "category '{category}' left empty");
        assert!(
            entries.iter().all(|name| !name.ends_with(".part")),
            "temporary file left in '{category}': {entries:?}"
        );
    }
}

/// Concurrent uploads of distinct files into one new category all land.
#[test]
fn test_concurrent_uploads_same_category() {
    let (_temp_dir, repo) = setup_repo();
    const NUM_UPLOADS: usize = 16;

    let barrier = Arc::new(Barrier::new(NUM_UPLOADS));
    let handles: Vec<_> = (0..NUM_UPLOADS)
        .map(|i| {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let session = repo.sessions().start();
                barrier.wait();
                repo.save_file(&session, "jazz", &format!("take-{i:02}.mp3"), &vec![i as u8; 2048])
                    .unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let files = repo.list_files("jazz").unwrap();
    assert_eq!(files.len(), NUM_UPLOADS);
    for (i, file) in files.iter().enumerate() {
        assert_eq!(file.name, format!("take-{i:02}.mp3"));
        assert_eq!(file.size_bytes, 2048);
    }
    assert_consistent(&repo);
}

/// Concurrent writers of the same name leave exactly one complete file.
#[test]
fn test_concurrent_overwrites_same_name() {
    let (_temp_dir, repo) = setup_repo();
    const NUM_WRITERS: usize = 8;

    let barrier = Arc::new(Barrier::new(NUM_WRITERS));
    let handles: Vec<_> = (0..NUM_WRITERS)
        .map(|i| {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let session = repo.sessions().start();
                barrier.wait();
                repo.save_file(&session, "jazz", "take.mp3", &vec![i as u8; 4096])
                    .unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let content = repo.download_bytes("jazz", "take.mp3").unwrap();
    assert_eq!(content.len(), 4096);
    assert!(content.iter().all(|b| *b == content[0]));
    assert_eq!(repo.list_files("jazz").unwrap().len(), 1);
    assert_consistent(&repo);
}

/// Uploads racing the deletion of a category's last file never lose the
/// upload to the empty-category cleanup.
#[test]
fn test_upload_races_last_delete() {
    const ROUNDS: usize = 25;

    for round in 0..ROUNDS {
        let (_temp_dir, repo) = setup_repo();
        let session = repo.sessions().start();
        repo.save_file(&session, "jazz", "old.mp3", &[1u8; 64])
            .unwrap();

        let barrier = Arc::new(Barrier::new(2));

        let deleter = {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                repo.delete_file("jazz", "old.mp3").unwrap()
            })
        };
        let uploader = {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            let session = session.clone();
            thread::spawn(move || {
                barrier.wait();
                repo.save_file(&session, "jazz", "new.mp3", &[2u8; 64])
                    .unwrap();
            })
        };

        assert!(deleter.join().unwrap(), "round {round}: delete missed");
        uploader.join().unwrap();

        let names: Vec<String> = repo
            .list_files("jazz")
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["new.mp3"], "round {round}");
        assert_consistent(&repo);
    }
}

/// Once uploads and deletes of the same file have settled, the session's
/// upload record names the file exactly when it exists.
#[test]
fn test_upload_record_matches_disk_after_races() {
    const ROUNDS: usize = 25;

    for round in 0..ROUNDS {
        let (_temp_dir, repo) = setup_repo();
        let session = repo.sessions().start();
        let barrier = Arc::new(Barrier::new(2));

        let uploader = {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            let session = session.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..10 {
                    repo.save_file(&session, "jazz", "take.mp3", &[3u8; 64])
                        .unwrap();
                }
            })
        };
        let deleter = {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..10 {
                    repo.delete_file("jazz", "take.mp3").unwrap();
                }
            })
        };

        uploader.join().unwrap();
        deleter.join().unwrap();

        let path = repo.file_path("jazz", "take.mp3").unwrap();
        assert_eq!(
            repo.sessions().has_uploaded(&session, &path),
            path.is_file(),
            "round {round}: upload record out of step with disk"
        );
        for recorded in repo.sessions().uploads(&session) {
            assert!(recorded.is_file(), "round {round}: stale upload record {recorded:?}");
        }
        assert_consistent(&repo);
    }
}

/// Mixed uploads and deletes across several categories.
#[test]
fn test_mixed_workload_consistency() {
    let (_temp_dir, repo) = setup_repo();
    const NUM_THREADS: usize = 8;
    const OPS_PER_THREAD: usize = 20;
    let categories = ["jazz", "rock", "blues"];

    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|t| {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let session = repo.sessions().start();
                barrier.wait();
                for op in 0..OPS_PER_THREAD {
                    let category = categories[(t + op) % categories.len()];
                    let name = format!("clip-{}.mp3", op % 3);
                    if (t + op) % 2 == 0 {
                        repo.save_file(&session, category, &name, &[t as u8; 128])
                            .unwrap();
                    } else {
                        repo.delete_file(category, &name).unwrap();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_consistent(&repo);
    for category in repo.list_categories().unwrap() {
        for file in repo.list_files(&category).unwrap() {
            assert_eq!(file.size_bytes, 128);
        }
    }
}
