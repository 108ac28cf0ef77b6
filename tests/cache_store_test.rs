use tempfile::tempdir;
use ttf_scraper::storage::{CacheKey, CacheStore};
use ttf_scraper::types::{Coordinates, GeoRecord};

const NOW: i64 = 1_760_000_000;
const DAY: i64 = 24 * 3600;

fn resolved(lat: &str) -> GeoRecord {
    GeoRecord::Resolved(Coordinates {
        lat: lat.to_string(),
        lon: "8.69".to_string(),
        display_name: "Heidelberg, Baden-Württemberg, Deutschland".to_string(),
    })
}

#[test]
fn entries_survive_reopening() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.db");

    {
        let store = CacheStore::open(&path, true).unwrap();
        store.set(&CacheKey::tournament("1"), &resolved("49.4")).unwrap();
        store
            .set(&CacheKey::location("Halle Nord", "Hessen"), &resolved("50.1"))
            .unwrap();
        store
            .set(&CacheKey::tournament("2"), &GeoRecord::failed(NOW, 2))
            .unwrap();
    }

    let reopened = CacheStore::open(&path, false).unwrap();
    assert_eq!(
        reopened.get(&CacheKey::tournament("1")).unwrap(),
        Some(resolved("49.4"))
    );
    assert_eq!(
        reopened.get(&CacheKey::location(" halle nord ", "Hessen")).unwrap(),
        Some(resolved("50.1"))
    );
    assert_eq!(
        reopened.get(&CacheKey::tournament("2")).unwrap(),
        Some(GeoRecord::failed(NOW, 2))
    );
}

#[test]
fn mirrored_and_direct_stores_agree() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.db");

    let mirrored = CacheStore::open(&path, true).unwrap();
    mirrored.set(&CacheKey::tournament("1"), &resolved("49.4")).unwrap();
    mirrored
        .set(&CacheKey::organizer("TC Heidelberg", "Baden-Württemberg"), &resolved("49.4"))
        .unwrap();
    mirrored
        .set(&CacheKey::tournament("old"), &GeoRecord::failed(NOW - 40 * DAY, 4))
        .unwrap();

    let direct = CacheStore::open(&path, false).unwrap();
    assert!(mirrored.is_mirrored());
    assert!(!direct.is_mirrored());
    assert_eq!(mirrored.entries().unwrap(), direct.entries().unwrap());
    assert_eq!(mirrored.statistics(NOW).unwrap(), direct.statistics(NOW).unwrap());

    let stats = direct.statistics(NOW).unwrap();
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.successful, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.pending_retry, 1);
    assert_eq!(stats.tournament_cache_size, 2);
    assert_eq!(stats.organizer_cache_size, 1);

    assert_eq!(direct.cleanup_failed_before(NOW).unwrap(), 1);
    assert_eq!(direct.get(&CacheKey::tournament("old")).unwrap(), None);
    assert!(direct.get(&CacheKey::tournament("1")).unwrap().is_some());
}

#[test]
fn unusable_path_falls_back_to_memory() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"plain file").unwrap();

    let store = CacheStore::open_or_memory(blocker.join("cache.db"), true).unwrap();
    store.set(&CacheKey::tournament("7"), &resolved("51.0")).unwrap();
    assert_eq!(
        store.get(&CacheKey::tournament("7")).unwrap(),
        Some(resolved("51.0"))
    );
}

#[test]
fn concurrent_writers_leave_mirror_and_disk_in_agreement() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let mirrored = CacheStore::open(&path, true).unwrap();
    let direct = CacheStore::open(&path, false).unwrap();
    let key = CacheKey::location("Tennisanlage am Neckar", "Baden-Württemberg");

    for round in 0..50 {
        std::thread::scope(|scope| {
            for writer in 0..8 {
                let (mirrored, key) = (&mirrored, &key);
                scope.spawn(move || {
                    let lat = format!("{}.{}", round, writer);
                    mirrored.set(key, &resolved(&lat)).unwrap();
                });
            }
        });
        assert_eq!(
            mirrored.get(&key).unwrap(),
            direct.get(&key).unwrap(),
            "mirror diverged from disk in round {}",
            round
        );
    }
}
