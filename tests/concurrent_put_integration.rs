//! Concurrency behavior of the tiered cache: racing writers and
//! reader/remover interleavings must never corrupt an entry or panic.

use std::fs;
use std::sync::Arc;
use std::thread;

use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use imgstash::TieredCache;
use tempfile::TempDir;

fn solid(value: u8) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([value, value, value, 255])))
}

#[test]
fn concurrent_put_of_same_key_keeps_exactly_one_entry() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(TieredCache::new(temp_dir.path()).unwrap());
    let key = "http://example.com/poster.png";
    let writers: u8 = 8;

    let handles: Vec<_> = (0..writers)
        .map(|i| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                cache.put(key, solid(i));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Exactly one canonical file, no temp leftovers.
    let names: Vec<String> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["http_example_com_poster_png".to_string()]);

    // The memory entry is one of the supplied images, intact.
    assert_eq!(cache.memory_len(), 1);
    let held = cache.get(key).unwrap().to_rgba8();
    let first_pixel = *held.get_pixel(0, 0);
    assert!((0..writers).any(|i| first_pixel == Rgba([i, i, i, 255])));
    assert!(held.pixels().all(|p| *p == first_pixel));

    // The disk entry decodes to one of the supplied images, intact.
    cache.clear_memory();
    let from_disk = cache.get(key).unwrap().to_rgba8();
    let disk_pixel = *from_disk.get_pixel(0, 0);
    assert!((0..writers).any(|i| disk_pixel == Rgba([i, i, i, 255])));
    assert!(from_disk.pixels().all(|p| *p == disk_pixel));
}

#[test]
fn concurrent_put_of_distinct_keys_keeps_all_entries() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(TieredCache::new(temp_dir.path()).unwrap());

    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let key = format!("http://example.com/poster-{}.png", i);
                assert!(cache.put(&key, solid(i)));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.memory_len(), 8);
    for i in 0..8u8 {
        let key = format!("http://example.com/poster-{}.png", i);
        let held = cache.get(&key).unwrap();
        assert_eq!(held.to_rgba8().get_pixel(0, 0), &Rgba([i, i, i, 255]));
    }
}

#[test]
fn get_racing_remove_degrades_to_hit_or_miss() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(TieredCache::new(temp_dir.path()).unwrap());
    let key = "poster";
    cache.put(key, solid(7));

    let reader = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for _ in 0..100 {
                // Either a complete image or a miss; never a panic.
                if let Some(hit) = cache.get(key) {
                    assert_eq!(hit.dimensions(), (8, 8));
                }
            }
        })
    };
    let remover = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for _ in 0..10 {
                cache.remove(key);
                thread::yield_now();
            }
        })
    };

    reader.join().unwrap();
    remover.join().unwrap();
}
