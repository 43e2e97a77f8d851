//! Daily content cache: eviction, sharing per location bucket and the
//! global daily slot

mod helpers;

use birdcast_common::time::{date_at_offset, local_today};
use birdcast_common::{location_key, Location};
use birdcast_daily::config::DailyConfig;
use birdcast_daily::program::{
    refresh_global_daily, refresh_listener_days, spawn_global_daily_scheduler,
    DailyProgramService,
};
use birdcast_daily::services::{fallback_birds, fallback_for_day, DailyContentCache};
use birdcast_daily::types::{seeded_rng, ResolutionSource};
use helpers::{date, obs, RenderMode, StubAudio, StubObservations, Stubs};
use chrono::{TimeZone, Utc};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_sweep_evicts_yesterday_only() {
    let cache = DailyContentCache::new();
    let key = location_key(40.71, -74.01);
    let yesterday = date(2024, 6, 9);
    let today = date(2024, 6, 10);

    cache.put("card", yesterday, &key, "Blue Jay").await;
    cache.put("card", today, &key, "Northern Cardinal").await;

    assert_eq!(cache.sweep_at(today).await, 1);
    assert!(cache.get("card", yesterday, &key).await.is_none());
    assert_eq!(
        cache.get("card", today, &key).await.unwrap().bird_name,
        "Northern Cardinal"
    );

    // a later sweep the same day removes nothing more
    assert_eq!(cache.sweep_at(today).await, 0);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn test_sweep_keeps_every_listener_today() {
    let cache = DailyContentCache::new();
    let key = location_key(37.77, -122.42);
    // 00:30 UTC: already the 2nd in London, still the 1st in San Francisco
    let now = Utc.with_ymd_and_hms(2024, 6, 2, 0, 30, 0).unwrap();
    let offsets = [-720, -480, 0, 840];

    for offset in offsets {
        let card = format!("card{}", offset);
        cache.put(&card, date_at_offset(now, offset), &key, "Steller's Jay").await;
    }
    cache.put("stale", date(2024, 5, 31), &key, "Old").await;

    assert_eq!(cache.sweep_as_of(now).await, 1);
    for offset in offsets {
        let card = format!("card{}", offset);
        let entry = cache.get(&card, date_at_offset(now, offset), &key).await;
        assert!(entry.is_some(), "entry for UTC{:+} minutes was evicted", offset);
    }
    assert!(cache.get("stale", date(2024, 5, 31), &key).await.is_none());
}

#[tokio::test]
async fn test_nearby_locations_share_entry() {
    let cache = DailyContentCache::new();
    let today = date(2024, 6, 10);
    cache.put("card", today, &location_key(40.712, -74.006), "Blue Jay").await;

    let nearby = location_key(40.74, -73.98);
    assert_eq!(cache.get("card", today, &nearby).await.unwrap().bird_name, "Blue Jay");

    let elsewhere = location_key(40.80, -74.01);
    assert!(cache.get("card", today, &elsewhere).await.is_none());
}

#[tokio::test]
async fn test_concurrent_writers_leave_one_entry() {
    let cache = DailyContentCache::new();
    let key = location_key(1.0, 2.0);
    let today = date(2024, 6, 10);

    let mut handles = Vec::new();
    for i in 0..16 {
        let cache = cache.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            cache.put("card", today, &key, &format!("Bird {}", i)).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(cache.len().await, 1);
    let name = cache.get("card", today, &key).await.unwrap().bird_name;
    assert!(name.starts_with("Bird "));
}

#[tokio::test]
async fn test_service_caches_resolution_per_card() {
    let stubs = Stubs::new(
        StubObservations::empty().with_tier(50, vec![obs("grtit", "Great Tit", "Parus major")]),
        StubAudio::playable(["Parus major"]),
        RenderMode::Working,
    );
    let dir = tempfile::tempdir().unwrap();
    let service = DailyProgramService::new(
        stubs.collaborators(),
        &DailyConfig::default(),
        dir.path(),
        seeded_rng(5),
    );
    let location = Location::from_coordinates(51.5, -0.12);
    let today = date(2024, 6, 10);

    let first = service.get_bird_for_location("card-1", &location, today).await.unwrap();
    assert!(matches!(first.source, ResolutionSource::Regional { .. }));

    let second = service.get_bird_for_location("card-1", &location, today).await.unwrap();
    assert_eq!(second.source, ResolutionSource::Cached);
    assert_eq!(second.candidate.common_name, "Great Tit");
    assert_eq!(
        second.recording.map(|r| r.file_url),
        first.recording.map(|r| r.file_url)
    );
    assert_eq!(stubs.observations.calls().len(), 1);

    // another card resolves on its own
    service.get_bird_for_location("card-2", &location, today).await.unwrap();
    assert_eq!(stubs.observations.calls().len(), 2);
}

#[tokio::test]
async fn test_global_daily_used_when_resolution_fails() {
    let stubs = Stubs::new(
        StubObservations::empty(),
        StubAudio::playable(["Gavia immer"]),
        RenderMode::Working,
    );
    let dir = tempfile::tempdir().unwrap();
    let service = DailyProgramService::new(
        stubs.collaborators(),
        &DailyConfig::default(),
        dir.path(),
        seeded_rng(5),
    )
    .with_fallback_list(Vec::new());
    let location = Location::from_coordinates(10.0, 10.0);
    let today = date(2024, 6, 10);

    assert!(service.get_bird_for_location("card", &location, today).await.is_err());

    service.cache().set_global_daily(today, "Common Loon").await;
    let bird = service.get_bird_for_location("card", &location, today).await.unwrap();
    assert_eq!(bird.source, ResolutionSource::GlobalDaily);
    assert_eq!(bird.candidate.common_name, "Common Loon");
}

#[tokio::test]
async fn test_refresh_global_daily_uses_day_slot() {
    let cache = DailyContentCache::new();
    let fallback = fallback_birds();
    let today = date(2024, 6, 10);

    let stored = refresh_global_daily(&cache, &fallback, today).await.unwrap();
    assert_eq!(stored, fallback_for_day(&fallback, today).unwrap().common_name);
    assert_eq!(cache.get_global_daily(today).await, Some(stored));

    assert!(refresh_global_daily(&cache, &[], today).await.is_none());
}

#[tokio::test]
async fn test_global_daily_scheduler_sets_today_at_start() {
    let cache = DailyContentCache::new();
    let token = CancellationToken::new();
    let handle = spawn_global_daily_scheduler(cache.clone(), fallback_birds(), token.clone());

    let mut found = None;
    for _ in 0..50 {
        if let Some(name) = cache.get_global_daily(local_today()).await {
            found = Some(name);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(found.is_some());

    token.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("scheduler should stop on cancel")
        .unwrap();
}

#[tokio::test]
async fn test_global_daily_filled_for_every_listener_date() {
    let cache = DailyContentCache::new();
    let fallback = fallback_birds();
    // 11:00 UTC spans three calendar dates from UTC-12 to UTC+14
    let now = Utc.with_ymd_and_hms(2024, 6, 2, 11, 0, 0).unwrap();

    let stored = refresh_listener_days(&cache, &fallback, now).await;
    assert_eq!(stored.len(), 3);

    for offset in [-720, -300, 0, 330, 840] {
        let day = date_at_offset(now, offset);
        assert_eq!(
            cache.get_global_daily(day).await,
            fallback_for_day(&fallback, day).map(|b| b.common_name.clone()),
            "no global bird for UTC{:+} minutes",
            offset
        );
    }
}

#[tokio::test]
async fn test_rotation_bird_used_when_global_slot_missing() {
    let stubs = Stubs::new(
        StubObservations::empty(),
        StubAudio::default(),
        RenderMode::Working,
    );
    let dir = tempfile::tempdir().unwrap();
    let service = DailyProgramService::new(
        stubs.collaborators(),
        &DailyConfig::default(),
        dir.path(),
        seeded_rng(5),
    );
    let location = Location::from_coordinates(-14.27, -170.70);
    let today = date(2024, 6, 10);
    assert!(service.cache().get_global_daily(today).await.is_none());

    let bird = service.get_bird_for_location("card", &location, today).await.unwrap();
    assert_eq!(bird.source, ResolutionSource::GlobalDaily);
    assert_eq!(
        Some(bird.candidate.common_name),
        fallback_for_day(&fallback_birds(), today).map(|b| b.common_name.clone())
    );
    assert!(bird.recording.is_none());
}
