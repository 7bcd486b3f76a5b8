use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vendhub_nav::api::{AchievementQueue, HostEvent, LocationTracker, RouteHost, VoiceAnnouncer};
use vendhub_nav::core::{BadgeCategory, BadgeDefinition, Destination, GeoPoint, Route, RouteStep};
use vendhub_nav::platform::{
    JsonFileStore, KeyValueStore, MemoryStore, MockGeolocation, MockMapView, MockSpeech, SledStore,
};
use vendhub_nav::utils::{Clock, ConfigurationManager, ManualClock};

fn demo_route() -> Route {
    let steps = vec![
        RouteStep::new(GeoPoint::new(41.2995, 69.2401), "Идите прямо по улице Навои"),
        RouteStep::new(GeoPoint::new(41.3004, 69.2401), "Поверните направо"),
        RouteStep::new(GeoPoint::new(41.3004, 69.2413), "Автомат будет слева"),
    ];
    let destination = Destination {
        name: "VendHub у метро Алишера Навои".to_string(),
        position: GeoPoint::new(41.3004, 69.2413),
    };
    Route::new(steps, destination)
}

fn demo_badges() -> Vec<BadgeDefinition> {
    vec![
        BadgeDefinition::new("first_order", "Первый заказ", BadgeCategory::Orders)
            .with_description("Сделайте первый заказ")
            .with_icon("coffee"),
        BadgeDefinition::new("explorer", "Исследователь", BadgeCategory::Special)
            .with_description("Дойдите до автомата по маршруту")
            .with_icon("map"),
    ]
}

/// Interpolated fixes from `from` to `to`, endpoints included
fn walk(from: GeoPoint, to: GeoPoint, points: usize) -> impl Iterator<Item = GeoPoint> {
    (0..=points).map(move |i| {
        let t = i as f64 / points as f64;
        GeoPoint::new(from.lat + (to.lat - from.lat) * t, from.lng + (to.lng - from.lng) * t)
    })
}

fn log_event(event: &HostEvent) {
    match event {
        HostEvent::Tracker(event) => info!(?event, "tracker"),
        HostEvent::Voice(event) => info!(?event, "voice"),
        HostEvent::OffRoute { distance_m } => info!(distance_m, "off route"),
        HostEvent::BackOnRoute => info!("back on route"),
        HostEvent::Arrived { destination } => info!(destination = %destination.name, "arrived"),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 3 {
        eprintln!(
            "Usage: {} [config.json] [seen_store.json | seen_store_dir]",
            args.first().map_or("vendhub-nav-demo", |s| s.as_str())
        );
        return Err("too many arguments".into());
    }

    let manager = match args.get(1) {
        Some(path) => ConfigurationManager::from_file(path)?,
        None => ConfigurationManager::new(),
    };
    let config = manager.config().clone();

    let clock = ManualClock::new(0);
    let geo = MockGeolocation::new();
    let speech = MockSpeech::new();
    let map = MockMapView::new();

    let tracker = LocationTracker::new(Box::new(geo.clone()), config.tracker.clone());
    let mut announcer =
        VoiceAnnouncer::new(Box::new(speech.clone()), config.voice.clone(), Arc::new(clock.clone()));
    announcer.enable();
    let mut host = RouteHost::new(tracker, announcer, Box::new(map.clone()), config.host.clone());

    let route = demo_route();
    let corners: Vec<GeoPoint> = route.steps.iter().map(|s| s.position).collect();
    host.start_navigation(route)?;

    let path = corners
        .windows(2)
        .flat_map(|leg| walk(leg[0], leg[1], 5).skip(1));
    let fixes = std::iter::once(corners[0]).chain(path);

    for position in fixes {
        clock.advance(u64::from(config.tracker.update_interval_ms));
        geo.deliver_position(position, clock.now_ms());
        for event in host.process() {
            log_event(&event);
        }
        if speech.is_playing() {
            speech.finish_current();
            host.process().iter().for_each(log_event);
        }
    }
    info!(
        arrived = host.has_arrived(),
        spoken = speech.spoken().len(),
        map_calls = map.calls().len(),
        "walk finished"
    );
    host.cancel_navigation();

    let store: Box<dyn KeyValueStore + Send> = match args.get(2) {
        Some(path) if Path::new(path).extension().is_some_and(|ext| ext == "json") => {
            Box::new(JsonFileStore::open(path)?)
        }
        Some(path) => Box::new(SledStore::open(path)?),
        None => Box::new(MemoryStore::new()),
    };
    let mut achievements = AchievementQueue::new(store, config.achievements.clone(), Arc::new(clock.clone()))?;
    let queued = achievements.check_and_queue_new_achievements(&["first_order", "explorer"], &demo_badges());
    info!(queued = queued.len(), "achievements unlocked");

    for _ in 0..20 {
        clock.advance(100);
        for ready in achievements.process() {
            info!(badge = %ready.badge.name, "showing toast");
            achievements.dismiss_current_achievement()?;
        }
    }
    info!(seen = ?achievements.seen_ids().collect::<Vec<_>>(), "achievements done");

    Ok(())
}
