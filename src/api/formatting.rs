//! Spoken announcement templates and distance/duration wording

/// Human wording of a distance: `350 м`, `1,2 км`
pub fn format_distance(meters: f64) -> String {
    let meters = meters.max(0.0);
    if meters < 1000.0 {
        format!("{} м", meters.round() as u64)
    } else {
        format!("{:.1} км", meters / 1000.0).replace('.', ",")
    }
}

/// Human wording of a travel time: `5 мин`, `1 ч`, `1 ч 10 мин`
pub fn format_duration(seconds: u64) -> String {
    let minutes = ((seconds + 30) / 60).max(1);
    let hours = minutes / 60;
    let rest = minutes % 60;

    match (hours, rest) {
        (0, m) => format!("{} мин", m),
        (h, 0) => format!("{} ч", h),
        (h, m) => format!("{} ч {} мин", h, m),
    }
}

/// Announcement spoken when a route has been built
pub fn route_start_text(distance: &str, duration: &str) -> String {
    format!(
        "Маршрут построен. Расстояние: {}. Время в пути: {}.",
        distance, duration
    )
}

/// Announcement spoken on arrival
pub fn arrival_text(destination_name: &str) -> String {
    format!("Вы прибыли к месту назначения: {}.", destination_name)
}

/// Message stored when an utterance fails for a platform reason
pub fn speech_error_text(reason: &str) -> String {
    format!("Ошибка синтеза речи: {}", reason)
}
