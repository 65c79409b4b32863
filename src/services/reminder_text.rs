use std::time::Duration;

use time::{OffsetDateTime, UtcOffset, macros::format_description};

use crate::{
    config::ReminderOffset,
    dao::models::{GameEntity, ParticipantId},
};

/// Renders reminder messages (Telegram HTML) in a fixed timezone.
#[derive(Debug, Clone, Copy)]
pub struct ReminderRenderer {
    utc_offset: UtcOffset,
}

impl ReminderRenderer {
    /// Renderer printing times at `utc_offset`.
    pub fn new(utc_offset: UtcOffset) -> Self {
        Self { utc_offset }
    }

    /// Reminder for `game` sent `offset` before it starts.
    pub fn render(&self, game: &GameEntity, offset: &ReminderOffset) -> String {
        let starts_at = OffsetDateTime::from(game.starts_at).to_offset(self.utc_offset);
        let date = starts_at
            .format(format_description!("[day].[month].[year]"))
            .unwrap_or_default();
        let time = starts_at
            .format(format_description!("[hour]:[minute]"))
            .unwrap_or_default();
        let court = game
            .court
            .map_or_else(|| "not specified".to_owned(), |court| format!("#{court}"));

        format!(
            "⏰ <b>Game reminder</b>\n\n\
             🎾 Starts in {before}\n\
             📅 {date}\n\
             🕐 {time} ({duration})\n\
             📍 {location}\n\
             🏟️ Court {court}\n\
             👥 {occupied}/{total} players: {roster}\n\n\
             See you on court!",
            before = duration_label(offset.before),
            duration = duration_label(Duration::from_secs(u64::from(game.duration_minutes) * 60)),
            location = escape_html(&game.location),
            occupied = game.occupied(),
            total = game.slots.len(),
            roster = game
                .participants()
                .map(mention)
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

/// Telegram mention linking to the participant's profile.
fn mention(participant: ParticipantId) -> String {
    format!("<a href=\"tg://user?id={participant}\">player {participant}</a>")
}

/// Human label such as `3 h`, `45 min` or `1 h 30 min`.
fn duration_label(duration: Duration) -> String {
    let minutes = duration.as_secs() / 60;
    match (minutes / 60, minutes % 60) {
        (0, minutes) => format!("{minutes} min"),
        (hours, 0) => format!("{hours} h"),
        (hours, minutes) => format!("{hours} h {minutes} min"),
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::models::ParticipantId;

    #[test]
    fn renders_local_time_and_occupancy() {
        // 2025-06-01 12:00:00 UTC
        let starts_at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_748_779_200);
        let mut game = GameEntity::new(
            starts_at,
            90,
            "Padel <Club> & Bar".into(),
            Some(3),
            ParticipantId(1),
        );
        game.slots[0] = Some(ParticipantId(1));
        game.slots[2] = Some(ParticipantId(2));

        let renderer = ReminderRenderer::new(UtcOffset::from_hms(3, 0, 0).unwrap());
        let text = renderer.render(&game, &ReminderOffset::minutes(180));

        assert!(text.contains("Starts in 3 h"));
        assert!(text.contains("01.06.2025"));
        assert!(text.contains("15:00 (1 h 30 min)"));
        assert!(text.contains("Padel &lt;Club&gt; &amp; Bar"));
        assert!(text.contains("Court #3"));
        assert!(text.contains(
            "2/4 players: <a href=\"tg://user?id=1\">player 1</a>, \
             <a href=\"tg://user?id=2\">player 2</a>"
        ));
    }

    #[test]
    fn duration_labels() {
        assert_eq!(duration_label(Duration::from_secs(45 * 60)), "45 min");
        assert_eq!(duration_label(Duration::from_secs(24 * 3600)), "24 h");
        assert_eq!(duration_label(Duration::from_secs(150 * 60)), "2 h 30 min");
    }
}
