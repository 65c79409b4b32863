//! Application-level configuration loading: scheduler policy, reminder offsets,
//! game creation and listing defaults.

use std::{collections::HashSet, env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use time::UtcOffset;
use tracing::{info, warn};

use crate::dao::models::SLOTS_PER_GAME;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PADEL_SLOTS_BACK_CONFIG_PATH";

const DEFAULT_TICK_INTERVAL_SECS: u64 = 60;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_CLAIM_LEASE_SECS: u64 = 120;
const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CONCURRENCY: usize = 8;
const DEFAULT_OFFSET_MINUTES: [u64; 2] = [24 * 60, 3 * 60];
const DEFAULT_UTC_OFFSET_HOURS: i8 = 3;
const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;
/// Farthest reminder offset accepted from a configuration file (30 days).
const MAX_OFFSET_MINUTES: u64 = 30 * 24 * 60;
/// Longest scheduler period, lease or timeout accepted from a configuration file.
const MAX_SCHEDULER_SECS: u64 = 7 * 24 * 60 * 60;

/// Errors raised while validating a parsed configuration file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The reminder offset list is empty.
    #[error("at least one reminder offset must be configured")]
    NoOffsets,
    /// Two offsets resolve to the same id.
    #[error("reminder offset `{0}` is configured more than once")]
    DuplicateOffset(String),
    /// An offset of zero minutes.
    #[error("reminder offset `{0}` must be at least one minute before start")]
    ZeroOffset(String),
    /// An offset farther than [`MAX_OFFSET_MINUTES`].
    #[error("reminder offset `{id}` of {minutes} minutes exceeds the maximum of {MAX_OFFSET_MINUTES}")]
    OffsetTooLarge { id: String, minutes: u64 },
    /// A numeric setting that must be positive is zero.
    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
    /// A scheduler duration longer than [`MAX_SCHEDULER_SECS`].
    #[error("`{0}` exceeds the maximum of {MAX_SCHEDULER_SECS} seconds")]
    TooLarge(&'static str),
    /// Hours outside the range `time` accepts for a UTC offset.
    #[error("utc offset of {0} hours is out of range")]
    InvalidUtcOffset(i8),
    /// Listing page size above [`MAX_PAGE_SIZE`].
    #[error("page size {0} exceeds the maximum of {MAX_PAGE_SIZE}")]
    PageSizeTooLarge(usize),
    /// A lease that could expire while its claimant is still dispatching.
    #[error("claim lease of {lease:?} must exceed the worst-case dispatch time of {required:?}")]
    LeaseTooShort { lease: Duration, required: Duration },
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    scheduler: SchedulerConfig,
    reminders: ReminderConfig,
    games: GameCreationConfig,
    listing: ListingConfig,
}

/// Timing and retry policy of the reminder scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Period between two scheduler ticks.
    pub tick_interval: Duration,
    /// Dispatch attempts before a reminder is given up.
    pub max_attempts: u32,
    /// How long a claimed reminder stays exclusive to its claimant.
    pub claim_lease: Duration,
    /// Upper bound for a single message send.
    pub dispatch_timeout: Duration,
    /// Reminders dispatched concurrently within one tick.
    pub concurrency: usize,
}

/// A configured "time before start" at which participants are reminded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderOffset {
    /// Stable key stored in reminder records (e.g. `"3h"`).
    pub id: String,
    /// Distance from the game start.
    pub before: Duration,
}

impl ReminderOffset {
    /// Offset of `minutes` before start, keyed by its compact label.
    pub fn minutes(minutes: u64) -> Self {
        Self {
            id: offset_label(minutes),
            before: Duration::from_secs(minutes.saturating_mul(60)),
        }
    }
}

/// Which reminders are sent and how their text is localised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderConfig {
    offsets: Vec<ReminderOffset>,
    utc_offset: UtcOffset,
}

impl ReminderConfig {
    /// Build a reminder configuration; offsets are kept sorted closest first.
    pub fn new(mut offsets: Vec<ReminderOffset>, utc_offset: UtcOffset) -> Self {
        offsets.sort_by_key(|offset| offset.before);
        Self {
            offsets,
            utc_offset,
        }
    }

    /// Configured offsets ordered from the closest to the farthest from start.
    pub fn offsets(&self) -> &[ReminderOffset] {
        &self.offsets
    }

    /// Largest configured offset.
    pub fn max_offset(&self) -> Duration {
        self.offsets
            .last()
            .map(|offset| offset.before)
            .unwrap_or_default()
    }

    /// Timezone used when rendering start times.
    pub fn utc_offset(&self) -> UtcOffset {
        self.utc_offset
    }
}

/// Behaviour applied when a game is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameCreationConfig {
    /// Seat the creator in the first slot of the new game.
    pub auto_register_creator: bool,
}

impl Default for GameCreationConfig {
    fn default() -> Self {
        Self {
            auto_register_creator: true,
        }
    }
}

/// Paging defaults for game listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingConfig {
    /// Page size used when a request does not ask for one.
    pub page_size: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        offsets = app_config.reminders.offsets.len(),
                        tick_secs = app_config.scheduler.tick_interval.as_secs(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "invalid config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        let raw = serde_json::from_str::<RawConfig>(contents)?;
        Ok(Self::try_from(raw)?)
    }

    /// Assemble a configuration from already validated parts.
    pub fn new(
        scheduler: SchedulerConfig,
        reminders: ReminderConfig,
        games: GameCreationConfig,
        listing: ListingConfig,
    ) -> Self {
        Self {
            scheduler,
            reminders,
            games,
            listing,
        }
    }

    /// Reminder scheduler policy.
    pub fn scheduler(&self) -> &SchedulerConfig {
        &self.scheduler
    }

    /// Reminder offsets and rendering timezone.
    pub fn reminders(&self) -> &ReminderConfig {
        &self.reminders
    }

    /// Game creation behaviour.
    pub fn games(&self) -> GameCreationConfig {
        self.games
    }

    /// Listing defaults.
    pub fn listing(&self) -> ListingConfig {
        self.listing
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            reminders: ReminderConfig::default(),
            games: GameCreationConfig::default(),
            listing: ListingConfig {
                page_size: DEFAULT_PAGE_SIZE,
            },
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            claim_lease: Duration::from_secs(DEFAULT_CLAIM_LEASE_SECS),
            dispatch_timeout: Duration::from_secs(DEFAULT_DISPATCH_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_OFFSET_MINUTES
                .into_iter()
                .map(ReminderOffset::minutes)
                .collect(),
            default_utc_offset(),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    scheduler: RawScheduler,
    reminders: RawReminders,
    games: RawGames,
    listing: RawListing,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawScheduler {
    tick_interval_secs: u64,
    max_attempts: u32,
    claim_lease_secs: u64,
    dispatch_timeout_secs: u64,
    concurrency: usize,
}

impl Default for RawScheduler {
    fn default() -> Self {
        Self {
            tick_interval_secs: DEFAULT_TICK_INTERVAL_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            claim_lease_secs: DEFAULT_CLAIM_LEASE_SECS,
            dispatch_timeout_secs: DEFAULT_DISPATCH_TIMEOUT_SECS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawReminders {
    offsets: Vec<RawOffset>,
    utc_offset_hours: i8,
}

impl Default for RawReminders {
    fn default() -> Self {
        Self {
            offsets: DEFAULT_OFFSET_MINUTES
                .into_iter()
                .map(|minutes_before| RawOffset {
                    id: None,
                    minutes_before,
                })
                .collect(),
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
        }
    }
}

#[derive(Debug, Deserialize)]
/// A single reminder offset; the id defaults to a label such as `3h` or `90m`.
struct RawOffset {
    #[serde(default)]
    id: Option<String>,
    minutes_before: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawGames {
    auto_register_creator: bool,
}

impl Default for RawGames {
    fn default() -> Self {
        Self {
            auto_register_creator: GameCreationConfig::default().auto_register_creator,
        }
    }
}

impl From<RawGames> for GameCreationConfig {
    fn from(value: RawGames) -> Self {
        Self {
            auto_register_creator: value.auto_register_creator,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawListing {
    page_size: usize,
}

impl Default for RawListing {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TryFrom<RawConfig> for AppConfig {
    type Error = ConfigError;

    fn try_from(value: RawConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            scheduler: value.scheduler.try_into()?,
            reminders: value.reminders.try_into()?,
            games: value.games.into(),
            listing: value.listing.try_into()?,
        })
    }
}

impl TryFrom<RawScheduler> for SchedulerConfig {
    type Error = ConfigError;

    fn try_from(value: RawScheduler) -> Result<Self, Self::Error> {
        if value.tick_interval_secs == 0 {
            return Err(ConfigError::Zero("scheduler.tick_interval_secs"));
        }
        if value.max_attempts == 0 {
            return Err(ConfigError::Zero("scheduler.max_attempts"));
        }
        if value.dispatch_timeout_secs == 0 {
            return Err(ConfigError::Zero("scheduler.dispatch_timeout_secs"));
        }
        if value.concurrency == 0 {
            return Err(ConfigError::Zero("scheduler.concurrency"));
        }
        for (secs, field) in [
            (value.tick_interval_secs, "scheduler.tick_interval_secs"),
            (value.claim_lease_secs, "scheduler.claim_lease_secs"),
            (value.dispatch_timeout_secs, "scheduler.dispatch_timeout_secs"),
        ] {
            if secs > MAX_SCHEDULER_SECS {
                return Err(ConfigError::TooLarge(field));
            }
        }

        let claim_lease = Duration::from_secs(value.claim_lease_secs);
        let dispatch_timeout = Duration::from_secs(value.dispatch_timeout_secs);
        // One claimed reminder sends to every slot sequentially.
        let required = dispatch_timeout * SLOTS_PER_GAME as u32;
        if claim_lease <= required {
            return Err(ConfigError::LeaseTooShort {
                lease: claim_lease,
                required,
            });
        }

        Ok(Self {
            tick_interval: Duration::from_secs(value.tick_interval_secs),
            max_attempts: value.max_attempts,
            claim_lease,
            dispatch_timeout,
            concurrency: value.concurrency,
        })
    }
}

impl TryFrom<RawReminders> for ReminderConfig {
    type Error = ConfigError;

    fn try_from(value: RawReminders) -> Result<Self, Self::Error> {
        if value.offsets.is_empty() {
            return Err(ConfigError::NoOffsets);
        }

        let mut seen = HashSet::new();
        let mut offsets = Vec::with_capacity(value.offsets.len());
        for raw in value.offsets {
            let id = raw
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| offset_label(raw.minutes_before));
            if raw.minutes_before == 0 {
                return Err(ConfigError::ZeroOffset(id));
            }
            if raw.minutes_before > MAX_OFFSET_MINUTES {
                return Err(ConfigError::OffsetTooLarge {
                    id,
                    minutes: raw.minutes_before,
                });
            }
            if !seen.insert(id.clone()) {
                return Err(ConfigError::DuplicateOffset(id));
            }
            offsets.push(ReminderOffset {
                id,
                before: Duration::from_secs(raw.minutes_before * 60),
            });
        }

        let utc_offset = UtcOffset::from_hms(value.utc_offset_hours, 0, 0)
            .map_err(|_| ConfigError::InvalidUtcOffset(value.utc_offset_hours))?;

        Ok(Self::new(offsets, utc_offset))
    }
}

impl TryFrom<RawListing> for ListingConfig {
    type Error = ConfigError;

    fn try_from(value: RawListing) -> Result<Self, Self::Error> {
        match value.page_size {
            0 => Err(ConfigError::Zero("listing.page_size")),
            size if size > MAX_PAGE_SIZE => Err(ConfigError::PageSizeTooLarge(size)),
            page_size => Ok(Self { page_size }),
        }
    }
}

/// Compact label for an offset: whole hours as `3h`, anything else as `90m`.
fn offset_label(minutes: u64) -> String {
    if minutes % 60 == 0 {
        format!("{}h", minutes / 60)
    } else {
        format!("{minutes}m")
    }
}

fn default_utc_offset() -> UtcOffset {
    UtcOffset::from_hms(DEFAULT_UTC_OFFSET_HOURS, 0, 0).unwrap_or(UtcOffset::UTC)
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.scheduler(), &SchedulerConfig::default());
        assert_eq!(config.reminders(), &ReminderConfig::default());
        assert_eq!(config.listing().page_size, DEFAULT_PAGE_SIZE);
        assert!(config.games().auto_register_creator);
    }

    #[test]
    fn creator_auto_registration_can_be_disabled() {
        let config =
            AppConfig::from_json(r#"{"games": {"auto_register_creator": false}}"#).unwrap();
        assert!(!config.games().auto_register_creator);
    }

    #[test]
    fn oversized_offsets_and_durations_are_rejected() {
        let raw = RawReminders {
            offsets: vec![RawOffset {
                id: None,
                minutes_before: u64::MAX,
            }],
            utc_offset_hours: 0,
        };
        assert!(matches!(
            ReminderConfig::try_from(raw),
            Err(ConfigError::OffsetTooLarge { minutes: u64::MAX, .. })
        ));

        let raw = RawScheduler {
            claim_lease_secs: u64::MAX,
            ..RawScheduler::default()
        };
        assert_eq!(
            SchedulerConfig::try_from(raw).unwrap_err(),
            ConfigError::TooLarge("scheduler.claim_lease_secs")
        );

        let raw = RawScheduler {
            dispatch_timeout_secs: u64::MAX / 2,
            claim_lease_secs: u64::MAX,
            ..RawScheduler::default()
        };
        assert!(SchedulerConfig::try_from(raw).is_err());
    }

    #[test]
    fn offsets_are_sorted_closest_first_with_derived_ids() {
        let config = AppConfig::from_json(
            r#"{"reminders": {"offsets": [
                {"minutes_before": 1440},
                {"minutes_before": 90},
                {"id": "morning", "minutes_before": 600}
            ], "utc_offset_hours": 0}}"#,
        )
        .unwrap();

        let ids: Vec<&str> = config
            .reminders()
            .offsets()
            .iter()
            .map(|offset| offset.id.as_str())
            .collect();
        assert_eq!(ids, ["90m", "morning", "24h"]);
        assert_eq!(config.reminders().max_offset(), Duration::from_secs(86_400));
        assert_eq!(config.reminders().utc_offset(), UtcOffset::UTC);
    }

    #[test]
    fn duplicate_offsets_are_rejected() {
        let raw = RawReminders {
            offsets: vec![
                RawOffset {
                    id: None,
                    minutes_before: 60,
                },
                RawOffset {
                    id: Some("1h".into()),
                    minutes_before: 30,
                },
            ],
            utc_offset_hours: 3,
        };
        assert_eq!(
            ReminderConfig::try_from(raw).unwrap_err(),
            ConfigError::DuplicateOffset("1h".into())
        );
    }

    #[test]
    fn lease_must_cover_every_dispatch_of_a_game() {
        let raw = RawScheduler {
            claim_lease_secs: 30,
            dispatch_timeout_secs: 10,
            ..RawScheduler::default()
        };
        assert!(matches!(
            SchedulerConfig::try_from(raw),
            Err(ConfigError::LeaseTooShort { .. })
        ));
    }

    #[test]
    fn invalid_values_fail_the_whole_document() {
        assert!(AppConfig::from_json(r#"{"scheduler": {"max_attempts": 0}}"#).is_err());
        assert!(AppConfig::from_json(r#"{"reminders": {"offsets": []}}"#).is_err());
        assert!(AppConfig::from_json(r#"{"reminders": {"utc_offset_hours": 30}}"#).is_err());
        assert!(AppConfig::from_json(r#"{"listing": {"page_size": 1000}}"#).is_err());
        assert!(AppConfig::from_json("not json").is_err());
    }
}
