//! Validation helpers for DTOs.

use std::time::SystemTime;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use validator::ValidationError;

/// Parses an RFC 3339 timestamp such as `2025-06-01T18:00:00+03:00`.
pub fn parse_rfc3339(raw: &str) -> Result<SystemTime, ValidationError> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .map(SystemTime::from)
        .map_err(|err| {
            let mut error = ValidationError::new("timestamp_format");
            error.message = Some(format!("expected an RFC 3339 timestamp: {err}").into());
            error
        })
}

/// Validates that `raw` is an RFC 3339 timestamp lying in the future.
pub fn validate_future_timestamp(raw: &str) -> Result<(), ValidationError> {
    let at = parse_rfc3339(raw)?;
    if at <= SystemTime::now() {
        let mut err = ValidationError::new("timestamp_in_past");
        err.message = Some("start time must be in the future".into());
        return Err(err);
    }
    Ok(())
}

/// Rejects strings made only of whitespace.
pub fn validate_not_blank(raw: &str) -> Result<(), ValidationError> {
    if raw.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn parses_offsets_into_the_same_instant() {
        let utc = parse_rfc3339("2025-06-01T15:00:00Z").unwrap();
        let moscow = parse_rfc3339("2025-06-01T18:00:00+03:00").unwrap();
        assert_eq!(utc, moscow);
        assert_eq!(
            utc,
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_748_790_000)
        );
    }

    #[test]
    fn rejects_malformed_and_past_timestamps() {
        assert!(parse_rfc3339("2025-06-01 18:00").is_err());
        assert!(validate_future_timestamp("2001-01-01T00:00:00Z").is_err());
        assert!(validate_future_timestamp("2999-01-01T00:00:00Z").is_ok());
    }

    #[test]
    fn blank_strings_are_rejected() {
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("Padel Club").is_ok());
    }
}
