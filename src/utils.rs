use crate::error::{PathfindingError, PathfindingResult};
use crate::network::Timestamp;

pub fn parse_time_impl(h: &str, m: &str, s: &str) -> Result<Timestamp, std::num::ParseIntError> {
    let hours: i32 = h.parse()?;
    let minutes: i32 = m.parse()?;
    let seconds: i32 = s.parse()?;
    Ok(hours * 3600 + minutes * 60 + seconds)
}

// Parse "HH:MM:SS" into seconds from the assignment-day epoch. Hours may
// exceed 23 for service running past midnight.
pub fn parse_time(s: &str) -> PathfindingResult<Timestamp> {
    if s.len() < 7 {
        return Err(PathfindingError::InvalidTime(s.to_owned()));
    }
    let parts: Vec<&str> = s.split(':').collect();

    if parts.len() != 3 {
        return Err(PathfindingError::InvalidTime(s.to_owned()));
    }

    let sec = parts[2];
    let min = parts[1];
    let hour = parts[0];

    if min.len() != 2 || sec.len() != 2 {
        return Err(PathfindingError::InvalidTime(s.to_owned()));
    }

    parse_time_impl(hour, min, sec).map_err(|_| PathfindingError::InvalidTime(s.to_owned()))
}

pub fn time_str(time: Timestamp) -> String {
    let sign = if time < 0 { "-" } else { "" };
    let time = time.unsigned_abs();
    let hours = time / 3600;
    let minutes = (time % 3600) / 60;
    let seconds = time % 60;
    format!("{sign}{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_format_round_trip() {
        let t = parse_time("15:30:00").unwrap();
        assert_eq!(t, 15 * 3600 + 30 * 60);
        assert_eq!(time_str(t), "15:30:00");
    }

    #[test]
    fn parse_after_midnight() {
        assert_eq!(parse_time("25:01:30").unwrap(), 25 * 3600 + 60 + 30);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_time("8:30").is_err());
        assert!(parse_time("aa:bb:cc").is_err());
        assert!(parse_time("08:3:00").is_err());
    }
}
