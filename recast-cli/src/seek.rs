use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

// [[hh:]mm:]ss[.frac]
static SEEK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:(\d+):)?(\d+):)?(\d+(?:\.\d+)?)$").unwrap()
});

/// Parse a seek offset given as seconds (`90`, `1.5`) or as a clock time
/// (`1:30`, `01:02:03.25`).
pub fn parse_seek(s: &str) -> Result<Duration, String> {
    let caps = SEEK_REGEX
        .captures(s.trim())
        .ok_or_else(|| format!("invalid seek {:?}, expected seconds or [hh:]mm:ss", s))?;

    let field = |i: usize| -> Result<u64, String> {
        caps.get(i)
            .map_or(Ok(0), |m| m.as_str().parse::<u64>())
            .map_err(|e| e.to_string())
    };
    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = caps[3].parse::<f64>().map_err(|e| e.to_string())?;

    if caps.get(2).is_some() && seconds >= 60.0 {
        return Err(format!("invalid seek {:?}, seconds must be below 60", s));
    }
    if caps.get(1).is_some() && minutes >= 60 {
        return Err(format!("invalid seek {:?}, minutes must be below 60", s));
    }

    let out_of_range = || format!("invalid seek {:?}, offset out of range", s);
    let whole = hours
        .checked_mul(3600)
        .zip(minutes.checked_mul(60))
        .and_then(|(h, m)| h.checked_add(m))
        .ok_or_else(out_of_range)?;
    let fraction = Duration::try_from_secs_f64(seconds).map_err(|_| out_of_range())?;
    Duration::from_secs(whole)
        .checked_add(fraction)
        .ok_or_else(out_of_range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_seconds() {
        assert_eq!(parse_seek("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_seek("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_seek("1.5").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn clock_times() {
        assert_eq!(parse_seek("1:30").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_seek("01:02:03.25").unwrap(), Duration::from_millis(3_723_250));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "-1", "abc", "1:2:3:4", "1:75", "1:60:00", "1.5.2"] {
            assert!(parse_seek(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn huge_offsets_are_errors() {
        for huge in [
            "100000000000000000000",
            "18446744073709551615:00:00",
            "18446744073709551615:00",
        ] {
            let err = parse_seek(huge).unwrap_err();
            assert!(err.contains("out of range"), "{huge:?}: {err}");
        }
    }
}
