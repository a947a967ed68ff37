//! Fingerprint synthesis from host signals.
//!
//! When no fingerprint is cached in the sidecar file, the engine derives a
//! believable desktop profile from what the host machine looks like: its UTC
//! offset, OS platform, wall-clock hour, and environment locale. The mapping
//! is deliberately coarse; several real zones share an offset and the color
//! scheme is a time-of-day guess, not an OS query. Precision is not the goal;
//! run-to-run consistency is, which is why the result is pinned to disk and
//! never re-derived for the same state file.

use chrono::Timelike;
use tracing::debug;

use crate::core::types::{
    ColorScheme, FingerprintProfile, ForcedColors, ReducedMotion,
};

/// The one device profile every session presents.
///
/// The extraction selectors are written against a single rendering engine, so
/// platform-based profile switching would only add variance without value.
pub const DESKTOP_PROFILE_NAME: &str = "Desktop Chrome";

const DEFAULT_LOCALE: &str = "en-US";

/// Unmapped offsets fall back here.
const FALLBACK_ZONE: &str = "America/New_York";

/// Offset-minute ranges (east of UTC, half-open) to representative IANA zones.
/// One bucket per whole hour we care about, plus India's half-hour offset.
const OFFSET_ZONES: &[(i32, i32, &str)] = &[
    (-660, -570, "Pacific/Honolulu"),
    (-570, -510, "America/Anchorage"),
    (-510, -450, "America/Los_Angeles"),
    (-450, -390, "America/Denver"),
    (-390, -330, "America/Chicago"),
    (-330, -270, "America/New_York"),
    (-30, 30, "Europe/London"),
    (30, 90, "Europe/Berlin"),
    (90, 150, "Europe/Kyiv"),
    (150, 210, "Europe/Moscow"),
    (300, 360, "Asia/Kolkata"),
    (450, 510, "Asia/Shanghai"),
    (510, 570, "Asia/Tokyo"),
    (570, 660, "Australia/Sydney"),
];

/// Snapshot of the host signals synthesis depends on.
///
/// Captured once per run so [`synthesize`] stays a pure, testable function.
#[derive(Debug, Clone)]
pub struct HostSignals {
    /// Minutes east of UTC.
    pub utc_offset_minutes: i32,
    /// `std::env::consts::OS` value.
    pub platform: &'static str,
    /// Local wall-clock hour, 0–23.
    pub local_hour: u32,
    /// Locale advertised by the environment (`LANG`), already normalized.
    pub env_locale: Option<String>,
}

impl HostSignals {
    pub fn capture() -> Self {
        let now = chrono::Local::now();
        Self {
            utc_offset_minutes: now.offset().local_minus_utc() / 60,
            platform: std::env::consts::OS,
            local_hour: now.hour(),
            env_locale: std::env::var("LANG").ok().and_then(normalize_locale),
        }
    }
}

/// Derives a fully-populated desktop fingerprint from host signals.
///
/// Deterministic: identical signals (and hint) always yield the identical
/// profile. Never fails.
pub fn synthesize(signals: &HostSignals, locale_hint: Option<&str>) -> FingerprintProfile {
    let locale = locale_hint
        .and_then(|h| normalize_locale(h.to_string()))
        .or_else(|| signals.env_locale.clone())
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string());

    let timezone_id = timezone_for_offset(signals.utc_offset_minutes);
    let color_scheme = color_scheme_for_hour(signals.local_hour);

    // The platform branch is informational only; every host gets the same
    // desktop Chromium profile for consistency with the extraction selectors.
    debug!(
        "synthesizing fingerprint: platform={} offset={}min hour={} -> {} / {} / {:?}",
        signals.platform, signals.utc_offset_minutes, signals.local_hour,
        locale, timezone_id, color_scheme
    );

    FingerprintProfile {
        device_profile_name: DESKTOP_PROFILE_NAME.to_string(),
        locale,
        timezone_id: timezone_id.to_string(),
        color_scheme,
        reduced_motion: ReducedMotion::NoPreference,
        forced_colors: ForcedColors::None,
    }
}

/// Maps a UTC offset to an IANA zone id via the fixed range table.
pub fn timezone_for_offset(offset_minutes: i32) -> &'static str {
    OFFSET_ZONES
        .iter()
        .find(|(lo, hi, _)| offset_minutes >= *lo && offset_minutes < *hi)
        .map(|(_, _, zone)| *zone)
        .unwrap_or(FALLBACK_ZONE)
}

/// Dark outside 07:00–19:00 local time.
pub fn color_scheme_for_hour(hour: u32) -> ColorScheme {
    if hour >= 19 || hour < 7 {
        ColorScheme::Dark
    } else {
        ColorScheme::Light
    }
}

/// `en_US.UTF-8` → `en-US`; empty or "C"/"POSIX" locales are rejected.
fn normalize_locale(raw: String) -> Option<String> {
    let base = raw.split('.').next().unwrap_or("").trim().replace('_', "-");
    if base.is_empty() || base.eq_ignore_ascii_case("c") || base.eq_ignore_ascii_case("posix") {
        return None;
    }
    Some(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(offset: i32, hour: u32) -> HostSignals {
        HostSignals {
            utc_offset_minutes: offset,
            platform: "linux",
            local_hour: hour,
            env_locale: None,
        }
    }

    #[test]
    fn synthesis_is_deterministic() {
        let s = signals(120, 22);
        let a = synthesize(&s, Some("de-DE"));
        let b = synthesize(&s, Some("de-DE"));
        assert_eq!(a, b);
    }

    #[test]
    fn mapped_offsets_resolve_to_expected_zones() {
        assert_eq!(timezone_for_offset(-480), "America/Los_Angeles");
        assert_eq!(timezone_for_offset(-300), "America/New_York");
        assert_eq!(timezone_for_offset(0), "Europe/London");
        assert_eq!(timezone_for_offset(60), "Europe/Berlin");
        assert_eq!(timezone_for_offset(330), "Asia/Kolkata");
        assert_eq!(timezone_for_offset(480), "Asia/Shanghai");
        assert_eq!(timezone_for_offset(540), "Asia/Tokyo");
    }

    #[test]
    fn unmapped_offset_falls_back() {
        assert_eq!(timezone_for_offset(-720), FALLBACK_ZONE);
        assert_eq!(timezone_for_offset(246), FALLBACK_ZONE);
        assert_eq!(timezone_for_offset(841), FALLBACK_ZONE);
    }

    #[test]
    fn color_scheme_boundaries() {
        assert_eq!(color_scheme_for_hour(19), ColorScheme::Dark);
        assert_eq!(color_scheme_for_hour(23), ColorScheme::Dark);
        assert_eq!(color_scheme_for_hour(0), ColorScheme::Dark);
        assert_eq!(color_scheme_for_hour(6), ColorScheme::Dark);
        assert_eq!(color_scheme_for_hour(7), ColorScheme::Light);
        assert_eq!(color_scheme_for_hour(12), ColorScheme::Light);
        assert_eq!(color_scheme_for_hour(18), ColorScheme::Light);
    }

    #[test]
    fn locale_resolution_order() {
        let mut s = signals(0, 12);
        s.env_locale = Some("fr-FR".into());
        assert_eq!(synthesize(&s, Some("ja-JP")).locale, "ja-JP");
        assert_eq!(synthesize(&s, None).locale, "fr-FR");
        s.env_locale = None;
        assert_eq!(synthesize(&s, None).locale, "en-US");
    }

    #[test]
    fn env_locale_is_normalized() {
        assert_eq!(normalize_locale("en_US.UTF-8".into()), Some("en-US".into()));
        assert_eq!(normalize_locale("C".into()), None);
        assert_eq!(normalize_locale("POSIX".into()), None);
        assert_eq!(normalize_locale("".into()), None);
    }

    #[test]
    fn profile_is_always_desktop() {
        for platform in ["linux", "macos", "windows"] {
            let s = HostSignals {
                utc_offset_minutes: 0,
                platform,
                local_hour: 12,
                env_locale: None,
            };
            assert_eq!(synthesize(&s, None).device_profile_name, DESKTOP_PROFILE_NAME);
        }
    }
}
