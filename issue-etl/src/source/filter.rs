use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;

/// How far before the previous run the next one starts looking for updates.
///
/// The tracker filters with minute precision in the user's timezone, so records updated
/// around the previous run could otherwise be missed.
pub const WATERMARK_OVERLAP_MINUTES: i64 = 2;

/// Format of timestamps inside a JQL `updated` clause.
const JQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Returns the lower bound of an incremental search, expressed in `timezone`.
pub fn lower_bound(watermark: DateTime<Utc>, timezone: Tz) -> DateTime<Tz> {
    watermark.with_timezone(&timezone) - TimeDelta::minutes(WATERMARK_OVERLAP_MINUTES)
}

/// Builds the JQL query selecting the issues of `project`, oldest update first.
///
/// Without a lower bound every issue of the project is selected.
pub fn build_jql(project: &str, lower_bound: Option<&DateTime<Tz>>) -> String {
    let filter = match lower_bound {
        Some(lower_bound) => format!(
            r#" AND updated >= "{}""#,
            lower_bound.format(JQL_TIMESTAMP_FORMAT)
        ),
        None => String::new(),
    };

    format!("project = {project}{filter} ORDER BY updated ASC")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn full_sync_has_no_time_filter() {
        assert_eq!(build_jql("OPS", None), "project = OPS ORDER BY updated ASC");
    }

    #[test]
    fn incremental_filter_is_in_user_timezone_with_overlap() {
        let watermark = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 30).unwrap();
        let bound = lower_bound(watermark, chrono_tz::Europe::Berlin);

        assert_eq!(
            build_jql("OPS", Some(&bound)),
            r#"project = OPS AND updated >= "2024-01-15 10:58" ORDER BY updated ASC"#
        );
    }

    #[test]
    fn overlap_crosses_day_boundaries() {
        let watermark = Utc.with_ymd_and_hms(2024, 3, 1, 0, 1, 0).unwrap();
        let bound = lower_bound(watermark, chrono_tz::UTC);

        assert_eq!(
            bound.format(JQL_TIMESTAMP_FORMAT).to_string(),
            "2024-02-29 23:59"
        );
    }
}
