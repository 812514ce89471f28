use chrono::NaiveDate;

/// Parse the date part of `s`, accepting `YYYY-MM-DD`, `YYYY/MM/DD` and
/// `YYYYMMDD`, optionally followed by a time (`T` or space separated).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let day = s.split(['T', ' ']).next()?;

    match day.len() {
        8 if day.bytes().all(|b| b.is_ascii_digit()) => {
            let year: i32 = day[0..4].parse().ok()?;
            let month: u32 = day[4..6].parse().ok()?;
            let dom: u32 = day[6..8].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, dom)
        }
        _ => NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(day, "%Y/%m/%d"))
            .ok(),
    }
}
