use chrono::{Datelike, Duration, NaiveDate};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"];

/// Разбор ячейки даты из выгрузки.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY.MM.DD`, `YYYYMMDD`,
/// `YYYY年MM月DD日` (optionally followed by a time part), `YYYY-MM`
/// and Excel serial day numbers.
pub fn parse_date_cell(raw: &str) -> Option<NaiveDate> {
    let date_part = strip_time(raw)?;
    if let Some(date) = calendar_date(date_part) {
        return Some(date);
    }

    if let Some((year, month)) = parse_year_month(date_part) {
        return NaiveDate::from_ymd_opt(year, month, 1);
    }

    excel_serial(date_part)
}

/// Дата из названия листа: только полная календарная дата.
///
/// Month-only labels and bare numbers are rejected: a label like `2024-01`
/// or `105` does not say which day its rows belong to.
pub fn parse_sheet_label(raw: &str) -> Option<NaiveDate> {
    strip_time(raw).and_then(calendar_date)
}

// Отбрасываем время: "2024-01-05 10:00:00", "2024-01-05T10:00:00"
fn strip_time(raw: &str) -> Option<&str> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    value.split(|c: char| c == ' ' || c == 'T').next()
}

fn calendar_date(date_part: &str) -> Option<NaiveDate> {
    if date_part.len() == 8 && date_part.chars().all(|c| c.is_ascii_digit()) {
        return compact_date(date_part);
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}

fn compact_date(digits: &str) -> Option<NaiveDate> {
    let year = digits[0..4].parse().ok()?;
    let month = digits[4..6].parse().ok()?;
    let day = digits[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Excel хранит даты как число дней от 1899-12-30
fn excel_serial(value: &str) -> Option<NaiveDate> {
    let serial: f64 = value.parse().ok()?;
    if !serial.is_finite() || !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Parse `YYYY-MM` into (year, month)
pub fn parse_year_month(value: &str) -> Option<(i32, u32)> {
    let (year, month) = value.trim().split_once('-')?;
    if year.len() != 4 || month.is_empty() || month.len() > 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    if (1..=12).contains(&month) {
        Some((year, month))
    } else {
        None
    }
}

/// First and last day of a calendar month
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, next.pred_opt()?))
}

/// Calendar month preceding the one containing `date`
pub fn previous_month(date: NaiveDate) -> (i32, u32) {
    if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_supported_formats() {
        assert_eq!(parse_date_cell("2024-01-05"), Some(d(2024, 1, 5)));
        assert_eq!(parse_date_cell("2024/1/5"), Some(d(2024, 1, 5)));
        assert_eq!(parse_date_cell("2024.01.05"), Some(d(2024, 1, 5)));
        assert_eq!(parse_date_cell("20240105"), Some(d(2024, 1, 5)));
        assert_eq!(parse_date_cell("2024年01月05日"), Some(d(2024, 1, 5)));
        assert_eq!(parse_date_cell(" 2024-01-05 10:30:00 "), Some(d(2024, 1, 5)));
        assert_eq!(parse_date_cell("2024-01-05T10:30:00"), Some(d(2024, 1, 5)));
        assert_eq!(parse_date_cell("2024-02"), Some(d(2024, 2, 1)));
    }

    #[test]
    fn test_excel_serial() {
        assert_eq!(parse_date_cell("45296"), Some(d(2024, 1, 5)));
        assert_eq!(parse_date_cell("45296.75"), Some(d(2024, 1, 5)));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_eq!(parse_date_cell(""), None);
        assert_eq!(parse_date_cell("Sheet1"), None);
        assert_eq!(parse_date_cell("1月5日"), None);
        assert_eq!(parse_date_cell("2024-13-01"), None);
    }

    #[test]
    fn test_sheet_label_needs_full_date() {
        assert_eq!(parse_sheet_label("2024-01-05"), Some(d(2024, 1, 5)));
        assert_eq!(parse_sheet_label("20240105"), Some(d(2024, 1, 5)));
        assert_eq!(parse_sheet_label("2024年1月5日"), Some(d(2024, 1, 5)));
        assert_eq!(parse_sheet_label("2024.01.05"), Some(d(2024, 1, 5)));

        assert_eq!(parse_sheet_label("105"), None);
        assert_eq!(parse_sheet_label("2024"), None);
        assert_eq!(parse_sheet_label("2024-01"), None);
        assert_eq!(parse_sheet_label("45296"), None);
        assert_eq!(parse_sheet_label(""), None);
    }

    #[test]
    fn test_month_helpers() {
        assert_eq!(parse_year_month("2024-03"), Some((2024, 3)));
        assert_eq!(parse_year_month("2024-3"), Some((2024, 3)));
        assert_eq!(parse_year_month("2024-00"), None);
        assert_eq!(parse_year_month("24-03"), None);

        assert_eq!(month_bounds(2024, 2), Some((d(2024, 2, 1), d(2024, 2, 29))));
        assert_eq!(month_bounds(2023, 12), Some((d(2023, 12, 1), d(2023, 12, 31))));
        assert_eq!(previous_month(d(2024, 1, 15)), (2023, 12));
        assert_eq!(previous_month(d(2024, 3, 1)), (2024, 2));
    }
}
