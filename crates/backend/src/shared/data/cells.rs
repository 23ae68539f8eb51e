//! Очистка значений ячеек: заголовки, идентификаторы, числа.

const ID_SEPARATORS: &[char] = &[',', '，', '、', '|', '/', ';'];
const ABSENT_IDS: &[&str] = &["", "null", "--", "-", "n/a"];
const ABSENT_NUMBERS: &[&str] = &["", "-", "—", "n/a", "na", "null", "none"];

/// Header key used for tolerant column matching
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '（' => '(',
            '）' => ')',
            '：' => ':',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

/// Trimmed text with zero-width characters and NBSP removed
pub fn clean_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}'))
        .map(|c| if c == '\u{a0}' { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Attribute value or `None` when the cell is blank
pub fn clean_attribute(raw: &str) -> Option<String> {
    let value = clean_text(raw);
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Single entity id, `None` for the sentinel placeholders
pub fn clean_entity_id(raw: &str) -> Option<String> {
    let value = clean_text(raw);
    let lowered = value.to_lowercase();
    if ABSENT_IDS.contains(&lowered.as_str()) {
        return None;
    }
    // Excel превращает коды в числа: "12345.0"
    if let Some(stripped) = value.strip_suffix(".0") {
        if !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit()) {
            return Some(stripped.to_string());
        }
    }
    Some(value)
}

/// Explode a cell that lists several ids into cleaned ids, in cell order, without repeats
pub fn split_entity_ids(raw: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for part in raw.split(ID_SEPARATORS) {
        if let Some(id) = clean_entity_id(part) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// Numeric cell. `Ok(None)` is an absent value; `Err` carries the cleaned non-numeric text.
pub fn parse_number(raw: &str) -> Result<Option<f64>, String> {
    let value = clean_text(raw);
    if ABSENT_NUMBERS.contains(&value.to_lowercase().as_str()) {
        return Ok(None);
    }
    let stripped: String = value.chars().filter(|c| *c != ',' && *c != '%').collect();
    match stripped.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(Some(number)),
        _ => Err(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header(" 小风车点击次数（不含小雪花） "), "小风车点击次数(不含小雪花)");
        assert_eq!(normalize_header("NSC Code"), "nsccode");
        assert_eq!(normalize_header("Spending(Net)"), "spending(net)");
    }

    #[test]
    fn test_entity_ids() {
        assert_eq!(clean_entity_id(" D1\u{200b} "), Some("D1".to_string()));
        assert_eq!(clean_entity_id("N/A"), None);
        assert_eq!(clean_entity_id("--"), None);
        assert_eq!(clean_entity_id("12345.0"), Some("12345".to_string()));
        assert_eq!(split_entity_ids("D1， D2、D3|D1"), vec!["D1", "D2", "D3"]);
        assert_eq!(split_entity_ids("a/b;c,null"), vec!["a", "b", "c"]);
        assert!(split_entity_ids(" - ").is_empty());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_number("1,234.5"), Ok(Some(1234.5)));
        assert_eq!(parse_number("12%"), Ok(Some(12.0)));
        assert_eq!(parse_number(" 3 "), Ok(Some(3.0)));
        assert_eq!(parse_number("—"), Ok(None));
        assert_eq!(parse_number("None"), Ok(None));
        assert_eq!(parse_number(""), Ok(None));
        assert_eq!(parse_number("abc"), Err("abc".to_string()));
    }

    #[test]
    fn test_attributes() {
        assert_eq!(clean_attribute("\u{a0}Gold\u{a0}"), Some("Gold".to_string()));
        assert_eq!(clean_attribute("   "), None);
    }
}
