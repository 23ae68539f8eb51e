use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::cells::normalize_header;
use crate::shared::catalog::SourceKind;

const CANCEL_CHECK_RECORDS: usize = 4096;

/// Sheet text that is not a usable CSV table
#[derive(Debug, Error)]
pub enum CsvDecodeError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// The csv reader silently runs such a field to the end of the text
    #[error("unterminated quoted field opened on line {0}")]
    UnterminatedQuote(usize),
}

/// Line (1-based) of a quoted field that never closes, if any
fn unterminated_quote_line(content: &str) -> Option<usize> {
    enum State {
        FieldStart,
        Unquoted,
        Quoted(usize),
        QuoteInQuoted(usize),
    }

    let mut line = 1;
    let mut state = State::FieldStart;
    for byte in content.bytes() {
        state = match (state, byte) {
            (State::Quoted(opened), b'"') => State::QuoteInQuoted(opened),
            (State::Quoted(opened), _) => State::Quoted(opened),
            (State::FieldStart, b'"') => State::Quoted(line),
            // "" внутри кавычек
            (State::QuoteInQuoted(opened), b'"') => State::Quoted(opened),
            (_, b',') | (_, b'\n') => State::FieldStart,
            _ => State::Unquoted,
        };
        if byte == b'\n' {
            line += 1;
        }
    }

    match state {
        State::Quoted(opened) => Some(opened),
        _ => None,
    }
}

/// Uploaded source after CSV decoding: every sheet of one workbook.
#[derive(Debug, Clone)]
pub struct RawSource {
    pub kind: SourceKind,
    pub sheets: Vec<RawSheet>,
    /// Sheets to read, in order. Required for multi-sheet kinds.
    pub selected_sheets: Option<Vec<String>>,
}

impl RawSource {
    pub fn new(kind: SourceKind, sheets: Vec<RawSheet>) -> Self {
        Self {
            kind,
            sheets,
            selected_sheets: None,
        }
    }

    pub fn with_selected(mut self, names: &[&str]) -> Self {
        self.selected_sheets = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn sheet(&self, name: &str) -> Option<&RawSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

/// One decoded sheet of an uploaded workbook: header row plus text cells.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Декодирование CSV-текста листа. Первая строка - заголовки.
    pub fn from_csv(name: &str, content: &str) -> Result<Self, CsvDecodeError> {
        Self::read_csv(name, content, || false).map(Option::unwrap_or_default)
    }

    /// Same as `from_csv`, but gives up with `None` once `cancel` fires
    pub fn from_csv_cancellable(
        name: &str,
        content: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Self>, CsvDecodeError> {
        Self::read_csv(name, content, || cancel.is_cancelled())
    }

    fn read_csv(
        name: &str,
        content: &str,
        stop: impl Fn() -> bool,
    ) -> Result<Option<Self>, CsvDecodeError> {
        if let Some(line) = unterminated_quote_line(content) {
            return Err(CsvDecodeError::UnterminatedQuote(line));
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::None)
            .from_reader(content.trim_start_matches('\u{feff}').as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            if idx % CANCEL_CHECK_RECORDS == 0 && stop() {
                return Ok(None);
            }
            let record = record?;
            let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Some(Self::new(name, headers, rows)))
    }

    /// Sheet without header and data rows
    pub fn is_blank(&self) -> bool {
        self.rows.is_empty() && self.headers.iter().all(|h| h.trim().is_empty())
    }

    /// Tolerant header lookup: whitespace, case and full-width punctuation ignored
    pub fn column_index(&self, wanted: &str) -> Option<usize> {
        let wanted = normalize_header(wanted);
        self.headers
            .iter()
            .position(|h| normalize_header(h) == wanted)
    }

    pub fn has_columns(&self, wanted: &[&str]) -> bool {
        wanted.iter().all(|w| self.column_index(w).is_some())
    }

    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_csv_pads_short_rows() {
        let sheet = RawSheet::from_csv("s", "\u{feff}a,b,c\n1,2\n4,5,6\n").unwrap();
        assert_eq!(sheet.headers, vec!["a", "b", "c"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0], vec!["1", "2", ""]);
        assert_eq!(sheet.cell(1, 2), "6");
        assert_eq!(sheet.cell(5, 0), "");
    }

    #[test]
    fn test_column_lookup_is_tolerant() {
        let sheet = RawSheet::new(
            "live",
            vec!["直播有效时长（小时）".into(), " NSC Code ".into()],
            vec![],
        );
        assert_eq!(sheet.column_index("直播有效时长(小时)"), Some(0));
        assert_eq!(sheet.column_index("nsc code"), Some(1));
        assert_eq!(sheet.column_index("NSCCODE"), Some(1));
        assert!(sheet.has_columns(&["nsc code", "直播有效时长(小时)"]));
        assert!(!sheet.has_columns(&["nsc code", "抖音id"]));
    }

    #[test]
    fn test_blank_sheet() {
        let sheet = RawSheet::from_csv("empty", "").unwrap();
        assert!(sheet.is_blank());
    }

    #[test]
    fn test_unterminated_quote_is_rejected() {
        let err = RawSheet::from_csv("s", "a,b\n1,\"2\n3,4\n").unwrap_err();
        assert!(matches!(err, CsvDecodeError::UnterminatedQuote(2)));

        // закрытые и экранированные кавычки в порядке
        let sheet = RawSheet::from_csv("s", "a,b\n\"x, \"\"y\"\"\",\"multi\nline\"\n5\",6\n").unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0], vec!["x, \"y\"", "multi\nline"]);
        assert_eq!(sheet.rows[1], vec!["5\"", "6"]);
    }

    #[test]
    fn test_cancelled_decode_gives_up() {
        let cancel = CancellationToken::new();
        let sheet = RawSheet::from_csv_cancellable("s", "a\n1\n2\n", &cancel).unwrap();
        assert_eq!(sheet.map(|s| s.rows.len()), Some(2));

        cancel.cancel();
        assert!(RawSheet::from_csv_cancellable("s", "a\n1\n2\n", &cancel).unwrap().is_none());
    }
}
