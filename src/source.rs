use std::path::PathBuf;

use thiserror::Error;

/// A rectangular grid of string cells as fetched from the row source
///
/// The first sheet row names the columns; every data row is padded or
/// truncated to the header width so downstream code can index by column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGrid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Failure modes of a row fetch
///
/// A fetch either completes or the whole pass fails; there is no retry or
/// partial result. These map directly onto the user-visible error banner.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source could not be reached or refused access
    #[error("row source unreachable: {0}")]
    Unreachable(String),

    /// The sheet, worksheet, or file does not exist
    #[error("sheet not found: {0}")]
    NotFound(String),

    /// The source answered but carried no data rows past the header
    #[error("row source returned no data rows")]
    Empty,
}

/// Where onboarding rows come from
///
/// Either a local CSV file or the published-CSV export URL of a Google Sheet
/// worksheet. The variant is picked once at startup from configuration.
#[derive(Debug, Clone)]
pub enum RowSource {
    CsvFile(PathBuf),
    PublishedSheet(String),
}

impl RowSource {
    /// Build a source from the configured `sheet` value
    ///
    /// URLs become a published-sheet fetch, anything else is treated as a
    /// local file path.
    pub fn from_setting(sheet: &str) -> RowSource {
        if sheet.starts_with("http://") || sheet.starts_with("https://") {
            RowSource::PublishedSheet(sheet.to_string())
        } else {
            RowSource::CsvFile(PathBuf::from(sheet))
        }
    }

    /// Human-readable description for logs and the dashboard footer
    pub fn describe(&self) -> String {
        match self {
            RowSource::CsvFile(path) => format!("file {}", path.display()),
            RowSource::PublishedSheet(url) => format!("published sheet {url}"),
        }
    }

    /// Fetch the full grid, blocking the current pass until done
    ///
    /// This is the only long-running operation in the system. Errors are
    /// surfaced, never retried; a manual refresh re-invokes this.
    pub async fn fetch(&self) -> Result<RowGrid, FetchError> {
        match self {
            RowSource::CsvFile(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        FetchError::NotFound(path.display().to_string())
                    } else {
                        FetchError::Unreachable(e.to_string())
                    }
                })?;
                parse_grid(&text)
            }
            RowSource::PublishedSheet(url) => {
                let response = reqwest::get(url)
                    .await
                    .map_err(|e| FetchError::Unreachable(e.to_string()))?;
                let status = response.status();
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(FetchError::NotFound(url.clone()));
                }
                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN
                {
                    return Err(FetchError::Unreachable(format!(
                        "permission denied ({status})"
                    )));
                }
                if !status.is_success() {
                    return Err(FetchError::Unreachable(format!(
                        "unexpected response {status}"
                    )));
                }
                let text = response
                    .text()
                    .await
                    .map_err(|e| FetchError::Unreachable(e.to_string()))?;
                parse_grid(&text)
            }
        }
    }
}

/// Parse CSV text into a header row plus rectangular data rows
fn parse_grid(text: &str) -> Result<RowGrid, FetchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut headers: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();

    for result in reader.records() {
        let row = result.map_err(|e| FetchError::Unreachable(e.to_string()))?;
        let mut cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        if headers.is_empty() {
            headers = cells;
            continue;
        }
        // Pad ragged rows out to the header width; drop overflow cells.
        cells.resize(headers.len(), String::new());
        rows.push(cells);
    }

    if headers.is_empty() || rows.is_empty() {
        return Err(FetchError::Empty);
    }

    Ok(RowGrid { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_header_and_rows() {
        let grid = parse_grid("a,b,c\n1,2,3\n4,5,6\n").unwrap();
        assert_eq!(grid.headers, vec!["a", "b", "c"]);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[0], vec!["1", "2", "3"]);
    }

    #[test]
    fn pads_short_rows_to_header_width() {
        let grid = parse_grid("a,b,c\n1,2\n").unwrap();
        assert_eq!(grid.rows[0], vec!["1", "2", ""]);
    }

    #[test]
    fn header_only_input_is_empty() {
        assert!(matches!(parse_grid("a,b,c\n"), Err(FetchError::Empty)));
        assert!(matches!(parse_grid(""), Err(FetchError::Empty)));
    }

    #[test]
    fn url_settings_become_published_sheet_sources() {
        assert!(matches!(
            RowSource::from_setting("https://docs.google.com/pub?output=csv"),
            RowSource::PublishedSheet(_)
        ));
        assert!(matches!(
            RowSource::from_setting("data/onboarding.csv"),
            RowSource::CsvFile(_)
        ));
    }

    #[tokio::test]
    async fn missing_file_reports_not_found() {
        let source = RowSource::CsvFile(PathBuf::from("definitely/not/here.csv"));
        assert!(matches!(source.fetch().await, Err(FetchError::NotFound(_))));
    }

    #[tokio::test]
    async fn csv_file_fetch_round_trips() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "licenseNumber,storeName").unwrap();
        writeln!(file, "C-100,Green Leaf").unwrap();

        let source = RowSource::CsvFile(file.path().to_path_buf());
        let grid = source.fetch().await.unwrap();
        assert_eq!(grid.headers, vec!["licenseNumber", "storeName"]);
        assert_eq!(grid.rows, vec![vec!["C-100", "Green Leaf"]]);
    }
}
