use calamine::{open_workbook, Data, Reader, Xlsx};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Header-less cell grid. Empty/whitespace cells are `None`.
pub type Grid = Vec<Vec<Option<String>>>;

/// Prefix identifying a Google Sheets source.
pub const SHEETS_URL_PREFIX: &str = "https://docs.google.com/spreadsheets/";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("source does not exist: {0}")]
    SourceNotFound(String),

    #[error("remote source responded with status {0}")]
    Http(reqwest::StatusCode),

    #[error("failed to reach remote source: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to read source data: {0}")]
    Unreadable(String),
}

/// Obtains the raw tabular grid from a local xlsx path or a Google Sheets
/// URL. All failures are surfaced as distinct [`FetchError`] variants; the
/// runner treats every one of them as "no data, skip this run".
pub struct SourceFetcher {
    http: reqwest::Client,
}

impl SourceFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub async fn fetch(&self, source: &str) -> Result<Grid, FetchError> {
        if source.starts_with(SHEETS_URL_PREFIX) {
            info!("Source is Google Sheets");
            self.fetch_sheet(source).await
        } else {
            info!("Source is file");
            self.read_file(source)
        }
    }

    /// Rewrite a sheet's "edit" URL into its CSV export form.
    pub fn export_url(source: &str) -> String {
        source.replace("edit#gid", "export?format=csv&gid")
    }

    async fn fetch_sheet(&self, source: &str) -> Result<Grid, FetchError> {
        let url = Self::export_url(source);
        info!("Remote source is: {}", url);

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Http(response.status()));
        }
        let body = response.bytes().await?;

        parse_csv(&body)
    }

    fn read_file(&self, path: &str) -> Result<Grid, FetchError> {
        if !Path::new(path).is_file() {
            return Err(FetchError::SourceNotFound(path.to_string()));
        }

        let mut workbook: Xlsx<std::io::BufReader<std::fs::File>> =
            open_workbook(path).map_err(|e: calamine::XlsxError| FetchError::Unreadable(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| FetchError::Unreadable("workbook has no sheets".to_string()))?
            .map_err(|e| FetchError::Unreadable(e.to_string()))?;

        let grid = range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();
        Ok(grid)
    }
}

fn cell_to_string(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(d) => d.to_string(),
        Data::DateTimeIso(d) | Data::DurationIso(d) => d.clone(),
        Data::Error(_) | Data::Empty => return None,
    };
    normalize_cell(&text)
}

fn normalize_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_csv(bytes: &[u8]) -> Result<Grid, FetchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut grid = Grid::new();
    for record in reader.records() {
        let record = record.map_err(|e| FetchError::Unreadable(e.to_string()))?;
        grid.push(record.iter().map(normalize_cell).collect());
    }
    Ok(grid)
}
