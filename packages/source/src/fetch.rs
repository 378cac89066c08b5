//! Dataset source implementations: demo CSV, local file, remote URL, and
//! the unit-map REST API.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use unit_map_unit_models::{DataSource, SourceType, UnitRecord};

use crate::codec::{DatasetFormat, parse_dataset};
use crate::normalize::normalize_rows;
use crate::{DatasetSource, SourceError};

/// Default location of the bundled demo dataset.
pub const DEFAULT_DEMO_PATH: &str = "data/units.demo.csv";

/// The bundled demo CSV shipped with the dashboard.
pub struct DemoSource {
    path: PathBuf,
}

impl DemoSource {
    /// Demo source reading from the given CSV path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new(DEFAULT_DEMO_PATH)
    }
}

#[async_trait]
impl DatasetSource for DemoSource {
    fn describe(&self) -> DataSource {
        DataSource::demo()
    }

    async fn fetch(&self) -> Result<Vec<UnitRecord>, SourceError> {
        let text = std::fs::read_to_string(&self.path)?;
        let records = parse_dataset(&text, DatasetFormat::Csv)?;
        log::info!(
            "Loaded {} demo records from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }
}

/// A user-supplied local file, format chosen by extension.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// File source for the given path. The format is decided at fetch
    /// time from the `.json`/`.csv` extension.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn format(&self) -> Result<DatasetFormat, SourceError> {
        match self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Ok(DatasetFormat::Json),
            Some("csv") => Ok(DatasetFormat::Csv),
            other => Err(SourceError::ParseFailure {
                message: format!(
                    "unsupported file extension {:?} for {}",
                    other.unwrap_or("none"),
                    self.path.display()
                ),
            }),
        }
    }
}

#[async_trait]
impl DatasetSource for FileSource {
    fn describe(&self) -> DataSource {
        DataSource {
            source_type: SourceType::File,
            url: String::new(),
        }
    }

    async fn fetch(&self) -> Result<Vec<UnitRecord>, SourceError> {
        let format = self.format()?;
        let text = std::fs::read_to_string(&self.path)?;
        parse_dataset(&text, format)
    }
}

/// A remote URL serving CSV or JSON. The only source type eligible for
/// auto-refresh.
pub struct UrlSource {
    url: String,
    client: reqwest::Client,
}

impl UrlSource {
    /// URL source with a fresh HTTP client.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DatasetSource for UrlSource {
    fn describe(&self) -> DataSource {
        DataSource::url(self.url.clone())
    }

    async fn fetch(&self) -> Result<Vec<UnitRecord>, SourceError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let format = if content_type.contains("application/json")
            || self.url.to_ascii_lowercase().ends_with(".json")
        {
            DatasetFormat::Json
        } else {
            DatasetFormat::Csv
        };

        let text = response.text().await?;
        let records = parse_dataset(&text, format)?;
        log::info!("Loaded {} records from {}", records.len(), self.url);
        Ok(records)
    }
}

/// The unit-map REST API (`GET {base}/api/units`).
pub struct ApiSource {
    base_url: String,
    client: reqwest::Client,
}

impl ApiSource {
    /// API source rooted at `base_url` (no trailing slash).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DatasetSource for ApiSource {
    fn describe(&self) -> DataSource {
        DataSource {
            source_type: SourceType::Api,
            url: String::new(),
        }
    }

    async fn fetch(&self) -> Result<Vec<UnitRecord>, SourceError> {
        let url = format!("{}/api/units", self.base_url);
        let body: Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let rows = body.as_array().ok_or_else(|| SourceError::ParseFailure {
            message: format!("{url} did not return a JSON array"),
        })?;
        Ok(normalize_rows(rows))
    }
}
