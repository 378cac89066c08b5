#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Load/merge/render orchestration for the unit map.
//!
//! The [`SyncCoordinator`] owns the raw and effective datasets and drives
//! every pipeline pass: fetch → normalize → reconcile → filter →
//! aggregate → render. Loads are generation-tagged with last-issued-wins
//! semantics: a slow older load that resolves after a newer one was
//! issued is discarded, never applied. A failing primary source falls
//! back to the demo dataset so the dashboard always ends up populated.

pub mod api;

use std::time::Duration;

use unit_map_pipeline::aggregate::{KpiSummary, TOP_N, kpi_summary, top_by_ytd};
use unit_map_pipeline::filters::{current_metric, filtered_view};
use unit_map_pipeline::reconcile::reconcile;
use unit_map_pipeline::style::{color_for_value, radius_for_value};
use unit_map_settings::{SettingsError, SettingsStore};
use unit_map_source::fetch::{ApiSource, FileSource, UrlSource};
use unit_map_source::{DatasetSource, SourceError};
use unit_map_unit_models::{DataSource, FilterState, SourceType, UnitRecord};

/// Errors from coordination and the remote API.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Dataset fetch or decode failed.
    #[error("Dataset source error: {0}")]
    Source(#[from] SourceError),

    /// Settings persist failed.
    #[error("Settings persist failed: {0}")]
    Settings(#[from] SettingsError),

    /// HTTP transport failed.
    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured admin token was rejected. Not retried.
    #[error("Write rejected: missing or invalid admin token")]
    Unauthorized,

    /// The API responded with an unexpected payload.
    #[error("Unexpected API response: {0}")]
    Api(String),
}

/// One marker ready for the map-rendering collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct MapPoint {
    /// Record id.
    pub id: String,
    /// Unit name.
    pub name: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
    /// Marker radius in pixels, derived from the current metric.
    pub radius: f64,
    /// Marker color: the record's explicit override or the metric bucket.
    pub color: String,
    /// Plain-text popup body.
    pub popup: String,
}

/// Map-rendering capability consumed by the coordinator. The core has no
/// dependency on any rendering toolkit; tests use a recording fake.
pub trait MapView {
    /// Replaces the rendered marker set.
    fn render_points(&mut self, points: &[MapPoint]);
}

/// A view that discards everything. Useful for headless embeddings.
pub struct NullMapView;

impl MapView for NullMapView {
    fn render_points(&mut self, _points: &[MapPoint]) {}
}

/// What one render pass produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    /// KPI over the full effective dataset.
    pub kpi: KpiSummary,
    /// Leading units by year-to-date count.
    pub top: Vec<UnitRecord>,
    /// Records in the filtered view.
    pub visible: usize,
    /// Records actually plotted (filtered view with usable coordinates).
    pub plotted: usize,
}

/// Result of a load trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The dataset was replaced and re-rendered.
    Ready {
        /// Number of raw records applied.
        records: usize,
        /// Whether the demo fallback supplied them.
        fallback: bool,
    },
    /// A refresh tick failed; the previous dataset was kept.
    Retained,
    /// The completion was stale (a newer load was issued meanwhile) and
    /// was discarded.
    Stale,
}

/// Orchestrates dataset loads, edit application, and render passes.
///
/// The coordinator is the only component allowed to replace the raw
/// dataset, and the settings store it owns is the single writer of edits
/// and the data-source descriptor.
pub struct SyncCoordinator<V: MapView> {
    view: V,
    settings: SettingsStore,
    filter: FilterState,
    raw: Vec<UnitRecord>,
    effective: Vec<UnitRecord>,
    demo: Box<dyn DatasetSource>,
    generation: u64,
    refresh_in_flight: bool,
}

impl<V: MapView> SyncCoordinator<V> {
    /// New coordinator with an empty dataset. `demo` is the fallback
    /// source used when a primary source is unreachable.
    #[must_use]
    pub fn new(view: V, settings: SettingsStore, demo: Box<dyn DatasetSource>) -> Self {
        Self {
            view,
            settings,
            filter: FilterState::default(),
            raw: Vec::new(),
            effective: Vec::new(),
            demo,
            generation: 0,
            refresh_in_flight: false,
        }
    }

    /// The effective dataset from the last reconciliation pass.
    #[must_use]
    pub fn effective(&self) -> &[UnitRecord] {
        &self.effective
    }

    /// The current filter state.
    #[must_use]
    pub const fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// The settings store (edits, theme, data source, refresh interval).
    #[must_use]
    pub const fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Replaces the filter state and re-renders.
    pub fn set_filter(&mut self, filter: FilterState) -> RenderSummary {
        self.filter = filter;
        self.render()
    }

    /// Loads from `source`, falling back to the demo dataset when the
    /// source fails. Applies last-issued-wins: if another load was
    /// issued while this one was in flight, the completion is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Settings`] if persisting the new data-source
    /// descriptor fails. Source failures are recovered, not returned.
    pub async fn load(&mut self, source: &dyn DatasetSource) -> Result<LoadOutcome, SyncError> {
        let generation = self.begin_load();
        match source.fetch().await {
            Ok(records) => self.complete_load(generation, source.describe(), records, false),
            Err(e) => {
                log::warn!(
                    "Load from {} source failed: {e}; falling back to demo dataset",
                    source.describe().source_type
                );
                let records = match self.demo.fetch().await {
                    Ok(records) => records,
                    Err(demo_err) => {
                        log::error!("Demo fallback failed too: {demo_err}");
                        Vec::new()
                    }
                };
                self.complete_load(generation, DataSource::demo(), records, true)
            }
        }
    }

    /// Loads the bundled demo dataset.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub async fn load_demo(&mut self) -> Result<LoadOutcome, SyncError> {
        let generation = self.begin_load();
        let records = match self.demo.fetch().await {
            Ok(records) => records,
            Err(e) => {
                log::error!("Demo dataset load failed: {e}");
                Vec::new()
            }
        };
        self.complete_load(generation, DataSource::demo(), records, false)
    }

    /// Loads from a local CSV/JSON file.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub async fn load_file(&mut self, path: &str) -> Result<LoadOutcome, SyncError> {
        self.load(&FileSource::new(path)).await
    }

    /// Loads from a remote URL serving CSV or JSON.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub async fn load_url(&mut self, url: &str) -> Result<LoadOutcome, SyncError> {
        self.load(&UrlSource::new(url)).await
    }

    /// Loads from the unit-map REST API.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub async fn load_api(&mut self, base_url: &str) -> Result<LoadOutcome, SyncError> {
        self.load(&ApiSource::new(base_url)).await
    }

    /// Whether the auto-refresh timer should be armed: only URL sources
    /// with a strictly positive interval refresh.
    #[must_use]
    pub fn auto_refresh_armed(&self) -> bool {
        let settings = self.settings.settings();
        settings.refresh_minutes > 0
            && settings.data_source.source_type == SourceType::Url
            && !settings.data_source.url.is_empty()
    }

    /// The interval to schedule refresh ticks at, or `None` when
    /// auto-refresh is not armed.
    #[must_use]
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.auto_refresh_armed()
            .then(|| Duration::from_secs(self.settings.settings().refresh_minutes * 60))
    }

    /// Runs one auto-refresh tick against the active URL source.
    ///
    /// Returns `None` when auto-refresh is not armed or the previous
    /// tick is still in flight (the fire is skipped, never queued). A
    /// failed tick is swallowed: the previous dataset is retained and
    /// the outcome is [`LoadOutcome::Retained`].
    pub async fn refresh_tick(&mut self) -> Option<LoadOutcome> {
        if !self.auto_refresh_armed() {
            return None;
        }
        if self.refresh_in_flight {
            log::debug!("Auto-refresh tick skipped: previous tick still in flight");
            return None;
        }

        let url = self.settings.settings().data_source.url.clone();
        let source = UrlSource::new(url.clone());
        self.refresh_in_flight = true;
        let generation = self.begin_load();
        let result = source.fetch().await;
        self.refresh_in_flight = false;

        let outcome = match result {
            Ok(records) => self
                .complete_load(generation, source.describe(), records, false)
                .unwrap_or_else(|e| {
                    log::warn!("Auto-refresh persist failed: {e}");
                    LoadOutcome::Retained
                }),
            Err(e) => {
                log::warn!("Auto-refresh from {url} failed: {e}; keeping previous dataset");
                LoadOutcome::Retained
            }
        };
        Some(outcome)
    }

    /// Writes one field edit through the settings store (persisted
    /// before any dependent computation), then re-reconciles and
    /// re-renders.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Settings`] if the persist fails.
    pub fn apply_edit(
        &mut self,
        id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<RenderSummary, SyncError> {
        self.settings.set_field(id, key, value)?;
        Ok(self.reconcile_and_render())
    }

    /// Clears all local edits and re-renders.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Settings`] if the persist fails.
    pub fn clear_edits(&mut self) -> Result<RenderSummary, SyncError> {
        self.settings.clear_edits()?;
        Ok(self.reconcile_and_render())
    }

    /// Sets the auto-refresh interval in minutes.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Settings`] if the persist fails.
    pub fn set_refresh_minutes(&mut self, minutes: u64) -> Result<(), SyncError> {
        self.settings.set_refresh_minutes(minutes)?;
        Ok(())
    }

    /// Sets the UI theme.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Settings`] if the persist fails.
    pub fn set_theme(&mut self, theme: &str) -> Result<(), SyncError> {
        self.settings.set_theme(theme)?;
        Ok(())
    }

    /// Flushes the current edit set to the remote API as one bulk
    /// upsert. On success the edit store is cleared; on failure edits
    /// are retained for the next attempt (at-least-once delivery).
    ///
    /// # Errors
    ///
    /// Returns the underlying [`SyncError`]; pending edits survive it.
    pub async fn flush_edits(&mut self, api: &api::ApiClient) -> Result<u64, SyncError> {
        if self.settings.edits().is_empty() {
            return Ok(0);
        }
        match api.bulk_upsert(self.settings.edits()).await {
            Ok(applied) => {
                self.settings.clear_edits()?;
                self.reconcile_and_render();
                log::info!("Flushed {applied} edits to the API");
                Ok(applied)
            }
            Err(e) => {
                log::warn!("Edit flush failed, retaining {} pending edits: {e}",
                    self.settings.edits().len());
                Err(e)
            }
        }
    }

    /// Re-derives the effective dataset from raw + edits and renders.
    pub fn reconcile_and_render(&mut self) -> RenderSummary {
        self.effective = reconcile(&self.raw, self.settings.edits());
        self.render()
    }

    fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Applies a completed load if its generation is still current.
    /// Stale completions are discarded wholesale.
    fn complete_load(
        &mut self,
        generation: u64,
        descriptor: DataSource,
        records: Vec<UnitRecord>,
        fallback: bool,
    ) -> Result<LoadOutcome, SyncError> {
        if generation != self.generation {
            log::info!(
                "Discarding stale load completion (generation {generation}, current {})",
                self.generation
            );
            return Ok(LoadOutcome::Stale);
        }

        let count = records.len();
        self.raw = records;
        self.settings.set_data_source(descriptor)?;
        self.reconcile_and_render();
        Ok(LoadOutcome::Ready {
            records: count,
            fallback,
        })
    }

    fn render(&mut self) -> RenderSummary {
        let visible = filtered_view(&self.effective, &self.filter);
        let points: Vec<MapPoint> = visible
            .iter()
            .filter_map(|record| self.point_for(record))
            .collect();
        self.view.render_points(&points);

        RenderSummary {
            kpi: kpi_summary(&self.effective),
            top: top_by_ytd(&self.effective, TOP_N),
            visible: visible.len(),
            plotted: points.len(),
        }
    }

    fn point_for(&self, record: &UnitRecord) -> Option<MapPoint> {
        let (lat, lon) = record.position()?;
        #[allow(clippy::cast_precision_loss)]
        let metric = current_metric(record, &self.filter) as f64;
        Some(MapPoint {
            id: record.id.clone(),
            name: record.name.clone(),
            lat,
            lon,
            radius: radius_for_value(metric),
            color: record
                .color
                .clone()
                .unwrap_or_else(|| color_for_value(metric).to_string()),
            popup: popup_text(record),
        })
    }
}

fn popup_text(record: &UnitRecord) -> String {
    let mut lines = vec![record.name.clone()];
    if !record.level.is_empty() {
        lines.push(format!("Level: {}", record.level));
    }
    if !record.parent.is_empty() {
        lines.push(format!("Parent: {}", record.parent));
    }
    lines.push(format!("Year to date: {}", record.ytd));
    if !record.inspectors.is_empty() {
        lines.push(format!("Inspectors: {}", record.inspectors));
    }
    if !record.last_check.is_empty() {
        lines.push(format!("Last check: {}", record.last_check));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};
    use unit_map_unit_models::Period;

    static NEXT: AtomicU64 = AtomicU64::new(0);

    fn temp_settings_path() -> PathBuf {
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "unit_map_sync_{}_{n}/settings.json",
            std::process::id()
        ))
    }

    struct FakeSource {
        descriptor: DataSource,
        records: Result<Vec<UnitRecord>, ()>,
    }

    impl FakeSource {
        fn ok(descriptor: DataSource, records: Vec<UnitRecord>) -> Self {
            Self {
                descriptor,
                records: Ok(records),
            }
        }

        fn failing(descriptor: DataSource) -> Self {
            Self {
                descriptor,
                records: Err(()),
            }
        }
    }

    #[async_trait]
    impl DatasetSource for FakeSource {
        fn describe(&self) -> DataSource {
            self.descriptor.clone()
        }

        async fn fetch(&self) -> Result<Vec<UnitRecord>, SourceError> {
            match &self.records {
                Ok(records) => Ok(records.clone()),
                Err(()) => Err(SourceError::Io(std::io::Error::other("fake outage"))),
            }
        }
    }

    #[derive(Default)]
    struct RecordingView {
        passes: Vec<Vec<MapPoint>>,
    }

    impl MapView for RecordingView {
        fn render_points(&mut self, points: &[MapPoint]) {
            self.passes.push(points.to_vec());
        }
    }

    fn record(id: &str, name: &str, level: &str, today: i64, ytd: i64) -> UnitRecord {
        let mut rec = UnitRecord::with_id(id);
        rec.name = name.to_string();
        rec.level = level.to_string();
        rec.today = today;
        rec.ytd = ytd;
        rec.lat = Some(49.9);
        rec.lon = Some(36.2);
        rec
    }

    fn demo_records() -> Vec<UnitRecord> {
        vec![record("d1", "Demo", "РУП", 1, 2)]
    }

    fn coordinator() -> SyncCoordinator<RecordingView> {
        SyncCoordinator::new(
            RecordingView::default(),
            SettingsStore::load(temp_settings_path()),
            Box::new(FakeSource::ok(DataSource::demo(), demo_records())),
        )
    }

    #[tokio::test]
    async fn load_replaces_dataset_and_renders() {
        let mut coord = coordinator();
        let source = FakeSource::ok(
            DataSource::url("https://example.com/u.csv"),
            vec![
                record("1", "A", "RUP", 5, 10),
                record("2", "B", "VP", 0, 50),
            ],
        );
        let outcome = coord.load(&source).await.unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Ready {
                records: 2,
                fallback: false
            }
        );
        assert_eq!(coord.effective().len(), 2);
        assert_eq!(
            coord.settings().settings().data_source.source_type,
            SourceType::Url
        );
        assert_eq!(coord.view.passes.last().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn boot_load_uses_the_demo_source() {
        let mut coord = coordinator();
        let outcome = coord.load_demo().await.unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Ready {
                records: 1,
                fallback: false
            }
        );
        assert_eq!(coord.effective()[0].id, "d1");
    }

    #[tokio::test]
    async fn failing_primary_falls_back_to_demo() {
        let mut coord = coordinator();
        let source = FakeSource::failing(DataSource {
            source_type: SourceType::Api,
            url: String::new(),
        });
        let outcome = coord.load(&source).await.unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Ready {
                records: 1,
                fallback: true
            }
        );
        assert_eq!(coord.effective()[0].id, "d1");
        assert_eq!(
            coord.settings().settings().data_source.source_type,
            SourceType::Demo
        );
    }

    #[tokio::test]
    async fn stale_completion_is_discarded() {
        let mut coord = coordinator();
        let older = coord.begin_load();
        let newer = coord.begin_load();

        let outcome = coord
            .complete_load(newer, DataSource::demo(), demo_records(), false)
            .unwrap();
        assert!(matches!(outcome, LoadOutcome::Ready { records: 1, .. }));

        // The older load resolves late; its records must not apply.
        let outcome = coord
            .complete_load(
                older,
                DataSource::url("https://slow.example.com"),
                vec![record("x", "Slow", "VP", 9, 9)],
                false,
            )
            .unwrap();
        assert_eq!(outcome, LoadOutcome::Stale);
        assert_eq!(coord.effective()[0].id, "d1");
        assert_eq!(
            coord.settings().settings().data_source.source_type,
            SourceType::Demo
        );
    }

    #[tokio::test]
    async fn refresh_requires_url_source_and_interval() {
        let mut coord = coordinator();
        assert!(!coord.auto_refresh_armed());
        assert_eq!(coord.refresh_interval(), None);
        assert_eq!(coord.refresh_tick().await, None);

        // A positive interval on a demo source still doesn't arm.
        coord.set_refresh_minutes(5).unwrap();
        assert!(!coord.auto_refresh_armed());
        assert_eq!(coord.refresh_tick().await, None);

        let source = FakeSource::ok(
            DataSource::url("https://example.com/u.csv"),
            demo_records(),
        );
        coord.load(&source).await.unwrap();
        assert!(coord.auto_refresh_armed());
        assert_eq!(
            coord.refresh_interval(),
            Some(Duration::from_secs(5 * 60))
        );

        coord.set_refresh_minutes(0).unwrap();
        assert!(!coord.auto_refresh_armed());
    }

    #[tokio::test]
    async fn in_flight_tick_skips_the_next_fire() {
        let mut coord = coordinator();
        let source = FakeSource::ok(
            DataSource::url("https://example.com/u.csv"),
            demo_records(),
        );
        coord.load(&source).await.unwrap();
        coord.set_refresh_minutes(5).unwrap();

        coord.refresh_in_flight = true;
        assert_eq!(coord.refresh_tick().await, None);
        coord.refresh_in_flight = false;
    }

    #[tokio::test]
    async fn edits_rerender_and_survive_flush_failure() {
        let mut coord = coordinator();
        let source = FakeSource::ok(
            DataSource::demo(),
            vec![
                record("1", "A", "RUP", 5, 10),
                record("2", "B", "VP", 0, 50),
            ],
        );
        coord.load(&source).await.unwrap();

        let summary = coord.apply_edit("1", "today", json!(7)).unwrap();
        assert_eq!(coord.effective()[0].today, 7);
        assert_eq!(summary.kpi.total, 2);

        // Flush against an unreachable API keeps the pending edits.
        let client = api::ApiClient::new("http://127.0.0.1:1", None);
        let err = coord.flush_edits(&client).await.unwrap_err();
        assert!(matches!(err, SyncError::Http(_)));
        assert_eq!(coord.settings().edits().len(), 1);
        assert_eq!(coord.effective()[0].today, 7);
    }

    #[tokio::test]
    async fn flush_with_no_edits_is_a_no_op() {
        let mut coord = coordinator();
        let client = api::ApiClient::new("http://127.0.0.1:1", None);
        assert_eq!(coord.flush_edits(&client).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn end_to_end_scenario() {
        let mut coord = coordinator();
        let mut a = record("1", "A", "RUP", 5, 10);
        a.parent = String::new();
        let mut b = record("2", "B", "VP", 0, 50);
        b.parent = "A".to_string();
        let source = FakeSource::ok(DataSource::demo(), vec![a, b]);
        coord.load(&source).await.unwrap();

        coord.apply_edit("1", "today", json!(7)).unwrap();
        assert_eq!(coord.effective()[0].today, 7);
        assert_eq!(coord.effective()[1].today, 0);

        let summary = coord.set_filter(FilterState {
            level: "VP".to_string(),
            ..FilterState::default()
        });
        assert_eq!(summary.visible, 1);
        let last_pass = coord.view.passes.last().unwrap();
        assert_eq!(last_pass.len(), 1);
        assert_eq!(last_pass[0].id, "2");

        assert_eq!(summary.top[0].id, "2");
        assert_eq!(summary.top[0].ytd, 50);
    }

    #[tokio::test]
    async fn points_use_override_color_and_metric_style() {
        let mut coord = coordinator();
        let mut a = record("1", "A", "RUP", 0, 10);
        a.color = Some("#123456".to_string());
        let mut b = record("2", "B", "VP", 85, 10);
        b.lat = None; // unusable coordinate, never plotted
        let source = FakeSource::ok(DataSource::demo(), vec![a, b]);
        coord.load(&source).await.unwrap();

        let pass = coord.view.passes.last().unwrap();
        assert_eq!(pass.len(), 1);
        assert_eq!(pass[0].color, "#123456");
        assert!((pass[0].radius - 6.0).abs() < f64::EPSILON);

        let summary = coord.set_filter(FilterState {
            period: Period::Ytd,
            ..FilterState::default()
        });
        assert_eq!(summary.plotted, 1);
        let pass = coord.view.passes.last().unwrap();
        assert!(pass[0].radius > 6.0);
    }
}
