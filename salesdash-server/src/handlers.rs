//! Request handlers

use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::Json;
use chrono::NaiveDate;
use salesdash_core::services::logging::events;
use salesdash_core::services::{
    DashboardQuery, DirectorDashboard, FilterOptions, IngestResult, ManagerDashboard,
    ReportRequest, TraderDashboard,
};
use salesdash_core::{
    AggregatedGroup, ComparisonPeriod, Error, GroupBy, LogEvent, NotificationConfig,
    NotificationStatus, Report, ReportMode, SalesdashContext,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Run store-bound work off the async runtime
async fn blocking<T, F>(state: &AppState, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&SalesdashContext) -> anyhow::Result<T> + Send + 'static,
{
    let ctx = Arc::clone(&state.ctx);
    let result = tokio::task::spawn_blocking(move || work(&ctx)).await?;
    result.map_err(ApiError::from)
}

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
}

/// GET /health
pub async fn health() -> Json<Health> {
    Json(Health { status: "healthy" })
}

/// GET /api/filters
pub async fn filters(State(state): State<AppState>) -> ApiResult<FilterOptions> {
    let options = blocking(&state, |ctx| ctx.filter_service.options()).await?;
    Ok(Json(options))
}

/// GET /api/sales-director-dashboard
pub async fn director_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<DirectorDashboard> {
    let view = blocking(&state, move |ctx| ctx.dashboard_service.director(&query)).await?;
    Ok(Json(view))
}

/// GET /api/sales-manager-dashboard
pub async fn manager_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<ManagerDashboard> {
    let view = blocking(&state, move |ctx| ctx.dashboard_service.manager(&query)).await?;
    Ok(Json(view))
}

/// GET /api/sales-trader-dashboard
pub async fn trader_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<TraderDashboard> {
    let view = blocking(&state, move |ctx| ctx.dashboard_service.trader(&query)).await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct AggregateParams {
    #[serde(default)]
    pub group_by: Option<String>,
    #[serde(flatten)]
    pub query: DashboardQuery,
}

/// GET /api/aggregate
pub async fn aggregate(
    State(state): State<AppState>,
    Query(params): Query<AggregateParams>,
) -> ApiResult<Vec<AggregatedGroup>> {
    let group_by: GroupBy = params.group_by.as_deref().unwrap_or_default().parse()?;
    let groups = blocking(&state, move |ctx| {
        ctx.dashboard_service.aggregate(&params.query, group_by)
    })
    .await?;
    Ok(Json(groups))
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    #[serde(default)]
    pub comparison_mode: bool,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub report_date: Option<String>,
    #[serde(default)]
    pub notify: bool,
}

impl UploadParams {
    fn to_request(&self) -> Result<ReportRequest, Error> {
        let period = match self.period.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(p) => Some(p.parse::<ComparisonPeriod>()?),
        };
        let report_date = match self.report_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(d) => Some(NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|_| {
                Error::validation(format!("report_date must be YYYY-MM-DD, got '{}'", d))
            })?),
        };
        Ok(ReportRequest {
            mode: ReportMode::from_flags(self.comparison_mode, period),
            report_date,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub filename: String,
    pub rows_processed: usize,
    pub ingest: IngestResult,
    /// `None` when the stored rows could not be reported on
    pub report: Option<Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationStatus>,
}

/// POST /upload-excel
///
/// Replaces the stored snapshot with the uploaded file and returns the
/// report built from it. Once the rows are stored the upload has succeeded:
/// a report that cannot be built (no dated rows of the report type) comes
/// back as `report: null` with `report_error`, and a failed notification is
/// reported next to the report.
pub async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    let request = params.to_request()?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }
    let (file_name, bytes) = upload.ok_or_else(|| ApiError::bad_request("Missing 'file' field"))?;

    let name = file_name.clone();
    let outcome = blocking(&state, move |ctx| {
        let ingest = ctx.ingest_service.ingest_bytes(&name, bytes, &mut |_, _| {})?;
        let generated = ctx.report_service.generate(&request);
        Ok((ingest, generated))
    })
    .await;

    let (ingest, generated) = match outcome {
        Ok(done) => done,
        Err(e) => {
            state.event_log.record(
                LogEvent::new(events::UPLOAD_FAILED)
                    .with_command("upload-excel")
                    .with_error(e.message.clone()),
            );
            return Err(e);
        }
    };
    state.event_log.record(
        LogEvent::new(events::UPLOAD_COMPLETED)
            .with_command("upload-excel")
            .with_row_count(ingest.rows_stored),
    );

    let (report, report_error) = match generated {
        Ok(generated) => {
            state.event_log.record(
                LogEvent::new(events::REPORT_GENERATED)
                    .with_command(generated.report.mode().to_string())
                    .with_row_count(generated.current_rows),
            );
            (Some(generated.report), None)
        }
        Err(e) => {
            let message = format!("{:#}", e);
            tracing::warn!(file = %file_name, error = %message, "Upload stored but no report was built");
            state.event_log.record(
                LogEvent::new(events::REPORT_FAILED)
                    .with_command("upload-excel")
                    .with_error(message.clone()),
            );
            (None, Some(message))
        }
    };

    let notification = match (&report, params.notify) {
        (Some(report), true) => Some(state.ctx.notification_service.notify(report, None).await),
        _ => None,
    };

    Ok(Json(UploadResponse {
        status: "success",
        filename: file_name,
        rows_processed: ingest.rows_stored,
        ingest,
        report,
        report_error,
        notification,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SendSmsRequest {
    pub report: Report,
    #[serde(default)]
    pub sms_config: Option<NotificationConfig>,
    #[serde(default)]
    pub report_mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendSmsResponse {
    pub status: &'static str,
    pub notification: NotificationStatus,
}

/// POST /send-sms
pub async fn send_sms(
    State(state): State<AppState>,
    Json(body): Json<SendSmsRequest>,
) -> ApiResult<SendSmsResponse> {
    if let Some(mode) = body.report_mode.as_deref() {
        let requested: ReportMode = mode.parse()?;
        if requested.name() != body.report.mode().name() {
            return Err(Error::validation(format!(
                "report_mode '{}' does not match a {} report",
                mode,
                body.report.mode().name()
            ))
            .into());
        }
    }

    let notification = state
        .ctx
        .notification_service
        .send(&body.report, body.sms_config.as_ref())
        .await?;
    Ok(Json(SendSmsResponse {
        status: "sent",
        notification,
    }))
}
