// Handlers for the sync service endpoints

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    AppState,
    error::AppError,
    hostaway::HostawayClient,
    sync,
    webflow::WebflowClient,
    widget::{BookingWidget, WidgetInit},
};

pub async fn index() -> &'static str {
    "Hostaway to Webflow sync service.\n\n\
     Endpoints:\n\
     /sync - Trigger sync (background)\n\
     /sync-now - Run sync and wait for the result\n\
     /publish - Re-publish all CMS items (background)\n\
     /status - Compare listing counts\n\
     /test - Inspect the field mapping for one listing\n\
     /policies - Show fetched cancellation policies\n\
     /widget-demo/:listing_id - Render booking widget state for a listing\n"
}

/// Build an authenticated source-API client from the configured credentials.
async fn hostaway_client(app_state: &AppState) -> Result<HostawayClient, AppError> {
    let settings = &app_state.settings;
    let (Some(account_id), Some(api_secret)) = (
        settings.hostaway_account_id.as_deref(),
        settings.hostaway_api_secret.as_deref(),
    ) else {
        return Err(AppError::BadRequest(
            "Hostaway credentials are not configured".to_string(),
        ));
    };
    let client = HostawayClient::new(
        Arc::clone(&app_state.http_client),
        settings.hostaway_base_url.clone(),
    );
    let token = client
        .access_token(account_id, api_secret)
        .await
        .map_err(AppError::InternalServerError)?;
    Ok(client.with_token(token))
}

fn webflow_client(app_state: &AppState) -> Result<WebflowClient, AppError> {
    WebflowClient::from_settings(&app_state.settings, Arc::clone(&app_state.http_client))
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Kick off a sync in the background and return immediately.
pub async fn trigger_sync(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let hostaway = hostaway_client(&app_state).await?;
    let webflow = webflow_client(&app_state)?;
    tokio::spawn(async move {
        if let Err(e) = sync::run_sync(&hostaway, &webflow).await {
            tracing::error!("Sync failed: {}", e);
        }
    });
    Ok(Json(json!({ "status": "sync started" })))
}

/// Run the sync in the foreground and report its counts.
pub async fn sync_now(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let hostaway = hostaway_client(&app_state).await?;
    let webflow = webflow_client(&app_state)?;
    let outcome = sync::run_sync(&hostaway, &webflow)
        .await
        .map_err(AppError::InternalServerError)?;
    Ok(Json(json!({ "status": "complete", "outcome": outcome })))
}

pub async fn trigger_publish(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let webflow = webflow_client(&app_state)?;
    tokio::spawn(async move {
        match sync::publish_all(&webflow).await {
            Ok(count) => tracing::info!("Published {} items", count),
            Err(e) => tracing::error!("Publish failed: {}", e),
        }
    });
    Ok(Json(json!({ "status": "publish started" })))
}

pub async fn sync_status(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let hostaway = hostaway_client(&app_state).await?;
    let webflow = webflow_client(&app_state)?;
    let status = sync::status(&hostaway, &webflow)
        .await
        .map_err(AppError::InternalServerError)?;
    Ok(Json(status))
}

pub async fn test_mapping(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let hostaway = hostaway_client(&app_state).await?;
    let report = sync::test_mapping(&hostaway)
        .await
        .map_err(AppError::InternalServerError)?;
    Ok(Json(report))
}

pub async fn list_policies(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let hostaway = hostaway_client(&app_state).await?;
    let policies = hostaway
        .fetch_cancellation_policies()
        .await
        .map_err(AppError::InternalServerError)?;
    Ok(Json(json!({
        "general": policies.general,
        "airbnb": policies.airbnb,
        "total": policies.map.len(),
    })))
}

/// Spin up a widget session for a listing and return its rendered state:
/// the classified month, the listing parameters and the headline rate.
pub async fn widget_demo(
    State(app_state): State<AppState>,
    Path(listing_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let hostaway = hostaway_client(&app_state).await?;
    let init = WidgetInit {
        listing_id: Some(listing_id),
        booking_active: true,
    };
    let mut widget = BookingWidget::new(
        &init,
        hostaway,
        app_state.settings.checkout_base_url.clone(),
    )
    .map_err(|e| AppError::BadRequest(e.to_string()))?;
    widget.start().await;

    let (year, month) = widget.visible_month();
    let days: Vec<_> = widget
        .render_days()
        .into_iter()
        .map(|day| {
            json!({
                "date": day.date,
                "day": day.day,
                "status": format!("{:?}", day.status),
                "selectable": day.selectable,
                "tooltip": day.tooltip,
            })
        })
        .collect();
    Ok(Json(json!({
        "listingId": listing_id,
        "minNights": widget.config().min_nights,
        "maxGuests": widget.config().max_guests,
        "averageNightlyRate": widget.average_rate(),
        "visibleMonth": format!("{}-{:02}", year, month),
        "days": days,
        "error": widget.transient_error(),
    })))
}
