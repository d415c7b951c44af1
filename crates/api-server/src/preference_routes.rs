use analysis_core::TimeFrame;
use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::preferences::PreferencesView;
use crate::{analysis_error, ApiResponse, AppError, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePreferencesRequest {
    pub time_frame: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TimeFrameRequest {
    pub time_frame: String,
}

#[derive(Debug, Serialize)]
pub struct TimeFrameView {
    pub time_frame: TimeFrame,
    pub options: [TimeFrame; 3],
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DisplayNameBody {
    pub display_name: String,
}

pub fn preference_routes() -> Router<AppState> {
    Router::new()
        .route("/api/preferences", get(get_preferences).put(update_preferences))
        .route("/api/preferences/time-frame", get(get_time_frame).put(set_time_frame))
        .route(
            "/api/preferences/display-name",
            get(get_display_name).put(set_display_name),
        )
}

async fn get_preferences(State(state): State<AppState>) -> Json<ApiResponse<PreferencesView>> {
    Json(ApiResponse::success(state.preferences.view()))
}

async fn update_preferences(
    State(state): State<AppState>,
    Json(request): Json<UpdatePreferencesRequest>,
) -> Result<Json<ApiResponse<PreferencesView>>, AppError> {
    // Parse before applying anything so a bad time frame leaves both values untouched
    let time_frame = request
        .time_frame
        .as_deref()
        .map(str::parse::<TimeFrame>)
        .transpose()
        .map_err(analysis_error)?;

    if let Some(time_frame) = time_frame {
        state.preferences.set_time_frame(time_frame);
    }
    if let Some(name) = request.display_name {
        state.preferences.set_display_name(name.trim());
    }
    Ok(Json(ApiResponse::success(state.preferences.view())))
}

async fn get_time_frame(State(state): State<AppState>) -> Json<ApiResponse<TimeFrameView>> {
    Json(ApiResponse::success(TimeFrameView {
        time_frame: state.preferences.time_frame(),
        options: TimeFrame::ALL,
    }))
}

async fn set_time_frame(
    State(state): State<AppState>,
    Json(request): Json<TimeFrameRequest>,
) -> Result<Json<ApiResponse<TimeFrameView>>, AppError> {
    let time_frame: TimeFrame = request.time_frame.parse().map_err(analysis_error)?;
    state.preferences.set_time_frame(time_frame);
    Ok(Json(ApiResponse::success(TimeFrameView {
        time_frame,
        options: TimeFrame::ALL,
    })))
}

async fn get_display_name(State(state): State<AppState>) -> Json<ApiResponse<DisplayNameBody>> {
    Json(ApiResponse::success(DisplayNameBody {
        display_name: state.preferences.display_name(),
    }))
}

async fn set_display_name(
    State(state): State<AppState>,
    Json(request): Json<DisplayNameBody>,
) -> Result<Json<ApiResponse<DisplayNameBody>>, AppError> {
    let name = request.display_name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Display name cannot be empty"));
    }
    state.preferences.set_display_name(name);
    Ok(Json(ApiResponse::success(DisplayNameBody {
        display_name: name.to_string(),
    })))
}
