// THEORY:
// The two endpoints the Mini-App calls. Both answer with a JSON envelope carrying
// `ok`; failures add an `error` string the client shows verbatim.
//
// - `POST /api/upload-sector` stores the photo, runs it through the scan pool and
//   returns the holds grouped by colour. A photo that cannot be decoded is still a
//   success with no holds; only storage or pool failures are server errors.
// - `POST /api/auth` verifies the Telegram launch payload and, if the signature holds,
//   returns the public profile of the user it names.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hold_vision::{DetectionResult, LaunchPayload, UserProfile};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::AppState;

const IMAGE_FIELD: &str = "image";
const SECTOR_FIELD: &str = "sectorId";
const INIT_DATA_FIELD: &str = "initData";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SectorData {
    #[serde(skip_serializing_if = "Option::is_none")]
    sector_id: Option<String>,
    image_url: String,
    #[serde(flatten)]
    result: DetectionResult,
}

#[derive(Debug, Serialize)]
struct SectorResponse {
    ok: bool,
    message: &'static str,
    data: SectorData,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    ok: bool,
    user: UserProfile,
}

struct Upload {
    original_name: String,
    bytes: Bytes,
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "ok": false, "error": message }))).into_response()
}

/// Reduces a client-supplied file name to a safe single path component.
pub fn sanitize_file_name(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

async fn store_upload(dir: &Path, file_name: &str, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(file_name), bytes).await
}

pub async fn upload_sector(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut upload = None;
    let mut sector_id = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "unreadable upload body");
                return failure(err.status(), "Failed to process image");
            }
        };
        let name = field.name().map(str::to_owned);

        match name.as_deref() {
            Some(IMAGE_FIELD) => {
                let is_image = field
                    .content_type()
                    .is_some_and(|mime| mime.starts_with("image/"));
                if !is_image {
                    return failure(StatusCode::BAD_REQUEST, "Only image files are allowed");
                }
                let original_name = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some(Upload {
                            original_name,
                            bytes,
                        })
                    }
                    Err(err) => {
                        warn!(error = %err, "upload interrupted");
                        return failure(err.status(), "Failed to process image");
                    }
                }
            }
            Some(SECTOR_FIELD) => sector_id = field.text().await.ok(),
            _ => {}
        }
    }

    let Some(upload) = upload else {
        return failure(StatusCode::BAD_REQUEST, "No image file provided");
    };

    let file_name = format!(
        "{}-{}",
        unix_millis(),
        sanitize_file_name(&upload.original_name)
    );
    if let Err(err) = store_upload(&state.uploads_dir, &file_name, &upload.bytes).await {
        error!(error = %err, file = %file_name, "failed to store upload");
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process image");
    }

    let result = match state.pool.scan(upload.bytes.to_vec()).await {
        Ok(report) => report.into_result(),
        Err(err) => {
            error!(error = %err, "scan pool unavailable");
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process image");
        }
    };
    info!(
        file = %file_name,
        sector = sector_id.as_deref().unwrap_or("-"),
        holds = result.total_holds(),
        "sector image processed"
    );

    let response = SectorResponse {
        ok: true,
        message: "Image processed successfully",
        data: SectorData {
            sector_id,
            image_url: format!("/uploads/{file_name}"),
            result,
        },
    };
    (StatusCode::OK, Json(response)).into_response()
}

pub async fn auth(State(state): State<AppState>, body: Bytes) -> Response {
    let init_data = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|mut request| request.get_mut(INIT_DATA_FIELD).map(Value::take));

    let parsed = match init_data {
        Some(Value::Object(fields)) => LaunchPayload::from_json_object(&fields),
        Some(Value::String(raw)) if !raw.is_empty() => LaunchPayload::parse_query(&raw),
        _ => return failure(StatusCode::BAD_REQUEST, "no initData"),
    };
    let payload = match parsed {
        Ok(payload) => payload,
        Err(err) => {
            debug!(error = %err, "malformed launch payload");
            return failure(StatusCode::BAD_REQUEST, "malformed initData");
        }
    };

    if let Err(reason) = state.verifier.check(&payload) {
        warn!(%reason, "login rejected");
        return failure(StatusCode::FORBIDDEN, "invalid signature");
    }

    let user = payload.user_profile();
    match &user.id {
        Some(id) => info!(user_id = %id, "login accepted"),
        None => info!("login accepted"),
    }
    (StatusCode::OK, Json(AuthResponse { ok: true, user })).into_response()
}
