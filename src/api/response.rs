use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Standard list response: the payload under `data`, the collection size in
/// an X-Total-Count header.
pub fn with_total_count<T: Serialize>(data: T, count: i64) -> Response {
    let mut headers = HeaderMap::new();
    match count.to_string().parse() {
        Ok(value) => {
            headers.insert("X-Total-Count", value);
        }
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }

    (StatusCode::OK, headers, Json(ApiResponse { data })).into_response()
}
