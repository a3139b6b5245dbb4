//! Request extractors whose rejections use the `{ "error": ... }` body

use axum::{
    extract::{
        multipart::MultipartError, rejection::JsonRejection, FromRequest, FromRequestParts,
        Multipart, Query, Request,
    },
    http::{request::Parts, StatusCode},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::core::error::AppError;

/// JSON body extractor
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let message = match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => return Ok(Self(value)),
            Err(JsonRejection::JsonDataError(err)) => format!("Invalid JSON data: {}", err),
            Err(JsonRejection::JsonSyntaxError(err)) => format!("Invalid JSON syntax: {}", err),
            Err(JsonRejection::MissingJsonContentType(err)) => {
                format!("Missing JSON content type: {}", err)
            }
            Err(_) => "Failed to parse JSON body".to_string(),
        };

        Err(AppError::BadRequest(message))
    }
}

/// Query string extractor
pub struct AppQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|e| AppError::BadRequest(e.body_text()))
    }
}

/// The `file` part of a multipart upload.
///
/// Other parts are ignored. A request without a `file` part is a
/// validation error.
#[derive(Debug)]
pub struct ModelUpload {
    pub data: Vec<u8>,
    /// Filename sent by the client, may be empty
    pub file_name: String,
    /// Content type of the part, may be empty
    pub content_type: String,
}

impl<S> FromRequest<S> for ModelUpload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error("Failed to read multipart data", e))?
        {
            if field.name() != Some("file") {
                debug!("Ignoring multipart field: {:?}", field.name());
                continue;
            }

            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();

            let data = field
                .bytes()
                .await
                .map_err(|e| multipart_error("Failed to read file data", e))?;

            return Ok(Self {
                data: data.to_vec(),
                file_name,
                content_type,
            });
        }

        Err(AppError::Validation("No file uploaded".to_string()))
    }
}

/// Body limit overruns keep their 413; anything else is a malformed request
fn multipart_error(context: &str, e: MultipartError) -> AppError {
    debug!("{}: {}", context, e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(format!("{}: {}", context, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::DefaultBodyLimit, routing::post, Router};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde::Deserialize;
    use serde_json::{json, Value};

    #[derive(Deserialize)]
    struct Limit {
        limit: u32,
    }

    async fn describe_upload(upload: ModelUpload) -> Json<Value> {
        Json(json!({
            "file_name": upload.file_name,
            "content_type": upload.content_type,
            "size": upload.data.len(),
        }))
    }

    async fn echo_limit(AppQuery(query): AppQuery<Limit>) -> String {
        query.limit.to_string()
    }

    async fn echo_json(AppJson(body): AppJson<Value>) -> Json<Value> {
        Json(body)
    }

    fn server() -> TestServer {
        let router = Router::new()
            .route("/upload", post(describe_upload))
            .route(
                "/limited",
                post(describe_upload).layer(DefaultBodyLimit::max(1024)),
            )
            .route("/query", post(echo_limit))
            .route("/json", post(echo_json));
        TestServer::new(router).unwrap()
    }

    #[tokio::test]
    async fn test_model_upload_takes_file_part() {
        let form = MultipartForm::new()
            .add_text("comment", "ignored")
            .add_part(
                "file",
                Part::bytes(b"solid x".to_vec())
                    .file_name("x.stl")
                    .mime_type("model/stl"),
            );

        let response = server().post("/upload").multipart(form).await;
        response.assert_status_ok();
        response.assert_json(&json!({
            "file_name": "x.stl",
            "content_type": "model/stl",
            "size": 7,
        }));
    }

    #[tokio::test]
    async fn test_model_upload_without_file_part() {
        let form = MultipartForm::new().add_text("comment", "no file");

        let response = server().post("/upload").multipart(form).await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn test_model_upload_requires_multipart() {
        let response = server().post("/upload").json(&json!({"file": "x"})).await;
        response.assert_status_bad_request();
        assert!(response.json::<Value>()["error"].is_string());
    }

    #[tokio::test]
    async fn test_model_upload_over_body_limit_is_payload_too_large() {
        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(vec![b'x'; 8 * 1024])
                .file_name("big.stl")
                .mime_type("model/stl"),
        );

        let response = server().post("/limited").multipart(form).await;
        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        assert!(response.json::<Value>()["error"].is_string());
    }

    #[tokio::test]
    async fn test_query_rejection_has_error_body() {
        let server = server();

        let ok = server.post("/query").add_query_param("limit", 5).await;
        ok.assert_text("5");

        let bad = server
            .post("/query")
            .add_query_param("limit", "many")
            .await;
        bad.assert_status_bad_request();
        assert!(bad.json::<Value>()["error"].is_string());
    }

    #[tokio::test]
    async fn test_json_rejection_has_error_body() {
        let response = server().post("/json").text("{}").await;
        response.assert_status_bad_request();
        let message = response.json::<Value>()["error"].as_str().unwrap().to_string();
        assert!(message.contains("content type"));
    }
}
