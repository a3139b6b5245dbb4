use axum::http::{HeaderValue, Request};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, MakeSpan, TraceLayer};
use tracing::{Level, Span};
use uuid::Uuid;

/// Request ID generator using UUID v7 (time-ordered)
#[derive(Clone, Copy)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::now_v7().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Span per request carrying method, URI and request id
#[derive(Clone, Debug)]
pub struct MakeSpanWithRequestId;

impl<B> MakeSpan<B> for MakeSpanWithRequestId {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map(|id| id.header_value())
            .or_else(|| request.headers().get("x-request-id"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

/// CORS for the configured origins; `*` allows any origin
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(origin) => Some(origin),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Wrap the router in the HTTP middleware stack.
///
/// Outermost first: request id assignment, tracing, request id
/// propagation to the response, CORS.
pub fn apply(router: Router, allowed_origins: &[String]) -> Router {
    router
        .layer(cors_layer(allowed_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Client-supplied ids are kept
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderName;
    use axum::routing::get;
    use axum_test::TestServer;

    const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
    const ORIGIN: HeaderName = HeaderName::from_static("origin");

    fn server(origins: &[&str]) -> TestServer {
        let origins: Vec<String> = origins.iter().map(|o| o.to_string()).collect();
        let router = Router::new().route("/ping", get(|| async { "pong" }));
        TestServer::new(apply(router, &origins)).unwrap()
    }

    #[test]
    fn test_request_id_is_uuid_v7() {
        let request = Request::new(());
        let id = MakeRequestUuid.make_request_id(&request).unwrap();

        let parsed = Uuid::parse_str(id.header_value().to_str().unwrap()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[tokio::test]
    async fn test_request_id_generated_and_propagated() {
        let server = server(&["*"]);

        let generated = server.get("/ping").await;
        let id = generated.header("x-request-id");
        assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok());

        let supplied = server
            .get("/ping")
            .add_header(REQUEST_ID, HeaderValue::from_static("client-id-1"))
            .await;
        assert_eq!(supplied.header("x-request-id"), "client-id-1");
    }

    #[tokio::test]
    async fn test_cors_allows_listed_origin_only() {
        let server = server(&["http://localhost:5173", "not a header\n"]);

        let allowed = server
            .get("/ping")
            .add_header(ORIGIN, HeaderValue::from_static("http://localhost:5173"))
            .await;
        assert_eq!(
            allowed.header("access-control-allow-origin"),
            "http://localhost:5173"
        );

        let other = server
            .get("/ping")
            .add_header(ORIGIN, HeaderValue::from_static("http://evil.example"))
            .await;
        assert!(other
            .headers()
            .get("access-control-allow-origin")
            .is_none());
    }
}
