use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

/// Single-record envelope: `{ "item": ... }`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemResponse<T> {
    pub item: T,
}

/// Listing envelope: `{ "items": [...] }`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}
