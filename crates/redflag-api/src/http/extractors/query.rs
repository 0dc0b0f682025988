//! Query parameter extractors for list endpoints.

use serde::Deserialize;

/// `?limit=&offset=` for paginated lists. Bounds are enforced by the
/// services.
#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
