//! Token refresh

use impact_core::types::TokenPair;
use serde_json::json;
use tracing::instrument;

use crate::client::ApiClient;
use crate::envelope;
use crate::error::ClientResult;

impl ApiClient {
    /// Exchange a refresh token for a new token pair
    ///
    /// This does not touch the client's own credentials; the automatic
    /// retry after a 401 handles that.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token is rejected.
    #[instrument(skip_all)]
    pub async fn exchange_refresh_token(&self, refresh_token: &str) -> ClientResult<TokenPair> {
        let body = self
            .post("/api/refresh", &json!({ "refresh_token": refresh_token }))
            .await?;
        envelope::into_payload(body)
    }
}
