//! Response handling shared by the REST clients.

use crate::error::{ClientError, ClientResult};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Client timeout applied to every remote call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) fn build_http_client() -> ClientResult<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {e}")))
}

/// Sends the request and fails on a non-success status, keeping the body as
/// the error message.
pub(crate) async fn send(context: &str, request: RequestBuilder) -> ClientResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| ClientError::from_reqwest(context, e))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            context: context.to_string(),
            status: status.as_u16(),
            message,
        });
    }

    Ok(response)
}

/// Reads and decodes a JSON body.
pub(crate) async fn decode<T: DeserializeOwned>(context: &str, response: Response) -> ClientResult<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ClientError::from_reqwest(context, e))?;
    serde_json::from_slice(&bytes).map_err(|source| ClientError::Decode {
        context: context.to_string(),
        source,
    })
}

/// `send` followed by `decode`.
pub(crate) async fn fetch<T: DeserializeOwned>(context: &str, request: RequestBuilder) -> ClientResult<T> {
    let response = send(context, request).await?;
    decode(context, response).await
}
