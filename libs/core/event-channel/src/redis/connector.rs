use crate::error::ChannelError;
use crate::retry::{RetryConfig, retry_with_backoff};
use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

/// Connect to the broker and verify the connection with `PING`
///
/// The ConnectionManager reconnects on its own after transient failures.
///
/// # Example
/// ```ignore
/// use event_channel::redis::connect;
///
/// let conn = connect("redis://127.0.0.1:6379").await?;
/// ```
pub async fn connect(url: &str) -> Result<ConnectionManager, ChannelError> {
    info!(url = %redacted(url), "Connecting to broker");

    let client = Client::open(url).map_err(|e| ChannelError::Config(e.to_string()))?;
    let manager = ConnectionManager::new(client)
        .await
        .map_err(|e| ChannelError::Connection(e.to_string()))?;

    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    info!("Connected to broker");
    Ok(manager)
}

/// Connect with exponential backoff; a final failure is returned to the caller
///
/// # Example
/// ```ignore
/// use event_channel::{redis::connect_with_retry, RetryConfig};
///
/// let conn = connect_with_retry(&url, Some(RetryConfig::new().with_max_retries(5))).await?;
/// ```
pub async fn connect_with_retry(
    url: &str,
    retry_config: Option<RetryConfig>,
) -> Result<ConnectionManager, ChannelError> {
    let url_owned = url.to_string();
    retry_with_backoff(|| connect(&url_owned), retry_config.unwrap_or_default()).await
}

/// Strip credentials from a connection URL for logging
pub(crate) fn redacted(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
