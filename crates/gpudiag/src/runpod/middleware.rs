//! Request logging for the Runpod client.

use http::Extensions;
use reqwest::{Request, Response, Url};
use reqwest_middleware::{Middleware, Next, Result};
use std::time::Instant;
use tracing::{debug, warn};

/// Logs each request's method, redacted URL, status and duration
pub struct TracingMiddleware;

#[async_trait::async_trait]
impl Middleware for TracingMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let method = req.method().clone();
        let url = redact(req.url());
        let start = Instant::now();

        let result = next.run(req, extensions).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(response) => {
                debug!(
                    %method,
                    %url,
                    status = response.status().as_u16(),
                    elapsed_ms,
                    "request completed"
                );
            }
            Err(reqwest_middleware::Error::Reqwest(error)) => {
                warn!(
                    %method,
                    %url,
                    elapsed_ms,
                    timeout = error.is_timeout(),
                    connect = error.is_connect(),
                    "request failed"
                );
            }
            Err(reqwest_middleware::Error::Middleware(error)) => {
                warn!(%method, %url, elapsed_ms, error = %error, "request failed in middleware");
            }
        }

        result
    }
}

/// Strip the query string, which holds the API key
pub(crate) fn redact(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
