//! Machine id lookup against the Runpod GraphQL API.

use std::time::Duration;

use crate::runpod::{errors::LookupError, middleware::TracingMiddleware};
use anyhow::{Context, Result};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const MACHINE_ID_QUERY: &str = "
    query Pod($podId: String!) {
      pod(input: { podId: $podId }) {
        machineId
      }
    }
";

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: PodVariables<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PodVariables<'a> {
    pod_id: &'a str,
}

/// Every level is optional: a missing or null level means "no machine id"
#[derive(Debug, Deserialize)]
struct PodResponse {
    data: Option<PodData>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct PodData {
    pod: Option<Pod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pod {
    machine_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// Client for the Runpod GraphQL endpoint.
pub struct RunpodClient {
    http: ClientWithMiddleware,
    endpoint: String,
}

impl RunpodClient {
    /// Creates a client for `endpoint` whose requests give up after `timeout`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = ClientBuilder::new(
            Client::builder()
                .connect_timeout(timeout.min(Duration::from_secs(10)))
                .timeout(timeout)
                .build()
                .context("Failed to create HTTP client")?,
        )
        .with(TracingMiddleware)
        .build();

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// Resolve the machine id of a pod, reporting failures as `None`.
    ///
    /// Failures, including a missing pod id or API key, are printed for the user and logged,
    /// never returned. Missing credentials skip the request entirely.
    pub async fn machine_id(
        &self,
        pod_id: Option<&str>,
        api_key: Option<&SecretString>,
    ) -> Option<String> {
        let result = match credentials(pod_id, api_key) {
            Ok((pod_id, api_key)) => self.fetch_machine_id(pod_id, api_key).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(machine_id) => {
                debug!(pod_id, machine_id = ?machine_id, "machine id lookup finished");
                machine_id
            }
            Err(e) => {
                println!("Failed to fetch machineId: {}", e);
                warn!(pod_id, error = %e, "machine id lookup failed");
                None
            }
        }
    }

    /// Issue the GraphQL query and extract `data.pod.machineId`.
    pub async fn fetch_machine_id(
        &self,
        pod_id: &str,
        api_key: &SecretString,
    ) -> Result<Option<String>, LookupError> {
        let body = GraphqlRequest {
            query: MACHINE_ID_QUERY,
            variables: PodVariables { pod_id },
        };

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("api_key", api_key.expose_secret())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LookupError::Body(e.without_url()))?;
        let parsed = parse_response(&bytes)?;

        for error in &parsed.errors {
            warn!(pod_id, message = %error.message, "GraphQL error in machine id response");
        }

        Ok(parsed
            .data
            .and_then(|data| data.pod)
            .and_then(|pod| pod.machine_id))
    }
}

/// Both values must be present and non-empty for a lookup to be attempted
fn credentials<'a>(
    pod_id: Option<&'a str>,
    api_key: Option<&'a SecretString>,
) -> Result<(&'a str, &'a SecretString), LookupError> {
    match (pod_id, api_key) {
        (Some(pod_id), Some(api_key))
            if !pod_id.is_empty() && !api_key.expose_secret().is_empty() =>
        {
            Ok((pod_id, api_key))
        }
        _ => Err(LookupError::MissingCredentials),
    }
}

/// Decode a complete response body; anything after the JSON document is an error
fn parse_response(bytes: &[u8]) -> Result<PodResponse, LookupError> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    let parsed: PodResponse = serde_path_to_error::deserialize(&mut deserializer)?;
    deserializer.end().map_err(LookupError::TrailingData)?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_matches_graphql_shape() {
        let body = GraphqlRequest {
            query: MACHINE_ID_QUERY,
            variables: PodVariables { pod_id: "abc123" },
        };
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["variables"], json!({"podId": "abc123"}));
        assert!(value["query"].as_str().unwrap().contains("machineId"));
    }

    #[test]
    fn null_levels_yield_no_machine_id() {
        for text in [
            r#"{}"#,
            r#"{"data": null}"#,
            r#"{"data": {"pod": null}}"#,
            r#"{"data": {"pod": {}}}"#,
            r#"{"errors": [{"message": "unauthorized"}], "data": {"pod": null}}"#,
        ] {
            let parsed: PodResponse = serde_json::from_str(text).unwrap();
            let machine_id = parsed.data.and_then(|d| d.pod).and_then(|p| p.machine_id);
            assert_eq!(machine_id, None, "{}", text);
        }
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let result = parse_response(br#"{"data": {"pod": {"machineId": "m-123"}}} trailing"#);
        assert!(matches!(result, Err(LookupError::TrailingData(_))), "{:?}", result);

        let parsed = parse_response(b"{\"data\": {\"pod\": {\"machineId\": \"m-123\"}}}\n").unwrap();
        assert_eq!(
            parsed.data.and_then(|d| d.pod).and_then(|p| p.machine_id),
            Some("m-123".to_string())
        );
    }

    #[test]
    fn missing_credentials_are_a_reported_failure() {
        let key = SecretString::from("key");
        let empty = SecretString::from("");

        for (pod_id, api_key) in [
            (None, Some(&key)),
            (Some("pod"), None),
            (Some(""), Some(&key)),
            (Some("pod"), Some(&empty)),
        ] {
            let error = credentials(pod_id, api_key).unwrap_err();
            assert!(matches!(error, LookupError::MissingCredentials));
            assert_eq!(error.to_string(), "RUNPOD_POD_ID or RUNPOD_API_KEY is not set");
        }
        assert!(credentials(Some("pod"), Some(&key)).is_ok());
    }

    #[tokio::test]
    async fn missing_credentials_skip_the_request() {
        // Port 9 is discard; the request would fail if it were sent
        let client = RunpodClient::new("http://127.0.0.1:9/graphql", Duration::from_secs(1)).unwrap();
        let key = SecretString::from("key");

        assert_eq!(client.machine_id(None, Some(&key)).await, None);
        assert_eq!(client.machine_id(Some("pod"), None).await, None);
        assert_eq!(client.machine_id(Some(""), Some(&key)).await, None);
    }
}
