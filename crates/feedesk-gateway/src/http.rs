//! HTTP gateway for a spreadsheet web app

use async_trait::async_trait;
use log::{debug, error};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::time::Duration;

use crate::{ChangeOutcome, Envelope, GatewayError, Record, SheetChange, SheetGateway};

/// Talks to the remote endpoint over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    endpoint: Url,
}

impl HttpGateway {
    /// Build a gateway for `endpoint`; redirects are followed since script hosts answer via a redirect
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let endpoint = Url::parse(endpoint).map_err(|_| GatewayError::InvalidEndpoint {
            url: endpoint.to_string(),
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn read_url(&self, sheet: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("action", "get")
            .append_pair("sheet", sheet);
        url
    }

    async fn try_fetch(&self, sheet: &str) -> Result<Vec<Record>, GatewayError> {
        let text = self
            .client
            .get(self.read_url(sheet))
            .send()
            .await?
            .text()
            .await?;
        let envelope: Envelope = serde_json::from_str(&text)?;
        envelope.into_records()
    }

    async fn try_submit(&self, change: &SheetChange) -> Result<ChangeOutcome, GatewayError> {
        // text/plain keeps the request "simple" for script hosts that reject JSON preflights
        let body = serde_json::to_string(change)?;
        let text = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(body)
            .send()
            .await?
            .text()
            .await?;
        let envelope: Envelope = serde_json::from_str(&text)?;
        Ok(envelope.into())
    }
}

#[async_trait]
impl SheetGateway for HttpGateway {
    async fn fetch_sheet(&self, sheet: &str) -> Vec<Record> {
        match self.try_fetch(sheet).await {
            Ok(rows) => {
                debug!("Fetched {} rows from sheet {}", rows.len(), sheet);
                rows
            }
            Err(e) => {
                error!("Failed to fetch sheet {}: {}", sheet, e);
                Vec::new()
            }
        }
    }

    async fn submit_change(&self, change: SheetChange) -> ChangeOutcome {
        match self.try_submit(&change).await {
            Ok(outcome) => {
                if !outcome.success {
                    error!(
                        "{} on sheet {} rejected: {}",
                        change.action,
                        change.sheet,
                        outcome.error_text()
                    );
                }
                outcome
            }
            Err(e) => {
                error!("{} on sheet {} failed: {}", change.action, change.sheet, e);
                ChangeOutcome::failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_endpoint() {
        let err = HttpGateway::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidEndpoint { .. }));
    }

    #[test]
    fn test_read_url_keeps_existing_query() {
        let gateway =
            HttpGateway::new("https://example.test/exec?key=abc", Duration::from_secs(1)).unwrap();
        let url = gateway.read_url("Sheet 1");
        assert_eq!(
            url.as_str(),
            "https://example.test/exec?key=abc&action=get&sheet=Sheet+1"
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_fail_soft() {
        let gateway = HttpGateway::new("http://127.0.0.1:9/exec", Duration::from_secs(2)).unwrap();
        assert!(gateway.fetch_sheet("Sheet1").await.is_empty());

        let outcome = gateway
            .submit_change(SheetChange::delete("Sheet1", "1"))
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
    }
}
