use reqwest::{Client, Method};
use serde_json::{json, Value};

use crate::error::SdkError;

pub const API_TOKEN_HEADER: &str = "x-api-token";
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Async client for a running gateway.
///
/// Successful calls return the full `{success, data}` envelope.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request to `path`. Bodies are only sent for POST, PUT and PATCH.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
        idempotency_key: Option<&str>,
    ) -> Result<Value, SdkError> {
        let mut builder = self
            .client
            .request(method.clone(), format!("{}{}", self.base_url, path))
            .header(reqwest::header::ACCEPT, "application/json");

        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(token) = &self.token {
            builder = builder.header(API_TOKEN_HEADER, token);
        }
        if let Some(key) = idempotency_key {
            builder = builder.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        if let Some(body) = body.filter(|_| matches!(method, Method::POST | Method::PUT | Method::PATCH)) {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text }));

        if !status.is_success() {
            return Err(SdkError::from_envelope(status.as_u16(), body));
        }
        Ok(body)
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, SdkError> {
        self.request(Method::GET, path, query, None, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, SdkError> {
        self.request(Method::POST, path, &[], Some(body), None).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value, SdkError> {
        self.request(Method::PUT, path, &[], Some(body), None).await
    }

    async fn delete(&self, path: &str) -> Result<Value, SdkError> {
        self.request(Method::DELETE, path, &[], None, None).await
    }

    // Monitoring

    pub async fn health(&self) -> Result<Value, SdkError> {
        self.get("/health", &[]).await
    }

    pub async fn status(&self) -> Result<Value, SdkError> {
        self.get("/api/status", &[]).await
    }

    pub async fn docs(&self) -> Result<Value, SdkError> {
        self.get("/api/docs", &[]).await
    }

    // Customers

    pub async fn create_customer(&self, data: &Value) -> Result<Value, SdkError> {
        self.post("/api/customers", data).await
    }

    /// Create a customer with a caller-chosen idempotency key.
    pub async fn create_customer_idempotent(&self, data: &Value, key: &str) -> Result<Value, SdkError> {
        self.request(Method::POST, "/api/customers", &[], Some(data), Some(key)).await
    }

    pub async fn list_customers(&self, query: &[(&str, &str)]) -> Result<Value, SdkError> {
        self.get("/api/customers", query).await
    }

    pub async fn get_customer(&self, id: &str) -> Result<Value, SdkError> {
        self.get(&format!("/api/customers/{id}"), &[]).await
    }

    pub async fn update_customer(&self, id: &str, data: &Value) -> Result<Value, SdkError> {
        self.put(&format!("/api/customers/{id}"), data).await
    }

    pub async fn delete_customer(&self, id: &str) -> Result<Value, SdkError> {
        self.delete(&format!("/api/customers/{id}")).await
    }

    pub async fn get_customer_kyc_link(&self, id: &str) -> Result<Value, SdkError> {
        self.get(&format!("/api/customers/{id}/kyc-link"), &[]).await
    }

    // KYC links

    pub async fn create_kyc_link(&self, data: &Value) -> Result<Value, SdkError> {
        self.post("/api/kyc-links", data).await
    }

    pub async fn list_kyc_links(&self, query: &[(&str, &str)]) -> Result<Value, SdkError> {
        self.get("/api/kyc-links", query).await
    }

    pub async fn get_kyc_link(&self, id: &str) -> Result<Value, SdkError> {
        self.get(&format!("/api/kyc-links/{id}"), &[]).await
    }

    // Transfers

    pub async fn create_transfer(&self, data: &Value) -> Result<Value, SdkError> {
        self.post("/api/transfers", data).await
    }

    pub async fn list_transfers(&self, query: &[(&str, &str)]) -> Result<Value, SdkError> {
        self.get("/api/transfers", query).await
    }

    pub async fn get_transfer(&self, id: &str) -> Result<Value, SdkError> {
        self.get(&format!("/api/transfers/{id}"), &[]).await
    }

    pub async fn update_transfer(&self, id: &str, data: &Value) -> Result<Value, SdkError> {
        self.put(&format!("/api/transfers/{id}"), data).await
    }

    pub async fn cancel_transfer(&self, id: &str) -> Result<Value, SdkError> {
        self.delete(&format!("/api/transfers/{id}")).await
    }

    // Webhook endpoints

    pub async fn create_webhook(&self, data: &Value) -> Result<Value, SdkError> {
        self.post("/api/webhooks", data).await
    }

    pub async fn list_webhooks(&self) -> Result<Value, SdkError> {
        self.get("/api/webhooks", &[]).await
    }

    pub async fn get_webhook(&self, id: &str) -> Result<Value, SdkError> {
        self.get(&format!("/api/webhooks/{id}"), &[]).await
    }

    pub async fn update_webhook(&self, id: &str, data: &Value) -> Result<Value, SdkError> {
        self.put(&format!("/api/webhooks/{id}"), data).await
    }

    pub async fn delete_webhook(&self, id: &str) -> Result<Value, SdkError> {
        self.delete(&format!("/api/webhooks/{id}")).await
    }

    pub async fn send_test_webhook(&self, id: &str, data: &Value) -> Result<Value, SdkError> {
        self.post(&format!("/api/webhooks/{id}/send"), data).await
    }

    // Reference data

    pub async fn exchange_rates(&self, query: &[(&str, &str)]) -> Result<Value, SdkError> {
        self.get("/api/exchange-rates", query).await
    }

    pub async fn list_currencies(&self) -> Result<Value, SdkError> {
        self.get("/api/lists/currencies", &[]).await
    }

    pub async fn list_chains(&self) -> Result<Value, SdkError> {
        self.get("/api/lists/chains", &[]).await
    }

    pub async fn list_countries(&self) -> Result<Value, SdkError> {
        self.get("/api/lists/countries", &[]).await
    }
}
