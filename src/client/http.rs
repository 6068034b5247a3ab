use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use super::dto::{
    ApiEnvelope, DocumentSummaryDto, GinDto, GinRequest, GrnDto, GrnRequest, PurchaseOrderDto,
    SalesOrderDto,
};
use super::OrderManagementApi;
use crate::config::AppConfig;
use crate::errors::{ErrorResponse, ServiceError};
use crate::models::{
    ExistingDocument, FulfillmentKind, ParentOrder, StockRecord, SubmissionRequest,
    SubmittedDocument,
};

const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// How a failed call is reported.
#[derive(Debug, Clone, Copy)]
enum CallKind {
    Read,
    Write,
}

/// `reqwest` implementation of [`OrderManagementApi`].
#[derive(Clone)]
pub struct HttpOrderManagementClient {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpOrderManagementClient {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let mut parsed = Url::parse(base_url).map_err(|e| {
            ServiceError::InvalidOperation(format!("Invalid API base URL '{}': {}", base_url, e))
        })?;
        // Url::join drops the last path segment unless it ends with a slash
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: parsed,
            api_token: api_token.filter(|token| !token.trim().is_empty()),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(
            &config.api_base_url,
            config.api_token.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ServiceError> {
        let url = self.base_url.join(path).map_err(|e| {
            ServiceError::InternalError(format!("Cannot build URL for '{}': {}", path, e))
        })?;

        let mut builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        fallback: &str,
    ) -> Result<Option<T>, ServiceError> {
        let builder = self.request(Method::GET, path)?;
        self.execute(builder, CallKind::Read, fallback).await
    }

    async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<Option<T>, ServiceError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(method, path)?.json(body);
        self.execute(builder, CallKind::Write, fallback).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        call: CallKind,
        fallback: &str,
    ) -> Result<Option<T>, ServiceError> {
        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "order-management request failed");
            match call {
                CallKind::Read => ServiceError::HttpError(e),
                CallKind::Write => ServiceError::Submission(fallback.to_string()),
            }
        })?;

        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "order-management response");

        if !status.is_success() {
            let message = ErrorResponse::message_from_body(&body)
                .unwrap_or_else(|| fallback.to_string());
            warn!(status = status.as_u16(), %message, "order-management call rejected");
            return Err(failure(call, status, message));
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body)?;
        if envelope.success == Some(false) {
            let message = envelope
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string());
            return Err(failure(call, status, message));
        }

        Ok(envelope.data)
    }
}

fn required<T>(data: Option<T>, fallback: &str) -> Result<T, ServiceError> {
    data.ok_or_else(|| ServiceError::ExternalApiError(format!("{}: empty response", fallback)))
}

fn failure(call: CallKind, status: StatusCode, message: String) -> ServiceError {
    match call {
        CallKind::Write => ServiceError::Submission(message),
        CallKind::Read if status == StatusCode::NOT_FOUND => ServiceError::NotFound(message),
        CallKind::Read if status == StatusCode::UNAUTHORIZED => ServiceError::Unauthorized(message),
        CallKind::Read => ServiceError::ExternalApiError(message),
    }
}

#[async_trait]
impl OrderManagementApi for HttpOrderManagementClient {
    #[instrument(skip(self))]
    async fn fetch_stock_snapshot(&self) -> Result<Vec<StockRecord>, ServiceError> {
        let records: Option<Vec<StockRecord>> = self.get("stocks", "Failed to load stock").await?;
        Ok(records.unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn fetch_parent_order(
        &self,
        kind: FulfillmentKind,
        order_id: i64,
    ) -> Result<ParentOrder, ServiceError> {
        match kind {
            FulfillmentKind::Issue => {
                let fallback = "Failed to load SO details";
                let dto: Option<SalesOrderDto> = self
                    .get(&format!("sales-orders/{}", order_id), fallback)
                    .await?;
                ParentOrder::try_from(required(dto, fallback)?)
            }
            FulfillmentKind::Receipt => {
                let fallback = "Failed to load PO details";
                let dto: Option<PurchaseOrderDto> = self
                    .get(&format!("purchase-orders/{}", order_id), fallback)
                    .await?;
                ParentOrder::try_from(required(dto, fallback)?)
            }
        }
    }

    #[instrument(skip(self))]
    async fn fetch_document(
        &self,
        kind: FulfillmentKind,
        document_id: i64,
    ) -> Result<ExistingDocument, ServiceError> {
        match kind {
            FulfillmentKind::Issue => {
                let fallback = "Failed to load GIN";
                let dto: Option<GinDto> =
                    self.get(&format!("gins/{}", document_id), fallback).await?;
                Ok(required(dto, fallback)?.into())
            }
            FulfillmentKind::Receipt => {
                let fallback = "Failed to load GRN";
                let dto: Option<GrnDto> =
                    self.get(&format!("grns/{}", document_id), fallback).await?;
                Ok(required(dto, fallback)?.into())
            }
        }
    }

    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    async fn create_document(
        &self,
        kind: FulfillmentKind,
        parent_order_id: i64,
        request: SubmissionRequest,
    ) -> Result<SubmittedDocument, ServiceError> {
        let summary: Option<DocumentSummaryDto> = match kind {
            FulfillmentKind::Issue => {
                self.send(
                    Method::POST,
                    &format!("gins/so/{}", parent_order_id),
                    &GinRequest::from(request),
                    "Failed to create GIN",
                )
                .await?
            }
            FulfillmentKind::Receipt => {
                self.send(
                    Method::POST,
                    &format!("grns/po/{}", parent_order_id),
                    &GrnRequest::from(request),
                    "Failed to create GRN",
                )
                .await?
            }
        };
        Ok(summary.unwrap_or_default().into())
    }

    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    async fn update_document(
        &self,
        kind: FulfillmentKind,
        document_id: i64,
        request: SubmissionRequest,
    ) -> Result<SubmittedDocument, ServiceError> {
        let summary: Option<DocumentSummaryDto> = match kind {
            FulfillmentKind::Issue => {
                self.send(
                    Method::PUT,
                    &format!("gins/{}", document_id),
                    &GinRequest::from(request),
                    "Failed to update GIN",
                )
                .await?
            }
            FulfillmentKind::Receipt => {
                self.send(
                    Method::PUT,
                    &format!("grns/{}", document_id),
                    &GrnRequest::from(request),
                    "Failed to update GRN",
                )
                .await?
            }
        };
        Ok(summary.unwrap_or_default().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = HttpOrderManagementClient::new(
            "http://localhost:8080/api",
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8080/api/");
        assert_eq!(
            client.base_url().join("gins/so/4").unwrap().as_str(),
            "http://localhost:8080/api/gins/so/4"
        );
    }

    #[test]
    fn rejects_malformed_base_url() {
        let err = HttpOrderManagementClient::new("not a url", None, Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::InvalidOperation(_)));
    }

    #[test]
    fn read_failures_map_by_status() {
        assert!(matches!(
            failure(CallKind::Read, StatusCode::NOT_FOUND, "gone".into()),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            failure(CallKind::Read, StatusCode::BAD_GATEWAY, "down".into()),
            ServiceError::ExternalApiError(_)
        ));
        assert!(matches!(
            failure(CallKind::Write, StatusCode::NOT_FOUND, "gone".into()),
            ServiceError::Submission(_)
        ));
    }
}
