//! Implements the `Repository` trait against the remote HTTP/JSON API.

use crate::api::Repository;
use crate::error::RepositoryError;
use crate::model::{NewTransaction, Summary, Transaction, TransactionId, UserId};
use crate::Result;
use anyhow::Context;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::trace;
use url::Url;

const FETCH_TRANSACTIONS_FAILED: &str = "Failed to fetch transactions";
const FETCH_SUMMARY_FAILED: &str = "Failed to fetch summary";
const CREATE_FAILED: &str = "Failed to create transaction";
const DELETE_FAILED: &str = "Failed to delete transaction";

/// Talks to the transaction API rooted at `base_url`, e.g. `http://192.168.1.8:3000/api`.
#[derive(Debug, Clone)]
pub struct HttpRepository {
    base_url: Url,
    http: reqwest::Client,
}

/// The body of a non-2xx response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl HttpRepository {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self> {
        let mut base_url = base_url.clone();
        // Without a trailing slash `Url::join` would replace the last path segment.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Unable to build the HTTP client")?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, RepositoryError> {
        self.base_url
            .join(path)
            .map_err(|e| RepositoryError::new(format!("Invalid API URL: {e}")))
    }

    fn user_endpoint(
        &self,
        path: &str,
        user_id: &UserId,
    ) -> std::result::Result<Url, RepositoryError> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut().append_pair("userId", user_id.as_str());
        Ok(url)
    }

    async fn get_json<T>(&self, url: Url, failure: &str) -> std::result::Result<T, RepositoryError>
    where
        T: DeserializeOwned,
    {
        trace!("GET {url}");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(failure, e))?;
        read_json(response, failure).await
    }
}

#[async_trait::async_trait]
impl Repository for HttpRepository {
    async fn fetch_transactions(
        &self,
        user_id: &UserId,
    ) -> std::result::Result<Vec<Transaction>, RepositoryError> {
        let url = self.user_endpoint("transactions", user_id)?;
        self.get_json(url, FETCH_TRANSACTIONS_FAILED).await
    }

    async fn fetch_summary(
        &self,
        user_id: &UserId,
    ) -> std::result::Result<Summary, RepositoryError> {
        let url = self.user_endpoint("transactions/summary", user_id)?;
        let summary: Summary = self.get_json(url, FETCH_SUMMARY_FAILED).await?;
        Ok(summary.normalized())
    }

    async fn create_transaction(
        &self,
        request: &NewTransaction,
    ) -> std::result::Result<Transaction, RepositoryError> {
        let url = self.endpoint("transactions")?;
        trace!("POST {url}");
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(CREATE_FAILED, e))?;
        read_json(response, CREATE_FAILED).await
    }

    async fn delete_transaction(
        &self,
        id: &TransactionId,
    ) -> std::result::Result<(), RepositoryError> {
        let mut url = self.endpoint("transactions")?;
        url.path_segments_mut()
            .map_err(|_| RepositoryError::new("Invalid API URL: cannot be a base"))?
            .push(id.as_str());
        trace!("DELETE {url}");
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| transport_error(DELETE_FAILED, e))?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(status_error(response, DELETE_FAILED).await)
    }
}

fn transport_error(failure: &str, e: reqwest::Error) -> RepositoryError {
    RepositoryError::new(format!("{failure}: {e}"))
}

/// Decodes a successful response body as `T`, or turns a non-2xx response into an error.
async fn read_json<T>(response: Response, failure: &str) -> std::result::Result<T, RepositoryError>
where
    T: DeserializeOwned,
{
    if !response.status().is_success() {
        return Err(status_error(response, failure).await);
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| transport_error(failure, e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| RepositoryError::new(format!("{failure}: malformed response: {e}")))
}

/// Surfaces the server's `message` verbatim when it sent one, otherwise a generic message that
/// names the HTTP status.
async fn status_error(response: Response, failure: &str) -> RepositoryError {
    let status: StatusCode = response.status();
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .filter(|m| !m.trim().is_empty());
    match message {
        Some(message) => RepositoryError::new(message),
        None => RepositoryError::new(format!("{failure} (HTTP {status})")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, Category, TransactionDraft, TransactionType};
    use http_body_util::{BodyExt, Full};
    use hyper::body::{Bytes, Incoming};
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Method, Request, Response as HyperResponse};
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::str::FromStr;
    use tokio::net::TcpListener;

    type Route = fn(&Method, &str, &str) -> (u16, String);

    /// Serves `route` on an ephemeral local port and returns the API base URL.
    async fn serve(route: Route) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| async move {
                        let method = req.method().clone();
                        let uri = req.uri().to_string();
                        let body = req.into_body().collect().await.unwrap().to_bytes();
                        let (status, payload) =
                            route(&method, &uri, &String::from_utf8_lossy(&body));
                        let response = HyperResponse::builder()
                            .status(status)
                            .header("content-type", "application/json")
                            .body(Full::new(Bytes::from(payload)))
                            .unwrap();
                        Ok::<_, Infallible>(response)
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });
        Url::parse(&format!("http://{addr}/api")).unwrap()
    }

    fn repo(url: &Url) -> HttpRepository {
        HttpRepository::new(url, Duration::from_secs(5)).unwrap()
    }

    const ROWS: &str = r#"[
        {"id": 2, "user_id": "u1", "title": "Salary", "amount": "5000.00",
         "category": "Income", "created_at": "2025-07-02T08:00:00Z"},
        {"id": 1, "user_id": "u1", "title": "Coffee", "amount": -50,
         "category": "Food & Drinks", "created_at": "2025-07-01T08:00:00Z"}
    ]"#;

    #[test]
    fn test_base_url_keeps_api_prefix() {
        let r = repo(&Url::parse("http://example.com/api").unwrap());
        assert_eq!(
            r.endpoint("transactions").unwrap().as_str(),
            "http://example.com/api/transactions"
        );
    }

    #[tokio::test]
    async fn test_fetch_transactions() {
        let url = serve(|method, uri, _| match (method, uri) {
            (&Method::GET, "/api/transactions?userId=u1") => (200, ROWS.to_string()),
            _ => (404, r#"{"message":"no route"}"#.to_string()),
        })
        .await;
        let transactions = repo(&url)
            .fetch_transactions(&UserId::from("u1"))
            .await
            .unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].title(), "Salary");
        assert_eq!(transactions[1].amount(), Amount::from(-50));
    }

    #[tokio::test]
    async fn test_fetch_summary_normalizes_expenses() {
        let url = serve(|method, uri, _| match (method, uri) {
            (&Method::GET, "/api/transactions/summary?userId=u1") => (
                200,
                r#"{"income":"5000.00","expenses":"50.00","balance":"4950.00"}"#.to_string(),
            ),
            _ => (404, String::new()),
        })
        .await;
        let summary = repo(&url).fetch_summary(&UserId::from("u1")).await.unwrap();
        assert_eq!(summary.income(), Amount::from(5000));
        assert_eq!(summary.expenses(), Amount::from(-50));
        assert_eq!(summary.balance(), Amount::from(4950));
    }

    #[tokio::test]
    async fn test_create_sends_signed_amount() {
        let url = serve(|method, uri, body| match (method, uri) {
            (&Method::POST, "/api/transactions") => {
                let body: serde_json::Value = serde_json::from_str(body).unwrap();
                if body["amount"] != serde_json::json!(-12.5) || body["user_id"] != "u1" {
                    return (400, r#"{"message":"bad body"}"#.to_string());
                }
                (
                    201,
                    r#"{"id": 7, "user_id": "u1", "title": "Lunch", "amount": "-12.50",
                        "category": "Food & Drinks", "created_at": "2025-07-03T12:00:00Z"}"#
                        .to_string(),
                )
            }
            _ => (404, String::new()),
        })
        .await;
        let request = TransactionDraft::new(
            "Lunch",
            "12.50",
            TransactionType::Expense,
            Some(Category::FoodAndDrinks),
        )
        .validate(&UserId::from("u1"))
        .unwrap();
        let created = repo(&url).create_transaction(&request).await.unwrap();
        assert_eq!(created.id().as_str(), "7");
        assert_eq!(created.amount(), Amount::from_str("-12.50").unwrap());
    }

    #[tokio::test]
    async fn test_delete_success_without_body() {
        let url = serve(|method, uri, _| match (method, uri) {
            (&Method::DELETE, "/api/transactions/42") => (204, String::new()),
            _ => (404, String::new()),
        })
        .await;
        repo(&url)
            .delete_transaction(&TransactionId::from(42))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_server_message_is_passed_through() {
        let url =
            serve(|_, _, _| (404, r#"{"message":"Transaction not found"}"#.to_string())).await;
        let err = repo(&url)
            .delete_transaction(&TransactionId::from(999))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Transaction not found");
    }

    #[tokio::test]
    async fn test_generic_message_without_server_message() {
        let url = serve(|_, _, _| (500, "oops".to_string())).await;
        let err = repo(&url)
            .fetch_transactions(&UserId::from("u1"))
            .await
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Failed to fetch transactions (HTTP 500 Internal Server Error)"
        );
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let url = serve(|_, _, _| (200, "{\"not\": \"a list\"}".to_string())).await;
        let err = repo(&url)
            .fetch_transactions(&UserId::from("u1"))
            .await
            .unwrap_err();
        assert!(err.message().starts_with("Failed to fetch transactions: malformed response"));
    }

    #[tokio::test]
    async fn test_network_failure() {
        // Bind and immediately drop a listener so that nothing is accepting on the port.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = Url::parse(&format!("http://{addr}/api")).unwrap();
        let err = repo(&url)
            .fetch_summary(&UserId::from("u1"))
            .await
            .unwrap_err();
        assert!(err.message().starts_with("Failed to fetch summary: "));
    }
}
