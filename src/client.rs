//! HTTP client for the finance backend REST API.
//!
//! The session travels as a `token` cookie, the same credential the web
//! application receives after the Google OAuth redirect.

use reqwest::header::{ACCEPT, COOKIE, HeaderValue};
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::backend::Backend;
use crate::error::{FinanceError, Result};
use crate::models::{
    Account, AccountId, Category, CategoryId, CreateAccount, CreateCategory, CreateSubscription,
    CreateTransaction, Schema as _, Subscription, SubscriptionId, Transaction, TransactionId,
    UpdateAccount, UpdateCategory, UpdateSubscription, UpdateTransaction, User,
};

/// Name of the session cookie.
const SESSION_COOKIE: &str = "token";

/// Accounts collection path segment.
const ACCOUNTS: &str = "accounts";
/// Categories collection path segment.
const CATEGORIES: &str = "categories";
/// Transactions collection path segment.
const TRANSACTIONS: &str = "transactions";
/// Subscriptions collection path segment.
const SUBSCRIPTIONS: &str = "subscriptions";
/// Current-user path segment.
const ME: &str = "me";

/// Builder for constructing a [`FinanceClient`].
#[derive(Debug, Default)]
pub struct FinanceClientBuilder {
    /// Backend base URL (required).
    base_url: Option<String>,
    /// Session cookie value.
    session_token: Option<SecretString>,
}

impl FinanceClientBuilder {
    /// Sets the backend base URL, e.g. `http://localhost:3000/api`.
    #[inline]
    #[must_use]
    pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the session cookie value.
    #[inline]
    #[must_use]
    pub fn session_token<T: Into<String>>(mut self, token: T) -> Self {
        self.session_token = Some(SecretString::from(token.into()));
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`FinanceError::Configuration`] if the base URL is missing or
    /// cannot serve as a base for path segments.
    /// Returns [`FinanceError::Http`] if the HTTP client fails to build.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub fn build(self) -> Result<FinanceClient> {
        let raw = self
            .base_url
            .ok_or_else(|| FinanceError::Configuration("backend base URL is required".to_owned()))?;
        let base_url = Url::parse(&raw)
            .map_err(|err| FinanceError::Configuration(format!("invalid base URL \"{raw}\": {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(FinanceError::Configuration(format!(
                "base URL \"{raw}\" cannot have path segments"
            )));
        }
        tracing::debug!(base_url = %base_url, has_session = self.session_token.is_some(), "building client");
        let http = reqwest::Client::builder().build()?;

        Ok(FinanceClient {
            http,
            base_url,
            session_token: self.session_token,
        })
    }
}

/// Async client for the finance backend.
///
/// Cheap to clone: the underlying connection pool is shared.
/// Use [`FinanceClient::builder()`] to construct an instance.
#[derive(Debug, Clone)]
pub struct FinanceClient {
    /// Underlying HTTP client.
    http: reqwest::Client,
    /// API base URL.
    base_url: Url,
    /// Session cookie value, if signed in.
    session_token: Option<SecretString>,
}

impl FinanceClient {
    /// Creates a new builder for configuring the client.
    #[inline]
    #[must_use]
    pub const fn builder() -> FinanceClientBuilder {
        FinanceClientBuilder {
            base_url: None,
            session_token: None,
        }
    }

    /// Returns the backend base URL.
    #[inline]
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the browser redirect target that starts Google sign-in.
    ///
    /// # Errors
    ///
    /// Returns [`FinanceError::Configuration`] if the URL cannot be built.
    #[inline]
    pub fn google_sign_in_url(&self) -> Result<Url> {
        self.endpoint(&["auth", "google"])
    }

    /// Joins percent-encoded path segments onto the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                FinanceError::Configuration("base URL cannot have path segments".to_owned())
            })?;
            let _path = path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    /// Starts a request carrying the session cookie.
    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        tracing::trace!(method = %method, url = %url, "sending request");
        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(token) = self.session_token.as_ref() {
            let mut cookie =
                HeaderValue::from_str(&format!("{SESSION_COOKIE}={}", token.expose_secret()))
                    .map_err(|err| {
                        FinanceError::Configuration(format!("invalid session token: {err}"))
                    })?;
            cookie.set_sensitive(true);
            request = request.header(COOKIE, cookie);
        }
        Ok(request)
    }

    /// Sends a request and decodes the JSON body.
    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let body = send_request(request).await?;
        serde_json::from_str(&body).map_err(FinanceError::from)
    }

    /// `GET /<resource>`.
    #[tracing::instrument(skip_all, fields(resource = resource))]
    async fn list<T: DeserializeOwned>(&self, resource: &str) -> Result<Vec<T>> {
        tracing::debug!("listing");
        Self::send_json(self.request(Method::GET, &[resource])?).await
    }

    /// `POST /<resource>`.
    #[tracing::instrument(skip_all, fields(resource = resource))]
    async fn create<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        resource: &str,
        body: &B,
    ) -> Result<T> {
        tracing::debug!("creating");
        Self::send_json(self.request(Method::POST, &[resource])?.json(body)).await
    }

    /// `PUT /<resource>/<id>`.
    #[tracing::instrument(skip_all, fields(resource = resource, id = id))]
    async fn update<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        resource: &str,
        id: &str,
        body: &B,
    ) -> Result<T> {
        tracing::debug!("updating");
        Self::send_json(self.request(Method::PUT, &[resource, id])?.json(body)).await
    }

    /// `DELETE /<resource>/<id>`. The response body is ignored.
    #[tracing::instrument(skip_all, fields(resource = resource, id = id))]
    async fn remove(&self, resource: &str, id: &str) -> Result<()> {
        tracing::debug!("deleting");
        let _body = send_request(self.request(Method::DELETE, &[resource, id])?).await?;
        Ok(())
    }
}

/// Sends a request and returns the body of a successful response.
///
/// Non-2xx responses become [`FinanceError::Api`] carrying the body text.
pub(crate) async fn send_request(request: RequestBuilder) -> Result<String> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        let body = response.text().await?;
        tracing::trace!(status = status.as_u16(), bytes = body.len(), "received response");
        Ok(body)
    } else {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_owned());
        tracing::debug!(status = status.as_u16(), "request rejected");
        Err(FinanceError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl Backend for FinanceClient {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.list(ACCOUNTS).await
    }

    async fn create_account(&self, create: &CreateAccount) -> Result<Account> {
        self.create(ACCOUNTS, create).await
    }

    async fn update_account(&self, id: &AccountId, update: &UpdateAccount) -> Result<Account> {
        self.update(ACCOUNTS, id.as_inner(), update).await
    }

    async fn delete_account(&self, id: &AccountId) -> Result<()> {
        self.remove(ACCOUNTS, id.as_inner()).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.list(CATEGORIES).await
    }

    async fn create_category(&self, create: &CreateCategory) -> Result<Category> {
        self.create(CATEGORIES, create).await
    }

    async fn update_category(&self, id: &CategoryId, update: &UpdateCategory) -> Result<Category> {
        self.update(CATEGORIES, id.as_inner(), update).await
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<()> {
        self.remove(CATEGORIES, id.as_inner()).await
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        self.list(TRANSACTIONS).await
    }

    async fn create_transaction(&self, create: &CreateTransaction) -> Result<Transaction> {
        self.create(TRANSACTIONS, create).await
    }

    async fn update_transaction(
        &self,
        id: &TransactionId,
        update: &UpdateTransaction,
    ) -> Result<Transaction> {
        self.update(TRANSACTIONS, id.as_inner(), update).await
    }

    async fn delete_transaction(&self, id: &TransactionId) -> Result<()> {
        self.remove(TRANSACTIONS, id.as_inner()).await
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        self.list(SUBSCRIPTIONS).await
    }

    async fn create_subscription(&self, create: &CreateSubscription) -> Result<Subscription> {
        self.create(SUBSCRIPTIONS, create).await
    }

    async fn update_subscription(
        &self,
        id: &SubscriptionId,
        update: &UpdateSubscription,
    ) -> Result<Subscription> {
        self.update(SUBSCRIPTIONS, id.as_inner(), update).await
    }

    async fn delete_subscription(&self, id: &SubscriptionId) -> Result<()> {
        self.remove(SUBSCRIPTIONS, id.as_inner()).await
    }

    #[tracing::instrument(skip_all)]
    async fn current_user(&self) -> Result<User> {
        tracing::debug!("fetching current user");
        let body = send_request(self.request(Method::GET, &[ME])?).await?;
        User::parse_str(&body)
    }

    fn has_session(&self) -> bool {
        self.session_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountType, PaymentMethod, TransactionType};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> FinanceClient {
        FinanceClient::builder()
            .base_url(format!("{}/api", server.uri()))
            .session_token("secret-session")
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_base_url() {
        let err = FinanceClient::builder().build().unwrap_err();
        assert!(matches!(err, FinanceError::Configuration(_)));
    }

    #[test]
    fn builder_rejects_unparseable_url() {
        let err = FinanceClient::builder()
            .base_url("not a url")
            .build()
            .unwrap_err();
        assert!(matches!(err, FinanceError::Configuration(_)));
    }

    #[test]
    fn session_presence() {
        let anonymous = FinanceClient::builder()
            .base_url("http://localhost:3000")
            .build()
            .unwrap();
        assert!(!anonymous.has_session());
        let signed_in = FinanceClient::builder()
            .base_url("http://localhost:3000")
            .session_token("abc")
            .build()
            .unwrap();
        assert!(signed_in.has_session());
    }

    #[test]
    fn debug_output_hides_session_token() {
        let client = FinanceClient::builder()
            .base_url("http://localhost:3000")
            .session_token("super-secret-value")
            .build()
            .unwrap();
        assert!(!format!("{client:?}").contains("super-secret-value"));
    }

    #[test]
    fn google_sign_in_url_appends_path() {
        let client = FinanceClient::builder()
            .base_url("http://localhost:3000/api/")
            .build()
            .unwrap();
        assert_eq!(
            client.google_sign_in_url().unwrap().as_str(),
            "http://localhost:3000/api/auth/google"
        );
    }

    #[tokio::test]
    async fn list_accounts_sends_session_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/accounts"))
            .and(header("cookie", "token=secret-session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "a1", "name": "Checking", "type": "CHECKING", "color": "#0088FE"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let accounts = client(&server).list_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].kind, AccountType::Checking);
    }

    #[tokio::test]
    async fn create_transaction_posts_camel_case_body() {
        let server = MockServer::start().await;
        let create = CreateTransaction {
            name: "Coffee".to_owned(),
            details: None,
            date: "2024-01-15".to_owned(),
            kind: TransactionType::Expense,
            amount: 4.5,
            category_id: CategoryId::from("c1"),
            account_id: AccountId::from("a1"),
            payment_method: PaymentMethod::Cash,
        };
        Mock::given(method("POST"))
            .and(path("/api/transactions"))
            .and(body_json(json!({
                "name": "Coffee",
                "date": "2024-01-15",
                "type": "EXPENSE",
                "amount": 4.5,
                "categoryId": "c1",
                "accountId": "a1",
                "paymentMethod": "CASH"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "t1",
                "name": "Coffee",
                "date": "2024-01-15",
                "type": "EXPENSE",
                "amount": 4.5,
                "categoryId": "c1",
                "accountId": "a1",
                "paymentMethod": "CASH"
            })))
            .mount(&server)
            .await;

        let created = client(&server).create_transaction(&create).await.unwrap();
        assert_eq!(created.id, TransactionId::from("t1"));
    }

    #[tokio::test]
    async fn update_encodes_id_segment() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/categories/food%2Fdrink"))
            .and(body_json(json!({"name": "Food"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "food/drink", "name": "Food", "type": "EXPENSE", "color": "#00C49F"
            })))
            .mount(&server)
            .await;

        let update = UpdateCategory {
            name: Some("Food".to_owned()),
            ..UpdateCategory::default()
        };
        let category = client(&server)
            .update_category(&CategoryId::from("food/drink"), &update)
            .await
            .unwrap();
        assert_eq!(category.name, "Food");
    }

    #[tokio::test]
    async fn delete_ignores_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/accounts/a1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .delete_account(&AccountId::from("a1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_status_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/categories"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = client(&server).list_categories().await.unwrap_err();
        match err {
            FinanceError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Unauthorized");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn current_user_is_schema_validated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u1", "email": "not-an-email", "name": "Jane"
            })))
            .mount(&server)
            .await;

        let err = client(&server).current_user().await.unwrap_err();
        match err {
            FinanceError::Validation(errors) => assert!(errors.has_field("email")),
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn current_user_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u1", "email": "jane@example.com", "name": "Jane"
            })))
            .mount(&server)
            .await;

        let user = client(&server).current_user().await.unwrap();
        assert_eq!(user.email, "jane@example.com");
        assert!(user.avatar.is_none());
    }
}
