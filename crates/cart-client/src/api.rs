//! Transport seam between the controller and the cart API.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use emporium_core::api::{AddItemRequest, CreateOrderRequest, ErrorBody, UpdateQuantityRequest};
use emporium_core::{Cart, CartMutation, Order};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Requests the controller issues. Every call receives a cancellation token
/// and must stop promptly once it fires.
#[async_trait]
pub trait CartApi: Send + Sync {
    /// `GET /cart`
    async fn fetch_cart(
        &self,
        token: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<Cart, ClientError>;

    /// One of the cart write endpoints, chosen by the mutation.
    async fn mutate_cart(
        &self,
        token: &SecretString,
        mutation: &CartMutation,
        cancel: &CancellationToken,
    ) -> Result<Cart, ClientError>;

    /// `POST /orders/create`
    async fn create_order(
        &self,
        token: &SecretString,
        request: &CreateOrderRequest,
        cancel: &CancellationToken,
    ) -> Result<Order, ClientError>;

    /// `GET /orders`
    async fn list_orders(
        &self,
        token: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<Vec<Order>, ClientError>;
}

/// [`CartApi`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpCartApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCartApi {
    /// Create a client for the configured base URL.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config.api_url.clone())
    }

    /// Create a client with a preconfigured `reqwest::Client`.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        token: &SecretString,
    ) -> Result<RequestBuilder, ClientError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ClientError::Transport(format!("invalid url {path}: {e}")))?;

        Ok(self
            .client
            .request(method, url)
            .bearer_auth(token.expose_secret()))
    }

    /// Send and decode, aborting the in-flight request if `cancel` fires.
    async fn send<T: DeserializeOwned>(
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<T, ClientError> {
        tokio::select! {
            () = cancel.cancelled() => Err(ClientError::Cancelled),
            result = Self::execute(request) => result,
        }
    }

    async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .map(|body| body.message)
                .filter(|message| !message.is_empty());
            tracing::debug!(status = status.as_u16(), ?message, "cart API error");
            return Err(ClientError::from_status(status.as_u16(), message));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl CartApi for HttpCartApi {
    async fn fetch_cart(
        &self,
        token: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<Cart, ClientError> {
        Self::send(self.request(Method::GET, "cart", token)?, cancel).await
    }

    async fn mutate_cart(
        &self,
        token: &SecretString,
        mutation: &CartMutation,
        cancel: &CancellationToken,
    ) -> Result<Cart, ClientError> {
        let request = match mutation {
            CartMutation::Add { product, quantity } => self
                .request(Method::POST, "cart/add", token)?
                .json(&AddItemRequest::new(product, *quantity)),
            CartMutation::SetQuantity {
                product_id,
                quantity,
            } => self
                .request(Method::PUT, &format!("cart/update/{product_id}"), token)?
                .json(&UpdateQuantityRequest {
                    quantity: *quantity,
                }),
            CartMutation::Remove { product_id } => {
                self.request(Method::DELETE, &format!("cart/remove/{product_id}"), token)?
            }
            CartMutation::Clear => self.request(Method::DELETE, "cart/clear", token)?,
        };

        Self::send(request, cancel).await
    }

    async fn create_order(
        &self,
        token: &SecretString,
        request: &CreateOrderRequest,
        cancel: &CancellationToken,
    ) -> Result<Order, ClientError> {
        let request = self
            .request(Method::POST, "orders/create", token)?
            .json(request);
        Self::send(request, cancel).await
    }

    async fn list_orders(
        &self,
        token: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<Vec<Order>, ClientError> {
        Self::send(self.request(Method::GET, "orders", token)?, cancel).await
    }
}
