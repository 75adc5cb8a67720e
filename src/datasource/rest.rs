use async_trait::async_trait;
use reqwest::{Method, Response, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::DataSource;
use crate::errors::ServiceError;
use crate::models::{
    Component, Delivery, Document, Eco, Machine, MachineStatus, PartReadiness, ProductionEvent,
    ShippingOrder, ShippingStatus, UserProfile, WorkOrder,
};

/// JSON client for the live shop-floor backend.
///
/// Collections live at `{base_url}/<resource>`; single records at
/// `{base_url}/<resource>/{id}`.
#[derive(Clone)]
pub struct RestDataSource {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct StatusPatch<S: Serialize> {
    status: S,
}

impl RestDataSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `{base_url}/<resource>[/<id>]`, with the id encoded as one path segment.
    fn resource_url(&self, resource: &str, id: Option<&str>) -> Result<Url, ServiceError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ServiceError::InternalError(format!("invalid backend URL {}: {}", self.base_url, e))
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ServiceError::InternalError(format!(
                    "backend URL {} cannot carry a path",
                    self.base_url
                ))
            })?;
            segments.pop_if_empty().push(resource);
            if let Some(id) = id {
                segments.push(checked_id(id)?);
            }
        }
        Ok(url)
    }

    async fn check(response: Response, method: &Method, path: &str) -> Result<Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::ExternalServiceError(format!(
            "{} {} returned {}: {}",
            method,
            path,
            status,
            body.chars().take(200).collect::<String>()
        )))
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let response = self.client.get(self.url(path)).send().await?;
        let response = Self::check(response, &Method::GET, path).await?;
        let parsed = response.json::<T>().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("GET {} returned malformed JSON: {}", path, e))
        })?;
        debug!(path, "fetched");
        Ok(parsed)
    }

    #[instrument(skip(self, body), fields(base_url = %self.base_url))]
    async fn send<B, T>(
        &self,
        method: Method,
        resource: &str,
        id: Option<&str>,
        body: &B,
    ) -> Result<T, ServiceError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.resource_url(resource, id)?;
        let path = url.path().to_string();
        let response = self
            .client
            .request(method.clone(), url)
            .json(body)
            .send()
            .await?;
        let response = Self::check(response, &method, &path).await?;
        response.json::<T>().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!(
                "{} {} returned malformed JSON: {}",
                method, path, e
            ))
        })
    }
}

#[async_trait]
impl DataSource for RestDataSource {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn machines(&self) -> Result<Vec<Machine>, ServiceError> {
        self.get("machines").await
    }

    async fn work_orders(&self) -> Result<Vec<WorkOrder>, ServiceError> {
        self.get("work-orders").await
    }

    async fn ecos(&self) -> Result<Vec<Eco>, ServiceError> {
        self.get("ecos").await
    }

    async fn documents(&self) -> Result<Vec<Document>, ServiceError> {
        self.get("documents").await
    }

    async fn components(&self) -> Result<Vec<Component>, ServiceError> {
        self.get("components").await
    }

    async fn shipping_orders(&self) -> Result<Vec<ShippingOrder>, ServiceError> {
        self.get("shipping-orders").await
    }

    async fn deliveries(&self) -> Result<Vec<Delivery>, ServiceError> {
        self.get("deliveries").await
    }

    async fn part_readiness(&self) -> Result<Vec<PartReadiness>, ServiceError> {
        self.get("part-readiness").await
    }

    async fn users(&self) -> Result<Vec<UserProfile>, ServiceError> {
        self.get("users").await
    }

    async fn production_events(&self) -> Result<Vec<ProductionEvent>, ServiceError> {
        self.get("production-events").await
    }

    async fn create_work_order(&self, order: WorkOrder) -> Result<WorkOrder, ServiceError> {
        self.send(Method::POST, "work-orders", None, &order).await
    }

    async fn update_work_order(&self, order: WorkOrder) -> Result<WorkOrder, ServiceError> {
        let id = order.id.clone();
        self.send(Method::PATCH, "work-orders", Some(&id), &order)
            .await
    }

    async fn set_machine_status(
        &self,
        id: &str,
        status: MachineStatus,
    ) -> Result<Machine, ServiceError> {
        self.send(Method::PATCH, "machines", Some(id), &StatusPatch { status })
            .await
    }

    async fn create_eco(&self, eco: Eco) -> Result<Eco, ServiceError> {
        self.send(Method::POST, "ecos", None, &eco).await
    }

    async fn update_eco(&self, eco: Eco) -> Result<Eco, ServiceError> {
        let id = eco.id.clone();
        self.send(Method::PATCH, "ecos", Some(&id), &eco).await
    }

    async fn update_shipping_status(
        &self,
        id: &str,
        status: ShippingStatus,
    ) -> Result<ShippingOrder, ServiceError> {
        self.send(
            Method::PATCH,
            "shipping-orders",
            Some(id),
            &StatusPatch { status },
        )
        .await
    }
}

// Record ids address a single resource; anything that could move the URL
// elsewhere on the backend is refused.
fn checked_id(id: &str) -> Result<&str, ServiceError> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(ServiceError::ValidationError(format!(
            "invalid record id: {:?}",
            id
        )));
    }
    Ok(id)
}
