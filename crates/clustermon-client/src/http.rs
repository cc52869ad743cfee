use async_trait::async_trait;
use clustermon_core::{
    ClusterAdmin, ClusterConfig, ClusterConfigPatch, ClusterError, Location, MonitorSettings,
    Node, NodeOutcomes, Result, StatusFetcher,
};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

const NODE_STATUS_PATH: &str = "rest/cluster/node/status";
const CLUSTER_STATUS_PATH: &str = "rest/cluster/group/status";
const CLUSTER_CONFIG_PATH: &str = "rest/cluster/config";
const CLUSTER_NODES_PATH: &str = "rest/cluster/config/node";
const LOCATIONS_PATH: &str = "rest/locations";

#[derive(Debug, Serialize)]
struct NodesRequest<'a> {
    nodes: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceNodesRequest<'a> {
    add_nodes: &'a [String],
    remove_nodes: &'a [String],
}

/// Cluster management client speaking to one node's workbench REST API.
pub struct HttpClusterClient {
    client: Client,
    base: Url,
    authorization: Option<SecretString>,
}

impl HttpClusterClient {
    pub fn new(settings: &MonitorSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| ClusterError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base: settings.base_url()?,
            authorization: settings.authorization.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self
            .base
            .join(path)
            .map_err(|e| ClusterError::Config(format!("invalid request path {path}: {e}")))?;
        let mut builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(authorization) = &self.authorization {
            builder = builder.header(AUTHORIZATION, authorization.expose_secret());
        }
        Ok(builder)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| ClusterError::Transport(e.to_string()))?;

        let status = response.status();
        let url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| ClusterError::Transport(e.to_string()))?;
        trace!("{} -> HTTP {} ({} bytes)", url, status, body.len());

        if !status.is_success() {
            debug!("cluster request to {} failed with HTTP {}", url, status);
            return Err(ClusterError::from_http(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request(Method::GET, path)?).await
    }
}

#[async_trait]
impl StatusFetcher for HttpClusterClient {
    async fn fetch_node_status(&self) -> Result<Node> {
        self.get(NODE_STATUS_PATH).await
    }

    async fn fetch_cluster_config(&self) -> Result<ClusterConfig> {
        self.get(CLUSTER_CONFIG_PATH).await
    }

    async fn fetch_cluster_status(&self) -> Result<Vec<Node>> {
        self.get(CLUSTER_STATUS_PATH).await
    }

    async fn fetch_locations(&self) -> Result<Vec<Location>> {
        self.get(LOCATIONS_PATH).await
    }
}

#[async_trait]
impl ClusterAdmin for HttpClusterClient {
    async fn create_cluster(&self, config: &ClusterConfig) -> Result<ClusterConfig> {
        let request = self.request(Method::POST, CLUSTER_CONFIG_PATH)?.json(config);
        self.send(request).await
    }

    async fn update_cluster_config(&self, patch: &ClusterConfigPatch) -> Result<ClusterConfig> {
        let request = self.request(Method::PATCH, CLUSTER_CONFIG_PATH)?.json(patch);
        self.send(request).await
    }

    async fn delete_cluster(&self, force: bool) -> Result<NodeOutcomes> {
        let request = self
            .request(Method::DELETE, CLUSTER_CONFIG_PATH)?
            .query(&[("force", force)]);
        self.send(request).await
    }

    async fn add_nodes(&self, nodes: &[String]) -> Result<NodeOutcomes> {
        let request = self
            .request(Method::POST, CLUSTER_NODES_PATH)?
            .json(&NodesRequest { nodes });
        self.send(request).await
    }

    async fn remove_nodes(&self, nodes: &[String]) -> Result<NodeOutcomes> {
        let request = self
            .request(Method::DELETE, CLUSTER_NODES_PATH)?
            .json(&NodesRequest { nodes });
        self.send(request).await
    }

    async fn replace_nodes(&self, add: &[String], remove: &[String]) -> Result<NodeOutcomes> {
        let request = self
            .request(Method::PATCH, CLUSTER_NODES_PATH)?
            .json(&ReplaceNodesRequest {
                add_nodes: add,
                remove_nodes: remove,
            });
        self.send(request).await
    }
}
