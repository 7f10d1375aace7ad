//! Product and collection lookups against the admin GraphQL API.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::SettingsError;

const PRODUCTS_QUERY: &str = r"
query GetProducts($ids: [ID!]!) {
  products: nodes(ids: $ids) {
    ... on Product {
      id
      title
    }
  }
}";

const COLLECTION_PRODUCTS_QUERY: &str = r"
query GetCollectionsProducts($ids: [ID!]!) {
  nodes(ids: $ids) {
    ... on Collection {
      id
      title
      products(first: 250) {
        nodes {
          id
          title
        }
      }
    }
  }
}";

/// Runs GraphQL queries against the admin API on behalf of the settings form.
pub trait AdminQuery {
    /// Error raised by the transport.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs `query` with `variables` and returns the raw response body.
    fn query(&self, query: &str, variables: Value) -> Result<Value, Self::Error>;
}

/// A product or collection shown in the settings form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,

    #[serde(default)]
    pub title: String,
}

impl ResourceRef {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    /// Numeric tail of the global id, e.g. `42` for `gid://shopify/Product/42`.
    pub fn legacy_id(&self) -> &str {
        self.id.rsplit('/').next().unwrap_or(&self.id)
    }

    /// Admin link to the product page.
    pub fn admin_url(&self) -> String {
        format!("shopify://admin/products/{}", self.legacy_id())
    }
}

#[derive(Deserialize)]
struct Response<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct ProductsData {
    #[serde(default)]
    products: Vec<Option<Node>>,
}

#[derive(Deserialize)]
struct CollectionsData {
    #[serde(default)]
    nodes: Vec<Option<CollectionNode>>,
}

#[derive(Deserialize)]
struct CollectionNode {
    products: Option<Connection>,
}

#[derive(Deserialize)]
struct Connection {
    #[serde(default)]
    nodes: Vec<Option<Node>>,
}

/// Nodes that are not of the fragment's type come back as `{}`.
#[derive(Deserialize)]
struct Node {
    id: Option<String>,

    #[serde(default)]
    title: String,
}

impl Node {
    fn into_resource(self) -> Option<ResourceRef> {
        let title = self.title;
        self.id.map(|id| ResourceRef { id, title })
    }
}

fn run<A, T>(api: &A, query: &str, ids: &[String]) -> Result<Option<T>, SettingsError>
where
    A: AdminQuery,
    T: for<'de> Deserialize<'de>,
{
    let body = api
        .query(query, json!({ "ids": ids }))
        .map_err(|error| SettingsError::Query(Box::new(error)))?;
    let response: Response<T> = serde_json::from_value(body)?;
    Ok(response.data)
}

/// Resolves product ids to `{id, title}` records, skipping ids that do not
/// resolve to a product.
#[instrument(skip(api))]
pub fn resolve_products<A: AdminQuery>(
    api: &A,
    ids: &[String],
) -> Result<Vec<ResourceRef>, SettingsError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let products: Vec<ResourceRef> = run::<_, ProductsData>(api, PRODUCTS_QUERY, ids)?
        .map(|data| data.products)
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .filter_map(Node::into_resource)
        .collect();

    debug!(requested = ids.len(), resolved = products.len(), "resolved products");
    Ok(products)
}

/// Resolves collection ids to the products they contain, in collection order.
///
/// A product in several collections is listed once per collection; callers
/// de-duplicate when merging into the form.
#[instrument(skip(api))]
pub fn resolve_collection_products<A: AdminQuery>(
    api: &A,
    ids: &[String],
) -> Result<Vec<ResourceRef>, SettingsError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let products: Vec<ResourceRef> =
        run::<_, CollectionsData>(api, COLLECTION_PRODUCTS_QUERY, ids)?
            .map(|data| data.nodes)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter_map(|collection| collection.products)
            .flat_map(|connection| connection.nodes.into_iter().flatten())
            .filter_map(Node::into_resource)
            .collect();

    debug!(collections = ids.len(), products = products.len(), "resolved collection products");
    Ok(products)
}
