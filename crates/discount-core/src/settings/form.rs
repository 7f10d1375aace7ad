use std::collections::HashSet;

use tracing::debug;

use super::{
    resolve_collection_products, resolve_products, AdminQuery, Commit, MetafieldChange, RequestId,
    RequestTracker, ResourceRef, SettingsError,
};
use crate::config::DiscountConfig;

/// Discount classes a merchant can switch on for the discount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiscountClass {
    Product,
    Order,
    Shipping,
}

/// Classes after toggling `class` on or off.
pub fn toggle_discount_class(current: &[DiscountClass], class: DiscountClass) -> Vec<DiscountClass> {
    if current.contains(&class) {
        current.iter().copied().filter(|c| *c != class).collect()
    } else {
        let mut next = current.to_vec();
        next.push(class);
        next
    }
}

/// The last enabled class cannot be switched off.
pub fn can_toggle_discount_class(current: &[DiscountClass], class: DiscountClass) -> bool {
    !(current.len() == 1 && current.contains(&class))
}

/// Percentage entered for each discount class.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Percentages {
    pub product: f64,
    pub order: f64,
    pub shipping: f64,
}

impl Percentages {
    pub fn from_config(config: &DiscountConfig) -> Self {
        Self {
            product: config.cart_line_percentage,
            order: config.order_percentage,
            shipping: config.delivery_percentage,
        }
    }

    pub fn get(&self, class: DiscountClass) -> f64 {
        match class {
            DiscountClass::Product => self.product,
            DiscountClass::Order => self.order,
            DiscountClass::Shipping => self.shipping,
        }
    }

    fn set(&mut self, class: DiscountClass, value: f64) {
        match class {
            DiscountClass::Product => self.product = value,
            DiscountClass::Order => self.order = value,
            DiscountClass::Shipping => self.shipping = value,
        }
    }
}

/// Which products the cart-line discount is scoped to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AppliesTo {
    #[default]
    All,
    Products,
    Collections,
}

impl AppliesTo {
    /// Mode shown when the form opens: stored products win over collections.
    pub fn on_load(config: &DiscountConfig) -> Self {
        if !config.product_ids.is_empty() {
            AppliesTo::Products
        } else if !config.collection_ids.is_empty() {
            AppliesTo::Collections
        } else {
            AppliesTo::All
        }
    }

    /// Mode restored by a reset: stored collections win over products.
    pub fn on_reset(config: &DiscountConfig) -> Self {
        if !config.collection_ids.is_empty() {
            AppliesTo::Collections
        } else if !config.product_ids.is_empty() {
            AppliesTo::Products
        } else {
            AppliesTo::All
        }
    }
}

/// Editable state of the discount settings form.
///
/// Resource lookups are split into `begin_*` and `finish_*` halves so that
/// callers can run them concurrently; a lookup only commits if no newer
/// lookup or mode change happened in between.
#[derive(Debug)]
pub struct SettingsForm {
    stored: DiscountConfig,
    percentages: Percentages,
    applies_to: AppliesTo,
    products: Vec<ResourceRef>,
    initial_products: Vec<ResourceRef>,
    collections: Vec<ResourceRef>,
    requests: RequestTracker,
    error: Option<SettingsError>,
}

impl SettingsForm {
    /// Opens the form over the stored metafield value.
    pub fn new(metafield_value: Option<&str>) -> Self {
        let stored = DiscountConfig::from_metafield(metafield_value);
        let applies_to = AppliesTo::on_load(&stored);
        let collections = match applies_to {
            AppliesTo::Collections => stored
                .collection_ids
                .iter()
                .map(|id| ResourceRef::new(id.clone(), ""))
                .collect(),
            _ => Vec::new(),
        };

        Self {
            percentages: Percentages::from_config(&stored),
            applies_to,
            products: Vec::new(),
            initial_products: Vec::new(),
            collections,
            requests: RequestTracker::new(),
            error: None,
            stored,
        }
    }

    pub fn stored(&self) -> &DiscountConfig {
        &self.stored
    }

    pub fn percentages(&self) -> Percentages {
        self.percentages
    }

    pub fn applies_to(&self) -> AppliesTo {
        self.applies_to
    }

    pub fn products(&self) -> &[ResourceRef] {
        &self.products
    }

    pub fn collections(&self) -> &[ResourceRef] {
        &self.collections
    }

    /// Error banner to show, if any.
    pub fn banner(&self) -> Option<&SettingsError> {
        self.error.as_ref()
    }

    /// Starts resolving the stored selection into products.
    pub fn begin_load(&mut self) -> RequestId {
        self.requests.begin()
    }

    /// Commits the products resolved for the stored selection.
    pub fn finish_load(&mut self, request: RequestId, products: Vec<ResourceRef>) -> Commit {
        if !self.requests.is_current(request) {
            debug!(?request, "dropping stale product load");
            return Commit::Stale;
        }

        self.initial_products = products.clone();
        self.products = products;
        Commit::Applied
    }

    /// Resolves the stored selection through the admin API.
    pub fn load<A: AdminQuery>(&mut self, api: &A) -> Result<Commit, SettingsError> {
        let request = self.begin_load();
        let products = match AppliesTo::on_load(&self.stored) {
            AppliesTo::Products => resolve_products(api, &self.stored.product_ids)?,
            AppliesTo::Collections => resolve_collection_products(api, &self.stored.collection_ids)?,
            AppliesTo::All => Vec::new(),
        };

        Ok(self.finish_load(request, products))
    }

    /// Updates a percentage from raw field input. Input that is not a number counts as zero.
    pub fn set_percentage(&mut self, class: DiscountClass, raw: &str) {
        let value = raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .unwrap_or_default();
        self.percentages.set(class, value);
    }

    /// Switches the scope. Choosing `All` or another mode drops the current
    /// selection and any lookup still in flight.
    pub fn set_applies_to(&mut self, applies_to: AppliesTo) {
        if applies_to == AppliesTo::All || applies_to != self.applies_to {
            self.products.clear();
            self.collections.clear();
            self.requests.invalidate();
        }
        self.applies_to = applies_to;
    }

    pub fn remove_product(&mut self, id: &str) {
        self.products.retain(|product| product.id != id);
    }

    /// Replaces the product selection with a picker result.
    pub fn select_products(&mut self, selection: Vec<ResourceRef>) {
        self.products = selection;
    }

    /// Replaces the collection selection and starts resolving its products.
    pub fn begin_collection_selection(&mut self, selection: Vec<ResourceRef>) -> RequestId {
        self.collections = selection;
        self.requests.begin()
    }

    /// Merges the products of the selected collections into the product list.
    pub fn finish_collection_selection(
        &mut self,
        request: RequestId,
        products: Vec<ResourceRef>,
    ) -> Commit {
        if !self.requests.is_current(request) {
            debug!(?request, "dropping stale collection products");
            return Commit::Stale;
        }

        self.merge_products(products);
        Commit::Applied
    }

    /// Replaces the collection selection and merges in its products through the admin API.
    pub fn select_collections<A: AdminQuery>(
        &mut self,
        selection: Vec<ResourceRef>,
        api: &A,
    ) -> Result<Commit, SettingsError> {
        let request = self.begin_collection_selection(selection);
        let products = resolve_collection_products(api, &ids_of(&self.collections))?;
        Ok(self.finish_collection_selection(request, products))
    }

    /// Adds products not already listed. Products are keyed by id and the
    /// first occurrence is kept.
    pub fn merge_products(&mut self, products: impl IntoIterator<Item = ResourceRef>) {
        let mut seen: HashSet<String> = self.products.iter().map(|p| p.id.clone()).collect();
        for product in products {
            if seen.insert(product.id.clone()) {
                self.products.push(product);
            }
        }
    }

    /// Records the host's answer to a discount class change.
    pub fn record_discount_class_update(&mut self, succeeded: bool) {
        self.error = if succeeded {
            None
        } else {
            Some(SettingsError::DiscountClassUpdate)
        };
    }

    /// Restores the stored percentages and the last loaded or saved products.
    pub fn reset(&mut self) {
        self.percentages = Percentages::from_config(&self.stored);
        self.products = self.initial_products.clone();
        self.applies_to = AppliesTo::on_reset(&self.stored);
        self.requests.invalidate();
    }

    /// Configuration the form would persist. Only the ids of the active
    /// scope are kept.
    pub fn to_config(&self) -> DiscountConfig {
        let (product_ids, collection_ids) = match self.applies_to {
            AppliesTo::Products => (ids_of(&self.products), Vec::new()),
            AppliesTo::Collections => (Vec::new(), ids_of(&self.collections)),
            AppliesTo::All => (Vec::new(), Vec::new()),
        };

        DiscountConfig {
            cart_line_percentage: self.percentages.product,
            order_percentage: self.percentages.order,
            delivery_percentage: self.percentages.shipping,
            product_ids,
            collection_ids,
            is_loyalty_discount: self.stored.is_loyalty_discount,
        }
    }

    /// The metafield write for the current state.
    pub fn metafield_change(&self) -> Result<MetafieldChange, SettingsError> {
        let value = self
            .to_config()
            .to_metafield_value()
            .map_err(SettingsError::Encode)?;
        Ok(MetafieldChange::update(value))
    }

    /// Makes the current state the baseline for later resets.
    pub fn mark_saved(&mut self) {
        self.stored = self.to_config();
        self.initial_products = self.products.clone();
    }
}

fn ids_of(resources: &[ResourceRef]) -> Vec<String> {
    resources.iter().map(|resource| resource.id.clone()).collect()
}
