//! Randomized request bodies for the order API.
//!
//! The factory holds the fixed value pools and nothing else; the random
//! source is always handed in by the caller so each worker can own its own
//! (optionally seeded) generator.
use crate::constants::*;
use crate::error::ConfigError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Delivery,
    Pickup,
    SelfDineIn,
}

impl OrderType {
    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.gen_range(0..3) {
            0 => OrderType::Delivery,
            1 => OrderType::Pickup,
            _ => OrderType::SelfDineIn,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    Alipay,
}

impl PaymentMethod {
    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.gen_range(0..3) {
            0 => PaymentMethod::Cash,
            1 => PaymentMethod::CreditCard,
            _ => PaymentMethod::Alipay,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: u64,
    pub quantity: u32,
}

/// Body of `POST /api/orders` and `POST /api/orders/calculate-price`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub merchant_id: String,
    pub user_id: u64,
    pub store_id: u64,
    pub order_type: OrderType,
    pub order_items: Vec<OrderItem>,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub receiver_address: String,
    pub payment_method: PaymentMethod,
    pub pay_online: bool,
}

/// Body of `POST /api/orders/{id}/pay`. The amount is left to the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    pub payment_method: PaymentMethod,
    pub amount: Option<f64>,
}

impl Default for PayRequest {
    fn default() -> Self {
        Self {
            payment_method: PaymentMethod::Cash,
            amount: None,
        }
    }
}

/// Identifier of an order created during the run.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OrderId(String);

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fields pinned by the caller instead of drawn from the pools.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub merchant_id: Option<String>,
    pub user_id: Option<u64>,
    pub store_id: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct ValuePools {
    pub merchant_ids: Vec<String>,
    pub user_ids: Vec<u64>,
    pub product_ids: Vec<u64>,
    pub store_ids: Vec<u64>,
}

impl Default for ValuePools {
    fn default() -> Self {
        Self {
            merchant_ids: (1..=3).map(|n| format!("merchant_{n:03}")).collect(),
            user_ids: (1001..=1005).collect(),
            product_ids: (1..=10).collect(),
            store_ids: (1001..=1005).collect(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RequestFactory {
    pools: ValuePools,
}

impl RequestFactory {
    pub fn new(pools: ValuePools) -> Result<Self, ConfigError> {
        if pools.merchant_ids.is_empty() {
            return Err(ConfigError::EmptyPool("merchant_ids"));
        }
        if pools.user_ids.is_empty() {
            return Err(ConfigError::EmptyPool("user_ids"));
        }
        if pools.product_ids.is_empty() {
            return Err(ConfigError::EmptyPool("product_ids"));
        }
        if pools.store_ids.is_empty() {
            return Err(ConfigError::EmptyPool("store_ids"));
        }
        Ok(Self { pools })
    }

    pub fn pools(&self) -> &ValuePools {
        &self.pools
    }

    pub fn order_request<R: Rng + ?Sized>(&self, rng: &mut R) -> OrderRequest {
        self.synthesize(rng, &Overrides::default())
    }

    pub fn synthesize<R: Rng + ?Sized>(&self, rng: &mut R, overrides: &Overrides) -> OrderRequest {
        let merchant_id = overrides
            .merchant_id
            .clone()
            .unwrap_or_else(|| pick(rng, &self.pools.merchant_ids).clone());
        let user_id = overrides
            .user_id
            .unwrap_or_else(|| *pick(rng, &self.pools.user_ids));
        let store_id = overrides
            .store_id
            .unwrap_or_else(|| *pick(rng, &self.pools.store_ids));

        let item_count = rng.gen_range(1..=MAX_ORDER_ITEMS);
        let order_items = (0..item_count)
            .map(|_| OrderItem {
                product_id: *pick(rng, &self.pools.product_ids),
                quantity: rng.gen_range(1..=MAX_ITEM_QUANTITY),
            })
            .collect();

        let receiver_phone = format!(
            "{PHONE_PREFIX}{}",
            rng.gen_range(10_000_000u32..=99_999_999)
        );
        let receiver_address = format!(
            "{} Test Street, Test City, CA {}",
            rng.gen_range(1..=999u32),
            rng.gen_range(10_000..=99_999u32)
        );

        OrderRequest {
            merchant_id,
            user_id,
            store_id,
            order_type: OrderType::random(rng),
            order_items,
            receiver_name: format!("Test User {user_id}"),
            receiver_phone,
            receiver_address,
            payment_method: PaymentMethod::random(rng),
            pay_online: rng.gen_bool(0.5),
        }
    }

    pub fn pay_request(&self) -> PayRequest {
        PayRequest::default()
    }
}

// Pools are checked for emptiness in `RequestFactory::new`.
fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, pool: &'a [T]) -> &'a T {
    &pool[rng.gen_range(0..pool.len())]
}
