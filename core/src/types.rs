//! Request parameters and response payloads for the SPIKE API.
//!
//! # Design
//! Each operation takes one structured parameter value. Defaults are carried
//! by `Default` impls so callers merge their fields over them with
//! `..Default::default()`.
//!
//! Response types wrap the decoded JSON object unchanged and read fields
//! through accessors, so a successful payload never fails to decode because
//! of a `null` or an unexpected number type, and re-serialising a result
//! reproduces what the server sent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

/// A line item attached to a charge for itemised reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: String,
    pub language: String,
    pub price: u64,
    pub currency: String,
    pub count: u32,
    pub stock: u32,
}

impl Default for Product {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            description: String::new(),
            language: "EN".to_string(),
            price: 0,
            currency: String::new(),
            count: 0,
            stock: 0,
        }
    }
}

impl Product {
    /// Value of the attribute `name`, or `None` if there is no such attribute.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.to_map().remove(name)
    }

    /// Set the attribute `name` to `value`.
    ///
    /// Unknown names and values of the wrong type are dropped and leave the
    /// product unchanged; the return value says whether the write happened.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> bool {
        let mut attrs = self.to_map();
        match attrs.get_mut(name) {
            Some(slot) => *slot = value.into(),
            None => return false,
        }
        match serde_json::from_value::<Product>(Value::Object(attrs)) {
            Ok(updated) => {
                *self = updated;
                true
            }
            Err(_) => false,
        }
    }

    /// All eight attributes, including those still at their defaults.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(attrs)) => attrs,
            _ => Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request parameters
// ---------------------------------------------------------------------------

/// Parameters for `POST /charges`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateCharge {
    /// ISO currency code, e.g. `JPY` or `USD`.
    pub currency: String,
    pub amount: u64,
    /// Token id obtained from SPIKE Checkout or `create_token`.
    pub card: String,
    /// Capture immediately as a real sale; `false` only authorises.
    pub capture: bool,
    pub products: Vec<Product>,
}

impl Default for CreateCharge {
    fn default() -> Self {
        Self {
            currency: String::new(),
            amount: 0,
            card: String::new(),
            capture: true,
            products: Vec::new(),
        }
    }
}

impl CreateCharge {
    pub fn new(currency: impl Into<String>, amount: u64, card: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            amount,
            card: card.into(),
            ..Default::default()
        }
    }

    /// Form fields; `products` travels as a JSON-encoded array.
    pub(crate) fn to_form(&self) -> Result<Vec<(String, String)>> {
        let products = serde_json::to_string(&self.products)
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(vec![
            ("amount".to_string(), self.amount.to_string()),
            ("currency".to_string(), self.currency.clone()),
            ("card".to_string(), self.card.clone()),
            ("capture".to_string(), self.capture.to_string()),
            ("products".to_string(), products),
        ])
    }
}

pub const DEFAULT_LIST_LIMIT: u32 = 10;

/// Parameters for `GET /charges`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListCharges {
    pub limit: u32,
}

impl Default for ListCharges {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl ListCharges {
    pub fn with_limit(limit: u32) -> Self {
        Self { limit }
    }
}

/// Parameters for `POST /tokens`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateToken {
    pub number: String,
    pub exp_month: u32,
    pub exp_year: u32,
    /// Kept as a string: leading zeros are significant.
    pub cvc: String,
    pub name: String,
    pub currency: String,
    pub email: Option<String>,
}

impl Default for CreateToken {
    fn default() -> Self {
        Self {
            number: String::new(),
            exp_month: 0,
            exp_year: 0,
            cvc: String::new(),
            name: String::new(),
            currency: "JPY".to_string(),
            email: None,
        }
    }
}

impl CreateToken {
    pub fn new(number: impl Into<String>, exp_month: u32, exp_year: u32, cvc: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            exp_month,
            exp_year,
            cvc: cvc.into(),
            ..Default::default()
        }
    }

    pub(crate) fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("card[number]".to_string(), self.number.clone()),
            ("card[exp_month]".to_string(), self.exp_month.to_string()),
            ("card[exp_year]".to_string(), self.exp_year.to_string()),
            ("card[cvc]".to_string(), self.cvc.clone()),
            ("card[name]".to_string(), self.name.clone()),
            ("currency".to_string(), self.currency.clone()),
        ];
        if let Some(email) = &self.email {
            form.push(("email".to_string(), email.clone()));
        }
        form
    }
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

macro_rules! payload_view {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name {
            fields: Map<String, Value>,
        }

        impl $name {
            /// Raw value of `name` exactly as the server sent it.
            pub fn get(&self, name: &str) -> Option<&Value> {
                self.fields.get(name)
            }

            pub fn as_map(&self) -> &Map<String, Value> {
                &self.fields
            }

            pub fn into_value(self) -> Value {
                Value::Object(self.fields)
            }
        }

        impl From<Map<String, Value>> for $name {
            fn from(fields: Map<String, Value>) -> Self {
                Self { fields }
            }
        }
    };
}

payload_view! {
    /// A payment transaction.
    ///
    /// Accessors return `None` when a field is absent, `null`, or of an
    /// unexpected JSON type; the value itself is still available via `get`.
    Charge
}

payload_view! {
    Refund
}

payload_view! {
    /// One page of `GET /charges`.
    ChargeList
}

payload_view! {
    /// A short-lived reference to card details.
    Token
}

payload_view! {
    TokenCard
}

impl Charge {
    pub fn id(&self) -> &str {
        str_field(&self.fields, "id").unwrap_or_default()
    }

    pub fn object(&self) -> Option<&str> {
        str_field(&self.fields, "object")
    }

    pub fn livemode(&self) -> Option<bool> {
        bool_field(&self.fields, "livemode")
    }

    pub fn created(&self) -> Option<i64> {
        i64_field(&self.fields, "created")
    }

    pub fn paid(&self) -> Option<bool> {
        bool_field(&self.fields, "paid")
    }

    pub fn captured(&self) -> Option<bool> {
        bool_field(&self.fields, "captured")
    }

    /// Amount in minor units; `None` unless the server sent a whole number.
    pub fn amount(&self) -> Option<u64> {
        u64_field(&self.fields, "amount")
    }

    pub fn currency(&self) -> Option<&str> {
        str_field(&self.fields, "currency")
    }

    pub fn refunded(&self) -> Option<bool> {
        bool_field(&self.fields, "refunded")
    }

    pub fn amount_refunded(&self) -> Option<u64> {
        u64_field(&self.fields, "amount_refunded")
    }

    pub fn refunds(&self) -> Vec<Refund> {
        object_list(&self.fields, "refunds")
    }
}

impl Refund {
    pub fn object(&self) -> Option<&str> {
        str_field(&self.fields, "object")
    }

    pub fn created(&self) -> Option<i64> {
        i64_field(&self.fields, "created")
    }

    pub fn amount(&self) -> Option<u64> {
        u64_field(&self.fields, "amount")
    }

    pub fn currency(&self) -> Option<&str> {
        str_field(&self.fields, "currency")
    }
}

impl ChargeList {
    pub fn object(&self) -> Option<&str> {
        str_field(&self.fields, "object")
    }

    pub fn url(&self) -> Option<&str> {
        str_field(&self.fields, "url")
    }

    pub fn has_more(&self) -> Option<bool> {
        bool_field(&self.fields, "has_more")
    }

    pub fn data(&self) -> Vec<Charge> {
        object_list(&self.fields, "data")
    }
}

impl Token {
    pub fn id(&self) -> &str {
        str_field(&self.fields, "id").unwrap_or_default()
    }

    pub fn object(&self) -> Option<&str> {
        str_field(&self.fields, "object")
    }

    pub fn livemode(&self) -> Option<bool> {
        bool_field(&self.fields, "livemode")
    }

    pub fn created(&self) -> Option<i64> {
        i64_field(&self.fields, "created")
    }

    pub fn currency(&self) -> Option<&str> {
        str_field(&self.fields, "currency")
    }

    pub fn email(&self) -> Option<&str> {
        str_field(&self.fields, "email")
    }

    pub fn card(&self) -> Option<TokenCard> {
        self.fields
            .get("card")
            .and_then(Value::as_object)
            .cloned()
            .map(TokenCard::from)
    }
}

impl TokenCard {
    pub fn object(&self) -> Option<&str> {
        str_field(&self.fields, "object")
    }

    pub fn last4(&self) -> Option<&str> {
        str_field(&self.fields, "last4")
    }

    pub fn brand(&self) -> Option<&str> {
        str_field(&self.fields, "brand")
    }

    pub fn exp_month(&self) -> Option<u32> {
        u64_field(&self.fields, "exp_month").and_then(|month| u32::try_from(month).ok())
    }

    pub fn exp_year(&self) -> Option<u32> {
        u64_field(&self.fields, "exp_year").and_then(|year| u32::try_from(year).ok())
    }

    pub fn name(&self) -> Option<&str> {
        str_field(&self.fields, "name")
    }
}

fn str_field<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    fields.get(name)?.as_str()
}

fn bool_field(fields: &Map<String, Value>, name: &str) -> Option<bool> {
    fields.get(name)?.as_bool()
}

fn u64_field(fields: &Map<String, Value>, name: &str) -> Option<u64> {
    fields.get(name)?.as_u64()
}

fn i64_field(fields: &Map<String, Value>, name: &str) -> Option<i64> {
    fields.get(name)?.as_i64()
}

fn object_list<T: From<Map<String, Value>>>(fields: &Map<String, Value>, name: &str) -> Vec<T> {
    fields
        .get(name)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_object().cloned().map(T::from))
                .collect()
        })
        .unwrap_or_default()
}
