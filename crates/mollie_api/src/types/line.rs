use serde::{Deserialize, Serialize};

use super::Amount;

/// Provider order/payment line types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineType {
    Physical,
    Digital,
    ShippingFee,
    Discount,
    StoreCredit,
    GiftCard,
    Surcharge,
}

/// One provider payment line. The provider validates that
/// `totalAmount == unitPrice × quantity − discountAmount`; this crate honors
/// the identity when constructing but does not re-check it locally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub line_type: Option<LineType>,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Amount,
    pub total_amount: Amount,
    pub vat_rate: String,
    pub vat_amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_url: Option<String>,
}

/// The payment's line collection. Kept as a newtype so an empty collection
/// can still be meaningful where the provider expects one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lines(pub Vec<Line>);

impl Lines {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
