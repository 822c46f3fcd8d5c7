//! Pure mappings between the host model and the provider model. Every
//! function here is total over its input domain: unmapped input yields
//! `None`, never an error, and the caller decides whether `None` is fatal.

use commerce_types::{Currency, HostPaymentStatus, LineItem, LineItemKind, PaymentMethodKind};

use crate::{
    resources::{MollieMethod, PaymentStatus},
    types::{line::LineType, Amount, Line, Lines},
};

/// Host method → provider method. The virtual direct-debit variants all
/// settle as plain `directdebit`; their interactive first rail is handled by
/// the orchestrator's sequence-type logic, not here.
pub fn to_provider_method(method: PaymentMethodKind) -> Option<MollieMethod> {
    match method {
        PaymentMethodKind::ApplePay => Some(MollieMethod::Applepay),
        PaymentMethodKind::Bancontact => Some(MollieMethod::Bancontact),
        PaymentMethodKind::BankTransfer => Some(MollieMethod::Banktransfer),
        PaymentMethodKind::Belfius => Some(MollieMethod::Belfius),
        PaymentMethodKind::CreditCard => Some(MollieMethod::Creditcard),
        PaymentMethodKind::DirectDebit
        | PaymentMethodKind::DirectDebitBancontact
        | PaymentMethodKind::DirectDebitIdeal
        | PaymentMethodKind::DirectDebitSofort => Some(MollieMethod::Directdebit),
        PaymentMethodKind::Eps => Some(MollieMethod::Eps),
        PaymentMethodKind::GiftCard => Some(MollieMethod::Giftcard),
        PaymentMethodKind::Giropay => Some(MollieMethod::Giropay),
        PaymentMethodKind::Ideal => Some(MollieMethod::Ideal),
        PaymentMethodKind::Kbc => Some(MollieMethod::Kbc),
        PaymentMethodKind::PayPal => Some(MollieMethod::Paypal),
        PaymentMethodKind::Przelewy24 => Some(MollieMethod::Przelewy24),
        PaymentMethodKind::Sofort => Some(MollieMethod::Sofort),
    }
}

/// Provider method → every host method it can correspond to. One-to-many:
/// `directdebit` expands to the virtual variants, and a card rail folds the
/// wallet methods that ride on it.
pub fn to_host_methods(method: MollieMethod) -> Vec<PaymentMethodKind> {
    match method {
        MollieMethod::Applepay => vec![PaymentMethodKind::ApplePay],
        MollieMethod::Bancontact => vec![PaymentMethodKind::Bancontact],
        MollieMethod::Banktransfer => vec![PaymentMethodKind::BankTransfer],
        MollieMethod::Belfius => vec![PaymentMethodKind::Belfius],
        MollieMethod::Creditcard => {
            vec![PaymentMethodKind::CreditCard, PaymentMethodKind::ApplePay]
        }
        MollieMethod::Directdebit => vec![
            PaymentMethodKind::DirectDebit,
            PaymentMethodKind::DirectDebitBancontact,
            PaymentMethodKind::DirectDebitIdeal,
            PaymentMethodKind::DirectDebitSofort,
        ],
        MollieMethod::Eps => vec![PaymentMethodKind::Eps],
        MollieMethod::Giftcard => vec![PaymentMethodKind::GiftCard],
        MollieMethod::Giropay => vec![PaymentMethodKind::Giropay],
        MollieMethod::Ideal => vec![PaymentMethodKind::Ideal],
        MollieMethod::Kbc => vec![PaymentMethodKind::Kbc],
        MollieMethod::Paypal => vec![PaymentMethodKind::PayPal],
        MollieMethod::Przelewy24 => vec![PaymentMethodKind::Przelewy24],
        MollieMethod::Sofort => vec![PaymentMethodKind::Sofort],
        MollieMethod::Unknown => Vec::new(),
    }
}

/// Provider method → the single preferred host method.
pub fn to_host_method(method: MollieMethod) -> Option<PaymentMethodKind> {
    to_host_methods(method).into_iter().next()
}

/// Provider status → host status. Exhaustive over the known provider set;
/// an unrecognized status maps to `None`, meaning "leave the host status
/// unchanged", so a terminal host status is never regressed over a value
/// this crate does not understand.
pub fn to_host_status(status: PaymentStatus) -> Option<HostPaymentStatus> {
    match status {
        PaymentStatus::Open | PaymentStatus::Pending => Some(HostPaymentStatus::Open),
        PaymentStatus::Paid => Some(HostPaymentStatus::Success),
        PaymentStatus::Authorized => Some(HostPaymentStatus::Authorized),
        PaymentStatus::Canceled => Some(HostPaymentStatus::Cancelled),
        PaymentStatus::Expired => Some(HostPaymentStatus::Expired),
        PaymentStatus::Failed => Some(HostPaymentStatus::Failure),
        PaymentStatus::Unknown => None,
    }
}

/// Locales the provider's hosted checkout supports.
pub const SUPPORTED_LOCALES: [&str; 22] = [
    "en_US", "en_GB", "nl_NL", "nl_BE", "fr_FR", "fr_BE", "de_DE", "de_AT", "de_CH", "es_ES",
    "ca_ES", "pt_PT", "it_IT", "nb_NO", "sv_SE", "fi_FI", "da_DK", "is_IS", "hu_HU", "pl_PL",
    "lv_LV", "lt_LT",
];

/// Normalizes a host locale to the provider's `xx_XX` form and matches it
/// case-insensitively against the supported set. Unsupported locale →
/// `None`; the caller then omits the locale and the provider auto-detects.
pub fn normalize_locale(raw: &str) -> Option<&'static str> {
    let raw = raw.trim().replace('-', "_");
    if raw.is_empty() {
        return None;
    }
    let candidate = if raw.len() == 2 {
        format!("{}_{}", raw.to_lowercase(), raw.to_uppercase())
    } else {
        raw
    };
    SUPPORTED_LOCALES
        .iter()
        .find(|supported| supported.eq_ignore_ascii_case(&candidate))
        .copied()
}

/// Host line kind → provider line type.
pub fn to_provider_line_type(kind: LineItemKind) -> Option<LineType> {
    match kind {
        LineItemKind::Product => Some(LineType::Physical),
        LineItemKind::Digital => Some(LineType::Digital),
        LineItemKind::Shipping => Some(LineType::ShippingFee),
        LineItemKind::Fee | LineItemKind::Surcharge => Some(LineType::Surcharge),
        LineItemKind::Discount => Some(LineType::Discount),
        LineItemKind::GiftCard => Some(LineType::GiftCard),
    }
}

/// Projects host order lines to provider lines. Lines with a zero total are
/// excluded: host discount-only bookkeeping lines must not become provider
/// lines.
pub fn to_provider_lines(items: &[LineItem], currency: Currency) -> Lines {
    let lines = items
        .iter()
        .filter(|item| !item.total.is_zero())
        .map(|item| Line {
            line_type: item.kind.and_then(to_provider_line_type),
            description: item.name.clone(),
            quantity: item.quantity,
            unit_price: Amount::from_minor(currency, item.unit_price),
            total_amount: Amount::from_minor(currency, item.total),
            vat_rate: item.vat_rate.clone(),
            vat_amount: Amount::from_minor(currency, item.vat_amount),
            discount_amount: item
                .discount
                .filter(|discount| !discount.is_zero())
                .map(|discount| Amount::from_minor(currency, discount)),
            category: item.category.clone(),
            sku: item.sku.clone(),
            image_url: item.image_url.clone(),
            product_url: item.product_url.clone(),
        })
        .collect();
    Lines(lines)
}
