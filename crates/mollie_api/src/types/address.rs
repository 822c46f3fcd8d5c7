use commerce_types::BillingAddress;
use error_stack::report;
use serde::{Deserialize, Serialize};

use crate::errors::ClientError;

/// Provider-shaped billing address. Optional fields are omitted from the
/// serialized form entirely, never sent as `null`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub given_name: String,
    pub family_name: String,
    pub email: String,
    pub street_and_number: String,
    pub city: String,
    /// ISO 3166-1 alpha-2, validated at construction.
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// E.164, or absent when normalization failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_additional: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl TryFrom<&BillingAddress> for Address {
    type Error = error_stack::Report<ClientError>;

    fn try_from(billing: &BillingAddress) -> Result<Self, Self::Error> {
        let required = |value: &str, field_name: &'static str| {
            if value.trim().is_empty() {
                Err(report!(ClientError::MissingRequiredField { field_name }))
            } else {
                Ok(value.trim().to_string())
            }
        };
        let country = required(&billing.country, "address.country")?.to_uppercase();
        if country.len() != 2 {
            return Err(report!(ClientError::InvalidValue { field_name: "address.country" }));
        }
        Ok(Self {
            given_name: required(&billing.given_name, "address.givenName")?,
            family_name: required(&billing.family_name, "address.familyName")?,
            email: required(&billing.email, "address.email")?,
            street_and_number: required(&billing.street_and_number, "address.streetAndNumber")?,
            city: required(&billing.city, "address.city")?,
            phone: billing
                .phone
                .as_deref()
                .and_then(|phone| normalize_phone(phone, &country)),
            country,
            organization_name: non_empty(billing.organization_name.as_deref()),
            title: non_empty(billing.title.as_deref()),
            street_additional: non_empty(billing.street_additional.as_deref()),
            postal_code: non_empty(billing.postal_code.as_deref()),
            region: non_empty(billing.region.as_deref()),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// E.164 normalization with the address country as parsing hint. A number
/// that cannot be normalized yields `None`; the address stays valid without
/// a phone.
fn normalize_phone(raw: &str, country: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let hint = country.parse::<phonenumber::country::Id>().ok();
    let number = phonenumber::parse(hint, raw).ok()?;
    if !phonenumber::is_valid(&number) {
        return None;
    }
    Some(number.format().mode(phonenumber::Mode::E164).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn billing() -> BillingAddress {
        BillingAddress {
            given_name: "Piet".into(),
            family_name: "Mondriaan".into(),
            email: "piet@example.org".into(),
            street_and_number: "Keizersgracht 126".into(),
            city: "Amsterdam".into(),
            country: "NL".into(),
            phone: Some("06 12345678".into()),
            ..BillingAddress::default()
        }
    }

    #[test]
    fn national_phone_normalizes_with_country_hint() {
        let address = Address::try_from(&billing()).expect("address");
        assert_eq!(address.phone.as_deref(), Some("+31612345678"));
    }

    #[test]
    fn unparseable_phone_is_dropped_silently() {
        let mut raw = billing();
        raw.phone = Some("not a phone".into());
        let address = Address::try_from(&raw).expect("address");
        assert_eq!(address.phone, None);
    }

    #[test]
    fn missing_required_field_is_fatal() {
        let mut raw = billing();
        raw.city = "  ".into();
        assert!(Address::try_from(&raw).is_err());
    }

    #[test]
    fn country_must_be_alpha2() {
        let mut raw = billing();
        raw.country = "NLD".into();
        assert!(Address::try_from(&raw).is_err());
    }

    #[test]
    fn serialization_omits_absent_optionals() {
        let mut raw = billing();
        raw.phone = None;
        let value = serde_json::to_value(Address::try_from(&raw).expect("address")).expect("json");
        let object = value.as_object().expect("object");
        assert!(!object.contains_key("phone"));
        assert!(!object.contains_key("postalCode"));
        assert_eq!(object["country"], "NL");
    }
}
