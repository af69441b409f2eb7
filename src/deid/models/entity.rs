//! Entity kind enumeration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of identifying entity found in a transcript
///
/// Names follow the entity types of the Presidio analyzer so detector output
/// maps one to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    /// Person names (first, middle, last, with honorifics)
    Person,
    /// Telephone numbers
    PhoneNumber,
    /// Email addresses
    EmailAddress,
    /// Dates, times and durations
    DateTime,
    /// Cities, countries, addresses
    Location,
    /// Companies, hospitals, insurers
    Organization,
    /// Medical licence numbers
    MedicalLicense,
    /// Credit/debit card numbers
    CreditCard,
    /// International bank account numbers
    IbanCode,
    /// US Social Security Numbers
    UsSsn,
    /// Nationality, religious or political group
    Nrp,
    /// Web URLs
    Url,
    /// IP addresses
    IpAddress,
}

impl EntityKind {
    /// Every supported kind, in declaration order
    pub const ALL: [EntityKind; 13] = [
        Self::Person,
        Self::PhoneNumber,
        Self::EmailAddress,
        Self::DateTime,
        Self::Location,
        Self::Organization,
        Self::MedicalLicense,
        Self::CreditCard,
        Self::IbanCode,
        Self::UsSsn,
        Self::Nrp,
        Self::Url,
        Self::IpAddress,
    ];

    /// Wire name used by the detection service and in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::PhoneNumber => "PHONE_NUMBER",
            Self::EmailAddress => "EMAIL_ADDRESS",
            Self::DateTime => "DATE_TIME",
            Self::Location => "LOCATION",
            Self::Organization => "ORGANIZATION",
            Self::MedicalLicense => "MEDICAL_LICENSE",
            Self::CreditCard => "CREDIT_CARD",
            Self::IbanCode => "IBAN_CODE",
            Self::UsSsn => "US_SSN",
            Self::Nrp => "NRP",
            Self::Url => "URL",
            Self::IpAddress => "IP_ADDRESS",
        }
    }

    /// Short label used inside the default placeholder token
    pub fn label(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::PhoneNumber => "PHONE",
            Self::EmailAddress => "EMAIL",
            Self::DateTime => "DATE_TIME",
            Self::Location => "LOCATION",
            Self::Organization => "ORG",
            Self::MedicalLicense => "MEDICAL_LICENSE",
            Self::CreditCard => "CARD",
            Self::IbanCode => "IBAN",
            Self::UsSsn => "SSN",
            Self::Nrp => "NRP",
            Self::Url => "URL",
            Self::IpAddress => "IP",
        }
    }

    /// Default placeholder token, e.g. `[PERSON]`
    pub fn default_placeholder(&self) -> String {
        format!("[{}]", self.label())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PERSON" | "NAME" => Ok(Self::Person),
            "PHONE_NUMBER" | "PHONE" => Ok(Self::PhoneNumber),
            "EMAIL_ADDRESS" | "EMAIL" => Ok(Self::EmailAddress),
            "DATE_TIME" | "DATE" => Ok(Self::DateTime),
            "LOCATION" | "GPE" => Ok(Self::Location),
            "ORGANIZATION" | "ORG" => Ok(Self::Organization),
            "MEDICAL_LICENSE" => Ok(Self::MedicalLicense),
            "CREDIT_CARD" | "CARD" => Ok(Self::CreditCard),
            "IBAN_CODE" | "IBAN" => Ok(Self::IbanCode),
            "US_SSN" | "SSN" => Ok(Self::UsSsn),
            "NRP" => Ok(Self::Nrp),
            "URL" => Ok(Self::Url),
            "IP_ADDRESS" | "IP" => Ok(Self::IpAddress),
            _ => Err(format!("Unknown entity kind: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("org".parse::<EntityKind>().unwrap(), EntityKind::Organization);
        assert_eq!("SSN".parse::<EntityKind>().unwrap(), EntityKind::UsSsn);
        assert!("BLOOD_TYPE".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_default_placeholders() {
        assert_eq!(EntityKind::Person.default_placeholder(), "[PERSON]");
        assert_eq!(EntityKind::Organization.default_placeholder(), "[ORG]");
        assert_eq!(EntityKind::PhoneNumber.default_placeholder(), "[PHONE]");
    }

    #[test]
    fn test_serde_screaming_snake_case() {
        let json = serde_json::to_string(&EntityKind::EmailAddress).unwrap();
        assert_eq!(json, "\"EMAIL_ADDRESS\"");
    }
}
