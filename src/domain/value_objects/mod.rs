//! Value Objects for the storefront

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Product code, stored uppercase (e.g. `WTC-001`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductCode(String);

impl ProductCode {
    pub fn new(value: impl Into<String>) -> Result<Self, IdentError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(IdentError::Empty("product code")); }
        if value.len() > 50 { return Err(IdentError::TooLong("product code")); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for ProductCode {
    type Error = IdentError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<ProductCode> for String {
    fn from(code: ProductCode) -> Self { code.0 }
}

/// URL slug, stored lowercase with spaces collapsed to dashes
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub fn new(value: impl Into<String>) -> Result<Self, IdentError> {
        let value = value.into().trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join("-");
        if value.is_empty() { return Err(IdentError::Empty("slug")); }
        if value.len() > 120 { return Err(IdentError::TooLong("slug")); }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(IdentError::InvalidCharacters("slug"));
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for Slug {
    type Error = IdentError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self { slug.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentError { Empty(&'static str), TooLong(&'static str), InvalidCharacters(&'static str) }
impl std::error::Error for IdentError {}
impl fmt::Display for IdentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty(what) => write!(f, "{what} must not be empty"),
            Self::TooLong(what) => write!(f, "{what} is too long"),
            Self::InvalidCharacters(what) => write!(f, "{what} may only contain letters, digits and dashes"),
        }
    }
}

/// Human-readable order number: `ORD-` followed by a zero-padded sequence value
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub const PREFIX: &'static str = "ORD-";

    pub fn from_sequence(seq: u64) -> Self { Self(format!("{}{:06}", Self::PREFIX, seq)) }

    pub fn parse(value: &str) -> Option<Self> {
        let digits = value.trim().strip_prefix(Self::PREFIX)?;
        if digits.len() < 6 || !digits.chars().all(|c| c.is_ascii_digit()) { return None; }
        Some(Self(value.trim().to_string()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Supported payment methods
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cod,
    Jazzcash,
    Easypaisa,
    BankTransfer,
    Payfast,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [Self::Cod, Self::Jazzcash, Self::Easypaisa, Self::BankTransfer, Self::Payfast];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cod => "cod",
            Self::Jazzcash => "jazzcash",
            Self::Easypaisa => "easypaisa",
            Self::BankTransfer => "bank_transfer",
            Self::Payfast => "payfast",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cod => "Cash on Delivery",
            Self::Jazzcash => "JazzCash",
            Self::Easypaisa => "EasyPaisa",
            Self::BankTransfer => "Bank Transfer",
            Self::Payfast => "PayFast",
        }
    }

    /// Methods settled out of band and confirmed by an admin from a screenshot.
    pub fn requires_proof(&self) -> bool {
        matches!(self, Self::Jazzcash | Self::Easypaisa | Self::BankTransfer)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for PaymentMethod {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|m| m.as_str() == s.trim()).ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);
impl std::error::Error for UnknownVariant {}
impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown value '{}'", self.0) }
}
