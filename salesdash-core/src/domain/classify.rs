//! Keyword classification of products and customers
//!
//! Rules are checked in order and the first match wins, so a deli whole bird
//! is caught before the plain whole-bird rule and frozen value-add before
//! fresh value-add.

use serde::{Deserialize, Serialize};

/// Product category used by the report breakdowns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductCategory {
    #[serde(rename = "WB")]
    WholeBird,
    #[serde(rename = "Deli WB")]
    DeliWholeBird,
    #[serde(rename = "Fillets")]
    Fillets,
    #[serde(rename = "Portion")]
    Portion,
    #[serde(rename = "V/Add")]
    ValueAdd,
    #[serde(rename = "V/Add Frozen")]
    ValueAddFrozen,
    #[serde(rename = "Offal Fresh")]
    OffalFresh,
}

impl ProductCategory {
    /// Report order
    pub const ALL: [ProductCategory; 7] = [
        ProductCategory::WholeBird,
        ProductCategory::DeliWholeBird,
        ProductCategory::Fillets,
        ProductCategory::Portion,
        ProductCategory::ValueAdd,
        ProductCategory::ValueAddFrozen,
        ProductCategory::OffalFresh,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProductCategory::WholeBird => "WB",
            ProductCategory::DeliWholeBird => "Deli WB",
            ProductCategory::Fillets => "Fillets",
            ProductCategory::Portion => "Portion",
            ProductCategory::ValueAdd => "V/Add",
            ProductCategory::ValueAddFrozen => "V/Add Frozen",
            ProductCategory::OffalFresh => "Offal Fresh",
        }
    }

    /// Classify a product name. Unmatched products count as whole birds.
    pub fn classify(product: &str) -> Self {
        let name = product.to_uppercase();

        if contains_any(&name, &["NO GIB", "WHOLE BIRD", "WHOLE"]) {
            if contains_any(&name, &["DELI", "BBQ", "SMOKED", "GRILL", "MARINATED"]) {
                return ProductCategory::DeliWholeBird;
            }
            return ProductCategory::WholeBird;
        }
        if contains_any(&name, &["BREAST", "FILLET"]) {
            return ProductCategory::Fillets;
        }
        if contains_any(&name, &["DRUMSTICK", "THIGH", "WING", "PORTION"]) {
            return ProductCategory::Portion;
        }
        if contains_any(&name, &["FRZ", "FROZEN", "IQF"]) {
            return ProductCategory::ValueAddFrozen;
        }
        if contains_any(
            &name,
            &["CRUMB", "MARINATED", "BBQ", "ESPETADA", "GRILL", "RUSSIAN", "KIEV"],
        ) {
            return ProductCategory::ValueAdd;
        }
        if contains_any(&name, &["BACK", "NECK", "OFFAL", "GIBLET", "SOUP", "PACK"]) {
            return ProductCategory::OffalFresh;
        }
        ProductCategory::WholeBird
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Retail customer group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerGroup {
    #[serde(rename = "T&Pay")]
    TakeNPay,
    #[serde(rename = "Spar D/Ship")]
    SparDirectShip,
    #[serde(rename = "Hyper C")]
    Hyper,
    #[serde(rename = "PnP")]
    PickNPay,
    #[serde(rename = "Mega")]
    Mega,
    #[serde(rename = "Dermott")]
    Dermott,
    #[serde(rename = "Other")]
    Other,
}

impl CustomerGroup {
    /// Groups shown in the report; `Other` is never reported
    pub const REPORTED: [CustomerGroup; 6] = [
        CustomerGroup::TakeNPay,
        CustomerGroup::SparDirectShip,
        CustomerGroup::Hyper,
        CustomerGroup::PickNPay,
        CustomerGroup::Mega,
        CustomerGroup::Dermott,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CustomerGroup::TakeNPay => "T&Pay",
            CustomerGroup::SparDirectShip => "Spar D/Ship",
            CustomerGroup::Hyper => "Hyper C",
            CustomerGroup::PickNPay => "PnP",
            CustomerGroup::Mega => "Mega",
            CustomerGroup::Dermott => "Dermott",
            CustomerGroup::Other => "Other",
        }
    }

    pub fn classify(customer: &str) -> Self {
        let name = customer.to_uppercase();

        if contains_any(&name, &["TAKE N PAY", "T&P"]) {
            CustomerGroup::TakeNPay
        } else if name.contains("SPAR") {
            CustomerGroup::SparDirectShip
        } else if name.contains("HYPER") {
            CustomerGroup::Hyper
        } else if contains_any(&name, &["PICK 'N PAY", "PNP", "PICK N PAY"]) {
            CustomerGroup::PickNPay
        } else if name.contains("MEGA") {
            CustomerGroup::Mega
        } else if name.contains("DERMOTT") {
            CustomerGroup::Dermott
        } else {
            CustomerGroup::Other
        }
    }
}

impl std::fmt::Display for CustomerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}
