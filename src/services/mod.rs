pub mod cashier;
pub mod checkout;
pub mod identifiers;
pub mod inventory_ledger;
pub mod pricing;
pub mod sale;
pub mod tax_rate;
