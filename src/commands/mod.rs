pub mod convert;
pub mod inventory;
