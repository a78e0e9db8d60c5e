pub mod filter;
pub mod policy;
