pub mod filter;
pub mod publish;
pub mod search;
