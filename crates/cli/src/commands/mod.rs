pub mod cart;
pub mod migrate;
pub mod token;
