pub mod daemon;
pub mod operator;
