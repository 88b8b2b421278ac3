//! External services consulted by buy-now processes.

pub mod price;

pub use price::{InMemoryPriceCalculator, PriceCalculator, PriceError};
