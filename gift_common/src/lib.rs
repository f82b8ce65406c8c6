mod price;

pub mod helpers;
pub mod op;
mod secret;

pub use price::{Price, PriceConversionError, DEFAULT_CURRENCY_CODE};
pub use secret::Secret;
