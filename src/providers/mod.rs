pub mod fixer;
pub mod free_currency;
pub mod util;

pub use fixer::FixerProvider;
pub use free_currency::FreeCurrencyProvider;
