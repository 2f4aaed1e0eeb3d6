//! Fee computation and the payment gateway seam.

pub mod fees;
pub mod gateway;

pub use fees::{FeeCalculator, FeeQuote, ScheduleFeeCalculator};
pub use gateway::{GatewayError, LedgerGateway, ObligationRequest, PaymentGateway};
