pub mod payments;

pub use payments::{CreatePayment, PaymentService, ResolveOutcome};
