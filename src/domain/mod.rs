pub mod payload;
pub mod transaction;

pub use payload::{build_payment_links, payment_note, DeviceClass, PaymentLinks};
pub use transaction::{should_expire, Provider, Transaction, TransactionStatus, PAYMENT_WINDOW_SECS};
