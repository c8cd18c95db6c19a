pub mod money;
pub mod payment;

pub use money::Money;
pub use payment::{MatchOrigin, PaymentId, RentalPayment, Tenant, TenantId};
