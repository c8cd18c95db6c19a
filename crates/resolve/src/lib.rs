pub mod config;
pub mod router;

pub use config::{EntityConfig, EntityConfigSet, IdPattern, ResolveError};
pub use router::{classify, IdentifierKind, Resolvable, RoutingDecision};
