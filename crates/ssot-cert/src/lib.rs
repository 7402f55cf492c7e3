#![deny(missing_docs)]
#![doc = "Certificate predicates and the engine that recomputes their status."]

/// Certificates, their registry and evaluation records.
pub mod certificate;
pub mod engine;
pub mod predicate;

pub use certificate::{CertStatus, Certificate, CertificateEvaluation, CertificateRegistry};
pub use engine::{evaluate, exact_band, CertificateEngine};
pub use predicate::{Expr, Operand, OperandSource, Predicate};
