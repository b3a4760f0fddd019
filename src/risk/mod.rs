// Risk management module
pub mod circuit_breakers;

pub use circuit_breakers::{CircuitBreaker, CircuitBreakerTrip};
