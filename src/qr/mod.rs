//! Dynamic QR ticket-validation core.
//!
//! Short-lived, signed tokens stand in for a physical ticket at the instant
//! it is scanned. A token is minted for the current time window
//! ([`window`]), serialized and signed ([`token`], [`signature`]) with a
//! per-ticket secret ([`secret`]), and later verified under adversarial
//! conditions by the validation state machine ([`validator`]) with replay
//! and brute-force protection ([`guard`]).

pub mod guard;
pub mod issuer;
pub mod secret;
pub mod signature;
pub mod token;
pub mod validator;
pub mod window;

pub use guard::{MemoryRateLimiter, MemoryReplayGuard, RateLimiter, ReplayGuard};
pub use issuer::{IssueError, IssuedToken, TokenIssuer};
pub use secret::{ResolvedSecret, SecretResolver, SecretSource};
pub use token::{DecodedToken, MalformedToken, TokenPayload};
pub use validator::{Admission, RejectReason, Validator, VerifyError, VerifyRequest};
