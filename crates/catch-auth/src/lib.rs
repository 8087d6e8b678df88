//! # catch-auth
//!
//! Token authentication for the catch annotation store.
//!
//! Requests carry a JWT signed with the secret of a registered consumer.
//! The claims name the acting user, when the token was issued, how long it
//! lives, and optional override flags that bypass per-record ACLs.
//!
//! ```
//! use catch_auth::{decode_token, encode_catchjwt, Algorithm, CatchJwtRequest};
//!
//! let token = encode_catchjwt(
//!     CatchJwtRequest { user: Some("alice".into()), ..Default::default() },
//!     "secret",
//!     Algorithm::HS256,
//! ).unwrap();
//! let payload = decode_token(&token, "secret", true, Algorithm::HS256).unwrap();
//! assert_eq!(payload["userId"], "alice");
//! ```

pub mod consumer;
pub mod error;
pub mod gate;
pub mod jwt;
pub mod validate;

pub use consumer::{Consumer, ConsumerStore, StaticConsumers};
pub use error::TokenError;
pub use gate::{extract_token, Authenticator};
pub use jwt::{
    catchjwt_payload, decode_token, encode_catchjwt, encode_token, parse_algorithm,
    CatchJwtRequest,
};
pub use validate::validate_token;

pub use jsonwebtoken::Algorithm;
