//! # azc_output
//!
//! Deferred values for azcomp component resources.
//!
//! Resource properties are often not known while a deployment is being
//! declared: a vault URI, an access key or a host name only exists once the
//! upstream resource is provisioned. [`Output`] models such a value and lets
//! callers compose it (`map`, `apply`, `all`, [`interpolate!`]) without
//! waiting on it.
//!
//! ## Example
//!
//! ```rust
//! use azc_output::{interpolate, Output, OutputError};
//!
//! # async fn demo() -> Result<(), OutputError> {
//! let namespace = Output::from_future(async { Ok("bus01".to_string()) });
//! let url = interpolate!("https://", &namespace, ".servicebus.windows.net");
//!
//! assert_eq!(url.resolve().await?, "https://bus01.servicebus.windows.net");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod output;

pub use error::{OutputError, OutputResult};
pub use output::Output;
