// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Gravitee Gateway
//!
//! A declarative, idempotent reconciler for APIs managed by a Gravitee.io
//! API Management server.
//!
//! ## Overview
//!
//! One invocation declares the desired state of one API: its configuration,
//! visibility, documentation pages, access plans, primary owner and
//! lifecycle state. The reconciler:
//!
//! - Authenticates with basic credentials, a gateway token, or an OAuth2
//!   access token exchanged for a gateway token
//! - Observes the API as it exists on the server
//! - Computes the ordered list of actions needed to converge
//! - Executes them, stopping at the first failure
//! - Reports whether anything changed
//!
//! Running the same invocation twice issues no write the second time.
//!
//! ## Modules
//!
//! - [`config`]: Parameter parsing and validation
//! - [`gateway`]: Management API client, authentication and observation
//! - [`planner`]: Diff computation and plan execution
//! - [`reconciler`]: One reconciliation run and its outcome
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! url: https://apim.mycompany.com
//! user: admin
//! password: admin
//! state: started
//! visibility: PUBLIC
//! config:
//!   name: echo
//!   version: "1"
//!   description: Echo API
//!   contextPath: /echo
//!   endpoint: https://api.gravitee.io/echo
//! pages:
//!   - name: readme
//!     type: MARKDOWN
//!     content: "# Echo"
//! plans:
//!   - name: keyless
//!     security: KEY_LESS
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod planner;
pub mod reconciler;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigHasher, ConfigParser, DesiredSpec, Invocation, ModuleParams, ParamsValidator};
pub use error::{ErrorKind, GatewayError, Result};
pub use gateway::{Authenticator, GatewayClient, ManagementApi};
pub use planner::{ActionPlan, DiffEngine, PlanExecutor};
pub use reconciler::{Outcome, Reconciliation, Reconciler};
