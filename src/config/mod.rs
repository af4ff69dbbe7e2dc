//! Parameter module for the reconciler.
//!
//! This module handles parsing and validation of the parameter document
//! that declares the desired state of one API.

mod hash;
mod parser;
mod spec;
mod validator;

pub use hash::ConfigHasher;
pub use parser::{find_params_file, ConfigParser, DEFAULT_PARAMS_FILES};
pub use spec::{
    Connection, Credentials, DesiredSpec, Invocation, ModuleParams, OwnershipParams,
    OwnershipTransfer, PageSpec, PlanKey, PlanSpec, StateGoal, Visibility, DEFAULT_TIMEOUT_SECS,
};
pub use validator::{ParamsValidator, ValidationError, ValidationResult, READ_ONLY_API_FIELDS};
