#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Static Policy Plugin
//!
//! A [`PolicyEvaluatorClient`](authmerge_sdk::PolicyEvaluatorClient) driven
//! entirely by the facts in the evaluation request:
//!
//! ```json
//! {
//!   "roles": { "admin": ["9021"] },
//!   "object_permissions": {
//!     "nestedObject.subObject": { "set": ["1234"], "del": ["1234"] }
//!   }
//! }
//! ```
//!
//! A change is allowed if its actor holds the admin role, or if every one of
//! its operations is granted by `object_permissions[path][action]`, where
//! `path` is the dotted path of the operation's container. A batch is allowed
//! only if every change in it is.
//!
//! ## Configuration
//!
//! ```yaml
//! static_policy:
//!   admin_role: admin
//!   inherit_ancestor_permissions: false
//! ```

pub mod config;
pub mod domain;

pub use config::StaticPolicyPluginConfig;
pub use domain::Service;
