//! HomeBody Cloud Declarations
//!
//! This crate provides the provider-agnostic declaration model for HomeBody:
//! a stack builder that constructs register resources on, and the writer
//! that turns stacks into a cloud assembly for an external provisioning
//! engine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  HomeBody CLI                    │
//! │             (homebody synth / ls)                │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                homebody-aws                      │
//! │   Vpc, SecurityGroup, Instance, Role, Table ...  │
//! └─────────────────┬───────────────────────────────┘
//!                   │ &mut Stack
//! ┌─────────────────▼───────────────────────────────┐
//! │               homebody-cloud                     │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │    Stack     │  │   Context    │             │
//! │  └──────┬───────┘  └──────────────┘             │
//! │         │ synthesize                             │
//! │  ┌──────▼───────┐  ┌──────────────┐             │
//! │  │   Template   │─▶│   Assembly   │             │
//! │  └──────────────┘  └──────────────┘             │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod assembly;
pub mod context;
pub mod error;
pub mod intrinsic;
pub mod path;
pub mod resource;
pub mod stack;
pub mod template;

// Re-exports
pub use assembly::{CloudAssembly, MANIFEST_FILE, Manifest, StackArtifact};
pub use context::{CONTEXT_FILE, Context, ContextLookup, ContextStore, LookupProvider, MissingContext};
pub use error::{CloudError, Result};
pub use intrinsic::Pseudo;
pub use path::{ConstructPath, LogicalId};
pub use resource::{CfnResource, ConstructKind, ConstructRecord, RemovalPolicy};
pub use stack::{Environment, Stack, StackProps};
pub use template::Template;
