//! TOSCA Core Types
//!
//! This crate provides the foundational types used throughout the modeling
//! system:
//! - Identifier types (StructId, NodeTypeId, TemplateId, CoercedId)
//! - Value types (the Value enum for property defaults and restrictions)

mod id;
mod value;

pub use id::*;
pub use value::*;
