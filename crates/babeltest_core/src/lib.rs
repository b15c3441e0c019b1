//! Provide the shared vocabulary and reflection model for BabelTest adapters.
//!
//! This crate is the "semantic core" every adapter component agrees on:
//! - canonical vocabulary registries (error kinds, expectation kinds, lifecycle modes, type hints),
//! - naming helpers that bridge conventions across languages (`get_by_id` ↔ `getById`),
//! - the explicit reflection model a Rust codebase uses to describe itself to the adapter.
//!
//! ## Notes
//!
//! - No IO and no global state. The adapter runtime (the `babeltest` crate) owns all mutable state.
//! - Rust has no runtime reflection, so a codebase under test registers its types into a
//!   [`reflect::Registry`]. Member bodies are closures over the real Rust code.

pub mod lang;
pub mod naming;
pub mod reflect;

pub use reflect::{
    Arg, AsyncBody, Body, BoxFuture, Builder, CallArgs, CallContext, Constructor, Instance, Interceptor, Method,
    Param, ParamType, Property, Raised, Receiver, Registry, Returned, SyncBody, TypeInfo, TypeKind,
};
