//! # pel-base
//!
//! Pure structural atoms for the PEL ecosystem.
//!
//! This crate provides the foundational types shared by the lexer, parser,
//! type checker, IR generator and runtime:
//!
//! - [`Span`] — source location tracking
//! - [`SpannedError`]/[`Result`] — errors with source positions
//!
//! # Design Principles
//!
//! This crate has **no knowledge of PEL's grammar, dimensional type system,
//! or JSON IR**. It provides only generic, reusable infrastructure that the
//! `pel` crate builds upon.

pub mod error;
pub mod span;

pub use error::{Result, SpannedError};
pub use span::Span;
