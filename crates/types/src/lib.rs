//! Foundation types for querynav.
//!
//! This crate provides shared types used across the navigation stack.
//! It has zero external dependencies, making it suitable as a foundation layer.
//!
//! # Type Categories
//!
//! - **File types**: [`FileUri`], [`Language`]
//! - **Position types**: [`Position`], [`Range`], [`OffsetRange`]
//! - **Navigation types**: [`Location`], [`LocationLink`]

mod file;
mod location;
mod position;

pub use file::{FileUri, Language};
pub use location::{Location, LocationLink};
pub use position::{OffsetRange, Position, Range};
