//! `bookwright`: builds word-processor and PDF volumes from markdown.
//!
//! Per-chapter markdown fragments go through four stages, each reading one
//! directory and writing the next:
//!
//! 1. **merge** - one document per volume, headings demoted under a title
//! 2. **entitize** - `&name;` references replaced from an entity table
//! 3. **customize** - regex style rules applied outside `:::` fences
//! 4. **export** - external converter and rasterizer produce the artifacts
//!
//! The text transforms live in [`transform`]; [`pipeline`] chains them and
//! [`export`] wraps the external tools behind the [`export::Converter`] trait.

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod observability;
pub mod pipeline;
pub mod transform;
