//! Core traits, settings, and request-scoped primitives shared by bookshelf modules.

pub mod filters;
pub mod module;
pub mod registry;
pub mod settings;
pub mod validation;

pub use filters::{Filters, PaginationMetadata, SortColumn, SortDirection, SortOrder};
pub use module::{InitCtx, Migration, Module};
pub use registry::ModuleRegistry;
pub use validation::{Check, FieldErrors, RuleSet};
