//! Tools and the action catalogue
//!
//! # Module Structure
//!
//! - [`actions`](crate::tools::actions) - Action names, decoding and coordinator tool definitions
//! - [`registry`](crate::tools::registry) - Tool trait, registration and execution
//! - [`search`](crate::tools::search) - Web search over the configured search provider
//! - [`reflection`](crate::tools::reflection) - Side-effect-free reflection notes
//!
//! Coordinator actions (`delegate_research`, `signal_complete`, `reflection`)
//! are interpreted by the supervisor loop itself; worker actions run through
//! the [`ToolRegistry`](crate::tools::registry::ToolRegistry).

/// Action catalogue and coordinator tool definitions.
pub mod actions;
/// Reflection tool.
pub mod reflection;
/// Tool registry for managing available tools.
pub mod registry;
/// Web search tool.
pub mod search;
