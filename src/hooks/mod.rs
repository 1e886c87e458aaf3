//! Hook system: named extension points answered by modules
//!
//! Handlers come from two places:
//! - hook files exported by modules and the host (see [`loader`])
//! - in-memory handlers registered at runtime (see [`registry`])

pub mod dispatcher;
pub mod executor;
pub mod loader;
pub mod merge;
pub mod registry;
mod types;
pub mod value;

pub use dispatcher::{Collected, Dispatcher, PendingHandler};
pub use executor::CommandHandler;
pub use loader::{DEFAULT_HOOK_FILE, HookFile};
pub use registry::{DynamicHook, HookRegistry};
pub use types::{
    DetailedOutcome, DispatchNotice, DispatchOptions, EVENT_PREFIX, HandlerFailure, HookContext,
    HookName, MergeMode, canonical_event,
};
pub use value::{FnHandler, HookCallable, HookValue, ResolvedHook};
