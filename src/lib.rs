//! plugkit - Plugin discovery, config composition and hook dispatch
//!
//! This library provides the runtime a command-line framework builds on:
//! - Locating installed extension modules across ordered roots
//! - Composing each module's manifest and merging them with the host's
//! - Dispatching named hooks to every module under a chosen merge mode
//! - Letting modules contribute subcommands to a shared namespace
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Host application                    │
//! │   argument parser  │  middleware  │  lifecycle       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                     Runtime                          │
//! │   Locator  │  Composer  │  Dispatcher  │  Extend    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                     Modules                          │
//! │   manifests  │  hook files  │  command descriptors   │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod hooks;
pub mod locator;
pub mod manifest;
pub mod middleware;
pub mod module;
pub mod runtime;

/// Application name of the bundled `plugkit` binary
pub const APP_NAME: &str = "plugkit";

pub use commands::{CommandEntry, CommandRegistrar};
pub use config::RuntimeOptions;
pub use error::{Error, HookError, Result};
pub use hooks::{
    DetailedOutcome, DispatchNotice, DispatchOptions, FnHandler, HandlerFailure, HookCallable,
    HookContext, HookName, HookValue, MergeMode,
};
pub use locator::{ModuleMap, NamePattern, Root, RootKind};
pub use manifest::{CombinedConfig, Composer, Manifest};
pub use module::Module;
pub use runtime::{ModuleSet, Runtime};
