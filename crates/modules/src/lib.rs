//! Convention-over-configuration module pipeline.
//!
//! User modules are data files that export one descriptor, or a list of
//! them, shaped as `{ tag = "event" | "command", payload = { ... } }`.
//! Executable behaviour is referenced by name through `{ "$action" = "..." }`
//! values and resolved against an [`ActionTable`].
//!
//! Discover → load → normalize → validate → partition:
//!
//! ```rust,ignore
//! let source = FsModuleSource::new(root, discoverer, loader);
//! let loaded = load_modules(&source).await?;
//! ```

pub mod actions;
pub mod descriptor;
pub mod discover;
pub mod error;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod source;
pub mod validate;
pub mod value;

pub use {
    actions::{ACTION_KEY, ActionRequest, ActionTable},
    descriptor::{
        CommandData, CommandDescriptor, Cooldown, EventDescriptor, Executable, ModuleDescriptor,
        ModuleOrigin,
    },
    discover::FileDiscoverer,
    error::{Error, Result},
    loader::ModuleLoader,
    normalize::{NormalizedEntry, normalize},
    pipeline::{LoadedModules, load_modules},
    source::{
        EmbeddedModuleSource, FsModuleSource, ModuleSource, RawModuleEntry, StaticModuleSource,
    },
    validate::{ValidationFailure, validate},
    value::{
        Callable, CallableKind, CommandFn, CooldownCheck, CooldownFn, EventArgs, EventFn,
        HandlerFn, ModuleValue,
    },
};
