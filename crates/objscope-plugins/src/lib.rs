//! Plugin manager core for the Objscope namespace inspector.
//!
//! Discovers plugin modules in a subdirectory at startup, validates them by
//! their embedded file description, drives the load/start/stop lifecycle,
//! and dispatches menu activations, handing each started plugin a fixed
//! capability table of host services. Faults in plugin code are contained
//! at every boundary; a broken plugin costs one operation, never the host.

#![warn(unsafe_op_in_unsafe_fn)]

mod config;
mod discovery;
mod dispatch;
mod error;
mod host;
mod isolated;
mod load;
mod menu;
mod registry;
mod table;
mod util;
mod validate;

pub use config::PluginManagerConfig;
pub use discovery::{discover_plugins, spawn_discovery, DiscoveryReport, DiscoveryTask};
pub use dispatch::{activate_plugin, ActivationOutcome, ActivationRejection};
pub use error::{Error, Result};
pub use host::{
    HostContext, HostEnvironment, HostServices, HostUi, MessageSeverity, ModuleEntry,
    ObjectNamespace, OwnedObjectHandle, SelectedObject, SelectionSource, SelectionSurface,
    ServiceResult,
};
pub use isolated::{isolated_call, panic_message, Fault};
pub use menu::{context_menu_entries, static_menu_entries, MenuEntry};
pub use registry::{PluginEntry, PluginRegistry};
pub use validate::has_plugin_description;
