//! Activation dispatch: from a chosen menu identifier to a running plugin.

use objscope_plugin_api::{ObPluginKind, ObPluginState, OB_ERR_INVALID_ARG, OB_ERR_NOT_FOUND, OB_OK};
use tracing::info;

use crate::host::{HostContext, MessageSeverity, OwnedObjectHandle};
use crate::isolated::isolated_call;
use crate::registry::PluginRegistry;
use crate::table::build_capability_table;

/// Result of one activation attempt. Every failure has already been
/// reported through [`crate::host::HostUi`] by the time it is returned;
/// nothing here is fatal to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    Started,
    /// The identifier resolves to no registry entry.
    UnknownId,
    /// The plugin was running and the user declined the restart prompt.
    RestartDeclined,
    Rejected(ActivationRejection),
    /// No selected object, or opening it failed.
    ObjectOpenFailed { status: i32 },
    /// Start returned a failure status.
    StartFailed { status: i32 },
    /// Start unwound; contained by the fault boundary.
    StartFaulted,
}

/// Precondition violated at activation time; the plugin was not touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationRejection {
    RestrictedRuntime,
    RequiresElevation,
    RequiresDriver,
}

/// Route a menu activation to its plugin.
///
/// Runs synchronously on the calling (UI) thread: restart confirmation,
/// precondition checks, selected-object resolution for context plugins,
/// capability-table construction, and the isolated `start` call.
pub fn activate_plugin(
    registry: &PluginRegistry,
    menu_id: u32,
    host: &HostContext,
) -> ActivationOutcome {
    let Some(entry) = registry.get(menu_id) else {
        return ActivationOutcome::UnknownId;
    };

    if entry.state() == Some(ObPluginState::Running) {
        let prompt = format!(
            "The plugin \"{}\" reports it is already running.\n\nRestart it?",
            entry.description()
        );
        if !host.ui.confirm(&prompt) {
            return ActivationOutcome::RestartDeclined;
        }
        if let Err(fault) = entry.force_stop() {
            host.ui.message_box(
                MessageSeverity::Error,
                &format!("There was an error while stopping the plugin: {fault}"),
            );
        }
    }

    // All three preconditions are evaluated before any resource is acquired.
    if host.environment.restricted_runtime && !entry.supports_restricted_runtime() {
        host.ui.message_box(
            MessageSeverity::Info,
            "This plugin does not support a restricted runtime",
        );
        return ActivationOutcome::Rejected(ActivationRejection::RestrictedRuntime);
    }
    if entry.requires_elevation() && !host.environment.elevated {
        host.ui.message_box(
            MessageSeverity::Info,
            "This plugin requires administrator privileges",
        );
        return ActivationOutcome::Rejected(ActivationRejection::RequiresElevation);
    }
    if entry.requires_driver() && !host.environment.driver_ready {
        host.ui.message_box(
            MessageSeverity::Info,
            "This plugin requires the kernel driver to run",
        );
        return ActivationOutcome::Rejected(ActivationRejection::RequiresDriver);
    }

    // A context plugin is never invoked without its object handle. The
    // guard owns the handle past the start call and closes it on drop.
    let mut object_handle = None;
    if entry.kind() == Some(ObPluginKind::Context) {
        let opened = host
            .selection
            .focused_object()
            .ok_or(OB_ERR_NOT_FOUND)
            .and_then(|object| OwnedObjectHandle::open(host.namespace.clone(), &object));
        match opened {
            Ok(handle) => object_handle = Some(handle),
            Err(status) => {
                host.ui.message_box(
                    MessageSeverity::Error,
                    &format!(
                        "Cannot open the selected object!\nPlugin \"{}\" will not work\nError code 0x{status:x}",
                        entry.description()
                    ),
                );
                return ActivationOutcome::ObjectOpenFailed { status };
            }
        }
    }

    let (table, _call_ctx) = build_capability_table(
        &host.environment,
        host.services.clone(),
        host.ui.clone(),
        object_handle.as_ref(),
    );

    let Some(start) = entry.start_fn() else {
        host.ui.message_box(
            MessageSeverity::Error,
            &format!("Plugin \"{}\" has no start entry point", entry.description()),
        );
        return ActivationOutcome::StartFailed {
            status: OB_ERR_INVALID_ARG,
        };
    };

    // SAFETY: the table and its call context outlive this synchronous call;
    // the entry point was resolved from the module this entry owns.
    match isolated_call("plugin start", || unsafe { start(&*table) }) {
        Err(_fault) => {
            host.ui.message_box(
                MessageSeverity::Error,
                &format!("Plugin \"{}\" faulted during start", entry.description()),
            );
            ActivationOutcome::StartFaulted
        }
        Ok(status) if status != OB_OK => {
            host.ui.message_box(
                MessageSeverity::Error,
                &format!("Could not start plugin, error code 0x{status:x}"),
            );
            ActivationOutcome::StartFailed { status }
        }
        Ok(_) => {
            entry.set_state(ObPluginState::Running);
            info!(file = entry.file_name(), "plugin started");
            ActivationOutcome::Started
        }
    }
}
