use tracing::trace;

use crate::extensions::{ChartPlugin, PluginContext, PluginEvent};

use super::ChartEngine;

impl<D: 'static> ChartEngine<D> {
    pub(super) fn plugin_context(&self) -> PluginContext {
        PluginContext {
            items_len: self.items.len(),
            in_flight_fetches: self.provider.in_flight_len(),
            live_timers: self.live.len(),
        }
    }
}

/// Takes the plugin list separately so events may borrow other engine state.
pub(super) fn emit(
    plugins: &mut [Box<dyn ChartPlugin>],
    event: &PluginEvent<'_>,
    context: PluginContext,
) {
    for plugin in plugins.iter_mut() {
        trace!(plugin = plugin.id(), "dispatching plugin event");
        plugin.on_event(event, context);
    }
}
