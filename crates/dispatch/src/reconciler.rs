//! Configuration reconciliation
//!
//! Matches an incoming ordered list of handler configurations against the
//! live handler list, preserving handlers whose configuration still claims
//! them so their output is never interrupted.
//!
//! The algorithm, front to back over the incoming configs:
//! 1. probe every surviving live handler with `apply_configuration`;
//! 2. a `true` moves the handler into the keep set and consumes the config;
//! 3. an error retires the probed handler as compromised;
//! 4. live handlers no config claimed are deactivated;
//! 5. the list is rebuilt from the keep set, then unclaimed configs are
//!    instantiated through the factory registry and appended.

use scribe_config::HandlerConfig;

use crate::handler::Handler;
use crate::handler_list::HandlerList;
use crate::registry::{HandlerRegistry, ServiceContainer};

pub(crate) async fn reconcile(
    list: &mut HandlerList,
    incoming: Vec<HandlerConfig>,
    registry: &HandlerRegistry,
    services: &ServiceContainer,
) {
    let mut keep: Vec<Box<dyn Handler>> = Vec::new();
    let mut unclaimed: Vec<HandlerConfig> = Vec::new();

    for config in incoming {
        let mut claimed = false;
        let mut index = 0;
        while index < list.len() {
            match list.apply_config_at(index, &config) {
                Ok(true) => {
                    keep.push(list.remove_at(index));
                    claimed = true;
                    break;
                }
                Ok(false) => index += 1,
                Err(error) => {
                    let mut handler = list.remove_at(index);
                    tracing::error!(
                        handler = %handler.name(),
                        %error,
                        "handler failed while probing a configuration, removing it"
                    );
                    if let Err(error) = handler.deactivate().await {
                        tracing::warn!(
                            handler = %handler.name(),
                            %error,
                            "compromised handler also failed during deactivation"
                        );
                    }
                }
            }
        }
        if !claimed {
            unclaimed.push(config);
        }
    }

    // Live handlers no incoming config claimed are retired.
    for mut handler in list.drain_all() {
        tracing::info!(handler = %handler.name(), "handler no longer configured, deactivating");
        if let Err(error) = handler.deactivate().await {
            tracing::warn!(
                handler = %handler.name(),
                %error,
                "handler failed during deactivation"
            );
        }
    }

    list.replace(keep);

    for config in unclaimed {
        match registry.create(&config, services) {
            Ok(mut handler) => match handler.activate().await {
                Ok(()) => {
                    tracing::info!(handler = %handler.name(), "handler activated");
                    list.push(handler);
                }
                Err(error) => {
                    tracing::error!(
                        handler = config.identity(),
                        %error,
                        "handler failed to activate, skipping"
                    );
                }
            },
            Err(error) => {
                tracing::error!(
                    kind = config.type_name(),
                    handler = config.identity(),
                    %error,
                    "could not instantiate handler"
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod reconciler_test;
