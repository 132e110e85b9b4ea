//! Panic tracking
//!
//! When a configuration enables `track_panics`, unhandled panics are
//! reported through the sink as fatal events before the previous hook
//! runs. Installation is process-wide and happens at most once.

use std::panic;
use std::sync::Once;

use scribe_event::{Level, TagSet};

use crate::sink::SinkClient;

static INSTALL: Once = Once::new();

pub(crate) fn install(client: SinkClient) {
    INSTALL.call_once(move || {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let event = client.create_event(
                Level::Fatal,
                TagSet::EMPTY,
                format!("unhandled panic: {info}"),
            );
            if let Err(event) = client.try_submit(event) {
                event.release();
            }
            previous(info);
        }));
        tracing::debug!("panic tracking installed");
    });
}
