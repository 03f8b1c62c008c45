//! # LogObserver — simple event printer
//!
//! A minimal observer that prints incoming [`NavEvent`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [started] depth=1
//! [attached] node=#3 tag="contact-list"
//! [stack-changed] depth=2 top="contact-list"
//! [output] node=#3 tag="contact-list"
//! [detached] node=#3 tag="contact-list"
//! [disposed]
//! ```

use async_trait::async_trait;

use crate::events::{EventKind, NavEvent};
use crate::observers::Observe;

/// Event printer observer.
#[derive(Default)]
pub struct LogObserver;

impl LogObserver {
    /// Constructs a new [`LogObserver`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Observe for LogObserver {
    async fn on_event(&self, e: &NavEvent) {
        match e.kind {
            EventKind::Started => {
                println!("[started] depth={:?}", e.depth);
            }
            EventKind::Disposed => {
                println!("[disposed]");
            }
            EventKind::NodeAttached => {
                println!("[attached] node={:?} tag={:?}", e.node, e.tag);
            }
            EventKind::NodeDetached => {
                println!("[detached] node={:?} tag={:?}", e.node, e.tag);
            }
            EventKind::StackChanged => {
                println!("[stack-changed] depth={:?} top={:?}", e.depth, e.tag);
            }
            EventKind::OutputForwarded => {
                println!("[output] node={:?} tag={:?}", e.node, e.tag);
            }
            EventKind::CollectorLagged => {
                println!("[collector-lagged] node={:?} {:?}", e.node, e.reason);
            }
            EventKind::RouterPanicked => {
                println!("[router-panicked] node={:?} info={:?}", e.node, e.reason);
            }
            EventKind::ObserverOverflow => {
                println!("[observer-overflow] observer={:?} reason={:?}", e.tag, e.reason);
            }
            EventKind::ObserverPanicked => {
                println!(
                    "[observer-panicked] observer={} info={}",
                    e.tag.as_deref().unwrap_or("unknown"),
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogObserver"
    }
}
