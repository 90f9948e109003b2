//! Scene-scoped publish/subscribe channels.
//!
//! Each scene opens one channel and addresses it by [`ChannelId`]; nothing
//! holds a reference to the scene itself. Listeners (tooltips, persistence,
//! selection bridges, ...) subscribe to the channel, and closing the channel
//! drops every listener at once.
//!
//! Events emitted while a listener is running are queued and delivered after
//! the current event has reached every listener.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use annoscene_core::{Point, Rect};
use serde::Serialize;

use crate::overlay::{Label, OverlayId};
use crate::scene::SceneOptions;

/// Notifications published by a scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SceneEvent {
    OverlayAdded {
        id: OverlayId,
    },
    OverlayRemoved {
        id: OverlayId,
    },
    OverlayError {
        id: OverlayId,
        message: String,
    },
    OverlayBoundsChanged {
        id: OverlayId,
        relative: Option<Rect>,
        absolute: Rect,
    },
    LabelChanged {
        id: OverlayId,
        label: Label,
    },
    CommandExecuted {
        command_id: u64,
        description: String,
    },
    CommandUndone {
        command_id: u64,
        description: String,
    },
    CommandRedone {
        command_id: u64,
        description: String,
    },
    DragStart {
        id: OverlayId,
        point: Point,
    },
    DragMove {
        id: OverlayId,
        bounds: Rect,
    },
    DragEnd {
        id: OverlayId,
        bounds: Rect,
    },
    ResizeStart {
        id: OverlayId,
        point: Point,
    },
    ResizeMove {
        id: OverlayId,
        bounds: Rect,
    },
    ResizeEnd {
        id: OverlayId,
        bounds: Rect,
    },
    HoverEnter {
        id: OverlayId,
        point: Option<Point>,
    },
    HoverLeave {
        id: OverlayId,
    },
    Click {
        id: Option<OverlayId>,
        point: Point,
    },
    DoubleClick {
        id: Option<OverlayId>,
        point: Point,
    },
    EstablishStart {
        point: Point,
    },
    EstablishMove {
        bounds: Rect,
    },
    /// A new box was drawn and waits for a label.
    EstablishEnd {
        relative: Rect,
        absolute: Rect,
    },
    EstablishCancelled,
    SelectionChanged {
        selected: Vec<OverlayId>,
    },
    SelectionCleared,
    CanonicalMediaChanged {
        id: Option<OverlayId>,
    },
    SceneOptionsChanged {
        options: SceneOptions,
    },
    DrawingSessionStarted,
    DrawingSessionEnded,
}

/// Address of a scene's channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChannelId(u64);

/// Handle returned by [`subscribe`], used to [`unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&SceneEvent)>;

#[derive(Default)]
struct Channel {
    listeners: Vec<(SubscriptionId, Listener)>,
    queue: VecDeque<SceneEvent>,
    dispatching: bool,
    /// Unsubscribed while their listener list was out for dispatch.
    removed: Vec<SubscriptionId>,
}

#[derive(Default)]
struct Hub {
    next_channel: u64,
    next_subscription: u64,
    channels: HashMap<ChannelId, Channel>,
}

thread_local! {
    static HUB: RefCell<Hub> = RefCell::new(Hub::default());
}

/// Open a new, empty channel.
pub fn open_channel() -> ChannelId {
    HUB.with(|hub| {
        let mut hub = hub.borrow_mut();
        hub.next_channel += 1;
        let id = ChannelId(hub.next_channel);
        hub.channels.insert(id, Channel::default());
        id
    })
}

/// Close a channel, dropping all of its listeners and queued events.
pub fn close_channel(channel: ChannelId) {
    let dropped = HUB.with(|hub| hub.borrow_mut().channels.remove(&channel));
    if let Some(dropped) = dropped {
        log::debug!(
            "Closed event channel {:?} ({} listeners)",
            channel,
            dropped.listeners.len()
        );
    }
}

/// Whether a channel is still open.
pub fn is_open(channel: ChannelId) -> bool {
    HUB.with(|hub| hub.borrow().channels.contains_key(&channel))
}

/// Subscribe to a channel. Returns `None` if the channel is closed.
pub fn subscribe<F>(channel: ChannelId, listener: F) -> Option<SubscriptionId>
where
    F: FnMut(&SceneEvent) + 'static,
{
    HUB.with(|hub| {
        let mut hub = hub.borrow_mut();
        hub.next_subscription += 1;
        let id = SubscriptionId(hub.next_subscription);
        let channel = hub.channels.get_mut(&channel)?;
        channel.listeners.push((id, Box::new(listener)));
        Some(id)
    })
}

/// Remove a listener. Unknown ids are ignored.
pub fn unsubscribe(channel: ChannelId, subscription: SubscriptionId) {
    let removed = HUB.with(|hub| {
        let mut hub = hub.borrow_mut();
        let channel = hub.channels.get_mut(&channel)?;
        if let Some(index) = channel.listeners.iter().position(|(id, _)| *id == subscription) {
            return Some(channel.listeners.remove(index));
        }
        if channel.dispatching {
            channel.removed.push(subscription);
        }
        None
    });
    drop(removed);
}

/// Number of listeners on a channel (0 if closed).
pub fn listener_count(channel: ChannelId) -> usize {
    HUB.with(|hub| {
        hub.borrow()
            .channels
            .get(&channel)
            .map(|c| c.listeners.len())
            .unwrap_or(0)
    })
}

/// Publish an event on a channel. Events on closed channels are dropped.
pub fn emit(channel: ChannelId, event: SceneEvent) {
    log::trace!("Event on {:?}: {:?}", channel, event);

    let start_dispatch = HUB.with(|hub| {
        let mut hub = hub.borrow_mut();
        let Some(ch) = hub.channels.get_mut(&channel) else {
            return false;
        };
        ch.queue.push_back(event);
        if ch.dispatching {
            return false;
        }
        ch.dispatching = true;
        true
    });
    if !start_dispatch {
        return;
    }

    loop {
        // Listeners run with the hub unborrowed so they may emit/subscribe.
        let next = HUB.with(|hub| {
            let mut hub = hub.borrow_mut();
            let ch = hub.channels.get_mut(&channel)?;
            match ch.queue.pop_front() {
                Some(event) => Some((event, std::mem::take(&mut ch.listeners))),
                None => {
                    ch.dispatching = false;
                    None
                }
            }
        });
        let Some((event, mut listeners)) = next else {
            break;
        };

        for (_, listener) in listeners.iter_mut() {
            listener(&event);
        }

        let leftover = HUB.with(|hub| {
            let mut hub = hub.borrow_mut();
            let Some(ch) = hub.channels.get_mut(&channel) else {
                // Closed by a listener.
                return Some(listeners);
            };
            let removed = std::mem::take(&mut ch.removed);
            let (kept, dropped): (Vec<_>, Vec<_>) = listeners
                .into_iter()
                .partition(|(id, _)| !removed.contains(id));
            let added = std::mem::replace(&mut ch.listeners, kept);
            ch.listeners.extend(added);
            Some(dropped)
        });
        drop(leftover);
    }
}
