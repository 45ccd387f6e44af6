//! Per-frame style patches.
//!
//! An [`AnimationSource`] is asked once per frame for a list of
//! `(node key, patch)` pairs, which the engine applies through
//! [`Scene::attr`](crate::scene::Scene::attr). Keys instead of ids keep
//! sources independent of the tree; patches for keys that no longer exist
//! are dropped.
//!
//! Worker threads feed patches through [`animation_channel`]; in-process
//! tweens use [`Tween`].

mod timing;
mod tween;

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Instant;

use crate::style::StylePatch;

pub use timing::TimingFunction;
pub use tween::Tween;

pub trait AnimationSource {
    /// Patches to apply for the frame at `now`.
    fn frame(&mut self, now: Instant) -> Vec<(String, StylePatch)>;

    /// A finished source is dropped by the engine.
    fn is_finished(&self) -> bool {
        false
    }
}

/// Sending half of [`animation_channel`]. Cheap to clone and `Send`.
#[derive(Clone)]
pub struct AnimationSender {
    sender: Sender<(String, StylePatch)>,
}

impl AnimationSender {
    /// Queue a patch for the next frame. Returns false once the receiving
    /// side is gone.
    pub fn send(&self, key: impl Into<String>, patch: StylePatch) -> bool {
        self.sender.send((key.into(), patch)).is_ok()
    }
}

/// Receiving half of [`animation_channel`].
pub struct ChannelSource {
    receiver: Receiver<(String, StylePatch)>,
    closed: bool,
}

impl AnimationSource for ChannelSource {
    fn frame(&mut self, _now: Instant) -> Vec<(String, StylePatch)> {
        let mut patches = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(patch) => patches.push(patch),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
        patches
    }

    fn is_finished(&self) -> bool {
        self.closed
    }
}

pub fn animation_channel() -> (AnimationSender, ChannelSource) {
    let (sender, receiver) = mpsc::channel();
    (
        AnimationSender { sender },
        ChannelSource {
            receiver,
            closed: false,
        },
    )
}
