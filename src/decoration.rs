//! Highlight decorations owned by filters.
//!
//! An editor integration renders matched lines through opaque handles. Each
//! filter owns at most one live handle; whenever a property that affects the
//! rendering changes, the old handle is released before a new one is created.

use crate::color::Rgb;
use std::collections::HashMap;

/// Opaque handle to a rendering resource held by a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecorationHandle(u64);

impl DecorationHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// What a filter's decoration looks like, derived from its current properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecorationStyle {
    pub hue: u16,
    pub background: Rgb,
    /// Excluded filters are drawn struck through so they read as hidden in focus views
    pub strikethrough: bool,
}

/// Something that can allocate and free decorations (an editor, a terminal renderer)
pub trait DecorationHost {
    fn create(&mut self, style: &DecorationStyle) -> DecorationHandle;
    fn release(&mut self, handle: DecorationHandle);
}

/// In-memory host that tracks every live handle
#[derive(Debug, Default)]
pub struct DecorationRegistry {
    next: u64,
    live: HashMap<DecorationHandle, DecorationStyle>,
    released: usize,
}

impl DecorationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn released_count(&self) -> usize {
        self.released
    }

    pub fn style(&self, handle: DecorationHandle) -> Option<&DecorationStyle> {
        self.live.get(&handle)
    }

    pub fn is_live(&self, handle: DecorationHandle) -> bool {
        self.live.contains_key(&handle)
    }
}

impl DecorationHost for DecorationRegistry {
    fn create(&mut self, style: &DecorationStyle) -> DecorationHandle {
        self.next += 1;
        let handle = DecorationHandle(self.next);
        self.live.insert(handle, *style);
        handle
    }

    fn release(&mut self, handle: DecorationHandle) {
        if self.live.remove(&handle).is_some() {
            self.released += 1;
        } else {
            tracing::debug!(handle = handle.raw(), "release of unknown decoration ignored");
        }
    }
}
