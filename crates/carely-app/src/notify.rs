// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// Pending property-change signals, drained by the presentation layer after
/// each call into a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changes<P> {
    pending: Vec<P>,
}

impl<P> Default for Changes<P> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<P: Copy + PartialEq> Changes<P> {
    pub fn notify(&mut self, property: P) {
        self.pending.push(property);
    }

    pub fn notify_all(&mut self, properties: &[P]) {
        self.pending.extend_from_slice(properties);
    }

    pub fn contains(&self, property: P) -> bool {
        self.pending.contains(&property)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn drain(&mut self) -> Vec<P> {
        std::mem::take(&mut self.pending)
    }
}
