//! Ordered multimap from a port to the list of links it owns.
//!
//! Every port key `(source, node, port)` heads a doubly linked list of
//! [`RuntimeLink`] targets stored in a shared slot arena. Insertion goes
//! through a [`PortCursor`] returned by [`LinkStorage::select_port`], so a
//! link can never be inserted without a selected port. Traversal by index
//! (`first_link` / `next_link` / `link`) is O(1).
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::BlueprintError;
use crate::runtime::link::RuntimeLink;

#[derive(Debug, Clone, Copy)]
struct LinkSlot {
    link: RuntimeLink,
    owner: RuntimeLink,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
struct PortEntry {
    first: Option<usize>,
    last: Option<usize>,
    len: usize,
}

/// All links of one port, used for dumps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortLinks {
    pub port: RuntimeLink,
    pub links: Vec<RuntimeLink>,
}

#[derive(Debug, Clone, Default)]
pub struct LinkStorage {
    ports: FxHashMap<RuntimeLink, PortEntry>,
    slots: Vec<Option<LinkSlot>>,
    free: Vec<usize>,
}

impl LinkStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(links: usize) -> Self {
        Self {
            ports: FxHashMap::with_capacity_and_hasher(links, Default::default()),
            slots: Vec::with_capacity(links),
            free: Vec::new(),
        }
    }

    /// Selects `port` for insertion. The port entry is created on first insert.
    pub fn select_port(&mut self, port: RuntimeLink) -> PortCursor<'_> {
        PortCursor { storage: self, port }
    }

    pub fn first_link(&self, port: RuntimeLink) -> Option<usize> {
        self.ports.get(&port).and_then(|entry| entry.first)
    }

    pub fn last_link(&self, port: RuntimeLink) -> Option<usize> {
        self.ports.get(&port).and_then(|entry| entry.last)
    }

    pub fn next_link(&self, index: usize) -> Option<usize> {
        self.slot(index).and_then(|slot| slot.next)
    }

    pub fn link(&self, index: usize) -> Option<RuntimeLink> {
        self.slot(index).map(|slot| slot.link)
    }

    /// Iterates the targets stored under `port` in list order.
    pub fn links(&self, port: RuntimeLink) -> LinkIter<'_> {
        LinkIter {
            storage: self,
            next: self.first_link(port),
        }
    }

    pub fn link_len(&self, port: RuntimeLink) -> usize {
        self.ports.get(&port).map_or(0, |entry| entry.len)
    }

    pub fn contains_port(&self, port: RuntimeLink) -> bool {
        self.ports.contains_key(&port)
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    pub fn link_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Ports that own at least one link, sorted.
    pub fn ports(&self) -> Vec<RuntimeLink> {
        let mut ports: Vec<RuntimeLink> = self.ports.keys().copied().collect();
        ports.sort_unstable();
        ports
    }

    pub fn to_table(&self) -> Vec<PortLinks> {
        self.ports()
            .into_iter()
            .map(|port| PortLinks {
                port,
                links: self.links(port).collect(),
            })
            .collect()
    }

    /// Removes one link and returns its target.
    pub fn remove_link(&mut self, index: usize) -> Result<RuntimeLink, BlueprintError> {
        let slot = self
            .slots
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(BlueprintError::InvalidLink(index))?;

        if let Some(prev) = slot.prev {
            if let Some(prev_slot) = self.slot_mut(prev) {
                prev_slot.next = slot.next;
            }
        }
        if let Some(next) = slot.next {
            if let Some(next_slot) = self.slot_mut(next) {
                next_slot.prev = slot.prev;
            }
        }

        let now_empty = match self.ports.get_mut(&slot.owner) {
            Some(entry) => {
                if entry.first == Some(index) {
                    entry.first = slot.next;
                }
                if entry.last == Some(index) {
                    entry.last = slot.prev;
                }
                entry.len -= 1;
                entry.len == 0
            }
            None => false,
        };
        if now_empty {
            self.ports.remove(&slot.owner);
        }

        self.free.push(index);
        Ok(slot.link)
    }

    /// Removes a port with all of its links. Returns the number of removed links.
    pub fn remove_port(&mut self, port: RuntimeLink) -> usize {
        let Some(entry) = self.ports.remove(&port) else {
            return 0;
        };

        let mut removed = 0;
        let mut next = entry.first;
        while let Some(index) = next {
            next = self.slots.get_mut(index).and_then(Option::take).and_then(|slot| slot.next);
            self.free.push(index);
            removed += 1;
        }
        removed
    }

    /// Collapses linker indirections.
    ///
    /// Every stored target for which `is_linker` holds is replaced by the
    /// flattened list of links stored under that target, recursively. After
    /// this pass no list contains a linker target. Cyclic linker chains are
    /// broken by dropping the link that closes the cycle; a port whose
    /// expansion crossed a cycle keeps each target once.
    pub fn inline_links(&mut self, is_linker: impl Fn(RuntimeLink) -> bool) -> usize {
        let mut resolved: FxHashMap<RuntimeLink, Vec<RuntimeLink>> = FxHashMap::default();
        let mut visiting: FxHashSet<RuntimeLink> = FxHashSet::default();
        let mut rewrites = Vec::new();

        // Expand against the original lists, then rewrite.
        for port in self.ports() {
            if !self.links(port).any(&is_linker) {
                continue;
            }

            let mut flat = Vec::with_capacity(self.link_len(port));
            let mut cut = false;
            visiting.insert(port);
            for target in self.links(port) {
                cut |= self.flatten_target(target, &is_linker, &mut resolved, &mut visiting, &mut flat);
            }
            visiting.remove(&port);

            if cut {
                let mut seen = FxHashSet::default();
                flat.retain(|link| seen.insert(*link));
            }
            rewrites.push((port, flat));
        }

        let rewritten = rewrites.len();
        for (port, flat) in rewrites {
            self.replace_port(port, &flat);
        }

        debug!(ports = rewritten, links = self.link_count(), "Inlined linker ports");
        rewritten
    }

    /// Appends the flattened targets of `target` to `out`. Returns true when
    /// a cycle was cut somewhere below; such partial lists are not memoized.
    fn flatten_target(
        &self,
        target: RuntimeLink,
        is_linker: &impl Fn(RuntimeLink) -> bool,
        resolved: &mut FxHashMap<RuntimeLink, Vec<RuntimeLink>>,
        visiting: &mut FxHashSet<RuntimeLink>,
        out: &mut Vec<RuntimeLink>,
    ) -> bool {
        if !is_linker(target) {
            out.push(target);
            return false;
        }
        if let Some(links) = resolved.get(&target) {
            out.extend_from_slice(links);
            return false;
        }
        if !visiting.insert(target) {
            warn!(port = %target, "Linker cycle detected, dropping link");
            return true;
        }

        let mut flat = Vec::new();
        let mut cut = false;
        for next in self.links(target) {
            cut |= self.flatten_target(next, is_linker, resolved, visiting, &mut flat);
        }

        visiting.remove(&target);
        out.extend_from_slice(&flat);
        if !cut {
            resolved.insert(target, flat);
        }
        cut
    }

    fn replace_port(&mut self, port: RuntimeLink, links: &[RuntimeLink]) {
        self.remove_port(port);
        let mut cursor = self.select_port(port);
        for &link in links {
            cursor.append(link);
        }
    }

    fn slot(&self, index: usize) -> Option<&LinkSlot> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, index: usize) -> Option<&mut LinkSlot> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    fn alloc(&mut self, slot: LinkSlot) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(slot);
                index
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }
}

/// Insertion cursor over one selected port.
pub struct PortCursor<'a> {
    storage: &'a mut LinkStorage,
    port: RuntimeLink,
}

impl PortCursor<'_> {
    pub fn port(&self) -> RuntimeLink {
        self.port
    }

    pub fn first_link(&self) -> Option<usize> {
        self.storage.first_link(self.port)
    }

    pub fn last_link(&self) -> Option<usize> {
        self.storage.last_link(self.port)
    }

    /// Inserts `link` after `after`, or as the first link of the port when
    /// `after` is `None`. Returns the new link index.
    pub fn insert_link_after(&mut self, after: Option<usize>, link: RuntimeLink) -> Result<usize, BlueprintError> {
        let next = match after {
            Some(index) => {
                let slot = self.storage.slot(index).ok_or(BlueprintError::InvalidLink(index))?;
                if slot.owner != self.port {
                    return Err(BlueprintError::LinkNotInPort { index, port: self.port });
                }
                slot.next
            }
            None => self.first_link(),
        };

        let index = self.storage.alloc(LinkSlot {
            link,
            owner: self.port,
            prev: after,
            next,
        });

        if let Some(prev) = after {
            if let Some(prev_slot) = self.storage.slot_mut(prev) {
                prev_slot.next = Some(index);
            }
        }
        if let Some(next) = next {
            if let Some(next_slot) = self.storage.slot_mut(next) {
                next_slot.prev = Some(index);
            }
        }

        let entry = self.storage.ports.entry(self.port).or_default();
        if after.is_none() {
            entry.first = Some(index);
        }
        if next.is_none() {
            entry.last = Some(index);
        }
        entry.len += 1;

        Ok(index)
    }

    /// Appends `link` at the end of the port list.
    pub fn append(&mut self, link: RuntimeLink) -> usize {
        let last = self.last_link();
        let index = self.storage.alloc(LinkSlot {
            link,
            owner: self.port,
            prev: last,
            next: None,
        });

        if let Some(prev) = last {
            if let Some(prev_slot) = self.storage.slot_mut(prev) {
                prev_slot.next = Some(index);
            }
        }

        let entry = self.storage.ports.entry(self.port).or_default();
        if entry.first.is_none() {
            entry.first = Some(index);
        }
        entry.last = Some(index);
        entry.len += 1;
        index
    }
}

pub struct LinkIter<'a> {
    storage: &'a LinkStorage,
    next: Option<usize>,
}

impl Iterator for LinkIter<'_> {
    type Item = RuntimeLink;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next?;
        let slot = self.storage.slot(index)?;
        self.next = slot.next;
        Some(slot.link)
    }
}
