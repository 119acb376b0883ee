use indexmap::IndexMap;

use crate::runtime::link::RuntimeLink;
use crate::runtime::link_storage::LinkStorage;
use crate::runtime::node::HashLinkDirection;
use crate::signature::Signature;

/// Transient `hash -> direction -> endpoints` table filled while nodes are
/// wired and resolved once every node of the compile has been visited.
#[derive(Debug, Default)]
pub struct HashLinkTree {
    entries: IndexMap<Signature, [Vec<RuntimeLink>; 2]>,
}

impl HashLinkTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, hash: Signature, direction: HashLinkDirection, link: RuntimeLink) {
        self.entries.entry(hash).or_default()[direction as usize].push(link);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hashes declared on one side only.
    pub fn unmatched(&self) -> impl Iterator<Item = Signature> + '_ {
        self.entries
            .iter()
            .filter(|(_, [from, to])| from.is_empty() || to.is_empty())
            .map(|(hash, _)| *hash)
    }

    /// Connects every `From` endpoint to every `To` endpoint sharing its hash.
    /// Returns the number of links created.
    pub fn resolve(self, links: &mut LinkStorage) -> usize {
        let mut created = 0;
        for (_, [from, to]) in self.entries {
            for &owner in &from {
                let mut cursor = links.select_port(owner);
                for &target in &to {
                    cursor.append(target);
                    created += 1;
                }
            }
        }
        created
    }
}
