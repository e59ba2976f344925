use std::path::Path;

use collections::BTreeMap;

use crate::entity::Terminal;
use crate::host::{BufferId, ProcessHandle};

/// Every terminal that has been created, keyed by the number it was
/// requested under.
///
/// A new terminal's own `id` is one more than the registry size at creation
/// time, which is not necessarily the key it is stored under. A first
/// request for terminal 5 stores it at key 5 with id 1; later lookups of
/// terminal 5 return that same entity. Callers rely on this numbering, so it
/// is kept as is.
#[derive(Debug, Default)]
pub struct Registry {
    terminals: BTreeMap<u32, Terminal>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the terminal stored under `id`, creating it in `directory` if
    /// absent. The flag is true when the terminal was created by this call.
    pub fn get_or_create(&mut self, id: u32, directory: &Path) -> (&mut Terminal, bool) {
        let next = self.terminals.len() as u32 + 1;
        let mut created = false;
        let terminal = self.terminals.entry(id).or_insert_with(|| {
            created = true;
            Terminal::new(next, directory.to_path_buf())
        });
        if created {
            tracing::debug!(key = id, terminal = next, "Created terminal");
        }
        (terminal, created)
    }

    pub fn get(&self, id: u32) -> Option<&Terminal> {
        self.terminals.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Terminal> {
        self.terminals.get_mut(&id)
    }

    /// Drop every terminal. Processes and windows are left to the host.
    pub fn reset(&mut self) {
        self.terminals.clear();
    }

    /// Terminals in ascending key order.
    pub fn all(&self) -> &BTreeMap<u32, Terminal> {
        &self.terminals
    }

    pub(crate) fn terminals_mut(&mut self) -> impl Iterator<Item = &mut Terminal> {
        self.terminals.values_mut()
    }

    pub fn len(&self) -> usize {
        self.terminals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terminals.is_empty()
    }

    pub fn ids_descending(&self) -> Vec<u32> {
        self.terminals.keys().rev().copied().collect()
    }

    pub fn highest_id(&self) -> Option<u32> {
        self.terminals.keys().next_back().copied()
    }

    /// Key of the terminal that owns `buffer`.
    pub fn find_by_buffer(&self, buffer: BufferId) -> Option<u32> {
        self.terminals
            .iter()
            .find(|(_, terminal)| terminal.buffer() == Some(buffer))
            .map(|(key, _)| *key)
    }

    /// Key of the terminal whose own id is `number`.
    pub fn find_by_number(&self, number: u32) -> Option<u32> {
        self.terminals
            .iter()
            .find(|(_, terminal)| terminal.id() == number)
            .map(|(key, _)| *key)
    }

    /// Key of the terminal running `process`.
    pub fn find_by_process(&self, process: ProcessHandle) -> Option<u32> {
        self.terminals
            .iter()
            .find(|(_, terminal)| terminal.process() == Some(process))
            .map(|(key, _)| *key)
    }
}
