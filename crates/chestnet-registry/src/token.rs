//! Remote tokens
//!
//! A portable item carries a short list of containers as annotation lines.
//! Each container contributes a human line for display and a machine line
//! `name|x|y|z|realm|kind` that is parsed back on the next use. The token
//! embeds its data, so nothing in the registry has to be cleaned up when the
//! item is destroyed.

use serde::{Deserialize, Serialize};

use chestnet_core::{check_container_key, ChestnetError, ContainerKey, Result, TokenConfig};
use chestnet_store::RecordStore;

use crate::model::Binding;
use crate::registry::NetworkRegistry;

const FIELD_SEPARATOR: char = '|';

/// One container referenced by a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    /// Name shown to the user
    pub name: String,
    /// Container location
    pub key: ContainerKey,
    /// Block kind label, e.g. `chest` or `barrel`
    pub block_kind: String,
}

impl TokenEntry {
    fn human_line(&self) -> String {
        format!(
            "{} ({}) at {}, {}, {} in {}",
            self.name, self.block_kind, self.key.x, self.key.y, self.key.z, self.key.realm
        )
    }

    fn machine_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.name, self.key.x, self.key.y, self.key.z, self.key.realm, self.block_kind
        )
    }
}

/// A token entry together with what the registry currently says about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry<'a> {
    /// The token entry
    pub entry: &'a TokenEntry,
    /// Current binding of the container, if any
    pub binding: Option<&'a Binding>,
}

/// Bounded, ordered list of containers carried on an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteToken {
    entries: Vec<TokenEntry>,
    capacity: usize,
}

impl RemoteToken {
    /// Create an empty token
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Create an empty token sized by configuration
    pub fn from_config(config: &TokenConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Connected containers, in connection order
    pub fn entries(&self) -> &[TokenEntry] {
        &self.entries
    }

    /// Maximum number of containers
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of connected containers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is connected
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether no further container fits
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Connect a container
    ///
    /// Reconnecting a container already on the token updates its name and
    /// kind in place and never counts against the cap. A realm that cannot be
    /// written to a machine line is rejected.
    pub fn connect(&mut self, name: &str, key: ContainerKey, block_kind: &str) -> Result<()> {
        check_container_key(&key)?;
        let block_kind = sanitize(block_kind);
        let name = match sanitize(name) {
            n if n.trim().is_empty() => block_kind.clone(),
            n => n,
        };

        if let Some(existing) = self.entries.iter_mut().find(|e| e.key == key) {
            existing.name = name;
            existing.block_kind = block_kind;
            return Ok(());
        }
        if self.is_full() {
            return Err(ChestnetError::capacity_exceeded(format!(
                "token already holds {} containers",
                self.capacity
            )));
        }

        tracing::debug!(container = %key, "connected container to token");
        self.entries.push(TokenEntry {
            name,
            key,
            block_kind,
        });
        Ok(())
    }

    /// Disconnect a container, returning whether it was connected
    pub fn disconnect(&mut self, key: &ContainerKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.key != key);
        before != self.entries.len()
    }

    /// Annotation lines: a human line then a machine line per container
    pub fn to_lore(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|e| [e.human_line(), e.machine_line()])
            .collect()
    }

    /// Rebuild a token from its annotation lines
    ///
    /// Lines without the field separator are display text and are skipped.
    pub fn from_lore<L: AsRef<str>>(lines: &[L], capacity: usize) -> Result<Self> {
        let mut token = Self::new(capacity);
        for line in lines {
            let line = line.as_ref();
            if !line.contains(FIELD_SEPARATOR) {
                continue;
            }
            let entry = parse_machine_line(line)?;
            token.connect(&entry.name, entry.key, &entry.block_kind)?;
        }
        Ok(token)
    }

    /// Look every entry up in the registry
    ///
    /// Always re-reads the registry, so containers unbound since the token
    /// was written come back with no binding.
    pub fn resolve<'a, S: RecordStore>(
        &'a self,
        registry: &'a NetworkRegistry<S>,
    ) -> Vec<ResolvedEntry<'a>> {
        self.entries
            .iter()
            .map(|entry| ResolvedEntry {
                entry,
                binding: registry.binding_of(&entry.key),
            })
            .collect()
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != FIELD_SEPARATOR && *c != '\n' && *c != '\r')
        .collect()
}

fn parse_machine_line(line: &str) -> Result<TokenEntry> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    let [name, x, y, z, realm, kind] = fields.as_slice() else {
        return Err(ChestnetError::decode(format!(
            "token line needs 6 fields, got {}: {line:?}",
            fields.len()
        )));
    };
    let coord = |s: &str| {
        s.trim()
            .parse::<i32>()
            .map_err(|_| ChestnetError::decode(format!("bad coordinate {s:?} in {line:?}")))
    };
    if realm.is_empty() {
        return Err(ChestnetError::decode(format!("token line without realm: {line:?}")));
    }
    Ok(TokenEntry {
        name: name.to_string(),
        key: ContainerKey::new(*realm, coord(*x)?, coord(*y)?, coord(*z)?),
        block_kind: kind.to_string(),
    })
}
