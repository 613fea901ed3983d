//! Registry data model
//!
//! Network definitions and per-container bindings. A container's binding is
//! a tagged variant, so holding both roles at once cannot be represented.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chestnet_core::{encode_network_id, ColorTag, ContainerKey, NetworkId, Role};

/// A named, optionally password-protected network
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDefinition {
    /// Identifier derived from name and colour
    pub id: NetworkId,
    /// Name as entered by the user
    pub display_name: String,
    /// Colour tag
    pub color: ColorTag,
    /// Plaintext password, `None` when the network is open
    pub password: Option<String>,
}

impl NetworkDefinition {
    /// Build a definition, deriving its id
    ///
    /// An empty password means "no password".
    pub fn new(display_name: &str, color: ColorTag, password: Option<&str>) -> Self {
        Self {
            id: encode_network_id(display_name, color),
            display_name: display_name.to_string(),
            color,
            password: normalize_password(password),
        }
    }

    /// Whether mutations require a password
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

impl fmt::Debug for NetworkDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkDefinition")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("color", &self.color)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

pub(crate) fn normalize_password(password: Option<&str>) -> Option<String> {
    password.filter(|p| !p.is_empty()).map(str::to_string)
}

/// How an edit treats the existing password
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PasswordUpdate {
    /// Leave the password as it is
    #[default]
    Keep,
    /// Remove the password
    Clear,
    /// Replace the password (an empty string clears it)
    Set(String),
}

/// Binding of one container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Binding {
    /// The container feeds exactly one network
    Input(NetworkId),
    /// The container reads from these networks (never empty)
    Output(BTreeSet<NetworkId>),
}

impl Binding {
    /// Role of the container
    pub fn role(&self) -> Role {
        match self {
            Binding::Input(_) => Role::Input,
            Binding::Output(_) => Role::Output,
        }
    }

    /// Whether the binding mentions `id`
    pub fn references(&self, id: &NetworkId) -> bool {
        match self {
            Binding::Input(input) => input == id,
            Binding::Output(outputs) => outputs.contains(id),
        }
    }

    /// Networks this binding points at
    pub fn networks(&self) -> Vec<&NetworkId> {
        match self {
            Binding::Input(id) => vec![id],
            Binding::Output(ids) => ids.iter().collect(),
        }
    }
}

/// Flattened view of one (container, role, network) association
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerBinding {
    /// Container
    pub key: ContainerKey,
    /// Role the container plays
    pub role: Role,
    /// Network the container belongs to
    pub network_id: NetworkId,
}

/// Complete registry contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryState {
    pub(crate) networks: BTreeMap<NetworkId, NetworkDefinition>,
    pub(crate) bindings: BTreeMap<ContainerKey, Binding>,
}

impl RegistryState {
    /// Network definitions by id
    pub fn networks(&self) -> &BTreeMap<NetworkId, NetworkDefinition> {
        &self.networks
    }

    /// Bindings by container
    pub fn bindings(&self) -> &BTreeMap<ContainerKey, Binding> {
        &self.bindings
    }

    /// Every association, flattened and sorted
    pub fn container_bindings(&self) -> Vec<ContainerBinding> {
        let mut out = Vec::new();
        for (key, binding) in &self.bindings {
            let role = binding.role();
            for id in binding.networks() {
                out.push(ContainerBinding {
                    key: key.clone(),
                    role,
                    network_id: id.clone(),
                });
            }
        }
        out
    }

    /// Containers feeding `id`, in key order
    pub fn inputs_of(&self, id: &NetworkId) -> Vec<ContainerKey> {
        self.bindings
            .iter()
            .filter(|(_, b)| matches!(b, Binding::Input(input) if input == id))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Containers reading from `id`, in key order
    pub fn outputs_of(&self, id: &NetworkId) -> Vec<ContainerKey> {
        self.bindings
            .iter()
            .filter(|(_, b)| matches!(b, Binding::Output(ids) if ids.contains(id)))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Make `key` the input of `id`, dropping any output role
    pub(crate) fn set_input(&mut self, key: &ContainerKey, id: &NetworkId) -> bool {
        let next = Binding::Input(id.clone());
        if self.bindings.get(key) == Some(&next) {
            return false;
        }
        self.bindings.insert(key.clone(), next);
        true
    }

    /// Add `id` to the outputs of `key`, dropping any input role
    pub(crate) fn add_output(&mut self, key: &ContainerKey, id: &NetworkId) -> bool {
        match self.bindings.get_mut(key) {
            Some(Binding::Output(ids)) => ids.insert(id.clone()),
            _ => {
                self.bindings
                    .insert(key.clone(), Binding::Output(BTreeSet::from([id.clone()])));
                true
            }
        }
    }

    pub(crate) fn remove_output(&mut self, key: &ContainerKey, id: &NetworkId) -> bool {
        let Some(Binding::Output(ids)) = self.bindings.get_mut(key) else {
            return false;
        };
        let removed = ids.remove(id);
        if ids.is_empty() {
            self.bindings.remove(key);
        }
        removed
    }

    pub(crate) fn clear_outputs(&mut self, key: &ContainerKey) -> bool {
        if matches!(self.bindings.get(key), Some(Binding::Output(_))) {
            self.bindings.remove(key);
            return true;
        }
        false
    }

    pub(crate) fn remove_input(&mut self, key: &ContainerKey) -> bool {
        if matches!(self.bindings.get(key), Some(Binding::Input(_))) {
            self.bindings.remove(key);
            return true;
        }
        false
    }

    /// Drop every binding that references `id`, returning how many containers changed
    pub(crate) fn remove_references(&mut self, id: &NetworkId) -> usize {
        let mut touched = 0;
        self.bindings.retain(|_, binding| match binding {
            Binding::Input(input) => {
                let keep = input != id;
                touched += usize::from(!keep);
                keep
            }
            Binding::Output(ids) => {
                touched += usize::from(ids.remove(id));
                !ids.is_empty()
            }
        });
        touched
    }

    /// Point every binding of `old` at `new`, returning how many containers changed
    pub(crate) fn migrate_references(&mut self, old: &NetworkId, new: &NetworkId) -> usize {
        let mut touched = 0;
        for binding in self.bindings.values_mut() {
            match binding {
                Binding::Input(input) if input == old => {
                    *input = new.clone();
                    touched += 1;
                }
                Binding::Output(ids) => {
                    if ids.remove(old) {
                        ids.insert(new.clone());
                        touched += 1;
                    }
                }
                Binding::Input(_) => {}
            }
        }
        touched
    }

    /// Drop bindings whose network is not defined, returning how many went
    pub(crate) fn prune_dangling(&mut self) -> usize {
        let dangling: Vec<NetworkId> = self
            .bindings
            .values()
            .flat_map(Binding::networks)
            .filter(|id| !self.networks.contains_key(*id))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        dangling
            .iter()
            .map(|id| self.remove_references(id))
            .sum()
    }
}
