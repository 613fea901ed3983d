//! Network registry
//!
//! Owns every network definition and container binding for one world. Each
//! mutation is staged on a copy of the state, persisted through the chunked
//! store, and only then committed, so a failed write leaves the registry
//! exactly as it was.
//!
//! Callers hold ids and keys across user prompts. Every operation looks them
//! up again and answers `NotFound` when they went stale in the meantime.

use chestnet_core::{
    check_container_key, encode_network_id, ChestnetError, ColorTag, ContainerKey,
    DecodeFailurePolicy, NetworkId, Result, StorageConfig,
};
use chestnet_store::{ChunkedStore, RecordStore};

use crate::gate::AccessGate;
use crate::model::{
    normalize_password, Binding, ContainerBinding, NetworkDefinition, PasswordUpdate,
    RegistryState,
};
use crate::records::{decode_state, encode_state};

/// What [`NetworkRegistry::open`] found in storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing had been persisted yet
    Fresh,
    /// Persisted state was decoded
    Restored {
        /// Networks loaded
        networks: usize,
        /// Container bindings loaded
        bindings: usize,
    },
    /// Persisted state was corrupt and the registry started empty
    Recovered {
        /// Why decoding failed
        reason: String,
    },
}

/// Catalogue of networks and container bindings for one world
#[derive(Debug)]
pub struct NetworkRegistry<S> {
    store: ChunkedStore<S>,
    key_space: String,
    state: RegistryState,
}

impl<S: RecordStore> NetworkRegistry<S> {
    /// Open the registry persisted in `store`
    ///
    /// Corrupt data is handled according to `config.decode_failure`.
    pub fn open(store: S, config: &StorageConfig) -> Result<(Self, LoadOutcome)> {
        let store = ChunkedStore::from_config(store, config)?;
        let key_space = config.key_space.clone();

        let (state, outcome) = match load_state(&store, &key_space) {
            Ok(Some(state)) => {
                let outcome = LoadOutcome::Restored {
                    networks: state.networks.len(),
                    bindings: state.bindings.len(),
                };
                (state, outcome)
            }
            Ok(None) => (RegistryState::default(), LoadOutcome::Fresh),
            Err(ChestnetError::Decode { message }) => match config.decode_failure {
                DecodeFailurePolicy::Fail => return Err(ChestnetError::Decode { message }),
                DecodeFailurePolicy::StartEmpty => {
                    tracing::error!(
                        key_space = %key_space,
                        reason = %message,
                        "persisted registry is corrupt; starting empty, stored data will be overwritten by the next change"
                    );
                    (
                        RegistryState::default(),
                        LoadOutcome::Recovered { reason: message },
                    )
                }
            },
            Err(other) => return Err(other),
        };

        tracing::info!(key_space = %key_space, ?outcome, "opened network registry");
        Ok((
            Self {
                store,
                key_space,
                state,
            },
            outcome,
        ))
    }

    /// Create a network
    pub fn create_network(
        &mut self,
        display_name: &str,
        color: ColorTag,
        password: Option<&str>,
    ) -> Result<NetworkDefinition> {
        let def = NetworkDefinition::new(display_name, color, password);
        if self.state.networks.contains_key(&def.id) {
            return Err(ChestnetError::already_exists(format!(
                "network {} already exists",
                def.id
            )));
        }

        let mut staged = self.state.clone();
        staged.networks.insert(def.id.clone(), def.clone());
        self.commit(staged)?;

        tracing::info!(network = %def.id, protected = def.has_password(), "created network");
        Ok(def)
    }

    /// Rename, recolour or re-password a network
    ///
    /// When the derived id changes, every binding of the old id moves to the
    /// new one in the same write.
    pub fn edit_network(
        &mut self,
        old_id: &NetworkId,
        new_display_name: &str,
        new_color: ColorTag,
        new_password: PasswordUpdate,
        attempt: Option<&str>,
    ) -> Result<NetworkDefinition> {
        let current = self.require(old_id)?;
        AccessGate::authorize(current, attempt)?;

        let new_id = encode_network_id(new_display_name, new_color);
        if &new_id != old_id && self.state.networks.contains_key(&new_id) {
            return Err(ChestnetError::conflict(format!(
                "cannot rename {old_id}: {new_id} is another network"
            )));
        }

        let password = match new_password {
            PasswordUpdate::Keep => current.password.clone(),
            PasswordUpdate::Clear => None,
            PasswordUpdate::Set(password) => normalize_password(Some(&password)),
        };
        let def = NetworkDefinition {
            id: new_id,
            display_name: new_display_name.to_string(),
            color: new_color,
            password,
        };

        let mut staged = self.state.clone();
        staged.networks.remove(old_id);
        staged.networks.insert(def.id.clone(), def.clone());
        let migrated = if &def.id == old_id {
            0
        } else {
            staged.migrate_references(old_id, &def.id)
        };
        self.commit(staged)?;

        tracing::info!(from = %old_id, to = %def.id, migrated, "edited network");
        Ok(def)
    }

    /// Delete a network and every binding that references it
    pub fn delete_network(&mut self, id: &NetworkId, attempt: Option<&str>) -> Result<()> {
        AccessGate::authorize(self.require(id)?, attempt)?;

        let mut staged = self.state.clone();
        staged.networks.remove(id);
        let unbound = staged.remove_references(id);
        self.commit(staged)?;

        tracing::info!(network = %id, unbound, "deleted network");
        Ok(())
    }

    /// Make `key` the input of a network
    ///
    /// Clears any output bindings of `key` and replaces a previous input.
    /// `attempt` must open the target network and every protected network
    /// the container leaves in the process.
    pub fn bind_input(
        &mut self,
        key: &ContainerKey,
        network_id: &NetworkId,
        attempt: Option<&str>,
    ) -> Result<()> {
        check_container_key(key)?;
        AccessGate::authorize(self.require(network_id)?, attempt)?;

        let mut staged = self.state.clone();
        if staged.set_input(key, network_id) {
            self.authorize_departures(key, &staged, attempt)?;
            self.commit(staged)?;
            tracing::debug!(container = %key, network = %network_id, "bound input");
        }
        Ok(())
    }

    /// Add a network to the outputs of `key`
    ///
    /// Clears an input binding of `key`. Adding an existing output is a no-op.
    pub fn bind_output(
        &mut self,
        key: &ContainerKey,
        network_id: &NetworkId,
        attempt: Option<&str>,
    ) -> Result<()> {
        check_container_key(key)?;
        AccessGate::authorize(self.require(network_id)?, attempt)?;

        let mut staged = self.state.clone();
        if staged.add_output(key, network_id) {
            self.authorize_departures(key, &staged, attempt)?;
            self.commit(staged)?;
            tracing::debug!(container = %key, network = %network_id, "bound output");
        }
        Ok(())
    }

    /// Remove one network from the outputs of `key`
    pub fn unbind_output(
        &mut self,
        key: &ContainerKey,
        network_id: &NetworkId,
        attempt: Option<&str>,
    ) -> Result<()> {
        let mut staged = self.state.clone();
        if staged.remove_output(key, network_id) {
            self.authorize_departures(key, &staged, attempt)?;
            self.commit(staged)?;
            tracing::debug!(container = %key, network = %network_id, "unbound output");
        }
        Ok(())
    }

    /// Remove every output binding of `key`
    ///
    /// Nothing is removed unless `attempt` opens every protected network
    /// among them.
    pub fn clear_all_outputs(&mut self, key: &ContainerKey, attempt: Option<&str>) -> Result<()> {
        let mut staged = self.state.clone();
        if staged.clear_outputs(key) {
            self.authorize_departures(key, &staged, attempt)?;
            self.commit(staged)?;
            tracing::debug!(container = %key, "cleared outputs");
        }
        Ok(())
    }

    /// Remove the input binding of `key`
    pub fn unbind_input(&mut self, key: &ContainerKey, attempt: Option<&str>) -> Result<()> {
        let mut staged = self.state.clone();
        if staged.remove_input(key) {
            self.authorize_departures(key, &staged, attempt)?;
            self.commit(staged)?;
            tracing::debug!(container = %key, "unbound input");
        }
        Ok(())
    }

    /// All networks, sorted by display name
    pub fn list_networks(&self) -> Vec<&NetworkDefinition> {
        let mut networks: Vec<&NetworkDefinition> = self.state.networks.values().collect();
        networks.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        networks
    }

    /// Look up a network
    pub fn resolve(&self, id: &NetworkId) -> Option<&NetworkDefinition> {
        self.state.networks.get(id)
    }

    /// Containers feeding a network, in key order
    pub fn inputs_of(&self, id: &NetworkId) -> Vec<ContainerKey> {
        self.state.inputs_of(id)
    }

    /// Containers reading from a network, in key order
    pub fn outputs_of(&self, id: &NetworkId) -> Vec<ContainerKey> {
        self.state.outputs_of(id)
    }

    /// Current binding of a container
    pub fn binding_of(&self, key: &ContainerKey) -> Option<&Binding> {
        self.state.bindings.get(key)
    }

    /// Every (container, role, network) association
    pub fn bindings(&self) -> Vec<ContainerBinding> {
        self.state.container_bindings()
    }

    /// Number of defined networks
    pub fn network_count(&self) -> usize {
        self.state.networks.len()
    }

    /// Read-only view of the whole state
    pub fn state(&self) -> &RegistryState {
        &self.state
    }

    /// Underlying chunked store
    pub fn store(&self) -> &ChunkedStore<S> {
        &self.store
    }

    fn require(&self, id: &NetworkId) -> Result<&NetworkDefinition> {
        self.state
            .networks
            .get(id)
            .ok_or_else(|| ChestnetError::not_found(format!("network {id}")))
    }

    /// Gate every network that `key` is bound to now but not in `staged`
    fn authorize_departures(
        &self,
        key: &ContainerKey,
        staged: &RegistryState,
        attempt: Option<&str>,
    ) -> Result<()> {
        let remaining = staged.bindings.get(key);
        let current = self.state.bindings.get(key);
        for id in current.map(Binding::networks).unwrap_or_default() {
            if remaining.is_some_and(|b| b.references(id)) {
                continue;
            }
            if let Some(def) = self.state.networks.get(id) {
                AccessGate::authorize(def, attempt)?;
            }
        }
        Ok(())
    }

    fn commit(&mut self, staged: RegistryState) -> Result<()> {
        let payload = encode_state(&staged);
        self.store.write(&self.key_space, &payload)?;
        self.state = staged;
        Ok(())
    }
}

fn load_state<S: RecordStore>(
    store: &ChunkedStore<S>,
    key_space: &str,
) -> Result<Option<RegistryState>> {
    let payload = store.read(key_space)?;
    if payload.is_empty() && !store.exists(key_space)? {
        return Ok(None);
    }

    let mut state = decode_state(&payload)?;
    let pruned = state.prune_dangling();
    if pruned > 0 {
        tracing::warn!(key_space, pruned, "dropped bindings to undefined networks");
    }
    Ok(Some(state))
}
