//! Persisted record format
//!
//! The registry is written as one payload of newline-separated records:
//!
//! ```text
//! net:{id}|{display name}|{colour}[|p={password}]
//! in:{container key}|{network id}
//! out:{container key}|{network id}
//! ```
//!
//! Display names and passwords are percent-encoded so the `|` delimiter and
//! line breaks never appear inside a field. Older records stored display
//! names raw, so a name only has the escapes of reserved characters undone
//! and any other `%` is kept as written. Stored ids are kept as written,
//! so a network created under an older slug rule keeps its id.

use std::collections::BTreeSet;

use chestnet_core::{
    decode_container_key, encode_container_key, percent_decode, percent_decode_lenient,
    percent_encode, ChestnetError, ColorTag, ContainerKey, NetworkId, Result,
};

use crate::model::{Binding, NetworkDefinition, RegistryState};

const NETWORK_PREFIX: &str = "net";
const INPUT_PREFIX: &str = "in";
const OUTPUT_PREFIX: &str = "out";
const PASSWORD_FIELD: &str = "p=";

/// Serialize the registry state
///
/// Output is deterministic: networks by id, then bindings by container.
pub fn encode_state(state: &RegistryState) -> String {
    let mut out = String::new();
    for def in state.networks.values() {
        out.push_str(&encode_network(def));
        out.push('\n');
    }
    for (key, binding) in &state.bindings {
        let key = encode_container_key(key);
        match binding {
            Binding::Input(id) => {
                out.push_str(&format!("{INPUT_PREFIX}:{key}|{id}\n"));
            }
            Binding::Output(ids) => {
                for id in ids {
                    out.push_str(&format!("{OUTPUT_PREFIX}:{key}|{id}\n"));
                }
            }
        }
    }
    out
}

fn encode_network(def: &NetworkDefinition) -> String {
    let mut record = format!(
        "{NETWORK_PREFIX}:{}|{}|{}",
        def.id,
        percent_encode(&def.display_name),
        def.color
    );
    if let Some(password) = &def.password {
        record.push('|');
        record.push_str(PASSWORD_FIELD);
        record.push_str(&percent_encode(password));
    }
    record
}

/// Parse a payload written by [`encode_state`] or an older version
///
/// Blank lines are skipped. Any malformed line fails the whole decode with
/// its line number.
pub fn decode_state(payload: &str) -> Result<RegistryState> {
    let mut state = RegistryState::default();
    for (index, line) in payload.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        decode_line(&mut state, line).map_err(|e| {
            ChestnetError::decode(format!("line {}: {}", index + 1, error_detail(&e)))
        })?;
    }
    Ok(state)
}

fn error_detail(err: &ChestnetError) -> String {
    match err {
        ChestnetError::Decode { message } => message.clone(),
        other => other.to_string(),
    }
}

fn decode_line(state: &mut RegistryState, line: &str) -> Result<()> {
    let Some((prefix, body)) = line.split_once(':') else {
        return Err(ChestnetError::decode(format!("record without prefix: {line:?}")));
    };
    match prefix {
        NETWORK_PREFIX => {
            let def = decode_network(body)?;
            if state.networks.contains_key(&def.id) {
                return Err(ChestnetError::decode(format!("duplicate network {}", def.id)));
            }
            state.networks.insert(def.id.clone(), def);
        }
        INPUT_PREFIX => {
            let (key, id) = decode_binding(body)?;
            if state.bindings.contains_key(&key) {
                return Err(ChestnetError::decode(format!(
                    "container {key} bound more than once"
                )));
            }
            state.bindings.insert(key, Binding::Input(id));
        }
        OUTPUT_PREFIX => {
            let (key, id) = decode_binding(body)?;
            match state.bindings.get_mut(&key) {
                Some(Binding::Output(ids)) => {
                    ids.insert(id);
                }
                Some(Binding::Input(_)) => {
                    return Err(ChestnetError::decode(format!(
                        "container {key} is both input and output"
                    )));
                }
                None => {
                    state
                        .bindings
                        .insert(key, Binding::Output(BTreeSet::from([id])));
                }
            }
        }
        other => {
            return Err(ChestnetError::decode(format!("unknown record prefix {other:?}")));
        }
    }
    Ok(())
}

fn decode_network(body: &str) -> Result<NetworkDefinition> {
    let mut fields = body.split('|');
    let id: NetworkId = fields.next().unwrap_or_default().parse()?;
    let display_name = fields
        .next()
        .map(percent_decode_lenient)
        .ok_or_else(|| ChestnetError::decode(format!("network {id} has no display name")))?;

    let mut color: Option<ColorTag> = None;
    let mut password: Option<String> = None;
    for field in fields {
        if let Some(raw) = field.strip_prefix(PASSWORD_FIELD) {
            if password.is_some() {
                return Err(ChestnetError::decode(format!("network {id} has two passwords")));
            }
            password = Some(percent_decode(raw)?);
        } else if color.is_none() && password.is_none() {
            color = Some(field.parse()?);
        } else {
            return Err(ChestnetError::decode(format!(
                "unexpected field {field:?} in network {id}"
            )));
        }
    }

    // legacy records carry no colour field
    let color = color.or_else(|| id.color()).unwrap_or_default();
    Ok(NetworkDefinition {
        id,
        display_name,
        color,
        password: password.filter(|p| !p.is_empty()),
    })
}

fn decode_binding(body: &str) -> Result<(ContainerKey, NetworkId)> {
    let Some((key, id)) = body.split_once('|') else {
        return Err(ChestnetError::decode(format!("binding without network: {body:?}")));
    };
    Ok((decode_container_key(key)?, id.parse()?))
}
