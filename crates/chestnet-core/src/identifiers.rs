//! Core identifier types
//!
//! Value types that name containers, networks and items. All of them are
//! plain data: they carry no reference to host-engine objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ChestnetError;

/// Unique location of a physical storage container
///
/// Ordered by realm first, then coordinates, which gives every walk over a
/// set of containers a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerKey {
    /// Realm (dimension) identifier, e.g. `minecraft:overworld`
    pub realm: String,
    /// Block x coordinate
    pub x: i32,
    /// Block y coordinate
    pub y: i32,
    /// Block z coordinate
    pub z: i32,
}

impl ContainerKey {
    /// Create a container key
    pub fn new(realm: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            realm: realm.into(),
            x,
            y,
            z,
        }
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {} in {}", self.x, self.y, self.z, self.realm)
    }
}

/// Colour tag attached to a network
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ColorTag {
    /// White
    #[default]
    White,
    /// Orange
    Orange,
    /// Magenta
    Magenta,
    /// Light blue
    LightBlue,
    /// Yellow
    Yellow,
    /// Lime
    Lime,
    /// Pink
    Pink,
    /// Gray
    Gray,
    /// Light gray
    LightGray,
    /// Cyan
    Cyan,
    /// Purple
    Purple,
    /// Blue
    Blue,
    /// Brown
    Brown,
    /// Green
    Green,
    /// Red
    Red,
    /// Black
    Black,
}

impl ColorTag {
    /// Every colour, in menu order
    pub const ALL: [ColorTag; 16] = [
        ColorTag::White,
        ColorTag::Orange,
        ColorTag::Magenta,
        ColorTag::LightBlue,
        ColorTag::Yellow,
        ColorTag::Lime,
        ColorTag::Pink,
        ColorTag::Gray,
        ColorTag::LightGray,
        ColorTag::Cyan,
        ColorTag::Purple,
        ColorTag::Blue,
        ColorTag::Brown,
        ColorTag::Green,
        ColorTag::Red,
        ColorTag::Black,
    ];

    /// Wire name (lower-case snake_case)
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorTag::White => "white",
            ColorTag::Orange => "orange",
            ColorTag::Magenta => "magenta",
            ColorTag::LightBlue => "light_blue",
            ColorTag::Yellow => "yellow",
            ColorTag::Lime => "lime",
            ColorTag::Pink => "pink",
            ColorTag::Gray => "gray",
            ColorTag::LightGray => "light_gray",
            ColorTag::Cyan => "cyan",
            ColorTag::Purple => "purple",
            ColorTag::Blue => "blue",
            ColorTag::Brown => "brown",
            ColorTag::Green => "green",
            ColorTag::Red => "red",
            ColorTag::Black => "black",
        }
    }
}

impl fmt::Display for ColorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorTag {
    type Err = ChestnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        ColorTag::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| ChestnetError::decode(format!("unknown colour tag: {s:?}")))
    }
}

/// Network identifier, `"{slug}.{colour}"`
///
/// Derived from a display name and colour by
/// [`encode_network_id`](crate::codec::encode_network_id). Parsing only
/// checks the shape, so ids written by older versions still load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NetworkId(String);

impl NetworkId {
    pub(crate) fn from_parts(slug: &str, color: ColorTag) -> Self {
        Self(format!("{slug}.{color}"))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Colour component of the id
    pub fn color(&self) -> Option<ColorTag> {
        self.0
            .rsplit_once('.')
            .and_then(|(_, color)| color.parse().ok())
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NetworkId {
    type Err = ChestnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((slug, color)) = s.rsplit_once('.') else {
            return Err(ChestnetError::decode(format!("network id without colour: {s:?}")));
        };
        if slug.is_empty() || s.contains(['|', '\n', '\r']) {
            return Err(ChestnetError::decode(format!("malformed network id: {s:?}")));
        }
        color.parse::<ColorTag>()?;
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for NetworkId {
    type Error = ChestnetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NetworkId> for String {
    fn from(id: NetworkId) -> Self {
        id.0
    }
}

/// Item type identifier, e.g. `minecraft:iron_ingot`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemType(String);

impl ItemType {
    /// Create an item type
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemType {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Role a container plays in a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Upstream producer feeding the network
    Input,
    /// Downstream consumer reading from the network
    Output,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Input => f.write_str("input"),
            Role::Output => f.write_str("output"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_container_key_ordering() {
        let a = ContainerKey::new("minecraft:nether", 0, 0, 0);
        let b = ContainerKey::new("minecraft:overworld", -5, 64, 2);
        let c = ContainerKey::new("minecraft:overworld", 3, 64, 2);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(b, ContainerKey::new("minecraft:overworld", -5, 64, 2));
    }

    #[test]
    fn test_color_tag_parsing() {
        assert_eq!("Light Blue".parse::<ColorTag>().unwrap(), ColorTag::LightBlue);
        assert_eq!("light-gray".parse::<ColorTag>().unwrap(), ColorTag::LightGray);
        assert_eq!("RED".parse::<ColorTag>().unwrap(), ColorTag::Red);
        assert_matches!("teal".parse::<ColorTag>(), Err(ChestnetError::Decode { .. }));
    }

    #[test]
    fn test_network_id_shape() {
        let id: NetworkId = "ore-depot.red".parse().unwrap();
        assert_eq!(id.color(), Some(ColorTag::Red));
        assert!("ore-depot".parse::<NetworkId>().is_err());
        assert!(".red".parse::<NetworkId>().is_err());
        assert!("ore|depot.red".parse::<NetworkId>().is_err());
        assert!("ore-depot.teal".parse::<NetworkId>().is_err());
    }
}
