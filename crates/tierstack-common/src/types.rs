//! Domain primitive types used across the tierstack workspace.

use std::fmt;
use std::net::Ipv4Addr;

use nom::{
    IResult, Parser,
    bytes::complete::take_while1,
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res},
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TierstackError};

/// Identifier of a unit, unique within a composition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// Creates a new unit ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable logical name of a resource, unique within its unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalName(String);

impl LogicalName {
    /// Creates a new logical name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deployment region a topology is realized in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    /// Creates a region from its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the region name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_REGION)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An IPv4 address range in CIDR notation, e.g. `10.0.0.0/16`.
///
/// Host bits below the prefix must be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Cidr {
    /// Parses a CIDR block.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not `a.b.c.d/n` with `n <= 32`
    /// or if host bits are set.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || TierstackError::Parse {
            input: input.to_string(),
            expected: "an IPv4 CIDR block",
        };
        let (_, (network, prefix)) = all_consuming(cidr).parse(input).map_err(|_| invalid())?;
        if prefix > 32 {
            return Err(invalid());
        }
        let cidr = Self { network, prefix };
        if u32::from(network) & !cidr.mask() != 0 {
            return Err(invalid());
        }
        Ok(cidr)
    }

    /// Builds a block from parts already known to be well-formed.
    pub(crate) const fn from_raw(network: Ipv4Addr, prefix: u8) -> Self {
        Self { network, prefix }
    }

    /// Network address of the block.
    #[must_use]
    pub const fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Prefix length in bits.
    #[must_use]
    pub const fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Returns whether `addr` lies inside this block.
    #[must_use]
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & self.mask() == u32::from(self.network)
    }

    const fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix)
        }
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl TryFrom<String> for Cidr {
    type Error = TierstackError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Cidr> for String {
    fn from(value: Cidr) -> Self {
        value.to_string()
    }
}

fn octet(input: &str) -> IResult<&str, u8> {
    map_res(digit1, str::parse::<u8>).parse(input)
}

fn ipv4(input: &str) -> IResult<&str, Ipv4Addr> {
    let (input, (a, _, b, _, c, _, d)) = (
        octet,
        char('.'),
        octet,
        char('.'),
        octet,
        char('.'),
        octet,
    )
        .parse(input)?;
    Ok((input, Ipv4Addr::new(a, b, c, d)))
}

fn cidr(input: &str) -> IResult<&str, (Ipv4Addr, u8)> {
    let (input, (addr, _, prefix)) = (ipv4, char('/'), octet).parse(input)?;
    Ok((input, (addr, prefix)))
}

/// Address of a single output: `<unit>.<output>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputPath {
    /// Producing unit.
    pub unit: UnitId,
    /// Output name within the unit.
    pub output: String,
}

impl OutputPath {
    /// Parses `unit.output`. Both segments use `[A-Za-z0-9_-]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly two dot-separated segments.
    pub fn parse(input: &str) -> Result<Self> {
        let (_, (unit, _, output)) = all_consuming((segment, char('.'), segment))
            .parse(input)
            .map_err(|_| TierstackError::Parse {
                input: input.to_string(),
                expected: "an output path (unit.output)",
            })?;
        Ok(Self {
            unit: UnitId::new(unit),
            output: output.to_string(),
        })
    }
}

impl fmt::Display for OutputPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.unit, self.output)
    }
}

fn segment(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_')(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cidr_parses_network_block() {
        let cidr = Cidr::parse("10.0.0.0/16").expect("valid cidr");
        assert_eq!(cidr.network(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(cidr.prefix(), 16);
        assert_eq!(cidr.to_string(), "10.0.0.0/16");
    }

    #[test]
    fn cidr_contains_addresses_in_range() {
        let cidr = Cidr::parse("10.0.0.0/16").expect("valid cidr");
        assert!(cidr.contains(Ipv4Addr::new(10, 0, 42, 7)));
        assert!(!cidr.contains(Ipv4Addr::new(10, 1, 0, 1)));
    }

    #[test]
    fn cidr_zero_prefix_contains_everything() {
        let any = Cidr::parse("0.0.0.0/0").expect("valid cidr");
        assert!(any.contains(Ipv4Addr::new(203, 0, 113, 9)));
    }

    #[test]
    fn cidr_rejects_host_bits() {
        assert!(Cidr::parse("10.0.0.1/16").is_err());
    }

    #[test]
    fn cidr_rejects_malformed_input() {
        for input in ["10.0.0/16", "10.0.0.0", "10.0.0.0/33", "256.0.0.0/8", "10.0.0.0/16 "] {
            assert!(Cidr::parse(input).is_err(), "{input} should be rejected");
        }
    }

    #[test]
    fn cidr_serializes_as_string() {
        let cidr = Cidr::parse("192.168.0.0/24").expect("valid cidr");
        let json = serde_json::to_string(&cidr).expect("serialize");
        assert_eq!(json, "\"192.168.0.0/24\"");
        let back: Cidr = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, cidr);
    }

    #[test]
    fn output_path_parses_unit_and_output() {
        let path = OutputPath::parse("network.target-group").expect("valid path");
        assert_eq!(path.unit.as_str(), "network");
        assert_eq!(path.output, "target-group");
    }

    #[test]
    fn output_path_rejects_missing_segment() {
        assert!(OutputPath::parse("network").is_err());
        assert!(OutputPath::parse("network.").is_err());
        assert!(OutputPath::parse("a.b.c").is_err());
    }

    #[test]
    fn region_defaults_to_tokyo() {
        assert_eq!(Region::default().as_str(), "ap-northeast-1");
    }
}
