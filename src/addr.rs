//! IPv4 address plus network prefix, as reported by netlink for an
//! interface's configured addresses.

use std::{
  fmt::{
    self,
    Display,
    Formatter,
  },
  net::Ipv4Addr,
};

/// An IPv4 address together with the prefix length of the network it is
/// configured on, and the broadcast address that prefix implies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ip4AddressInfo {
  /// The interface's address.
  pub address: Ipv4Addr,
  /// Network prefix length, 0 to 32.
  pub prefix_len: u8,
}

impl Ip4AddressInfo {
  /// Build from an address and prefix length.
  pub const fn new(address: Ipv4Addr, prefix_len: u8) -> Self {
    Self { address, prefix_len }
  }

  /// The subnet mask implied by `prefix_len`.
  pub fn netmask(&self) -> Ipv4Addr {
    let bits = if self.prefix_len == 0 {
      0
    } else {
      u32::MAX << (32 - u32::from(self.prefix_len))
    };
    Ipv4Addr::from(bits)
  }

  /// The broadcast address of the network `address` sits on.
  pub fn broadcast(&self) -> Ipv4Addr {
    let address = u32::from(self.address);
    let mask = u32::from(self.netmask());
    Ipv4Addr::from(address | !mask)
  }
}

impl Display for Ip4AddressInfo {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.address, self.prefix_len)
  }
}

#[cfg(test)]
mod tests {
  use std::net::Ipv4Addr;

  use pretty_assertions::assert_eq;
  use test_log::test;

  use super::Ip4AddressInfo;

  #[test]
  fn broadcast_for_slash_24() {
    let info = Ip4AddressInfo::new(Ipv4Addr::new(192, 168, 6, 1), 24);
    assert_eq!(info.netmask(), Ipv4Addr::new(255, 255, 255, 0));
    assert_eq!(info.broadcast(), Ipv4Addr::new(192, 168, 6, 255));
  }

  #[test]
  fn display_is_cidr_notation() {
    let info = Ip4AddressInfo::new(Ipv4Addr::new(10, 0, 0, 5), 8);
    assert_eq!(info.to_string(), "10.0.0.5/8");
  }
}
