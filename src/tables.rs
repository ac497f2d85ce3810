//! Bidirectional name/number tables for TCP flags, TCP options, IP protocol
//! numbers, and ICMP type/code pairs.
//!
//! [`crate::ip_protocol::IPProtocol`] carries its own `struct_variants!`
//! generated `Display`, but not a usable `FromStr` (its derived
//! implementation matches against the macro invocation's token text rather
//! than the expanded name, so it never matches anything at runtime) and its
//! `Display` renders Pascal-cased variant names rather than the record
//! format's upper-case ones; [`IP_PROTOCOL_NAMES`] is used directly for both
//! directions instead of going through either.

use crate::ip_protocol::IPProtocol;

/// Name/number pairs for the protocols the codec gives a name to on the
/// record's `ip.protocol` property. Any other protocol number round-trips
/// as a bare integer.
pub const IP_PROTOCOL_NAMES: &[(&str, IPProtocol)] = &[
  ("TCP", IPProtocol::TCP),
  ("UDP", IPProtocol::UDP),
  ("ICMP", IPProtocol::ICMP),
];

/// Look up the record-format name for a protocol, or `None` if it has no
/// entry in [`IP_PROTOCOL_NAMES`] (the caller then emits a bare integer).
pub fn ip_protocol_name(protocol: IPProtocol) -> Option<&'static str> {
  IP_PROTOCOL_NAMES
    .iter()
    .find(|(_, proto)| *proto == protocol)
    .map(|(name, _)| *name)
}

/// Reverse of [`crate::ip_protocol::IPProtocol`]'s `Display` for the
/// protocols in [`IP_PROTOCOL_NAMES`].
pub fn ip_protocol_from_name(name: &str) -> Option<IPProtocol> {
  IP_PROTOCOL_NAMES
    .iter()
    .find(|(protocol_name, _)| *protocol_name == name)
    .map(|(_, protocol)| *protocol)
}

/// TCP flag bit names, in wire order (MSB to LSB of the 9-bit flag field).
/// Only the six flags the record format emits are listed here; `ECE`,
/// `CWR`, and `NS` are tracked in [`crate::tcp::TcpFlags`] but are not
/// surfaced in records (see the crate's open design decisions).
pub const TCP_FLAG_NAMES: &[(&str, u8)] = &[
  ("URG", 5),
  ("ACK", 4),
  ("PSH", 3),
  ("RST", 2),
  ("SYN", 1),
  ("FIN", 0),
];

/// IP header flag bit names. The 3-bit field binator's `ipv4_header` parses
/// (the byte preceding the 13-bit fragment offset) has `DF` as bit 1 and
/// `MF` as bit 0; bit 2 is reserved and must be zero.
pub const IP_FLAG_NAMES: &[(&str, u8)] = &[("DF", 0x02), ("MF", 0x01)];

/// TCP option kind numbers by name.
pub const TCP_OPTION_EOL: u8 = 0;
/// No-operation padding option.
pub const TCP_OPTION_NOP: u8 = 1;
/// Maximum segment size option.
pub const TCP_OPTION_MSS: u8 = 2;
/// Window scale option.
pub const TCP_OPTION_WSCALE: u8 = 3;
/// Selective-ack-permitted option.
pub const TCP_OPTION_SACK_PERMITTED: u8 = 4;
/// Selective ack option (unsupported on the deserialize path).
pub const TCP_OPTION_SACK: u8 = 5;
/// Timestamp option.
pub const TCP_OPTION_TIMESTAMP: u8 = 8;

/// ICMP type numbers used by the codec. Names mirror the record property
/// values; unlisted types round-trip as a bare integer.
pub fn icmp_type_name(ty: u8) -> Option<&'static str> {
  Some(match ty {
    0 => "echoReply",
    3 => "destinationUnreachable",
    4 => "sourceQuench",
    5 => "redirectMessage",
    8 => "echoRequest",
    9 => "routerAdvertisement",
    10 => "routerSolicitation",
    11 => "timeExceeded",
    12 => "badIpHeader",
    13 => "timestamp",
    14 => "timestampReply",
    15 => "infoRequest",
    16 => "infoReply",
    17 => "addressMaskRequest",
    18 => "addressMaskReply",
    30 => "traceroute",
    _ => return None,
  })
}

/// Reverse of [`icmp_type_name`].
pub fn icmp_type_from_name(name: &str) -> Option<u8> {
  (0u8..=30).find(|&ty| icmp_type_name(ty) == Some(name))
}

/// ICMP type number constants referenced by the codec for type-specific
/// dispatch (payload shape and code subtable selection).
pub const ICMP_TYPE_DEST_UNREACH: u8 = 3;
pub const ICMP_TYPE_REDIRECT: u8 = 5;
pub const ICMP_TYPE_ECHO: u8 = 8;
pub const ICMP_TYPE_ECHO_REPLY: u8 = 0;
pub const ICMP_TYPE_TIME_EXCEEDED: u8 = 11;
pub const ICMP_TYPE_PARAMETERPROB: u8 = 12;
pub const ICMP_TYPE_TIMESTAMP: u8 = 13;
pub const ICMP_TYPE_TIMESTAMP_REPLY: u8 = 14;

const DEST_UNREACH_CODES: &[&str] = &[
  "destinationNetworkUnreachable",
  "destinationHostUnreachable",
  "destinationProtocolUnreachable",
  "destinationPortUnreachable",
  "fragmentationRequired",
  "sourceRouteFailed",
  "destinationNetworkUnknown",
  "destinationHostUnknown",
  "sourceHostIsolated",
  "networkAdministrativelyProhibited",
  "hostAdministrativelyProhibited",
  "networkUnreachableForTos",
  "communicationAdministrativelyProhibited",
];

const REDIRECT_CODES: &[&str] = &[
  "redirectDatagramForHost",
  "redirectDatagramForNetwork",
  "redirectDatagramForTosAndNetwork",
  "redirectDatagramForTosAndHost",
];

const BAD_IP_HEADER_CODES: &[&str] = &["pointerIndicatesTheError", "missingARequiredOption", "badLength"];

/// Resolve an ICMP `code` value against the subtable selected by `ty`, or
/// `None` if `ty` has no named code subtable (the caller then emits a bare
/// integer).
pub fn icmp_code_name(ty: u8, code: u8) -> Option<&'static str> {
  let table = match ty {
    ICMP_TYPE_DEST_UNREACH => DEST_UNREACH_CODES,
    ICMP_TYPE_REDIRECT => REDIRECT_CODES,
    ICMP_TYPE_PARAMETERPROB => BAD_IP_HEADER_CODES,
    _ => return None,
  };
  table.get(code as usize).copied()
}

/// Reverse of [`icmp_code_name`] for a given type.
pub fn icmp_code_from_name(ty: u8, name: &str) -> Option<u8> {
  let table = match ty {
    ICMP_TYPE_DEST_UNREACH => DEST_UNREACH_CODES,
    ICMP_TYPE_REDIRECT => REDIRECT_CODES,
    ICMP_TYPE_PARAMETERPROB => BAD_IP_HEADER_CODES,
    _ => return None,
  };
  table.iter().position(|&n| n == name).map(|i| i as u8)
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use test_log::test;

  use super::*;

  #[test]
  fn icmp_names_round_trip() {
    for ty in 0u8..=30 {
      if let Some(name) = icmp_type_name(ty) {
        assert_eq!(icmp_type_from_name(name), Some(ty));
      }
    }
  }

  #[test]
  fn icmp_echo_request_name() {
    assert_eq!(icmp_type_name(ICMP_TYPE_ECHO), Some("echoRequest"));
    assert_eq!(icmp_type_from_name("echoRequest"), Some(ICMP_TYPE_ECHO));
  }

  #[test]
  fn dest_unreach_code_table() {
    assert_eq!(
      icmp_code_name(ICMP_TYPE_DEST_UNREACH, 3),
      Some("destinationPortUnreachable")
    );
    assert_eq!(
      icmp_code_from_name(ICMP_TYPE_DEST_UNREACH, "destinationPortUnreachable"),
      Some(3)
    );
    assert_eq!(icmp_code_name(ICMP_TYPE_ECHO, 0), None);
  }

  #[test]
  fn ip_protocol_names_are_uppercase() {
    assert_eq!(ip_protocol_name(IPProtocol::TCP), Some("TCP"));
    assert_eq!(ip_protocol_name(IPProtocol::UDP), Some("UDP"));
    assert_eq!(ip_protocol_name(IPProtocol::ICMP), Some("ICMP"));
    assert_eq!(ip_protocol_from_name("TCP"), Some(IPProtocol::TCP));
  }
}
