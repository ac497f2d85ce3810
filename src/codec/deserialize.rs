//! Record to wire bytes. Unlike [`super::serialize`], there is no combinator
//! precedent to lean on here: the record format is read field-by-field
//! against [`Reader`] and the wire bytes are assembled and checksummed by
//! hand.

use std::{
  io::Read,
  net::Ipv4Addr,
};

use crate::{
  checksum::{
    self,
    PseudoHeader,
  },
  error::DeserializeError,
  hex,
  ip_protocol::IPProtocol,
  record::{
    Error as RecordError,
    Reader,
    Token,
  },
  tables,
};

/// Turn one record back into the IPv4 datagram it describes. The `ip`
/// property is mandatory; `tcp`, `udp`, and `icmp` are mutually exclusive
/// (the last one seen wins if more than one is present) and `data` is
/// always optional.
pub fn deserialize<R: Read>(reader: &mut Reader<R>) -> Result<Vec<u8>, DeserializeError> {
  expect(reader, Token::StartObject, "record", "an object")?;
  deserialize_object_body(reader)
}

/// Read a top-level array of records, decoding each one in turn. Used by
/// playback to replay an entire log file in one pass.
pub fn deserialize_records<R: Read>(reader: &mut Reader<R>) -> Result<Vec<Vec<u8>>, DeserializeError> {
  expect(reader, Token::StartArray, "records", "an array")?;
  let mut packets = Vec::new();
  loop {
    if !reader.next() {
      return Err(end_of_stream(reader));
    }
    match reader.token() {
      Token::EndArray => break,
      Token::StartObject => packets.push(deserialize_object_body(reader)?),
      _ => return unexpected(reader, "records", "a record object or the end of the array"),
    }
  }
  Ok(packets)
}

fn deserialize_object_body<R: Read>(reader: &mut Reader<R>) -> Result<Vec<u8>, DeserializeError> {
  let mut ip = None;
  let mut transport = None;
  let mut payload = None;

  loop {
    if !reader.next() {
      return Err(end_of_stream(reader));
    }
    match reader.token() {
      Token::EndObject => break,
      Token::PropertyName => {
        let name = reader.string_value().to_string();
        match name.as_str() {
          "ip" => ip = Some(read_ip(reader)?),
          "tcp" => transport = Some(Transport::Tcp(read_tcp(reader)?)),
          "udp" => transport = Some(Transport::Udp(read_udp(reader)?)),
          "icmp" => transport = Some(Transport::Icmp(read_icmp(reader)?)),
          "data" => payload = Some(read_payload(reader)?),
          _ => skip_value(reader)?,
        }
      }
      _ => return unexpected(reader, "record", "a property name or the end of the object"),
    }
  }

  let ip = ip.ok_or_else(|| DeserializeError::UnexpectedToken {
    context: "record".to_string(),
    expected: "an \"ip\" property",
  })?;
  let payload = payload.unwrap_or_default();

  assemble(ip, transport, payload)
}

fn end_of_stream<R: Read>(reader: &Reader<R>) -> DeserializeError {
  match reader.error() {
    Some(err) => DeserializeError::Record(err),
    None => DeserializeError::Record(RecordError::UnexpectedEnd),
  }
}

fn expect<R: Read>(
  reader: &mut Reader<R>, token: Token, context: &str, expected: &'static str,
) -> Result<(), DeserializeError> {
  if !reader.next() {
    return Err(end_of_stream(reader));
  }
  if reader.token() != token {
    return unexpected(reader, context, expected);
  }
  Ok(())
}

fn unexpected<R: Read, T>(
  reader: &Reader<R>, context: &str, expected: &'static str,
) -> Result<T, DeserializeError> {
  let _ = reader;
  Err(DeserializeError::UnexpectedToken {
    context: context.to_string(),
    expected,
  })
}

fn read_integer<R: Read>(
  reader: &mut Reader<R>, field: &'static str, min: i64, max: i64,
) -> Result<i64, DeserializeError> {
  if !reader.next() {
    return Err(end_of_stream(reader));
  }
  if reader.token() != Token::Integer {
    return unexpected(reader, field, "an integer");
  }
  let value = reader.int_value();
  if value < min || value > max {
    return Err(DeserializeError::OutOfRange {
      field,
      min,
      max,
      value,
    });
  }
  Ok(value)
}

fn read_string<R: Read>(reader: &mut Reader<R>, field: &'static str) -> Result<String, DeserializeError> {
  if !reader.next() {
    return Err(end_of_stream(reader));
  }
  if reader.token() != Token::String {
    return unexpected(reader, field, "a string");
  }
  Ok(reader.string_value().to_string())
}

fn skip_value<R: Read>(reader: &mut Reader<R>) -> Result<(), DeserializeError> {
  if !reader.next() {
    return Err(end_of_stream(reader));
  }
  let mut depth = match reader.token() {
    Token::StartObject | Token::StartArray => 1,
    _ => return Ok(()),
  };
  while depth > 0 {
    if !reader.next() {
      return Err(end_of_stream(reader));
    }
    match reader.token() {
      Token::StartObject | Token::StartArray => depth += 1,
      Token::EndObject | Token::EndArray => depth -= 1,
      _ => {}
    }
  }
  Ok(())
}

struct IpFields {
  version: u8,
  tos: u8,
  id: u16,
  flags: u8,
  fragment_offset: u16,
  ttl: u8,
  protocol: IPProtocol,
  source: Ipv4Addr,
  destination: Ipv4Addr,
}

fn read_ip<R: Read>(reader: &mut Reader<R>) -> Result<IpFields, DeserializeError> {
  expect(reader, Token::StartObject, "ip", "an object")?;

  let mut version = 4u8;
  let mut tos = 0u8;
  let mut id = 0u16;
  let mut flags = 0u8;
  let mut fragment_offset = 0u16;
  let mut ttl = 64u8;
  let mut protocol = None;
  let mut source = Ipv4Addr::UNSPECIFIED;
  let mut destination = Ipv4Addr::UNSPECIFIED;

  loop {
    if !reader.next() {
      return Err(end_of_stream(reader));
    }
    match reader.token() {
      Token::EndObject => break,
      Token::PropertyName => {
        let name = reader.string_value().to_string();
        match name.as_str() {
          "version" => version = read_integer(reader, "ip.version", 0, 15)? as u8,
          "tos" => tos = read_integer(reader, "ip.tos", 0, 255)? as u8,
          "id" => id = read_integer(reader, "ip.id", 0, 0xffff)? as u16,
          "flags" => flags = read_ip_flags(reader)?,
          "fragmentOffset" => {
            fragment_offset = read_integer(reader, "ip.fragmentOffset", 0, 0x1fff)? as u16
          }
          "ttl" => ttl = read_integer(reader, "ip.ttl", 0, 255)? as u8,
          "protocol" => protocol = Some(read_ip_protocol(reader)?),
          "source" => source = read_ipv4(reader, "ip.source")?,
          "destination" => destination = read_ipv4(reader, "ip.destination")?,
          _ => skip_value(reader)?,
        }
      }
      _ => return unexpected(reader, "ip", "a property name or the end of the object"),
    }
  }

  let protocol = protocol.ok_or_else(|| DeserializeError::UnexpectedToken {
    context: "ip".to_string(),
    expected: "a \"protocol\" property",
  })?;

  Ok(IpFields {
    version,
    tos,
    id,
    flags,
    fragment_offset,
    ttl,
    protocol,
    source,
    destination,
  })
}

fn read_ip_flags<R: Read>(reader: &mut Reader<R>) -> Result<u8, DeserializeError> {
  expect(reader, Token::StartArray, "ip.flags", "an array")?;
  let mut flags = 0u8;
  loop {
    if !reader.next() {
      return Err(end_of_stream(reader));
    }
    match reader.token() {
      Token::EndArray => break,
      Token::String => {
        let name = reader.string_value();
        let bit = tables::IP_FLAG_NAMES
          .iter()
          .find(|(flag_name, _)| *flag_name == name)
          .map(|(_, bit)| *bit)
          .ok_or_else(|| DeserializeError::UnknownEnumValue {
            field: "ip.flags",
            value: name.to_string(),
          })?;
        flags |= bit;
      }
      _ => return unexpected(reader, "ip.flags", "a flag name"),
    }
  }
  Ok(flags)
}

fn read_ip_protocol<R: Read>(reader: &mut Reader<R>) -> Result<IPProtocol, DeserializeError> {
  if !reader.next() {
    return Err(end_of_stream(reader));
  }
  match reader.token() {
    Token::String => {
      let name = reader.string_value();
      tables::ip_protocol_from_name(name).ok_or_else(|| DeserializeError::UnknownEnumValue {
        field: "ip.protocol",
        value: name.to_string(),
      })
    }
    Token::Integer => {
      let value = reader.int_value();
      if !(0..=255).contains(&value) {
        return Err(DeserializeError::OutOfRange {
          field: "ip.protocol",
          min: 0,
          max: 255,
          value,
        });
      }
      Ok(IPProtocol::new(value as u8))
    }
    _ => unexpected(reader, "ip.protocol", "a protocol name or number"),
  }
}

fn read_ipv4<R: Read>(reader: &mut Reader<R>, field: &'static str) -> Result<Ipv4Addr, DeserializeError> {
  let text = read_string(reader, field)?;
  text.parse().map_err(|_| DeserializeError::UnknownEnumValue {
    field,
    value: text,
  })
}

enum Transport {
  Tcp(TcpFields),
  Udp(UdpFields),
  Icmp(IcmpFields),
}

struct TcpFields {
  source_port: u16,
  dest_port: u16,
  seq_number: u32,
  ack_number: Option<u32>,
  flags: u8,
  window_size: u16,
  urgent_pointer: Option<u16>,
  options: Vec<u8>,
}

fn read_tcp<R: Read>(reader: &mut Reader<R>) -> Result<TcpFields, DeserializeError> {
  expect(reader, Token::StartObject, "tcp", "an object")?;

  let mut source_port = 0u16;
  let mut dest_port = 0u16;
  let mut seq_number = 0u32;
  let mut ack_number = None;
  let mut flags = 0u8;
  let mut window_size = 0u16;
  let mut urgent_pointer = None;
  let mut options = Vec::new();

  loop {
    if !reader.next() {
      return Err(end_of_stream(reader));
    }
    match reader.token() {
      Token::EndObject => break,
      Token::PropertyName => {
        let name = reader.string_value().to_string();
        match name.as_str() {
          "sourcePort" => source_port = read_integer(reader, "tcp.sourcePort", 0, 0xffff)? as u16,
          "destPort" => dest_port = read_integer(reader, "tcp.destPort", 0, 0xffff)? as u16,
          "seqNumber" => seq_number = read_integer(reader, "tcp.seqNumber", 0, u32::MAX.into())? as u32,
          "ackNumber" => {
            ack_number = Some(read_integer(reader, "tcp.ackNumber", 0, u32::MAX.into())? as u32)
          }
          "flags" => flags = read_tcp_flags(reader)?,
          "windowSize" => window_size = read_integer(reader, "tcp.windowSize", 0, 0xffff)? as u16,
          "urgentPointer" => {
            urgent_pointer = Some(read_integer(reader, "tcp.urgentPointer", 0, 0xffff)? as u16)
          }
          "options" => options = read_tcp_options(reader)?,
          _ => skip_value(reader)?,
        }
      }
      _ => return unexpected(reader, "tcp", "a property name or the end of the object"),
    }
  }

  Ok(TcpFields {
    source_port,
    dest_port,
    seq_number,
    ack_number,
    flags,
    window_size,
    urgent_pointer,
    options,
  })
}

fn read_tcp_flags<R: Read>(reader: &mut Reader<R>) -> Result<u8, DeserializeError> {
  expect(reader, Token::StartArray, "tcp.flags", "an array")?;
  let mut flags = 0u8;
  loop {
    if !reader.next() {
      return Err(end_of_stream(reader));
    }
    match reader.token() {
      Token::EndArray => break,
      Token::String => {
        let name = reader.string_value();
        let bit = tables::TCP_FLAG_NAMES
          .iter()
          .find(|(flag_name, _)| *flag_name == name)
          .map(|(_, bit)| *bit)
          .ok_or_else(|| DeserializeError::UnknownEnumValue {
            field: "tcp.flags",
            value: name.to_string(),
          })?;
        flags |= 1 << bit;
      }
      _ => return unexpected(reader, "tcp.flags", "a flag name"),
    }
  }
  Ok(flags)
}

fn read_tcp_options<R: Read>(reader: &mut Reader<R>) -> Result<Vec<u8>, DeserializeError> {
  expect(reader, Token::StartArray, "tcp.options", "an array")?;
  let mut bytes = Vec::new();
  loop {
    if !reader.next() {
      return Err(end_of_stream(reader));
    }
    match reader.token() {
      Token::EndArray => break,
      Token::StartArray => read_tcp_option(reader, &mut bytes)?,
      _ => return unexpected(reader, "tcp.options", "an option array"),
    }
  }
  if bytes.len() % 4 != 0 {
    return Err(DeserializeError::OddOptionLength(bytes.len()));
  }
  Ok(bytes)
}

fn read_tcp_option<R: Read>(reader: &mut Reader<R>, bytes: &mut Vec<u8>) -> Result<(), DeserializeError> {
  let kind = read_string(reader, "tcp.options[]")?;
  match kind.as_str() {
    "EOL" => bytes.push(tables::TCP_OPTION_EOL),
    "NOP" => bytes.push(tables::TCP_OPTION_NOP),
    "maxSegmentSize" => {
      let value = read_integer(reader, "tcp.options.maxSegmentSize", 0, 0xffff)? as u16;
      bytes.push(tables::TCP_OPTION_MSS);
      bytes.push(4);
      bytes.extend_from_slice(&value.to_be_bytes());
    }
    "windowScale" => {
      // Adopted uniformly as a 4-byte, u16-big-endian option (kind, length,
      // value:u16), rather than the 3-byte/u8 layout TCP uses on the wire.
      let value = read_integer(reader, "tcp.options.windowScale", 0, 0xffff)? as u16;
      bytes.push(tables::TCP_OPTION_WSCALE);
      bytes.push(4);
      bytes.extend_from_slice(&value.to_be_bytes());
    }
    "sackPermitted" => {
      bytes.push(tables::TCP_OPTION_SACK_PERMITTED);
      bytes.push(2);
    }
    "timestamp" => {
      let value = read_integer(reader, "tcp.options.timestamp", 0, u32::MAX.into())? as u32;
      let echo = read_integer(reader, "tcp.options.timestamp", 0, u32::MAX.into())? as u32;
      bytes.push(tables::TCP_OPTION_TIMESTAMP);
      bytes.push(10);
      bytes.extend_from_slice(&value.to_be_bytes());
      bytes.extend_from_slice(&echo.to_be_bytes());
    }
    "sack" => return Err(DeserializeError::UnsupportedSack),
    other => {
      return Err(DeserializeError::UnknownEnumValue {
        field: "tcp.options[]",
        value: other.to_string(),
      })
    }
  }
  expect(reader, Token::EndArray, "tcp.options[]", "the end of the option array")?;
  Ok(())
}

struct UdpFields {
  source_port: u16,
  dest_port: u16,
}

fn read_udp<R: Read>(reader: &mut Reader<R>) -> Result<UdpFields, DeserializeError> {
  expect(reader, Token::StartObject, "udp", "an object")?;

  let mut source_port = 0u16;
  let mut dest_port = 0u16;

  loop {
    if !reader.next() {
      return Err(end_of_stream(reader));
    }
    match reader.token() {
      Token::EndObject => break,
      Token::PropertyName => {
        let name = reader.string_value().to_string();
        match name.as_str() {
          "sourcePort" => source_port = read_integer(reader, "udp.sourcePort", 0, 0xffff)? as u16,
          "destPort" => dest_port = read_integer(reader, "udp.destPort", 0, 0xffff)? as u16,
          _ => skip_value(reader)?,
        }
      }
      _ => return unexpected(reader, "udp", "a property name or the end of the object"),
    }
  }

  Ok(UdpFields {
    source_port,
    dest_port,
  })
}

struct IcmpFields {
  ty: u8,
  code: u8,
  identifier: Option<u16>,
  sequence_number: Option<u16>,
  next_hop_mtu: Option<u16>,
  gateway: Option<Ipv4Addr>,
}

fn read_icmp<R: Read>(reader: &mut Reader<R>) -> Result<IcmpFields, DeserializeError> {
  expect(reader, Token::StartObject, "icmp", "an object")?;

  let mut ty = None;
  let mut code = 0u8;
  let mut identifier = None;
  let mut sequence_number = None;
  let mut next_hop_mtu = None;
  let mut gateway = None;

  loop {
    if !reader.next() {
      return Err(end_of_stream(reader));
    }
    match reader.token() {
      Token::EndObject => break,
      Token::PropertyName => {
        let name = reader.string_value().to_string();
        match name.as_str() {
          "type" => ty = Some(read_icmp_type(reader)?),
          "code" => code = read_icmp_code(reader, ty)?,
          "identifier" => identifier = Some(read_integer(reader, "icmp.identifier", 0, 0xffff)? as u16),
          "sequenceNumber" => {
            sequence_number = Some(read_integer(reader, "icmp.sequenceNumber", 0, 0xffff)? as u16)
          }
          "nextHopMtu" => next_hop_mtu = Some(read_integer(reader, "icmp.nextHopMtu", 0, 0xffff)? as u16),
          "gateway" => gateway = Some(read_ipv4(reader, "icmp.gateway")?),
          _ => skip_value(reader)?,
        }
      }
      _ => return unexpected(reader, "icmp", "a property name or the end of the object"),
    }
  }

  let ty = ty.ok_or_else(|| DeserializeError::UnexpectedToken {
    context: "icmp".to_string(),
    expected: "a \"type\" property",
  })?;

  Ok(IcmpFields {
    ty,
    code,
    identifier,
    sequence_number,
    next_hop_mtu,
    gateway,
  })
}

fn read_icmp_type<R: Read>(reader: &mut Reader<R>) -> Result<u8, DeserializeError> {
  if !reader.next() {
    return Err(end_of_stream(reader));
  }
  match reader.token() {
    Token::String => {
      let name = reader.string_value();
      tables::icmp_type_from_name(name).ok_or_else(|| DeserializeError::UnknownEnumValue {
        field: "icmp.type",
        value: name.to_string(),
      })
    }
    Token::Integer => {
      let value = reader.int_value();
      if !(0..=255).contains(&value) {
        return Err(DeserializeError::OutOfRange {
          field: "icmp.type",
          min: 0,
          max: 255,
          value,
        });
      }
      Ok(value as u8)
    }
    _ => unexpected(reader, "icmp.type", "a type name or number"),
  }
}

fn read_icmp_code<R: Read>(reader: &mut Reader<R>, ty: Option<u8>) -> Result<u8, DeserializeError> {
  if !reader.next() {
    return Err(end_of_stream(reader));
  }
  match reader.token() {
    Token::String => {
      let name = reader.string_value();
      let ty = ty.ok_or_else(|| DeserializeError::UnexpectedToken {
        context: "icmp.code".to_string(),
        expected: "\"type\" to appear before a named \"code\"",
      })?;
      tables::icmp_code_from_name(ty, name).ok_or_else(|| DeserializeError::UnknownEnumValue {
        field: "icmp.code",
        value: name.to_string(),
      })
    }
    Token::Integer => {
      let value = reader.int_value();
      if !(0..=255).contains(&value) {
        return Err(DeserializeError::OutOfRange {
          field: "icmp.code",
          min: 0,
          max: 255,
          value,
        });
      }
      Ok(value as u8)
    }
    _ => unexpected(reader, "icmp.code", "a code name or number"),
  }
}

fn read_payload<R: Read>(reader: &mut Reader<R>) -> Result<Vec<u8>, DeserializeError> {
  expect(reader, Token::StartObject, "data", "an object")?;

  let mut kind = None;
  let mut lines: Vec<String> = Vec::new();

  loop {
    if !reader.next() {
      return Err(end_of_stream(reader));
    }
    match reader.token() {
      Token::EndObject => break,
      Token::PropertyName => {
        let name = reader.string_value().to_string();
        match name.as_str() {
          "type" => kind = Some(read_string(reader, "data.type")?),
          "data" => lines = read_string_array(reader, "data.data")?,
          _ => skip_value(reader)?,
        }
      }
      _ => return unexpected(reader, "data", "a property name or the end of the object"),
    }
  }

  match kind.as_deref() {
    Some("hex") => hex::parse_hex(&lines.concat()).map_err(|_| DeserializeError::UnexpectedToken {
      context: "data.data".to_string(),
      expected: "well-formed hex digits",
    }),
    _ => Ok(lines.concat().into_bytes()),
  }
}

fn read_string_array<R: Read>(
  reader: &mut Reader<R>, field: &'static str,
) -> Result<Vec<String>, DeserializeError> {
  expect(reader, Token::StartArray, field, "an array")?;
  let mut out = Vec::new();
  loop {
    if !reader.next() {
      return Err(end_of_stream(reader));
    }
    match reader.token() {
      Token::EndArray => break,
      Token::String => out.push(reader.string_value().to_string()),
      _ => return unexpected(reader, field, "a string"),
    }
  }
  Ok(out)
}

fn assemble(
  ip: IpFields, transport: Option<Transport>, payload: Vec<u8>,
) -> Result<Vec<u8>, DeserializeError> {
  let mut transport_bytes = match &transport {
    Some(Transport::Tcp(tcp)) => build_tcp(tcp)?,
    Some(Transport::Udp(udp)) => build_udp(udp, &payload),
    Some(Transport::Icmp(icmp)) => build_icmp(icmp),
    None => Vec::new(),
  };
  transport_bytes.extend_from_slice(&payload);

  let mut packet = vec![0u8; 20];
  packet[0] = (ip.version << 4) | 5;
  packet[1] = ip.tos;
  // packet[2..4] (total length) is patched below, after the packet size is
  // known: the original encoder only keeps the low byte of the true size,
  // so this intentionally does not reproduce a correct 16-bit length for
  // packets over 255 bytes.
  packet[4..6].copy_from_slice(&ip.id.to_be_bytes());
  let flags_and_frag = (u16::from(ip.flags) << 13) | (ip.fragment_offset & 0x1fff);
  packet[6..8].copy_from_slice(&flags_and_frag.to_be_bytes());
  packet[8] = ip.ttl;
  packet[9] = ip.protocol.protocol();
  // packet[10..12] (checksum) patched below.
  packet[12..16].copy_from_slice(&ip.source.octets());
  packet[16..20].copy_from_slice(&ip.destination.octets());

  packet.extend_from_slice(&transport_bytes);

  let packet_size = packet.len();
  let tot_len = (packet_size & 0xff) as u16;
  packet[2..4].copy_from_slice(&tot_len.to_be_bytes());

  let ip_checksum = checksum::checksum(&packet[0..20]);
  packet[10..12].copy_from_slice(&ip_checksum.to_be_bytes());

  match transport {
    Some(Transport::Tcp(_)) => patch_pseudo_header_checksum(&mut packet, 20, 16, &ip),
    Some(Transport::Udp(_)) => {
      // build_udp already stamped udp.len from its own payload length.
      patch_pseudo_header_checksum(&mut packet, 20, 6, &ip);
    }
    Some(Transport::Icmp(_)) => {
      let segment_start = 20;
      let segment = &mut packet[segment_start..];
      segment[2] = 0;
      segment[3] = 0;
      let sum = checksum::checksum(segment);
      packet[segment_start + 2..segment_start + 4].copy_from_slice(&sum.to_be_bytes());
    }
    None => {}
  }

  Ok(packet)
}

/// Zero the checksum field at `segment_start + checksum_offset`, compute the
/// pseudo-header checksum over the segment, and write it back. `checksum_offset`
/// is 16 for TCP and 6 for UDP, where each places its checksum field.
fn patch_pseudo_header_checksum(
  packet: &mut [u8], segment_start: usize, checksum_offset: usize, ip: &IpFields,
) {
  let segment_len = packet.len() - segment_start;
  let field = segment_start + checksum_offset;
  packet[field..field + 2].copy_from_slice(&[0, 0]);
  let pseudo = PseudoHeader {
    source: ip.source.octets(),
    destination: ip.destination.octets(),
    protocol: ip.protocol.protocol(),
    length: segment_len as u16,
  };
  let sum = checksum::checksum_with_pseudo_header(&pseudo, &packet[segment_start..]);
  packet[field..field + 2].copy_from_slice(&sum.to_be_bytes());
}

fn build_tcp(tcp: &TcpFields) -> Result<Vec<u8>, DeserializeError> {
  let options_words = tcp.options.len() / 4;
  let data_offset = 5 + options_words;
  if data_offset > 15 {
    return Err(DeserializeError::OutOfRange {
      field: "tcp.options",
      min: 0,
      max: 40,
      value: tcp.options.len() as i64,
    });
  }

  let ack_bit = 1 << tables::TCP_FLAG_NAMES
    .iter()
    .find(|(name, _)| *name == "ACK")
    .map(|(_, bit)| *bit)
    .expect("ACK is always present in TCP_FLAG_NAMES");
  if tcp.flags & ack_bit != 0 && tcp.ack_number.is_none() {
    return Err(DeserializeError::UnexpectedToken {
      context: "tcp.ackNumber".to_string(),
      expected: "\"ackNumber\" to be present since \"ACK\" is set in \"flags\"",
    });
  }

  let mut bytes = vec![0u8; 20];
  bytes[0..2].copy_from_slice(&tcp.source_port.to_be_bytes());
  bytes[2..4].copy_from_slice(&tcp.dest_port.to_be_bytes());
  bytes[4..8].copy_from_slice(&tcp.seq_number.to_be_bytes());
  bytes[8..12].copy_from_slice(&tcp.ack_number.unwrap_or(0).to_be_bytes());
  let flags_word = ((data_offset as u16) << 12) | u16::from(tcp.flags);
  bytes[12..14].copy_from_slice(&flags_word.to_be_bytes());
  bytes[14..16].copy_from_slice(&tcp.window_size.to_be_bytes());
  // bytes[16..18] (checksum) patched by the caller.
  bytes[18..20].copy_from_slice(&tcp.urgent_pointer.unwrap_or(0).to_be_bytes());
  bytes.extend_from_slice(&tcp.options);
  Ok(bytes)
}

fn build_udp(udp: &UdpFields, payload: &[u8]) -> Vec<u8> {
  let mut bytes = vec![0u8; 8];
  bytes[0..2].copy_from_slice(&udp.source_port.to_be_bytes());
  bytes[2..4].copy_from_slice(&udp.dest_port.to_be_bytes());
  let len = (8 + payload.len()) as u16;
  bytes[4..6].copy_from_slice(&len.to_be_bytes());
  bytes
}

fn build_icmp(icmp: &IcmpFields) -> Vec<u8> {
  let mut bytes = vec![0u8; 8];
  bytes[0] = icmp.ty;
  bytes[1] = icmp.code;
  let rest = match icmp.ty {
    tables::ICMP_TYPE_ECHO
    | tables::ICMP_TYPE_ECHO_REPLY
    | tables::ICMP_TYPE_TIMESTAMP
    | tables::ICMP_TYPE_TIMESTAMP_REPLY => {
      (u32::from(icmp.identifier.unwrap_or(0)) << 16) | u32::from(icmp.sequence_number.unwrap_or(0))
    }
    tables::ICMP_TYPE_DEST_UNREACH => u32::from(icmp.next_hop_mtu.unwrap_or(0)),
    tables::ICMP_TYPE_REDIRECT => u32::from_be_bytes(icmp.gateway.unwrap_or(Ipv4Addr::UNSPECIFIED).octets()),
    _ => 0,
  };
  bytes[4..8].copy_from_slice(&rest.to_be_bytes());
  bytes
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use test_log::test;

  use super::{
    deserialize,
    deserialize_records,
  };
  use crate::record::Reader;

  fn deserialized(record: &str) -> Vec<u8> {
    let mut reader = Reader::new(record.as_bytes());
    deserialize(&mut reader).unwrap()
  }

  #[test]
  fn udp_round_trips_ports_and_addresses() {
    let record = r#"{
      "ip": {"protocol": "UDP", "source": "192.168.0.1", "destination": "192.168.0.2"},
      "udp": {"sourcePort": 12345, "destPort": 53},
      "data": {"type": "text", "data": ["hi"]}
    }"#;
    let bytes = deserialized(record);
    assert_eq!(bytes[0] >> 4, 4);
    assert_eq!(bytes[0] & 0xf, 5);
    assert_eq!(bytes[9], 17);
    assert_eq!(&bytes[12..16], &[192, 168, 0, 1]);
    assert_eq!(&bytes[16..20], &[192, 168, 0, 2]);
    assert_eq!(u16::from_be_bytes([bytes[20], bytes[21]]), 12345);
    assert_eq!(u16::from_be_bytes([bytes[22], bytes[23]]), 53);
    assert_eq!(u16::from_be_bytes([bytes[24], bytes[25]]), 8 + 2);
    assert_eq!(&bytes[28..30], b"hi");
  }

  #[test]
  fn ip_checksum_is_self_consistent() {
    let record = r#"{
      "ip": {"protocol": "ICMP", "source": "10.0.0.1", "destination": "10.0.0.2"},
      "icmp": {"type": "echoRequest", "code": 0, "identifier": 1, "sequenceNumber": 2}
    }"#;
    let bytes = deserialized(record);
    assert_eq!(super::checksum::checksum(&bytes[0..20]), 0);
  }

  #[test]
  fn tcp_options_must_be_word_aligned() {
    let record = r#"{
      "ip": {"protocol": "TCP", "source": "10.0.0.1", "destination": "10.0.0.2"},
      "tcp": {
        "sourcePort": 1, "destPort": 2, "seqNumber": 0, "flags": ["SYN"], "windowSize": 0,
        "options": [["NOP"]]
      }
    }"#;
    let mut reader = Reader::new(record.as_bytes());
    let err = deserialize(&mut reader).unwrap_err();
    assert!(matches!(err, crate::error::DeserializeError::OddOptionLength(1)));
  }

  #[test]
  fn tcp_psh_ack_round_trips_length_and_checksums() {
    let record = r#"{
      "ip": {"protocol": "TCP", "source": "10.0.0.5", "destination": "142.250.80.4"},
      "tcp": {
        "sourcePort": 54321, "destPort": 80, "seqNumber": 1000000000,
        "ackNumber": 2245680723, "flags": ["ACK", "PSH"], "windowSize": 64240
      },
      "data": {"type": "text", "data": [
        "GET / HTTP/1.1\r\n", "Accept: */*\r\n", "Host: www.google.com\r\n",
        "Connection: Keep-Alive\r\n", "\r\n"
      ]}
    }"#;
    let mut reader = Reader::new(record.as_bytes());
    let bytes = deserialize(&mut reader).unwrap();

    assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), (bytes.len() & 0xff) as u16);
    assert_eq!(super::checksum::checksum(&bytes[0..20]), 0);

    let pseudo = super::checksum::PseudoHeader {
      source: [10, 0, 0, 5],
      destination: [142, 250, 80, 4],
      protocol: 6,
      length: (bytes.len() - 20) as u16,
    };
    assert_eq!(
      super::checksum::checksum_with_pseudo_header(&pseudo, &bytes[20..]),
      0
    );
  }

  #[test]
  fn tcp_ack_flag_without_ack_number_is_an_error() {
    let record = r#"{
      "ip": {"protocol": "TCP", "source": "10.0.0.1", "destination": "10.0.0.2"},
      "tcp": {
        "sourcePort": 1, "destPort": 2, "seqNumber": 0, "flags": ["ACK"], "windowSize": 0
      }
    }"#;
    let mut reader = Reader::new(record.as_bytes());
    let err = deserialize(&mut reader).unwrap_err();
    match err {
      crate::error::DeserializeError::UnexpectedToken { context, .. } => {
        assert_eq!(context, "tcp.ackNumber");
      }
      other => panic!("expected UnexpectedToken, got {other:?}"),
    }
  }

  #[test]
  fn deserialize_records_reads_every_entry_in_the_array() {
    let log = r#"[
      {"ip": {"protocol": "UDP", "source": "10.0.0.1", "destination": "10.0.0.2"},
       "udp": {"sourcePort": 1, "destPort": 2}},
      {"ip": {"protocol": "UDP", "source": "10.0.0.3", "destination": "10.0.0.4"},
       "udp": {"sourcePort": 3, "destPort": 4}}
    ]"#;
    let mut reader = Reader::new(log.as_bytes());
    let packets = deserialize_records(&mut reader).unwrap();
    assert_eq!(packets.len(), 2);
    assert_eq!(&packets[0][12..16], &[10, 0, 0, 1]);
    assert_eq!(&packets[1][12..16], &[10, 0, 0, 3]);
  }
}
