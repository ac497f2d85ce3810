//! Wraps a `tun` async device: packets read off the device are broadcast to
//! subscribers, and packets handed to [`TunDevice::send`] that can't be
//! written immediately are logged and dropped rather than blocking the
//! caller or aborting the process.

use std::io;

use tokio::io::{
  AsyncReadExt,
  AsyncWriteExt,
};
use tracing::{
  info,
  warn,
};

use crate::broadcaster::{
  Broadcaster,
  ListenerHandle,
};

/// Configuration for bringing up the TUN interface. An interface can be
/// created bare, with its address left for a netlink caller to assign
/// later (as `capture`'s forwarding pair does), or with `address`/`netmask`
/// set up front.
pub struct TunConfig {
  /// Interface name, e.g. `crIN`.
  pub name: String,
  /// IPv4 address assigned to the interface, if any.
  pub address: Option<std::net::Ipv4Addr>,
  /// Network mask for `address`, if any.
  pub netmask: Option<std::net::Ipv4Addr>,
  /// MTU in bytes.
  pub mtu: i32,
}

impl TunConfig {
  /// A bare interface with no address configured yet.
  pub fn unaddressed(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      address: None,
      netmask: None,
      mtu: 1500,
    }
  }
}

/// A TUN device plus the broadcaster packets read from it are published
/// through.
pub struct TunDevice {
  device: tun::AsyncDevice,
  received: Broadcaster<Vec<u8>>,
}

impl TunDevice {
  /// Open and configure the device, bringing it up.
  pub fn open(config: &TunConfig) -> io::Result<Self> {
    let mut tun_config = tun::Configuration::default();
    tun_config.name(&config.name).mtu(config.mtu).up();
    if let Some(address) = config.address {
      tun_config.address(address);
    }
    if let Some(netmask) = config.netmask {
      tun_config.netmask(netmask);
    }

    let device = tun::create_as_async(&tun_config).map_err(io::Error::other)?;
    info!(name = %config.name, "created TUN interface");

    Ok(Self {
      device,
      received: Broadcaster::new(),
    })
  }

  /// Subscribe to packets read from the device.
  #[must_use = "dropping the returned handle immediately unsubscribes"]
  pub fn subscribe(&self, callback: impl FnMut(&Vec<u8>) + Send + 'static) -> ListenerHandle<Vec<u8>> {
    self.received.listen(callback)
  }

  /// Read packets from the device in a loop, broadcasting each one, until
  /// the device errors.
  pub async fn run(&mut self) -> io::Result<()> {
    loop {
      let packet = self.read_packet().await?;
      self.received.notify(&packet);
    }
  }

  /// Read a single packet from the device without broadcasting it, for
  /// callers that need to act on each packet themselves (e.g. forwarding
  /// it while also logging it) rather than subscribing.
  pub async fn read_packet(&mut self) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; 65536];
    let n = self.device.read(&mut buf).await?;
    buf.truncate(n);
    Ok(buf)
  }

  /// Write `packet` to the device. A write that would block is logged and
  /// the packet is dropped, matching a TUN device's own behavior of
  /// discarding packets it can't accept rather than buffering forever.
  pub async fn send(&mut self, packet: &[u8]) {
    match self.device.write_all(packet).await {
      Ok(()) => {}
      Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
        warn!(bytes = packet.len(), "tun device backpressured, dropping packet");
      }
      Err(err) => {
        warn!(%err, "failed to write packet to tun device");
      }
    }
  }
}
