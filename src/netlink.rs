//! Netlink control plane: bringing an interface up/down, assigning it an
//! address, and watching for link/address events on all interfaces.

use futures_util::TryStreamExt;
use rtnetlink::Handle;
use tracing::{
  debug,
  info,
};

use crate::{
  addr::Ip4AddressInfo,
  broadcaster::{
    Broadcaster,
    ListenerHandle,
  },
  error::AppError,
};

/// RPC handle for mutating interface state over netlink.
pub struct Netlink {
  handle: Handle,
}

impl Netlink {
  /// Connect to the kernel's netlink socket, spawning the background
  /// connection task on the current runtime.
  pub fn connect() -> Result<Self, rtnetlink::Error> {
    let (connection, handle, _) = rtnetlink::new_connection()?;
    tokio::spawn(connection);
    Ok(Self { handle })
  }

  /// Set an interface's administrative status.
  pub async fn set_device_status(&self, index: u32, up: bool) -> Result<(), rtnetlink::Error> {
    let request = self.handle.link().set(index);
    if up {
      request.up().execute().await
    } else {
      request.down().execute().await
    }
  }

  /// Assign an IPv4 address and prefix to an interface.
  pub async fn set_device_ip4_address(&self, index: u32, info: Ip4AddressInfo) -> Result<(), rtnetlink::Error> {
    self
      .handle
      .address()
      .add(index, std::net::IpAddr::V4(info.address), info.prefix_len)
      .execute()
      .await
  }

  /// Resolve an interface name to its kernel index.
  pub async fn interface_index(&self, name: &str) -> Result<Option<u32>, rtnetlink::Error> {
    let mut links = self.handle.link().get().match_name(name.to_string()).execute();
    match links.try_next().await? {
      Some(link) => Ok(Some(link.header.index)),
      None => Ok(None),
    }
  }
}

/// An observed interface's name and, once known, its addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NetInterfaceInfo {
  /// Kernel interface index.
  pub index: u32,
  /// Interface name, once resolved from a link message.
  pub name: Option<String>,
  /// Administrative state.
  pub is_up: bool,
  /// Addresses assigned to the interface.
  pub addresses: Vec<Ip4AddressInfo>,
}

/// An interface appeared, changed, or went away.
#[derive(Clone, Debug)]
pub enum NetEvent {
  /// An interface's link state changed (including first discovery).
  LinkChanged(NetInterfaceInfo),
  /// An interface's address set changed.
  AddressChanged(NetInterfaceInfo),
}

/// Watches netlink link/address notifications and broadcasts
/// [`NetEvent`]s. Events for an interface whose name hasn't been resolved
/// yet ("public", in the sense of being worth telling subscribers about)
/// are held back until the name is known.
pub struct NetlinkMonitor {
  events: Broadcaster<NetEvent>,
}

impl Default for NetlinkMonitor {
  fn default() -> Self {
    Self::new()
  }
}

impl NetlinkMonitor {
  /// An idle monitor with no subscribers yet.
  pub fn new() -> Self {
    Self {
      events: Broadcaster::new(),
    }
  }

  /// Subscribe to interface events.
  #[must_use = "dropping the returned handle immediately unsubscribes"]
  pub fn subscribe(&self, callback: impl FnMut(&NetEvent) + Send + 'static) -> ListenerHandle<NetEvent> {
    self.events.listen(callback)
  }

  /// Record that `info` changed and, if its name is known, tell
  /// subscribers.
  pub fn report_link(&self, info: NetInterfaceInfo) {
    if info.name.is_some() {
      info!(index = info.index, name = ?info.name, "link state changed");
      self.events.notify(&NetEvent::LinkChanged(info));
    } else {
      debug!(index = info.index, "link event for unnamed interface, holding");
    }
  }

  /// Record that `info`'s addresses changed and, if its name is known,
  /// tell subscribers.
  pub fn report_address(&self, info: NetInterfaceInfo) {
    if info.name.is_some() {
      self.events.notify(&NetEvent::AddressChanged(info));
    }
  }
}

/// Brings an interface up with a fixed address once, on construction.
pub struct InterfaceActivator;

impl InterfaceActivator {
  /// Resolve `name` to an index, assign `address`, and bring the link up.
  pub async fn activate(netlink: &Netlink, name: &str, address: Ip4AddressInfo) -> Result<u32, AppError> {
    let index = netlink.interface_index(name).await?.ok_or_else(|| {
      AppError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("no such interface: {name}"),
      ))
    })?;
    netlink.set_device_ip4_address(index, address).await?;
    netlink.set_device_status(index, true).await?;
    Ok(index)
  }
}
