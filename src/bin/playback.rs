//! Reads a previously captured record log and replays every packet it
//! contains into a TUN interface, once a second, for as long as the
//! process runs.

use std::{
  fs::File,
  io::BufReader,
  net::Ipv4Addr,
  time::Duration,
};

use cheaproute::{
  addr::Ip4AddressInfo,
  cli::PlaybackArgs,
  codec::deserialize_records,
  error::AppError,
  netlink::{
    InterfaceActivator,
    Netlink,
  },
  reactor::Reactor,
  record::Reader,
  tun_device::{
    TunConfig,
    TunDevice,
  },
};
use clap::Parser;
use tracing::error;

// TODO: remove hard-coded IP address
const PLAYBACK_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 6, 1);
const PLAYBACK_PREFIX_LEN: u8 = 24;

fn main() -> Result<(), AppError> {
  tracing_subscriber::fmt::init();
  let args = PlaybackArgs::parse();

  let reactor = Reactor::new()?;
  reactor.block_on(run(args))
}

async fn run(args: PlaybackArgs) -> Result<(), AppError> {
  let mut tun = TunDevice::open(&TunConfig::unaddressed(&args.iface_name))?;

  if let Ok(netlink) = Netlink::connect() {
    let address = Ip4AddressInfo::new(PLAYBACK_ADDRESS, PLAYBACK_PREFIX_LEN);
    if let Err(err) = InterfaceActivator::activate(&netlink, &args.iface_name, address).await {
      error!(%err, "failed to configure interface");
    }
  }

  tokio::select! {
    result = playback_loop(&mut tun, &args) => result,
    () = Reactor::wait_for_shutdown_signal() => Ok(()),
  }
}

async fn playback_loop(tun: &mut TunDevice, args: &PlaybackArgs) -> Result<(), AppError> {
  loop {
    tokio::time::sleep(Duration::from_secs(1)).await;
    let packets = load_packets(&args.packet_log)?;
    for packet in packets {
      tun.send(&packet).await;
    }
  }
}

fn load_packets(path: &std::path::Path) -> Result<Vec<Vec<u8>>, AppError> {
  let file = File::open(path)?;
  let mut reader = Reader::new(BufReader::new(file));
  Ok(deserialize_records(&mut reader)?)
}
