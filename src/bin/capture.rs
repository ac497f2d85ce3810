//! Creates a pair of TUN interfaces, `crIN` and `crOUT`; forwards every
//! packet read from `crIN` to `crOUT` unchanged, and logs each one to
//! stdout as a structured record.

use std::io::{
  self,
  BufWriter,
};

use cheaproute::{
  cli::CaptureArgs,
  codec::serialize,
  error::AppError,
  netlink::Netlink,
  reactor::Reactor,
  record::Writer,
  tun_device::{
    TunConfig,
    TunDevice,
  },
};
use clap::Parser;
use tracing::info;

fn main() -> Result<(), AppError> {
  tracing_subscriber::fmt::init();
  let _args = CaptureArgs::parse();

  let reactor = Reactor::new()?;
  reactor.block_on(run())
}

async fn run() -> Result<(), AppError> {
  let mut tun_in = TunDevice::open(&TunConfig::unaddressed("crIN"))?;
  let mut tun_out = TunDevice::open(&TunConfig::unaddressed("crOUT"))?;

  if let Ok(netlink) = Netlink::connect() {
    for name in ["crIN", "crOUT"] {
      if let Ok(Some(index)) = netlink.interface_index(name).await {
        info!(%name, index, "interface ready");
      }
    }
  }

  let mut writer = Writer::new(BufWriter::new(io::stdout()), true);

  tokio::select! {
    result = capture_loop(&mut tun_in, &mut tun_out, &mut writer) => result,
    () = Reactor::wait_for_shutdown_signal() => Ok(()),
  }
}

async fn capture_loop(
  tun_in: &mut TunDevice, tun_out: &mut TunDevice, writer: &mut Writer<BufWriter<io::Stdout>>,
) -> Result<(), AppError> {
  loop {
    let packet = tun_in.read_packet().await?;
    serialize(writer, &packet)?;
    writer.flush()?;
    tun_out.send(&packet).await;
  }
}
