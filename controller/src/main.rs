mod config;
#[cfg(not(feature = "rpi"))]
mod host;
mod ports;
#[cfg(feature = "rpi")]
mod rpi;
mod runtime;
mod sensors;
mod weather;

#[cfg(not(feature = "rpi"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}

#[cfg(feature = "rpi")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rpi::run().await
}
