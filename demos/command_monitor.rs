// Robot-side monitor: decode every command the controller transmits
//
// Usage: cargo run --example command_monitor -- [--echo]
// With --echo each payload is played back on the receive topic, so the
// controller shows it as received data.

use marvin42_controller::config::{TOPIC_CHIRP_RX, TOPIC_CHIRP_TX};
use marvin42_controller::messages::MotorCommand;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let echo = std::env::args().any(|arg| arg == "--echo");

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let subscriber = session.declare_subscriber(TOPIC_CHIRP_TX).await?;
    info!("Listening on {} (echo: {})", TOPIC_CHIRP_TX, echo);

    loop {
        tokio::select! {
            sample = subscriber.recv_async() => {
                let payload = sample?.payload().to_bytes().into_owned();
                match MotorCommand::decode(&payload) {
                    Ok(MotorCommand::Speed { left, right }) => {
                        info!("Motor speed: left={}%, right={}%", left, right);
                    }
                    Ok(MotorCommand::Stop) => info!("Motor stop"),
                    Err(e) => warn!("Undecodable payload {:02X?}: {}", payload, e),
                }
                if echo {
                    session.put(TOPIC_CHIRP_RX, payload).await?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    session.close().await?;
    Ok(())
}
