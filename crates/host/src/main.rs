use std::sync::Arc;

use log::info;
use openbell_core::GameSettings;
use openbell_host::{GameRoom, spawn_inbound_pump, spawn_timers};
use openbell_protocol::{ChannelTransport, Topics};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    env_logger::init();

    let room_name = std::env::var("OPENBELL_ROOM").unwrap_or_else(|_| "classroom".to_string());
    let settings = GameSettings::default();

    let transport = ChannelTransport::new();
    let topics = Topics::new("openbell", &room_name);
    info!("hosting room {room_name}");

    let (tx, rx) = mpsc::channel(1024);
    let timers = spawn_timers(tx.clone(), &settings);
    let pump = match spawn_inbound_pump(transport.clone(), topics.clone(), tx).await {
        Ok(pump) => pump,
        Err(e) => {
            eprintln!("failed to subscribe: {e}");
            std::process::exit(1);
        }
    };

    let mut room = GameRoom::new(settings, transport, topics);
    room.start_game().await;
    room.run(rx).await;

    for timer in timers {
        timer.abort();
    }
    pump.abort();
    info!("host shut down");
}
