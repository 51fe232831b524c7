use std::sync::Arc;

use log::info;
use openbell_client::RoomClient;
use openbell_core::{GamePhase, PlayerId};
use openbell_protocol::{ChannelTransport, Topics, Transport};

#[tokio::main]
async fn main() {
    env_logger::init();

    let room = std::env::var("OPENBELL_ROOM").unwrap_or_else(|_| "classroom".to_string());
    let name = std::env::var("OPENBELL_NAME").unwrap_or_else(|_| "observer".to_string());
    let player_id = PlayerId::new(format!("{}-{}", name, uuid::Uuid::new_v4()));

    let transport: Arc<dyn Transport> = ChannelTransport::new();
    let topics = Topics::new("openbell", &room);

    let mut client = match RoomClient::join(transport, topics, player_id, &name).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("failed to join {room}: {e}");
            std::process::exit(1);
        }
    };
    info!("joined room {room} as {name}");

    while let Some(applied) = client.next_update().await {
        if !applied {
            continue;
        }
        let world = &client.world;
        info!(
            "day {} {:?}/{:?} ({}s left), index {}",
            world.day, world.phase, world.session, world.time_left_secs, world.market_index
        );
        for note in &world.notifications {
            info!("  * {}", note.text);
        }
        if world.phase == GamePhase::Ended {
            break;
        }
    }
    info!("room closed");
}
