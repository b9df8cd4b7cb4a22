use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use room_calls::calls::loopback::{LoopbackCall, LoopbackFactory, PeerBehavior};
use room_calls::calls::MediaSink;
use room_calls::rooms::InMemoryRooms;
use room_calls::types::events::{IncomingCall, PlaceCall};
use room_calls::{Action, CallHandler, CallHandlerConfig, Dispatcher, RoomId};

// Runs one call through the coordinator against the loopback transport.
//
// Usage:
//   cargo run                                  # voice call, peer answers
//   cargo run -- --peer decline                # peer rejects the invite
//   cargo run -- --peer ignore                 # invite times out
//   cargo run -- --incoming                    # peer calls us, we answer
//   cargo run -- --members 3                   # rejected: not a 1:1 room
//   cargo run -- --config calls.json           # override dialog texts etc.

#[derive(Parser, Debug)]
#[command(about = "Drive the call coordinator against a simulated peer")]
struct Args {
    /// Room the call takes place in.
    #[arg(long, default_value = "!abc:example.org")]
    room: String,

    /// Media kind sent with place_call (voice, video, or anything else to see it rejected).
    #[arg(long = "type", default_value = "voice")]
    call_type: String,

    /// How the simulated remote side reacts to our invite.
    #[arg(long, value_enum, default_value_t = Peer::Answer)]
    peer: Peer,

    /// Simulate a call offered by the peer instead of placing one.
    #[arg(long)]
    incoming: bool,

    /// Joined members of the room.
    #[arg(long, default_value_t = 2)]
    members: usize,

    /// JSON file with coordinator settings.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Peer {
    Answer,
    Decline,
    Ignore,
}

impl From<Peer> for PeerBehavior {
    fn from(peer: Peer) -> Self {
        match peer {
            Peer::Answer => PeerBehavior::Answer,
            Peer::Decline => PeerBehavior::Decline,
            Peer::Ignore => PeerBehavior::Ignore,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{:<5}] [{}] - {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let config = match &args.config {
        Some(path) => CallHandlerConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CallHandlerConfig::default(),
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    rt.block_on(run(args, config))
}

async fn run(args: Args, config: CallHandlerConfig) -> Result<()> {
    let room_id = RoomId::from(args.room.as_str());
    let dispatcher = Arc::new(Dispatcher::new());
    let rooms = Arc::new(InMemoryRooms::new());
    rooms.set_joined_members(room_id.clone(), args.members);
    let factory = Arc::new(LoopbackFactory::new(args.peer.into()));

    let handler = CallHandler::builder()
        .with_config(config)
        .with_rooms(rooms)
        .with_call_factory(factory.clone())
        .build(dispatcher.clone())
        .context("Failed to build call handler")?;

    // Plays the part of the view layer: re-query on every call_state.
    let mut rx = dispatcher.subscribe();
    let view_handler = handler.clone();
    let view = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(Action::CallState { room_id }) => match view_handler.get_call(&room_id) {
                    Some(call) => info!("[view] {} is {}", room_id, call.status()),
                    None => info!("[view] {} has no call", room_id),
                },
                Ok(Action::ViewRoom { room_id }) => info!("[view] switching to {}", room_id),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("[view] missed {} actions", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let pause = Duration::from_millis(300);
    if args.incoming {
        let call = LoopbackCall::incoming("loopback-incoming", room_id.clone());
        dispatcher.dispatch(Action::IncomingCall(IncomingCall::new(call)));
        tokio::time::sleep(pause).await;
        dispatcher.dispatch(Action::Answer {
            room_id: room_id.clone(),
        });
    } else {
        let mut place = PlaceCall::voice(room_id.clone());
        place.call_type = args.call_type.clone();
        if place.call_type == "video" {
            place.remote_element = Some(MediaSink::new("remote-video"));
            place.local_element = Some(MediaSink::new("local-video"));
        }
        dispatcher.dispatch(Action::PlaceCall(place));
        tokio::time::sleep(pause).await;

        if let Some(call) = factory.last_call() {
            call.expire_invite();
        }
    }

    tokio::time::sleep(pause).await;
    if handler.get_call(&room_id).is_some_and(|call| call.is_live()) {
        dispatcher.dispatch(Action::Hangup {
            room_id: room_id.clone(),
        });
    }

    tokio::time::sleep(pause).await;
    if !handler.detach() {
        warn!("Call handler was already detached");
    }
    view.abort();
    Ok(())
}
