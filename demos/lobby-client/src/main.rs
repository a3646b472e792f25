use std::error::Error;
use std::time::Duration;

use dashlink::prelude::*;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// A headless runner: joins, readies once a second player is in, then runs
// and jumps on its own while printing what the server sends.
// ---------------------------------------------------------------------------

const FRAME: Duration = Duration::from_millis(16);
const SPEED: f32 = 4.0;
const JUMP_VELOCITY: f32 = 12.0;
const GRAVITY: f32 = 0.8;
const JUMP_EVERY: u64 = 90;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Runner {
    x: f32,
    y: f32,
    vy: f32,
}

impl Runner {
    fn step(&mut self, frame: u64) {
        self.x += SPEED;
        if self.y == 0.0 && frame % JUMP_EVERY == 0 {
            self.vy = JUMP_VELOCITY;
        }
        self.y = (self.y + self.vy).max(0.0);
        self.vy = if self.y == 0.0 { 0.0 } else { self.vy - GRAVITY };
    }

    fn state(&self, id: PlayerId) -> PlayerState {
        PlayerState::new(id, self.x, self.y, false)
    }
}

/// Ready up once we have an id and someone to play against.
fn should_ready(snapshot: &SessionSnapshot) -> bool {
    snapshot.my_id.is_assigned() && snapshot.player_count >= 2 && !snapshot.ready
}

struct Args {
    config: ClientConfig,
    frames: Option<u64>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, Box<dyn Error>> {
    let mut config = ClientConfig::default();
    let mut frames = None;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config needs a file path")?;
                config = ClientConfig::from_json_file(path)?;
            }
            "--server" => {
                let host = args.next().ok_or("--server needs HOST[:PORT]")?;
                config.locator = ServerLocator::Fixed { host };
            }
            "--frames" => {
                frames = Some(args.next().ok_or("--frames needs a count")?.parse()?);
            }
            other => return Err(format!("unknown argument {other:?}").into()),
        }
    }
    Ok(Args { config, frames })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = parse_args(std::env::args().skip(1))?;

    let mut client = match GameClient::connect(args.config).await {
        Ok(client) => client,
        Err(e) if e.is_discovery_failure() => {
            eprintln!("server not found: {e}");
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };
    client.on_game_start(|| tracing::info!("server says go"));

    let mut runner = Runner::default();
    let mut ticker = tokio::time::interval(FRAME);
    let mut frame_no: u64 = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {}
        }
        frame_no += 1;
        if args.frames.is_some_and(|max| frame_no > max) {
            break;
        }

        let frame = client.poll_frame();
        for event in &frame.events {
            match event {
                SessionEvent::Obstacle(obstacle) => {
                    println!("{}", serde_json::to_string(obstacle)?);
                }
                SessionEvent::PeerState(peer) => tracing::trace!(?peer, "peer moved"),
                SessionEvent::JoinAbandoned { attempts } => {
                    return Err(format!("server never assigned an id after {attempts} JOINs").into());
                }
                other => tracing::debug!(event = ?other, "session event"),
            }
        }

        if should_ready(&frame.snapshot) {
            client.send_ready()?;
        }
        if client.take_start_game() {
            runner = Runner::default();
        }

        if frame.snapshot.phase() == SessionPhase::InGame {
            runner.step(frame_no);
            if let Err(e) = client.send(&runner.state(frame.snapshot.my_id)) {
                // Next frame's state replaces this one.
                tracing::debug!(error = %e, "state not sent");
            }
        }
    }

    let stats = client.stats();
    tracing::info!(
        sent = stats.sent,
        received = stats.received,
        dropped = stats.dropped,
        "leaving"
    );
    client.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_runner_jumps_and_lands() {
        let mut runner = Runner::default();
        runner.step(JUMP_EVERY);
        assert!(runner.y > 0.0);

        for frame in 1..60 {
            runner.step(JUMP_EVERY + frame);
        }
        assert_eq!(runner.y, 0.0);
        assert_eq!(runner.vy, 0.0);
        assert_eq!(runner.x, SPEED * 60.0);
    }

    #[test]
    fn test_ready_needs_id_and_opponent() {
        let mut snap = SessionSnapshot::default();
        assert!(!should_ready(&snap));

        snap.my_id = PlayerId(1);
        snap.player_count = 1;
        assert!(!should_ready(&snap));

        snap.player_count = 2;
        assert!(should_ready(&snap));

        snap.ready = true;
        assert!(!should_ready(&snap));
    }

    #[test]
    fn test_parse_server_flag() {
        let parsed = parse_args(args(&["--server", "192.168.1.20", "--frames", "10"])).unwrap();
        assert_eq!(
            parsed.config.locator,
            ServerLocator::Fixed {
                host: "192.168.1.20".into()
            }
        );
        assert_eq!(parsed.frames, Some(10));
    }

    #[test]
    fn test_parse_rejects_unknown_flag() {
        assert!(parse_args(args(&["--nope"])).is_err());
        assert!(parse_args(args(&["--frames"])).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bot_readies_against_fake_server() {
        let server_addr = "10.0.0.1:4321".parse().unwrap();
        let (client_end, server) = MemoryTransport::pair("10.0.0.2:5000".parse().unwrap(), server_addr);
        let mut client = GameClient::start(client_end, TextCodec, server_addr, &ClientConfig::default());

        let mut buf = [0u8; 64];
        let (len, from) = server.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"JOIN");
        server.send_to(b"ASSIGN;id=1", from).await.unwrap();
        server.send_to(b"COUNT;players=2", from).await.unwrap();

        let mut readied = false;
        for _ in 0..50 {
            tokio::time::sleep(FRAME).await;
            let frame = client.poll_frame();
            if should_ready(&frame.snapshot) {
                client.send_ready().unwrap();
                readied = true;
                break;
            }
        }
        assert!(readied);

        // The next datagram after JOIN resends (if any) is READY.
        loop {
            let (len, _) = server.recv_from(&mut buf).await.unwrap();
            if &buf[..len] != b"JOIN" {
                assert_eq!(&buf[..len], b"READY");
                break;
            }
        }
    }
}
