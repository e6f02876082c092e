use std::sync::Arc;

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use typewire::codec::{Tag, TagMap};
use typewire::prelude::*;

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Ping {
    pub seq: u32,
}
wire_struct!(Ping { seq });
message!(Ping => Server);

#[derive(Debug, Clone, PartialEq)]
pub struct Pong {
    pub seq: u32,
    pub from: String,
}
wire_struct!(Pong { seq, from });
message!(Pong => Client);

/// Server-wide announcement carrying free-form tag data.
#[derive(Debug, Clone, PartialEq)]
pub struct Announce {
    pub text: String,
    pub extra: TagMap,
}
wire_struct!(Announce { text, extra });
message!(Announce => Client);

/// Builds the protocol shared by both ends. Events seen by the client are
/// forwarded to `events`.
fn protocol(events: mpsc::UnboundedSender<String>) -> Result<Registry, SchemaError> {
    let mut registry = Registry::new();
    registry.register::<Ping>()?;
    registry.register::<Pong>()?;
    registry.register::<Announce>()?;

    registry.on_server_reply::<Ping, Pong>(|ping, sender| {
        tracing::info!(seq = ping.seq, %sender, "ping");
        Some(Pong {
            seq: ping.seq,
            from: "server".into(),
        })
    })?;
    let pongs = events.clone();
    registry.on_client::<Pong>(move |pong, _| {
        let _ = pongs.send(format!("pong #{} from {}", pong.seq, pong.from));
    })?;
    registry.on_client::<Announce>(move |announce, _| {
        let _ = events.send(format!("announce: {} {:?}", announce.text, announce.extra));
    })?;
    Ok(registry)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let server = ChannelBuilder::new(protocol(mpsc::unbounded_channel().0)?)
        .name("server")
        .build(MemoryServer::new())?;
    let server = Arc::new(server);

    let (tx, mut events) = mpsc::unbounded_channel();
    let transport = server.transport().connect(Placement::default()).await;
    let client = Arc::new(
        ChannelBuilder::new(protocol(tx)?)
            .name("client")
            .build(transport)?,
    );

    let server_task = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.run().await }
    });
    let client_task = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.run().await }
    });

    for seq in 1..=3 {
        client.send_to_server(&Ping { seq }).await?;
    }
    let mut extra = TagMap::new();
    extra.insert("round".into(), Tag::from(3));
    server
        .send_to_all(&Announce {
            text: "that's all".into(),
            extra,
        })
        .await?;

    for _ in 0..4 {
        match events.recv().await {
            Some(event) => tracing::info!("{event}"),
            None => break,
        }
    }

    server.close().await?;
    server_task.await??;
    client_task.await??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_seals() {
        let mut registry = protocol(mpsc::unbounded_channel().0).unwrap();
        registry.seal().unwrap();
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn test_ping_is_answered() {
        let server = Arc::new(
            ChannelBuilder::new(protocol(mpsc::unbounded_channel().0).unwrap())
                .build(MemoryServer::new())
                .unwrap(),
        );
        let (tx, mut events) = mpsc::unbounded_channel();
        let transport = server.transport().connect(Placement::default()).await;
        let client = Arc::new(
            ChannelBuilder::new(protocol(tx).unwrap())
                .build(transport)
                .unwrap(),
        );
        tokio::spawn({
            let server = Arc::clone(&server);
            async move { server.run().await }
        });
        tokio::spawn({
            let client = Arc::clone(&client);
            async move { client.run().await }
        });

        client.send_to_server(&Ping { seq: 42 }).await.unwrap();
        assert_eq!(events.recv().await.unwrap(), "pong #42 from server");
    }
}
