//! TCP transport: one JSON message per line in each direction.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::handler::{ClientContext, Handler};
use crate::protocol::{encode, ServerMessage};

/// Accept connections until the listener fails.
pub async fn serve(listener: TcpListener, handler: Handler) -> io::Result<()> {
    let handler = Arc::new(handler);
    loop {
        let (stream, peer) = listener.accept().await?;
        log::info!("client connected: {}", peer);
        let handler = handler.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, peer, &handler).await {
                log::warn!("connection {} ended with error: {}", peer, err);
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    handler: &Handler,
) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let mut line = match encode(&msg) {
                Ok(line) => line,
                Err(err) => {
                    log::warn!("failed to encode outbound message: {}", err);
                    continue;
                }
            };
            line.push('\n');
            if let Err(err) = writer.write_all(line.as_bytes()).await {
                log::warn!("write to {} failed: {}", peer, err);
                break;
            }
        }
    });

    let mut ctx = ClientContext::new(tx);
    let mut lines = BufReader::new(reader).lines();
    let result = loop {
        match lines.next_line().await {
            Ok(Some(line)) => handler.handle_line(&mut ctx, &line).await,
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
        }
    };

    handler.disconnect(&mut ctx).await;
    write_task.abort();
    log::info!("client disconnected: {}", peer);
    result
}
