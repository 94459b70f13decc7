//! Line-delimited JSON over TCP.
//!
//! The wire carries exactly what the simulated network carries: one encoded
//! request per line, answered by one encoded response per line. Services and
//! clients generated by `service!` work unchanged on top of it.

use std::{net::SocketAddr, time::Duration};

use anyhow::{anyhow, Result};
use log::{debug, info, trace, warn};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpListener, TcpStream,
    },
    sync::mpsc::{self, Receiver, Sender},
    time,
};

use crate::network::NetworkPackage;

/// A peer that holds a request longer than this loses its connection.
const ROUNDTRIP_TIMEOUT: Duration = Duration::from_secs(10);

/// Accepts connections on `listener` and feeds their requests to a server
/// through `server_chan`. Returns only if accepting fails.
pub async fn serve(listener: TcpListener, server_chan: Sender<NetworkPackage>) -> Result<()> {
    info!("listening on {}", listener.local_addr()?);
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!("accepted connection from {}", peer);
        let server_chan = server_chan.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, server_chan).await {
                debug!("connection from {} closed: {}", peer, e);
            }
        });
    }
}

async fn serve_connection(stream: TcpStream, server_chan: Sender<NetworkPackage>) -> Result<()> {
    let (r, mut w) = stream.into_split();
    let mut lines = BufReader::new(r).lines();
    while let Some(data) = lines.next_line().await? {
        let (reply, mut rx) = mpsc::channel(1);
        server_chan
            .send(NetworkPackage {
                to: String::new(),
                reply,
                data,
            })
            .await
            .map_err(|_| anyhow!("server is gone"))?;
        // The server drops the reply channel for requests it cannot decode.
        let resp = rx.recv().await.ok_or_else(|| anyhow!("request rejected"))?;
        w.write_all(resp.as_bytes()).await?;
        w.write_all(b"\n").await?;
    }
    Ok(())
}

/// Opens a transport to `addr`. The connection is made lazily by a background
/// task and re-established after any I/O error; packages that cannot be
/// delivered are dropped, so the caller's call fails.
///
/// Must be called from within a tokio runtime.
pub fn connect(addr: SocketAddr) -> Sender<NetworkPackage> {
    let (tx, rx) = mpsc::channel(100);
    tokio::spawn(forward(addr, rx));
    tx
}

struct Connection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    w: OwnedWriteHalf,
}

impl Connection {
    async fn open(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (r, w) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(r).lines(),
            w,
        })
    }

    async fn roundtrip(&mut self, data: &str) -> Result<String> {
        self.w.write_all(data.as_bytes()).await?;
        self.w.write_all(b"\n").await?;
        self.lines
            .next_line()
            .await?
            .ok_or_else(|| anyhow!("connection closed by peer"))
    }
}

async fn forward(addr: SocketAddr, mut rx: Receiver<NetworkPackage>) {
    let mut conn: Option<Connection> = None;
    while let Some(p) = rx.recv().await {
        if conn.is_none() {
            match Connection::open(addr).await {
                Ok(c) => conn = Some(c),
                Err(e) => {
                    debug!("unable to connect to {}: {}", addr, e);
                    continue;
                }
            }
        }
        let result = match conn.as_mut() {
            Some(c) => match time::timeout(ROUNDTRIP_TIMEOUT, c.roundtrip(&p.data)).await {
                Ok(r) => r,
                Err(_) => Err(anyhow!("no answer within {:?}", ROUNDTRIP_TIMEOUT)),
            },
            None => continue,
        };
        match result {
            Ok(resp) => {
                trace!("{} answered {}", addr, resp);
                if p.reply.send(resp).await.is_err() {
                    warn!("caller of {} went away before the reply arrived", addr);
                }
            }
            Err(e) => {
                debug!("connection to {} failed: {}", addr, e);
                conn = None;
            }
        }
    }
}
