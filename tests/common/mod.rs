//! A fake clamd speaking the session protocol, over `tokio::io::duplex` or
//! a loopback TCP listener.

#![allow(dead_code)]

use async_trait::async_trait;
use clamstream::protocol::{self, Command};
use clamstream::session::{BoxedStream, Connect};
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// How the fake answers one INSTREAM.
#[derive(Debug, Clone)]
pub enum Verdict {
    Clean,
    Infected(&'static str),
    /// A bare NUL: an empty reply.
    Empty,
    /// Bytes that are not UTF-8.
    Garbage,
    /// Read the stream, then never answer.
    Stall,
    /// Read the first chunk, then drop the connection.
    Drop,
}

/// Something the fake observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connected,
    Command(Command),
    Stream(Vec<usize>),
}

#[derive(Debug, Clone, Default)]
pub struct FakeClamd {
    verdicts: Arc<Mutex<VecDeque<Verdict>>>,
    events: Arc<Mutex<Vec<Event>>>,
    duplex_capacity: Option<usize>,
}

impl FakeClamd {
    pub fn new(verdicts: impl IntoIterator<Item = Verdict>) -> Self {
        Self {
            verdicts: Arc::new(Mutex::new(verdicts.into_iter().collect())),
            ..Self::default()
        }
    }

    /// Uses a small in-memory pipe so writes block once the fake stops reading.
    pub fn with_duplex_capacity(mut self, capacity: usize) -> Self {
        self.duplex_capacity = Some(capacity);
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Command(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn streams(&self) -> Vec<Vec<usize>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Stream(sizes) => Some(sizes),
                _ => None,
            })
            .collect()
    }

    pub fn connections(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == Event::Connected)
            .count()
    }

    /// Binds a loopback listener and serves every connection it accepts.
    pub async fn listen_tcp(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let fake = self.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                fake.record(Event::Connected);
                tokio::spawn(fake.clone().serve(stream));
            }
        });
        addr
    }

    fn next_verdict(&self) -> Verdict {
        self.verdicts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Verdict::Clean)
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    async fn serve<S>(self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let (rd, mut wr) = tokio::io::split(stream);
        let mut rd = BufReader::new(rd);
        let mut request = 0u64;

        loop {
            let raw = match protocol::read_command(&mut rd).await {
                Ok(Some(raw)) => raw,
                _ => return,
            };
            let Some(command) = Command::parse(&raw) else {
                return;
            };
            self.record(Event::Command(command));

            let reply: Vec<u8> = match command {
                Command::IdSession => continue,
                Command::End => return,
                Command::Ping => {
                    request += 1;
                    format!("{}: PONG\0", request).into_bytes()
                }
                Command::Version => {
                    request += 1;
                    format!("{}: ClamAV 1.3.1/27300/Mon Jun 10 08:00:00 2024\0", request)
                        .into_bytes()
                }
                Command::InStream => {
                    request += 1;
                    match self.next_verdict() {
                        Verdict::Drop => {
                            let _ = protocol::read_chunk(&mut rd).await;
                            return;
                        }
                        verdict => {
                            let Ok(chunks) = protocol::read_stream(&mut rd).await else {
                                return;
                            };
                            self.record(Event::Stream(chunks.iter().map(Vec::len).collect()));
                            match verdict {
                                Verdict::Clean => format!("{}: stream: OK\0", request).into_bytes(),
                                Verdict::Infected(signature) => {
                                    format!("{}: stream: {} FOUND\0", request, signature)
                                        .into_bytes()
                                }
                                Verdict::Empty => b"\0".to_vec(),
                                Verdict::Garbage => vec![0xff, 0xfe, 0x00],
                                Verdict::Stall => {
                                    tokio::time::sleep(Duration::from_secs(3600)).await;
                                    return;
                                }
                                Verdict::Drop => unreachable!(),
                            }
                        }
                    }
                }
            };

            if wr.write_all(&reply).await.is_err() {
                return;
            }
        }
    }
}

#[async_trait]
impl Connect for FakeClamd {
    async fn connect(&self) -> io::Result<BoxedStream> {
        let (client, server) = tokio::io::duplex(self.duplex_capacity.unwrap_or(256 * 1024));
        self.record(Event::Connected);
        tokio::spawn(self.clone().serve(server));
        Ok(Box::new(client))
    }

    fn address(&self) -> String {
        "fake-clamd".to_string()
    }
}

/// Installs a test subscriber so `RUST_LOG=clamstream=debug` shows the
/// session at work.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
