/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use eva_ftp_client::{EvaClient, EvaClientConfig, TcpConnectionProvider};

pub const GREETING: &str = "220 ADAM2 FTP Server ready\r\n";

pub type TestClient = EvaClient<TcpConnectionProvider, TcpStream, std::io::Error>;

pub enum Step {
    /// Expect `command` and answer with the raw `reply` text.
    Reply {
        command: &'static str,
        reply: &'static str,
    },
    /// Expect PASV and open a data listener on loopback.
    Passive,
    /// Like `Passive`, for clients configured to send `P@SW`.
    PassiveAlt,
    /// Expect `command` and send `data` over the passive data connection.
    Send {
        command: &'static str,
        data: &'static [u8],
    },
    /// Like `Send`, but end the transfer with 426 instead of 226.
    SendAborted {
        command: &'static str,
        data: &'static [u8],
    },
}

pub fn reply(command: &'static str, reply: &'static str) -> Step {
    Step::Reply { command, reply }
}

pub struct ScriptedEva {
    addr: SocketAddr,
    task: JoinHandle<Vec<String>>,
}

impl ScriptedEva {
    pub async fn start(steps: Vec<Step>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            serve(stream, steps).await
        });
        ScriptedEva { addr, task }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn client(&self) -> TestClient {
        self.client_with(EvaClientConfig::default())
    }

    pub fn client_with(&self, mut config: EvaClientConfig) -> TestClient {
        config.connect_timeout = Duration::from_secs(5);
        EvaClient::new(self.addr, TcpConnectionProvider::default(), config).unwrap()
    }

    /// Every command line received, once the client has disconnected.
    pub async fn finish(self) -> Vec<String> {
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("scripted server did not finish")
            .unwrap()
    }
}

async fn serve(stream: TcpStream, steps: Vec<Step>) -> Vec<String> {
    let (r, mut w) = stream.into_split();
    let mut reader = BufReader::new(r);
    let mut received = Vec::new();
    let mut data_listener: Option<TcpListener> = None;

    w.write_all(GREETING.as_bytes()).await.unwrap();

    for step in steps {
        let line = read_command(&mut reader).await.expect("client went away");
        received.push(line.clone());
        match step {
            Step::Reply { command, reply } => {
                assert_eq!(line, command);
                w.write_all(reply.as_bytes()).await.unwrap();
            }
            Step::Passive => {
                assert_eq!(line, "PASV");
                data_listener = Some(enter_passive(&mut w).await);
            }
            Step::PassiveAlt => {
                assert_eq!(line, "P@SW");
                data_listener = Some(enter_passive(&mut w).await);
            }
            Step::Send { command, data } => {
                assert_eq!(line, command);
                let listener = data_listener.take().expect("no passive mode requested");
                send_data(&mut w, listener, data, "226 Transfer complete\r\n").await;
            }
            Step::SendAborted { command, data } => {
                assert_eq!(line, command);
                let listener = data_listener.take().expect("no passive mode requested");
                send_data(&mut w, listener, data, "426 Data connection closed\r\n").await;
            }
        }
    }

    // answer a goodbye, then wait for the client to hang up
    while let Some(line) = read_command(&mut reader).await {
        received.push(line.clone());
        if line == "QUIT" {
            w.write_all(b"221 Goodbye\r\n").await.unwrap();
        } else {
            w.write_all(b"502 Command not implemented\r\n").await.unwrap();
        }
    }
    received
}

async fn enter_passive(w: &mut OwnedWriteHalf) -> TcpListener {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let msg = format!(
        "227 Entering Passive Mode (127,0,0,1,{},{})\r\n",
        port >> 8,
        port & 0xff
    );
    w.write_all(msg.as_bytes()).await.unwrap();
    listener
}

async fn send_data(
    w: &mut OwnedWriteHalf,
    listener: TcpListener,
    data: &[u8],
    end_reply: &str,
) {
    let (mut data_stream, _) = listener.accept().await.unwrap();
    w.write_all(b"150 Opening BINARY data connection\r\n")
        .await
        .unwrap();
    data_stream.write_all(data).await.unwrap();
    data_stream.shutdown().await.unwrap();
    drop(data_stream);
    tokio::time::sleep(Duration::from_millis(20)).await;
    w.write_all(end_reply.as_bytes()).await.unwrap();
}

async fn read_command<R>(reader: &mut R) -> Option<String>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut line = String::new();
    match reader.read_line(&mut line).await {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
    }
}
