/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::error::Error;
use std::io;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpSocket, TcpStream};

use crate::config::FtpTransferConfig;

#[async_trait]
pub trait EvaConnectionProvider<T: AsyncRead + AsyncWrite, E: Error> {
    async fn new_control_connection(&mut self, server: SocketAddr) -> Result<T, E>;
    async fn new_data_connection(&mut self, server: SocketAddr) -> Result<T, E>;
}

/// Plain TCP connections, optionally bound to a local address.
#[derive(Default)]
pub struct TcpConnectionProvider {
    bind_ip: Option<IpAddr>,
    transfer: FtpTransferConfig,
}

impl TcpConnectionProvider {
    pub fn new(transfer: FtpTransferConfig) -> Self {
        TcpConnectionProvider {
            bind_ip: None,
            transfer,
        }
    }

    pub fn set_bind_ip(&mut self, ip: IpAddr) {
        self.bind_ip = Some(ip);
    }
}

fn new_socket_to(peer: &SocketAddr, bind_ip: Option<IpAddr>) -> io::Result<TcpSocket> {
    let socket = match peer {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    if let Some(ip) = bind_ip {
        socket.bind(SocketAddr::new(ip, 0))?;
    }
    Ok(socket)
}

#[async_trait]
impl EvaConnectionProvider<TcpStream, io::Error> for TcpConnectionProvider {
    async fn new_control_connection(&mut self, server: SocketAddr) -> io::Result<TcpStream> {
        let socket = new_socket_to(&server, self.bind_ip)?;
        let stream = socket.connect(server).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    async fn new_data_connection(&mut self, server: SocketAddr) -> io::Result<TcpStream> {
        let socket = new_socket_to(&server, self.bind_ip)?;
        socket.set_send_buffer_size(self.transfer.socket_buffer_size)?;
        socket.set_recv_buffer_size(self.transfer.socket_buffer_size)?;
        socket.set_nodelay(true)?;

        match tokio::time::timeout(self.transfer.connect_timeout, socket.connect(server)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "data connection timed out",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn data_connection_on_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut provider = TcpConnectionProvider::default();

        let (client, accepted) =
            tokio::join!(provider.new_data_connection(addr), listener.accept());
        let mut client = client.unwrap();
        let (mut server, _) = accepted.unwrap();
        assert!(client.nodelay().unwrap());

        server.write_all(b"urlader").await.unwrap();
        drop(server);
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"urlader");
    }

    #[tokio::test]
    async fn data_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut provider = TcpConnectionProvider::default();
        assert!(provider.new_data_connection(addr).await.is_err());
    }
}
