//! Tiny HTTP/1.1 server answering `HEAD` and `Range` requests over a byte image.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// Advertise and honour byte ranges
    pub ranges: bool,
    /// Cut every range response to at most this many bytes
    pub max_chunk: Option<usize>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            ranges: true,
            max_chunk: None,
        }
    }
}

/// Serve `body` on an ephemeral local port and return its URL.
pub async fn serve(body: Vec<u8>, options: ServerOptions) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = Arc::new(body);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(respond(stream, body.clone(), options));
        }
    });

    format!("http://{addr}/archive.zip")
}

async fn respond(mut stream: TcpStream, body: Arc<Vec<u8>>, options: ServerOptions) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }

    let request = String::from_utf8_lossy(&request).into_owned();
    let mut lines = request.lines();
    let method = lines
        .next()
        .and_then(|line| line.split(' ').next())
        .unwrap_or_default()
        .to_string();
    let range = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("range"))
        .and_then(|(_, value)| parse_range(value.trim()));

    let accept = if options.ranges { "bytes" } else { "none" };
    let response = match (method.as_str(), range) {
        ("HEAD", _) => format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nAccept-Ranges: {accept}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes(),
        ("GET", Some((start, end))) if options.ranges => {
            let end = end.min(body.len() as u64 - 1);
            let mut slice = &body[start as usize..=end as usize];
            if let Some(max) = options.max_chunk {
                slice = &slice[..slice.len().min(max)];
            }
            let last = start + slice.len() as u64 - 1;
            let mut out = format!(
                "HTTP/1.1 206 Partial Content\r\nContent-Length: {}\r\nContent-Range: bytes {start}-{last}/{}\r\nConnection: close\r\n\r\n",
                slice.len(),
                body.len()
            )
            .into_bytes();
            out.extend_from_slice(slice);
            out
        }
        _ => {
            let mut out = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .into_bytes();
            out.extend_from_slice(&body);
            out
        }
    };

    let _ = stream.write_all(&response).await;
    let _ = stream.shutdown().await;
}

fn parse_range(value: &str) -> Option<(u64, u64)> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}
