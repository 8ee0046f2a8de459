//! A local HTTP endpoint for exercising the API clients in tests.

use std::sync::{Arc, Mutex};

use anyhow::Context;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct Request {
    pub path: String,
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

/// Answers every request with whatever `respond` returns and remembers the requests.
pub struct StubServer {
    pub url: String,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl StubServer {
    pub async fn start<F>(respond: F) -> anyhow::Result<Self>
    where
        F: Fn(&Request) -> (u16, serde_json::Value) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = requests.clone();
        let respond = Arc::new(respond);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let seen = seen.clone();
                let respond = respond.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, &seen, respond.as_ref()).await;
                });
            }
        });

        Ok(Self { url, requests })
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

async fn serve<F>(mut stream: TcpStream, seen: &Mutex<Vec<Request>>, respond: &F) -> anyhow::Result<()>
where
    F: Fn(&Request) -> (u16, serde_json::Value),
{
    let mut buffer = Vec::new();
    let mut read = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut read).await?;
        anyhow::ensure!(n > 0, "connection closed before the headers ended");
        buffer.extend_from_slice(&read[..n]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.lines();
    let path = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .context("malformed request line")?
        .to_string();
    let mut content_length = 0;
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse()?,
                "authorization" => authorization = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    while buffer.len() < header_end + content_length {
        let n = stream.read(&mut read).await?;
        anyhow::ensure!(n > 0, "connection closed before the body ended");
        buffer.extend_from_slice(&read[..n]);
    }
    let body = serde_json::from_slice(&buffer[header_end..header_end + content_length])
        .unwrap_or(serde_json::Value::Null);

    let request = Request { path, authorization, body };
    let (status, reply) = respond(&request);
    if let Ok(mut requests) = seen.lock() {
        requests.push(request);
    }

    let reply = reply.to_string();
    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reply.len(),
        reply
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// A config whose OpenAI base URL points at `server`.
pub fn config_for(server: &StubServer) -> crate::Config {
    let mut config = crate::test_config();
    config.openai_base_url = format!("{}/v1", server.url);
    config
}
