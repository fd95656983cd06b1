//! Test server management.
//!
//! Spawns and manages sharecastd instances for integration testing.

use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::sleep;

/// A host entry for the generated config.
pub struct HostSpec {
    pub name: &'static str,
    pub secret: &'static str,
    pub slaves: &'static [&'static str],
}

/// A test broker instance.
pub struct TestServer {
    child: Child,
    port: u16,
    _dir: TempDir,
}

fn free_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

impl TestServer {
    /// Spawn a broker knowing `alice`/`s1` (slaves `alice-cam1`, `alice-cam2`)
    /// and `bob`/`s2` (slave `bob-cam1`).
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(&[
            HostSpec {
                name: "alice",
                secret: "s1",
                slaves: &["alice-cam1", "alice-cam2"],
            },
            HostSpec {
                name: "bob",
                secret: "s2",
                slaves: &["bob-cam1"],
            },
        ])
        .await
    }

    /// Spawn a broker with the given hosts.
    pub async fn spawn_with(hosts: &[HostSpec]) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let port = free_port()?;

        let mut config = format!(
            r#"
[server]
listen = "127.0.0.1:{port}"
node = "00T"

[timeouts]
handshake = 2
"#
        );
        for host in hosts {
            let slaves: Vec<String> = host.slaves.iter().map(|s| format!("\"{s}\"")).collect();
            config.push_str(&format!(
                "\n[[hosts]]\nname = \"{}\"\nsecret = \"{}\"\nslaves = [{}]\n",
                host.name,
                host.secret,
                slaves.join(", ")
            ));
        }
        let config_path = dir.path().join("sharecastd.toml");
        std::fs::write(&config_path, config)?;

        let child = Command::new(env!("CARGO_BIN_EXE_sharecastd"))
            .arg(&config_path)
            .env("RUST_LOG", "warn")
            .stdout(Stdio::null())
            .spawn()?;

        let server = Self {
            child,
            port,
            _dir: dir,
        };
        server.wait_until_ready().await?;
        Ok(server)
    }

    /// Wait until the broker is accepting connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Broker failed to start within 5 seconds")
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    /// Open a WebSocket connection without any handshake.
    pub async fn connect(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.ws_url()).await
    }

    /// Fetch and parse the status endpoint.
    pub async fn status(&self) -> anyhow::Result<serde_json::Value> {
        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", self.port)).await?;
        stream
            .write_all(b"GET /status HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await?;
        let mut response = String::new();
        stream.read_to_string(&mut response).await?;
        let (head, body) = response
            .split_once("\r\n\r\n")
            .ok_or_else(|| anyhow::anyhow!("malformed HTTP response"))?;
        anyhow::ensure!(head.starts_with("HTTP/1.1 200"), "unexpected status: {head}");
        Ok(serde_json::from_str(body)?)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
