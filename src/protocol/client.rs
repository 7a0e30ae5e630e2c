// Device API client. Owns exactly one connection; retry policy belongs to the caller.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tracing::{debug, info, instrument};

use super::auth;
use super::codec;
use super::command::{self, Command};
use super::reply::{Progress, Record, ReplyParser};
use crate::config::DeviceConfig;
use crate::error::ProtocolError;
use crate::models::CounterSnapshot;

pub struct DeviceClient<S = TcpStream> {
    stream: BufStream<S>,
    read_timeout: Duration,
}

impl DeviceClient<TcpStream> {
    /// Connects and logs in. Connection and login failures are returned, never retried here.
    #[instrument(skip(config), fields(host = %config.host, port = config.port))]
    pub async fn connect(config: &DeviceConfig) -> Result<Self, ProtocolError> {
        let addr = display_addr(&config.host, config.port);
        let connect = TcpStream::connect((config.host.as_str(), config.port));
        let stream = match tokio::time::timeout(config.connect_timeout(), connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ProtocolError::Connect { addr, source }),
            Err(_) => return Err(ProtocolError::ConnectTimeout { addr }),
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "set_nodelay failed");
        }

        let mut client = Self::from_stream(stream, config.read_timeout());
        if let Err(e) = client.login(&config.username, &config.password).await {
            if let Err(close_err) = client.close().await {
                debug!(error = %close_err, "close after failed login");
            }
            return Err(e);
        }
        info!(%addr, user = %config.username, "Logged in to device");
        Ok(client)
    }
}

impl<S> DeviceClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already-open transport. No login is performed.
    pub fn from_stream(stream: S, read_timeout: Duration) -> Self {
        Self {
            stream: BufStream::new(stream),
            read_timeout,
        }
    }

    /// Plain login; falls back to challenge-response when the reply carries `=ret=`.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), ProtocolError> {
        let reply = self
            .exchange(
                &Command::new("/login")
                    .attr("name", username)
                    .attr("password", password),
            )
            .await
            .map_err(into_auth_error)?;

        let Some(challenge) = reply.first().and_then(|r| r.get("ret")) else {
            debug!("login accepted without challenge");
            return Ok(());
        };
        let response = auth::challenge_response(password, challenge)?;
        debug!("answering login challenge");
        self.exchange(
            &Command::new("/login")
                .attr("name", username)
                .attr("response", &response),
        )
        .await
        .map_err(into_auth_error)?;
        Ok(())
    }

    /// Sends one command sentence and reads the reply through `!done`.
    pub async fn exchange(&mut self, command: &Command) -> Result<Vec<Record>, ProtocolError> {
        let sentence = codec::encode_sentence(&command.words());
        self.stream.write_all(&sentence).await?;
        self.stream.flush().await?;

        let mut parser = ReplyParser::new();
        loop {
            let word = codec::read_word(&mut self.stream, self.read_timeout).await?;
            if let Progress::Complete(result) = parser.feed(&word) {
                return result;
            }
        }
    }

    /// Live byte counters for `names` (all interfaces when empty).
    /// One unparsable counter rejects the whole response.
    pub async fn interface_stats(
        &mut self,
        names: &[String],
    ) -> Result<Vec<CounterSnapshot>, ProtocolError> {
        let cmd = command::interface_stats(names);
        debug!(words = ?cmd.words(), "interface stats command");
        let records = self.exchange(&cmd).await?;
        records
            .iter()
            .filter_map(|r| CounterSnapshot::from_record(r).transpose())
            .collect()
    }

    /// Flushes and shuts the transport down.
    pub async fn close(mut self) -> Result<(), ProtocolError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

fn into_auth_error(e: ProtocolError) -> ProtocolError {
    match e {
        ProtocolError::Trap { word, message } => ProtocolError::Auth {
            reason: message.unwrap_or(word),
        },
        other => other,
    }
}

fn display_addr(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
