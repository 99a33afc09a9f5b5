use crate::codec;
use crate::config::{Command, Config};
use crate::protocol::{
    CurrentWindowPayload, ErrorPayload, Message, MessageType, SetVisibilityPayload,
};
use anyhow::{Context, Result, bail};
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

/// Blocking client side of the daemon socket.
#[derive(Debug)]
pub struct Client {
    stream: UnixStream,
    next_id: u64,
}

impl Client {
    /// Connect to the daemon at `socket_path`.
    pub fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path).with_context(|| {
            format!(
                "Failed to connect to daemon at {}. Is the daemon running?",
                socket_path.display()
            )
        })?;

        // Set timeouts
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        stream.set_write_timeout(Some(Duration::from_secs(5)))?;

        Ok(Client { stream, next_id: 1 })
    }

    /// Send one request and wait for the matching response.
    ///
    /// Error-typed replies come back as `Err` carrying the daemon's detail
    /// string.
    pub fn send(&mut self, mut message: Message) -> Result<Message> {
        message.id = self.next_id;
        self.next_id += 1;

        let frame = codec::encode(&message)?;
        self.stream.write_all(&frame)?;
        self.stream.flush()?;

        let reply = codec::read_message_blocking(&mut self.stream)
            .context("Failed to read daemon response")?;

        if reply.ty == MessageType::Error {
            let payload: ErrorPayload = reply.payload()?;
            bail!("error response: {}", payload.details);
        }

        if reply.id != message.id {
            bail!(
                "mismatched correlation id: sent {}, got {}",
                message.id,
                reply.id
            );
        }

        Ok(reply)
    }
}

/// Run a single client command against the daemon and print its result.
///
/// An unreachable daemon is reported but exits successfully, so keybinding
/// scripts are not broken while the daemon is down.
pub fn run_command(config: &Config, command: Command) -> Result<()> {
    let socket_path = config.socket_path()?;

    let mut client = match Client::connect(&socket_path) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{e:#}");
            return Ok(());
        }
    };

    match command {
        Command::Daemon => bail!("the daemon command is not sent over the socket"),
        Command::Hello => {
            client.send(Message::request(MessageType::Hello, 0))?;
            println!("daemon is alive");
        }
        Command::Current => {
            let reply = client.send(Message::request(MessageType::CurrentWindow, 0))?;
            let payload: CurrentWindowPayload = reply.payload()?;
            println!("{}", serde_json::to_string_pretty(&payload.window)?);
        }
        Command::Add => {
            client.send(Message::request(MessageType::AddCurrentWindow, 0))?;
        }
        Command::Remove => {
            client.send(Message::request(MessageType::RemoveCurrentWindow, 0))?;
        }
        Command::Next => {
            client.send(Message::request(MessageType::ShowNextWindow, 0))?;
        }
        Command::Prev => {
            client.send(Message::request(MessageType::ShowPreviousWindow, 0))?;
        }
        Command::ShowAll => {
            client.send(Message::request(MessageType::ShowAllWindows, 0))?;
        }
        Command::SetVisibility { id, visible } => {
            let message = Message::reply_with(
                MessageType::SetWindowVisibility,
                0,
                &SetVisibilityPayload { id, visible },
            )?;
            client.send(message)?;
        }
    }

    Ok(())
}
