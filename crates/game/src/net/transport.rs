use std::collections::VecDeque;

pub type PlayerId = u32;

/// The three channels the transport must provide. Game-update frames go
/// reliable-unordered so a lost frame is retransmitted but a newer one may
/// arrive first; pings stay unreliable; control messages are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Unreliable,
    ReliableUnordered,
    ReliableOrdered,
}

/// An inbound message, authenticated and labelled by the transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub player: PlayerId,
    pub channel: Channel,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransportStats {
    pub messages_sent: u64,
    pub bytes_sent: u64,
    pub messages_received: u64,
    pub bytes_received: u64,
}

/// The server's view of the transport layer. `to = None` broadcasts.
/// Implementations copy outbound payloads before returning; the caller is
/// free to reuse its buffer immediately after the call.
pub trait Transport {
    fn send_text(&mut self, channel: Channel, to: Option<PlayerId>, text: &str);
    fn send_binary(&mut self, channel: Channel, to: Option<PlayerId>, data: &[u8]);
    fn poll(&mut self) -> Vec<InboundMessage>;
    fn stats(&self) -> TransportStats;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SentPayload {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub channel: Channel,
    pub to: Option<PlayerId>,
    pub payload: SentPayload,
}

/// In-process transport: outbound messages are recorded for inspection and
/// inbound messages are queued by the test harness.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    inbound: VecDeque<InboundMessage>,
    pub sent: Vec<SentMessage>,
    stats: TransportStats,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_inbound(&mut self, player: PlayerId, channel: Channel, text: impl Into<String>) {
        let text = text.into();
        self.stats.messages_received += 1;
        self.stats.bytes_received += text.len() as u64;
        self.inbound.push_back(InboundMessage {
            player,
            channel,
            text,
        });
    }

    pub fn sent_binary(&self) -> impl Iterator<Item = &SentMessage> {
        self.sent
            .iter()
            .filter(|m| matches!(m.payload, SentPayload::Binary(_)))
    }

    pub fn sent_text(&self) -> impl Iterator<Item = (&SentMessage, &str)> {
        self.sent.iter().filter_map(|m| match &m.payload {
            SentPayload::Text(text) => Some((m, text.as_str())),
            SentPayload::Binary(_) => None,
        })
    }
}

impl Transport for LoopbackTransport {
    fn send_text(&mut self, channel: Channel, to: Option<PlayerId>, text: &str) {
        self.stats.messages_sent += 1;
        self.stats.bytes_sent += text.len() as u64;
        self.sent.push(SentMessage {
            channel,
            to,
            payload: SentPayload::Text(text.to_string()),
        });
    }

    fn send_binary(&mut self, channel: Channel, to: Option<PlayerId>, data: &[u8]) {
        self.stats.messages_sent += 1;
        self.stats.bytes_sent += data.len() as u64;
        self.sent.push(SentMessage {
            channel,
            to,
            payload: SentPayload::Binary(data.to_vec()),
        });
    }

    fn poll(&mut self) -> Vec<InboundMessage> {
        self.inbound.drain(..).collect()
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}
