use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use vanguard::{Channel, InboundMessage, PlayerId, Transport, TransportStats};

const MAX_DATAGRAM: usize = 65_507;

/// Development transport: every channel rides plain UDP, with a one-byte
/// channel tag in front of each datagram. Reliability is therefore
/// best-effort; a production deployment supplies a transport whose reliable
/// channels actually retransmit.
///
/// Player identity is the datagram source address; the first two distinct
/// addresses become players 0 and 1, later ones are dropped.
pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
    players_by_addr: HashMap<SocketAddr, PlayerId>,
    addrs_by_player: HashMap<PlayerId, SocketAddr>,
    next_player: PlayerId,
    max_players: usize,
    stats: TransportStats,
    recv_buffer: Box<[u8; MAX_DATAGRAM]>,
}

impl UdpTransport {
    pub fn bind<A: ToSocketAddrs>(addr: A, max_players: usize) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            players_by_addr: HashMap::new(),
            addrs_by_player: HashMap::new(),
            next_player: 0,
            max_players,
            stats: TransportStats::default(),
            recv_buffer: Box::new([0u8; MAX_DATAGRAM]),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn player_count(&self) -> usize {
        self.players_by_addr.len()
    }

    fn channel_tag(channel: Channel) -> u8 {
        match channel {
            Channel::Unreliable => b'u',
            Channel::ReliableUnordered => b'r',
            Channel::ReliableOrdered => b'o',
        }
    }

    fn tag_channel(tag: u8) -> Option<Channel> {
        match tag {
            b'u' => Some(Channel::Unreliable),
            b'r' => Some(Channel::ReliableUnordered),
            b'o' => Some(Channel::ReliableOrdered),
            _ => None,
        }
    }

    fn player_for(&mut self, addr: SocketAddr) -> Option<PlayerId> {
        if let Some(&player) = self.players_by_addr.get(&addr) {
            return Some(player);
        }
        if self.players_by_addr.len() >= self.max_players {
            log::warn!("dropping datagram from {addr}: match is full");
            return None;
        }
        let player = self.next_player;
        self.next_player += 1;
        self.players_by_addr.insert(addr, player);
        self.addrs_by_player.insert(player, addr);
        log::info!("{addr} joined as player {player}");
        Some(player)
    }

    fn send_datagram(&mut self, channel: Channel, to: Option<PlayerId>, payload: &[u8]) {
        let mut datagram = Vec::with_capacity(payload.len() + 1);
        datagram.push(Self::channel_tag(channel));
        datagram.extend_from_slice(payload);

        let targets: Vec<SocketAddr> = match to {
            Some(player) => self.addrs_by_player.get(&player).copied().into_iter().collect(),
            None => self.addrs_by_player.values().copied().collect(),
        };

        for addr in targets {
            match self.socket.send_to(&datagram, addr) {
                Ok(bytes) => {
                    self.stats.messages_sent += 1;
                    self.stats.bytes_sent += bytes as u64;
                }
                Err(err) => log::warn!("send to {addr} failed: {err}"),
            }
        }
    }
}

impl Transport for UdpTransport {
    fn send_text(&mut self, channel: Channel, to: Option<PlayerId>, text: &str) {
        self.send_datagram(channel, to, text.as_bytes());
    }

    fn send_binary(&mut self, channel: Channel, to: Option<PlayerId>, data: &[u8]) {
        self.send_datagram(channel, to, data);
    }

    fn poll(&mut self) -> Vec<InboundMessage> {
        let mut messages = Vec::new();

        loop {
            match self.socket.recv_from(&mut self.recv_buffer[..]) {
                Ok((size, addr)) => {
                    if size < 2 {
                        continue;
                    }
                    let Some(channel) = Self::tag_channel(self.recv_buffer[0]) else {
                        log::debug!("unknown channel tag from {addr}");
                        continue;
                    };
                    let Some(player) = self.player_for(addr) else {
                        continue;
                    };
                    match std::str::from_utf8(&self.recv_buffer[1..size]) {
                        Ok(text) => {
                            self.stats.messages_received += 1;
                            self.stats.bytes_received += size as u64;
                            messages.push(InboundMessage {
                                player,
                                channel,
                                text: text.to_string(),
                            });
                        }
                        Err(_) => log::debug!("non-utf8 payload from {addr}"),
                    }
                }
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    log::warn!("udp receive error: {err}");
                    break;
                }
            }
        }

        messages
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}
