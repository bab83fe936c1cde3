mod commands;
mod frame;
mod handler;
mod transport;
mod wire;

pub use commands::{ClientMessage, MoveUnitsEntry, ServerMessage};
pub use frame::{
    parse_event, write_event, DeltaRecord, FullRecord, GameUpdateFrame, MESSAGE_TYPE_GAME_UPDATES,
};
pub use handler::MessageHandler;
pub use transport::{
    Channel, InboundMessage, LoopbackTransport, PlayerId, SentMessage, SentPayload, Transport,
    TransportStats,
};
pub use wire::{quantize_i16, quantize_u16, WireError, WireReader, WireWriter};
