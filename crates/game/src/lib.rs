pub mod collision;
pub mod config;
pub mod events;
pub mod math;
pub mod net;
pub mod objects;
pub mod path;
pub mod projectile;
pub mod server;
pub mod units;

pub use collision::{Aabb, CollisionBox, CollisionGrid, CollisionShape};
pub use config::GameConfig;
pub use events::{EventBuffer, GameEvent};
pub use math::Kahan;
pub use net::{
    Channel, ClientMessage, DeltaRecord, FullRecord, GameUpdateFrame, InboundMessage,
    LoopbackTransport, MessageHandler, MoveUnitsEntry, PlayerId, SentMessage, SentPayload,
    ServerMessage, Transport, TransportStats, WireError, WireReader, WireWriter,
    MESSAGE_TYPE_GAME_UPDATES,
};
pub use objects::{ObjectData, ObjectError, ObjectRegistry, UnitStats, UnitType};
pub use path::{DirectPathOracle, PathOracle, PathRequestId, PathResponse, ScriptedOracle};
pub use projectile::Projectile;
pub use server::{GameServer, TickClock};
pub use units::{DeltaFlags, MovementController, Unit, UnitMap, UnitPlatform, UnitTurret};
