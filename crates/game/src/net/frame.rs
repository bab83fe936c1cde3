use crate::events::GameEvent;
use crate::math::angle_to_u16;
use crate::units::{DeltaFlags, Unit};

use super::wire::{quantize_i16, quantize_u16, WireError, WireReader, WireWriter};

pub const MESSAGE_TYPE_GAME_UPDATES: u8 = 0;

/// A unit's complete wire state, snapshotted at composition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullRecord {
    pub id: u16,
    pub player: u8,
    pub debug_state: Option<u8>,
    pub x: u16,
    pub y: u16,
    pub speed: i16,
    pub acceleration: i16,
    pub platform_angle: u16,
    pub turret_offset_angle: u16,
}

impl FullRecord {
    pub fn from_unit(unit: &Unit, debug_enabled: bool) -> Self {
        let platform = unit.platform();
        let pos = platform.position();
        Self {
            id: unit.id(),
            player: unit.player() as u8,
            debug_state: debug_enabled.then(|| unit.debug_state()),
            x: quantize_u16(pos.x),
            y: quantize_u16(pos.y),
            speed: quantize_i16(platform.speed()),
            acceleration: quantize_i16(platform.acceleration()),
            platform_angle: angle_to_u16(platform.angle()),
            turret_offset_angle: angle_to_u16(unit.turret().offset_angle()),
        }
    }

    pub fn write(&self, writer: &mut WireWriter<'_>) -> Result<(), WireError> {
        writer.put_u16(self.id)?;
        writer.put_u8(self.player)?;
        if let Some(debug) = self.debug_state {
            writer.put_u8(debug)?;
        }
        writer.put_u16(self.x)?;
        writer.put_u16(self.y)?;
        writer.put_i16(self.speed)?;
        writer.put_i16(self.acceleration)?;
        writer.put_u16(self.platform_angle)?;
        writer.put_u16(self.turret_offset_angle)?;
        Ok(())
    }

    pub fn parse(reader: &mut WireReader<'_>, debug_enabled: bool) -> Result<Self, WireError> {
        Ok(Self {
            id: reader.get_u16()?,
            player: reader.get_u8()?,
            debug_state: if debug_enabled {
                Some(reader.get_u8()?)
            } else {
                None
            },
            x: reader.get_u16()?,
            y: reader.get_u16()?,
            speed: reader.get_i16()?,
            acceleration: reader.get_i16()?,
            platform_angle: reader.get_u16()?,
            turret_offset_angle: reader.get_u16()?,
        })
    }
}

/// Only the fields whose delta flags are set, in flag-bit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeltaRecord {
    pub id: u16,
    pub flags: DeltaFlags,
    pub position: Option<(u16, u16)>,
    pub speed: Option<i16>,
    pub acceleration: Option<i16>,
    pub platform_angle: Option<u16>,
    pub turret_offset_angle: Option<u16>,
    pub debug_state: Option<u8>,
}

impl DeltaRecord {
    pub fn from_unit(unit: &Unit) -> Self {
        let flags = unit.delta_flags();
        let platform = unit.platform();
        let pos = platform.position();
        Self {
            id: unit.id(),
            flags,
            position: flags
                .contains(DeltaFlags::POSITION)
                .then(|| (quantize_u16(pos.x), quantize_u16(pos.y))),
            speed: flags
                .contains(DeltaFlags::SPEED)
                .then(|| quantize_i16(platform.speed())),
            acceleration: flags
                .contains(DeltaFlags::ACCELERATION)
                .then(|| quantize_i16(platform.acceleration())),
            platform_angle: flags
                .contains(DeltaFlags::PLATFORM_ANGLE)
                .then(|| angle_to_u16(platform.angle())),
            turret_offset_angle: flags
                .contains(DeltaFlags::TURRET_OFFSET_ANGLE)
                .then(|| angle_to_u16(unit.turret().offset_angle())),
            debug_state: flags
                .contains(DeltaFlags::DEBUG_STATE)
                .then(|| unit.debug_state()),
        }
    }

    pub fn write(&self, writer: &mut WireWriter<'_>) -> Result<(), WireError> {
        writer.put_u16(self.id)?;
        writer.put_u8(self.flags.bits())?;
        if let Some((x, y)) = self.position {
            writer.put_u16(x)?;
            writer.put_u16(y)?;
        }
        if let Some(speed) = self.speed {
            writer.put_i16(speed)?;
        }
        if let Some(acceleration) = self.acceleration {
            writer.put_i16(acceleration)?;
        }
        if let Some(angle) = self.platform_angle {
            writer.put_u16(angle)?;
        }
        if let Some(angle) = self.turret_offset_angle {
            writer.put_u16(angle)?;
        }
        if let Some(debug) = self.debug_state {
            writer.put_u8(debug)?;
        }
        Ok(())
    }

    pub fn parse(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let id = reader.get_u16()?;
        let flags = DeltaFlags::from_bits_retain(reader.get_u8()?);
        Ok(Self {
            id,
            flags,
            position: if flags.contains(DeltaFlags::POSITION) {
                Some((reader.get_u16()?, reader.get_u16()?))
            } else {
                None
            },
            speed: if flags.contains(DeltaFlags::SPEED) {
                Some(reader.get_i16()?)
            } else {
                None
            },
            acceleration: if flags.contains(DeltaFlags::ACCELERATION) {
                Some(reader.get_i16()?)
            } else {
                None
            },
            platform_angle: if flags.contains(DeltaFlags::PLATFORM_ANGLE) {
                Some(reader.get_u16()?)
            } else {
                None
            },
            turret_offset_angle: if flags.contains(DeltaFlags::TURRET_OFFSET_ANGLE) {
                Some(reader.get_u16()?)
            } else {
                None
            },
            debug_state: if flags.contains(DeltaFlags::DEBUG_STATE) {
                Some(reader.get_u8()?)
            } else {
                None
            },
        })
    }
}

pub fn write_event(event: &GameEvent, writer: &mut WireWriter<'_>) -> Result<(), WireError> {
    writer.put_u8(event.type_byte())?;
    match *event {
        GameEvent::FireProjectile {
            id,
            x,
            y,
            angle,
            speed,
            range,
            distance_travelled,
        } => {
            writer.put_u16(id)?;
            writer.put_u16(x)?;
            writer.put_u16(y)?;
            writer.put_u16(angle)?;
            writer.put_u16(speed)?;
            writer.put_u16(range)?;
            writer.put_u16(distance_travelled)?;
        }
        GameEvent::ProjectileHit { id, x, y } => {
            writer.put_u16(id)?;
            writer.put_u16(x)?;
            writer.put_u16(y)?;
        }
        GameEvent::UnitDestroyed { id } => {
            writer.put_u16(id)?;
        }
    }
    Ok(())
}

pub fn parse_event(reader: &mut WireReader<'_>) -> Result<GameEvent, WireError> {
    match reader.get_u8()? {
        0 => Ok(GameEvent::FireProjectile {
            id: reader.get_u16()?,
            x: reader.get_u16()?,
            y: reader.get_u16()?,
            angle: reader.get_u16()?,
            speed: reader.get_u16()?,
            range: reader.get_u16()?,
            distance_travelled: reader.get_u16()?,
        }),
        1 => Ok(GameEvent::ProjectileHit {
            id: reader.get_u16()?,
            x: reader.get_u16()?,
            y: reader.get_u16()?,
        }),
        2 => Ok(GameEvent::UnitDestroyed {
            id: reader.get_u16()?,
        }),
        other => Err(WireError::UnknownEventType(other)),
    }
}

/// One decoded game-update frame: server time, the full section, the delta
/// section and the event section.
#[derive(Debug, Clone, PartialEq)]
pub struct GameUpdateFrame {
    pub time: f64,
    pub fulls: Vec<FullRecord>,
    pub deltas: Vec<DeltaRecord>,
    pub events: Vec<GameEvent>,
}

impl GameUpdateFrame {
    pub fn write(&self, writer: &mut WireWriter<'_>) -> Result<(), WireError> {
        writer.put_u8(MESSAGE_TYPE_GAME_UPDATES)?;
        writer.put_f64(self.time)?;

        writer.put_u16(self.fulls.len() as u16)?;
        for full in &self.fulls {
            full.write(writer)?;
        }

        writer.put_u16(self.deltas.len() as u16)?;
        for delta in &self.deltas {
            delta.write(writer)?;
        }

        writer.put_u16(self.events.len() as u16)?;
        for event in &self.events {
            write_event(event, writer)?;
        }

        Ok(())
    }

    pub fn parse(data: &[u8], debug_enabled: bool) -> Result<Self, WireError> {
        let mut reader = WireReader::new(data);

        let message_type = reader.get_u8()?;
        if message_type != MESSAGE_TYPE_GAME_UPDATES {
            return Err(WireError::UnknownMessageType(message_type));
        }
        let time = reader.get_f64()?;

        let full_count = reader.get_u16()?;
        let mut fulls = Vec::with_capacity(full_count as usize);
        for _ in 0..full_count {
            fulls.push(FullRecord::parse(&mut reader, debug_enabled)?);
        }

        let delta_count = reader.get_u16()?;
        let mut deltas = Vec::with_capacity(delta_count as usize);
        for _ in 0..delta_count {
            deltas.push(DeltaRecord::parse(&mut reader)?);
        }

        let event_count = reader.get_u16()?;
        let mut events = Vec::with_capacity(event_count as usize);
        for _ in 0..event_count {
            events.push(parse_event(&mut reader)?);
        }

        Ok(Self {
            time,
            fulls,
            deltas,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> GameUpdateFrame {
        GameUpdateFrame {
            time: 12.345,
            fulls: vec![FullRecord {
                id: 3,
                player: 1,
                debug_state: None,
                x: 1_000,
                y: 2_000,
                speed: -120,
                acceleration: 250,
                platform_angle: 40_000,
                turret_offset_angle: 12,
            }],
            deltas: vec![DeltaRecord {
                id: 9,
                flags: DeltaFlags::SPEED | DeltaFlags::PLATFORM_ANGLE,
                speed: Some(250),
                platform_angle: Some(777),
                ..DeltaRecord::default()
            }],
            events: vec![
                GameEvent::FireProjectile {
                    id: 1,
                    x: 500,
                    y: 500,
                    angle: 0,
                    speed: 600,
                    range: 1_000,
                    distance_travelled: 0,
                },
                GameEvent::UnitDestroyed { id: 3 },
            ],
        }
    }

    #[test]
    fn frame_round_trip() {
        let frame = sample_frame();
        let mut buf = Vec::new();
        let mut writer = WireWriter::new(&mut buf, 4_096);
        frame.write(&mut writer).unwrap();

        let parsed = GameUpdateFrame::parse(&buf, false).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn frame_layout_is_byte_exact() {
        let frame = GameUpdateFrame {
            time: 0.0,
            fulls: vec![],
            deltas: vec![],
            events: vec![GameEvent::UnitDestroyed { id: 0x0102 }],
        };
        let mut buf = Vec::new();
        let mut writer = WireWriter::new(&mut buf, 64);
        frame.write(&mut writer).unwrap();

        let mut expected = vec![MESSAGE_TYPE_GAME_UPDATES];
        expected.extend_from_slice(&0.0f64.to_be_bytes());
        expected.extend_from_slice(&[0, 0]); // full count
        expected.extend_from_slice(&[0, 0]); // delta count
        expected.extend_from_slice(&[0, 1]); // event count
        expected.extend_from_slice(&[2, 0x01, 0x02]); // unit-destroyed body
        assert_eq!(buf, expected);
    }

    #[test]
    fn delta_fields_follow_flag_order() {
        let delta = DeltaRecord {
            id: 1,
            flags: DeltaFlags::POSITION | DeltaFlags::TURRET_OFFSET_ANGLE,
            position: Some((10, 20)),
            turret_offset_angle: Some(30),
            ..DeltaRecord::default()
        };
        let mut buf = Vec::new();
        let mut writer = WireWriter::new(&mut buf, 64);
        delta.write(&mut writer).unwrap();

        // id, flags, then position x/y, then the turret angle.
        assert_eq!(buf, vec![0, 1, 0b0001_0001, 0, 10, 0, 20, 0, 30]);
    }

    #[test]
    fn debug_byte_only_when_enabled() {
        let with_debug = FullRecord {
            id: 1,
            player: 0,
            debug_state: Some(3),
            x: 0,
            y: 0,
            speed: 0,
            acceleration: 0,
            platform_angle: 0,
            turret_offset_angle: 0,
        };
        let mut buf = Vec::new();
        let mut writer = WireWriter::new(&mut buf, 64);
        with_debug.write(&mut writer).unwrap();
        assert_eq!(buf.len(), 16);

        let mut reader = WireReader::new(&buf);
        let parsed = FullRecord::parse(&mut reader, true).unwrap();
        assert_eq!(parsed.debug_state, Some(3));
    }
}
