use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("frame would exceed the {capacity}-byte scratch buffer")]
    Overflow { capacity: usize },
    #[error("frame ends unexpectedly at byte {0}")]
    UnexpectedEnd(usize),
    #[error("unknown message type {0}")]
    UnknownMessageType(u8),
    #[error("unknown event type {0}")]
    UnknownEventType(u8),
}

/// Rounds and clamps a pixel or pixel-derived value into u16 wire range.
pub fn quantize_u16(value: f64) -> u16 {
    value.round().clamp(0.0, 65_535.0) as u16
}

/// Rounds and clamps a signed rate into i16 wire range.
pub fn quantize_i16(value: f64) -> i16 {
    value.round().clamp(-32_768.0, 32_767.0) as i16
}

/// Big-endian writer over the pre-allocated scratch buffer. Exceeding the
/// configured capacity fails the frame rather than growing the allocation.
pub struct WireWriter<'a> {
    buf: &'a mut Vec<u8>,
    capacity: usize,
}

impl<'a> WireWriter<'a> {
    pub fn new(buf: &'a mut Vec<u8>, capacity: usize) -> Self {
        buf.clear();
        Self { buf, capacity }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn ensure(&self, extra: usize) -> Result<(), WireError> {
        if self.buf.len() + extra > self.capacity {
            return Err(WireError::Overflow {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    pub fn put_u8(&mut self, value: u8) -> Result<(), WireError> {
        self.ensure(1)?;
        self.buf.push(value);
        Ok(())
    }

    pub fn put_u16(&mut self, value: u16) -> Result<(), WireError> {
        self.ensure(2)?;
        self.buf.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn put_i16(&mut self, value: i16) -> Result<(), WireError> {
        self.ensure(2)?;
        self.buf.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn put_f64(&mut self, value: f64) -> Result<(), WireError> {
        self.ensure(8)?;
        self.buf.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }
}

/// Big-endian reader over a received frame.
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.pos + n > self.data.len() {
            return Err(WireError::UnexpectedEnd(self.pos));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn get_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u16(&mut self) -> Result<u16, WireError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn get_i16(&mut self) -> Result<i16, WireError> {
        let bytes = self.take(2)?;
        Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn get_f64(&mut self) -> Result<f64, WireError> {
        let bytes = self.take(8)?;
        let mut array = [0u8; 8];
        array.copy_from_slice(bytes);
        Ok(f64::from_be_bytes(array))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_primitives() {
        let mut buf = Vec::new();
        let mut writer = WireWriter::new(&mut buf, 64);
        writer.put_u8(7).unwrap();
        writer.put_u16(0xBEEF).unwrap();
        writer.put_i16(-1234).unwrap();
        writer.put_f64(1.239).unwrap();

        let mut reader = WireReader::new(&buf);
        assert_eq!(reader.get_u8().unwrap(), 7);
        assert_eq!(reader.get_u16().unwrap(), 0xBEEF);
        assert_eq!(reader.get_i16().unwrap(), -1234);
        assert_eq!(reader.get_f64().unwrap(), 1.239);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn big_endian_on_the_wire() {
        let mut buf = Vec::new();
        let mut writer = WireWriter::new(&mut buf, 8);
        writer.put_u16(0x0102).unwrap();
        assert_eq!(buf, vec![0x01, 0x02]);
    }

    #[test]
    fn overflow_fails_the_write() {
        let mut buf = Vec::new();
        let mut writer = WireWriter::new(&mut buf, 3);
        writer.put_u16(1).unwrap();
        assert!(matches!(
            writer.put_u16(2),
            Err(WireError::Overflow { capacity: 3 })
        ));
    }

    #[test]
    fn reader_reports_truncation() {
        let data = [0x01];
        let mut reader = WireReader::new(&data);
        assert!(matches!(reader.get_u16(), Err(WireError::UnexpectedEnd(0))));
    }

    #[test]
    fn quantizers_clamp() {
        assert_eq!(quantize_u16(-5.0), 0);
        assert_eq!(quantize_u16(70_000.0), 65_535);
        assert_eq!(quantize_u16(1_000.4), 1_000);
        assert_eq!(quantize_i16(-40_000.0), -32_768);
        assert_eq!(quantize_i16(250.0), 250);
    }
}
