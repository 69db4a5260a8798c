use ember_render::{ConstantBuffer, RenderError};

/// Uniform offsets must be multiples of this (the wgpu default limit).
pub const UNIFORM_ALIGNMENT: u64 = 256;

/// Host staging for one constant buffer.
///
/// Commands are replayed at present, so every upload within a frame gets its
/// own aligned slot and each draw remembers which slot was current when it
/// was issued. The last contents carry over into the next frame as slot 0.
#[derive(Debug, Clone)]
pub struct UniformRing {
    buffer: ConstantBuffer,
    capacity: usize,
    versions: Vec<Vec<u8>>,
}

impl UniformRing {
    pub fn new(buffer: ConstantBuffer, capacity: usize) -> Self {
        Self {
            buffer,
            capacity: capacity.max(1),
            versions: vec![vec![0; buffer.size()]],
        }
    }

    pub fn buffer(&self) -> ConstantBuffer {
        self.buffer
    }

    /// Distance between slots.
    pub fn stride(&self) -> u64 {
        (self.buffer.size() as u64).div_ceil(UNIFORM_ALIGNMENT) * UNIFORM_ALIGNMENT
    }

    /// Size of the backing GPU buffer.
    pub fn byte_size(&self) -> u64 {
        self.stride() * self.capacity as u64
    }

    /// Slot holding the latest contents.
    pub fn current(&self) -> u32 {
        (self.versions.len() - 1) as u32
    }

    pub fn offset(&self, slot: u32) -> u64 {
        u64::from(slot) * self.stride()
    }

    pub fn latest(&self) -> &[u8] {
        self.versions.last().map(Vec::as_slice).unwrap_or_default()
    }

    /// Stage new contents in the next free slot.
    pub fn push(&mut self, bytes: &[u8]) -> Result<u32, RenderError> {
        if bytes.len() != self.buffer.size() {
            return Err(RenderError::ConstantBufferUpdate {
                buffer: self.buffer,
                reason: format!("expected {} bytes, got {}", self.buffer.size(), bytes.len()),
            });
        }
        if self.versions.len() >= self.capacity {
            return Err(RenderError::ConstantBufferUpdate {
                buffer: self.buffer,
                reason: format!("more than {} updates in one frame", self.capacity),
            });
        }
        self.versions.push(bytes.to_vec());
        Ok(self.current())
    }

    /// Every staged slot with its byte offset, for writing before submit.
    pub fn staged(&self) -> impl Iterator<Item = (u64, &[u8])> + '_ {
        self.versions
            .iter()
            .enumerate()
            .map(|(slot, bytes)| (self.offset(slot as u32), bytes.as_slice()))
    }

    /// Drop every slot but the latest, which becomes slot 0.
    pub fn finish_frame(&mut self) {
        if let Some(last) = self.versions.pop() {
            self.versions.clear();
            self.versions.push(last);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_render::constants::MiscConstants;

    fn misc(x: f32) -> MiscConstants {
        MiscConstants {
            misc: [x, 0.0, 0.0, 0.0],
        }
    }

    #[test]
    fn stride_is_aligned() {
        assert_eq!(UniformRing::new(ConstantBuffer::Blur, 4).stride(), 256);
        // 304-byte light block spills into a second alignment unit.
        assert_eq!(UniformRing::new(ConstantBuffer::Light, 4).stride(), 512);
        assert_eq!(UniformRing::new(ConstantBuffer::Light, 4).byte_size(), 2048);
    }

    #[test]
    fn each_upload_gets_a_slot() {
        let mut ring = UniformRing::new(ConstantBuffer::Blur, 4);
        assert_eq!(ring.current(), 0);
        assert_eq!(ring.push(bytemuck::bytes_of(&misc(1.0))).unwrap(), 1);
        assert_eq!(ring.push(bytemuck::bytes_of(&misc(2.0))).unwrap(), 2);
        let offsets: Vec<u64> = ring.staged().map(|(offset, _)| offset).collect();
        assert_eq!(offsets, vec![0, 256, 512]);
    }

    #[test]
    fn overflow_is_an_update_error() {
        let mut ring = UniformRing::new(ConstantBuffer::Mrt, 2);
        ring.push(bytemuck::bytes_of(&misc(1.0))).unwrap();
        let err = ring.push(bytemuck::bytes_of(&misc(2.0))).unwrap_err();
        assert!(matches!(
            err,
            RenderError::ConstantBufferUpdate {
                buffer: ConstantBuffer::Mrt,
                ..
            }
        ));
    }

    #[test]
    fn wrong_size_is_rejected() {
        let mut ring = UniformRing::new(ConstantBuffer::Draw, 4);
        assert!(ring.push(&[0u8; 16]).is_err());
    }

    #[test]
    fn latest_contents_survive_the_frame() {
        let mut ring = UniformRing::new(ConstantBuffer::Mrt, 4);
        ring.push(bytemuck::bytes_of(&misc(1.0))).unwrap();
        ring.push(bytemuck::bytes_of(&misc(3.0))).unwrap();
        ring.finish_frame();
        assert_eq!(ring.current(), 0);
        let kept: MiscConstants = bytemuck::pod_read_unaligned(ring.latest());
        assert_eq!(kept.misc[0], 3.0);
    }
}
