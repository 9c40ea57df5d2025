/// Per-frame uniform buffer data for the GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    pub _pad0: f32,
    pub light_position: [f32; 3],
    pub _pad1: f32,
    pub light_color: [f32; 3],
    pub light_intensity: f32,
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
}

/// Per-object uniform buffer data for the GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 3],
    pub flags: u32,
}

/// Material ignores the lights entirely.
pub const OBJECT_FLAG_UNLIT: u32 = 1;
/// Material carries a real normal map (not the flat placeholder).
pub const OBJECT_FLAG_NORMAL_MAP: u32 = 2;

/// Background pass uniform: the fixed dim factor applied to the texture.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BackgroundUniform {
    pub intensity: f32,
    pub _pad: [f32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<FrameUniform>() % 16, 0);
    }

    #[test]
    fn object_uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<ObjectUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 64 + 16);
    }

    #[test]
    fn background_uniform_is_16_bytes() {
        assert_eq!(std::mem::size_of::<BackgroundUniform>(), 16);
    }

    #[test]
    fn flags_are_distinct_bits() {
        assert_eq!(OBJECT_FLAG_UNLIT & OBJECT_FLAG_NORMAL_MAP, 0);
    }
}
