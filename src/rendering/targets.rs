//! Offscreen float render targets and the ping-pong pair.

/// Single offscreen render target with a float format.
pub struct FloatTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl FloatTarget {
    pub fn new(device: &wgpu::Device, label: &str, size: u32, format: wgpu::TextureFormat) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Double-buffered propagation target. Each frame the destination is
/// rendered from the source, then the roles swap.
pub struct PingPong {
    pub targets: [FloatTarget; 2],
    dest: usize,
}

impl PingPong {
    pub fn new(device: &wgpu::Device, size: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            targets: [
                FloatTarget::new(device, "Ping-Pong A", size, format),
                FloatTarget::new(device, "Ping-Pong B", size, format),
            ],
            dest: 0,
        }
    }

    /// Index of the buffer written this frame.
    pub fn dest_index(&self) -> usize {
        self.dest
    }

    /// Index of the buffer holding last frame's output.
    pub fn source_index(&self) -> usize {
        1 - self.dest
    }

    pub fn dest(&self) -> &FloatTarget {
        &self.targets[self.dest]
    }

    /// Swap roles at the end of the frame.
    pub fn swap(&mut self) {
        self.dest = 1 - self.dest;
    }
}
