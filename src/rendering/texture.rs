/// A render-attachment-only texture that is recreated whenever the surface
/// size changes.
struct AttachmentTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    label: String,
    format: wgpu::TextureFormat,
    sample_count: u32,
}

impl AttachmentTexture {
    fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        sample_count: u32,
        label: String,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            _texture: texture,
            view,
            label,
            format,
            sample_count,
        }
    }

    fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let label = std::mem::take(&mut self.label);
        *self = Self::new(device, width, height, self.format, self.sample_count, label);
    }
}

pub struct DepthTexture(AttachmentTexture);

impl DepthTexture {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        sample_count: u32,
        label: impl Into<String>,
    ) -> Self {
        Self(AttachmentTexture::new(
            device,
            width,
            height,
            Self::DEPTH_FORMAT,
            sample_count,
            label.into(),
        ))
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.0.resize(device, width, height);
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.0.view
    }
}

/// Multisampled color target that resolves into the surface texture.
pub struct MsaaTexture(AttachmentTexture);

impl MsaaTexture {
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        Self(AttachmentTexture::new(
            device,
            width,
            height,
            format,
            sample_count,
            "MSAA color target".to_string(),
        ))
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.0.resize(device, width, height);
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.0.view
    }
}
