//! GPU point-sprite backend. Owns the wgpu context, the point pipeline and
//! the egui renderer used for the two 2D surfaces and the HUD.

pub mod context;
pub mod pipeline;
pub mod types;

pub use types::{hemisphere_weight, PointStyle, PointUniforms, PointVertex};

use self::{context::GfxContext, pipeline::PointPipeline};
use crate::field::PointField;
use image::DynamicImage;
use rayon::prelude::*;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

/// Readiness of the point layer as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendState {
    /// Pipeline built but no field uploaded yet.
    #[default]
    NotReady,
    Ready,
    /// The device was lost; the host must rebuild the renderer.
    Lost,
}

/// Owns all rendering-related state.
pub struct Renderer {
    pub gfx: GfxContext,
    pub points: PointPipeline,
    pub egui_renderer: egui_wgpu::Renderer,
    ubo: wgpu::Buffer,
    bind: wgpu::BindGroup,
    // Kept alive for `bind`.
    _sprite: wgpu::Texture,
    instances: Option<wgpu::Buffer>,
    instance_count: u32,
    uploaded: Option<u64>,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let gfx = GfxContext::new(window).await?;
        let points = PointPipeline::new(&gfx.device, gfx.config.format);
        let egui_renderer = egui_wgpu::Renderer::new(&gfx.device, gfx.config.format, None, 1);

        let ubo = gfx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globe Points UBO"),
            size: std::mem::size_of::<PointUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let (sprite, view) = create_sprite(&gfx, None);
        let bind = points.bind_group(&gfx.device, &ubo, &view);

        Ok(Self {
            gfx,
            points,
            egui_renderer,
            ubo,
            bind,
            _sprite: sprite,
            instances: None,
            instance_count: 0,
            uploaded: None,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.gfx.resize(new_size);
    }

    pub fn state(&self) -> BackendState {
        if self.gfx.is_lost() {
            BackendState::Lost
        } else if self.uploaded.is_some() {
            BackendState::Ready
        } else {
            BackendState::NotReady
        }
    }

    /// Re-uploads every point when the field generation moved on.
    /// Returns whether an upload happened.
    pub fn upload(&mut self, field: &PointField) -> bool {
        if self.uploaded == Some(field.generation()) {
            return false;
        }

        let vertices: Vec<PointVertex> = field.points().par_iter().map(PointVertex::from).collect();
        self.instances = (!vertices.is_empty()).then(|| {
            self.gfx
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Globe Points Instances"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                })
        });
        self.instance_count = vertices.len() as u32;
        self.uploaded = Some(field.generation());

        log::debug!(
            "uploaded {} points (generation {})",
            self.instance_count,
            field.generation()
        );
        true
    }

    /// Replaces the sprite texture; `None` restores the 1×1 white fallback.
    pub fn set_sprite(&mut self, image: Option<&DynamicImage>) {
        let (sprite, view) = create_sprite(&self.gfx, image);
        self.bind = self.points.bind_group(&self.gfx.device, &self.ubo, &view);
        self._sprite = sprite;
    }

    pub fn write_uniforms(&self, uniforms: &PointUniforms) {
        self.gfx
            .queue
            .write_buffer(&self.ubo, 0, bytemuck::bytes_of(uniforms));
    }

    /// Draws the uploaded points over whatever `target` holds.
    pub fn render_points(&self, target: &wgpu::TextureView) {
        let Some(instances) = &self.instances else {
            return;
        };

        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Points Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Points Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.points
                .draw(&mut pass, &self.bind, instances, self.instance_count);
        }
        self.gfx.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Paints tessellated egui output onto `target`, clearing it first when
    /// `clear` is given. Each call is its own submission, so the egui
    /// buffers can be reused by the next surface.
    pub fn render_egui(
        &mut self,
        target: &wgpu::TextureView,
        primitives: &[egui::ClippedPrimitive],
        screen: &egui_wgpu::ScreenDescriptor,
        clear: Option<wgpu::Color>,
    ) {
        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Surface Encoder"),
            });

        self.egui_renderer.update_buffers(
            &self.gfx.device,
            &self.gfx.queue,
            &mut encoder,
            primitives,
            screen,
        );

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Surface Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.egui_renderer.render(&mut pass, primitives, screen);
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
    }
}

fn create_sprite(gfx: &GfxContext, image: Option<&DynamicImage>) -> (wgpu::Texture, wgpu::TextureView) {
    let max = gfx.max_texture_side();
    let rgba = match image {
        Some(img) if img.width() > max || img.height() > max => img
            .resize(max, max, image::imageops::FilterType::Triangle)
            .to_rgba8(),
        Some(img) => img.to_rgba8(),
        None => image::RgbaImage::from_pixel(1, 1, image::Rgba([255; 4])),
    };
    let size = wgpu::Extent3d {
        width: rgba.width(),
        height: rgba.height(),
        depth_or_array_layers: 1,
    };

    // Linear format: the shader converts texels itself.
    let texture = gfx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Globe Sprite"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    gfx.queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &rgba,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * size.width),
            rows_per_image: Some(size.height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
