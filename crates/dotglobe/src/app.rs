use crate::{
    config::{Document, ElementId},
    events::GlobeEvent,
    globe::Globe,
    math::{Bounds, Color, Vector2},
    renderer::{types::color_to_linear, BackendState, Renderer},
    resources::Resources,
    ui,
    view::{Font, FontFamily, Surface2d, TextAlign},
};
use anyhow::Result;
use hgt::Heightmap;
use image::DynamicImage;
use std::{
    cell::RefCell,
    collections::HashMap,
    f64::consts::PI,
    path::PathBuf,
    sync::Arc,
    time::Instant,
};
use winit::{
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    window::Window,
};

/// Scale factor per wheel notch.
const ZOOM_STEP: f64 = 1.1;
/// Wheel pixels counted as one notch.
const PIXELS_PER_LINE: f64 = 40.0;
const OVERLAY_FONT_SIZE: f32 = 14.0;

/// egui textures for images drawn on the 2D surfaces, keyed by url.
#[derive(Default)]
pub struct TextureCache {
    handles: RefCell<HashMap<String, egui::TextureHandle>>,
}

impl TextureCache {
    fn get_or_load(&self, ctx: &egui::Context, key: &str, image: &DynamicImage) -> egui::TextureId {
        let mut handles = self.handles.borrow_mut();
        handles
            .entry(key.to_string())
            .or_insert_with(|| {
                let max = ctx.input(|i| i.max_texture_side) as u32;
                let rgba = if image.width() > max || image.height() > max {
                    image
                        .resize(max, max, image::imageops::FilterType::Triangle)
                        .to_rgba8()
                } else {
                    image.to_rgba8()
                };
                let size = [rgba.width() as usize, rgba.height() as usize];
                let pixels = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
                ctx.load_texture(key, pixels, egui::TextureOptions::LINEAR)
            })
            .id()
    }

    fn clear(&self) {
        self.handles.borrow_mut().clear();
    }
}

fn to_pos(v: Vector2) -> egui::Pos2 {
    egui::pos2(v.x as f32, v.y as f32)
}

fn to_color(c: Color, alpha: f64) -> egui::Color32 {
    let c = c.with_alpha(alpha);
    egui::Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

fn font_id(font: Font) -> egui::FontId {
    let size = font.size as f32;
    match font.family {
        FontFamily::Proportional => egui::FontId::proportional(size),
        FontFamily::Monospace => egui::FontId::monospace(size),
    }
}

/// A 2D surface collecting egui shapes, tessellated by the app after the
/// globe has drawn.
pub struct ShapeSurface<'a> {
    ctx: &'a egui::Context,
    textures: &'a TextureCache,
    alpha: f64,
    shapes: Vec<egui::Shape>,
}

impl<'a> ShapeSurface<'a> {
    pub fn new(ctx: &'a egui::Context, textures: &'a TextureCache) -> Self {
        Self {
            ctx,
            textures,
            alpha: 1.0,
            shapes: Vec::new(),
        }
    }

    pub fn into_clipped(self) -> Vec<egui::epaint::ClippedShape> {
        self.shapes
            .into_iter()
            .map(|shape| egui::epaint::ClippedShape {
                clip_rect: egui::Rect::EVERYTHING,
                shape,
            })
            .collect()
    }

    fn text_shape(&self, text: &str, pos: Vector2, font: Font, align: TextAlign, color: egui::Color32) -> egui::Shape {
        let galley = self
            .ctx
            .fonts(|f| f.layout_no_wrap(text.to_owned(), font_id(font), color));
        let anchor = match align {
            TextAlign::Left => egui::Align2::LEFT_TOP,
            TextAlign::Center => egui::Align2::CENTER_TOP,
            TextAlign::Right => egui::Align2::RIGHT_TOP,
        };
        let rect = anchor.anchor_size(to_pos(pos), galley.size());
        egui::Shape::galley(rect.min, galley, color)
    }
}

impl Surface2d for ShapeSurface<'_> {
    fn clear(&mut self) {
        self.shapes.clear();
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    fn image(&mut self, key: &str, image: &DynamicImage, rect: Bounds, rotation: f64) {
        let id = self.textures.get_or_load(self.ctx, key, image);
        let rect = egui::Rect::from_min_size(
            egui::pos2(rect.x as f32, rect.y as f32),
            egui::vec2(rect.w as f32, rect.h as f32),
        );
        let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));

        let mut mesh = egui::Mesh::with_texture(id);
        mesh.add_rect_with_uv(rect, uv, to_color(Color::WHITE, self.alpha));
        if rotation != 0.0 {
            mesh.rotate(egui::emath::Rot2::from_angle(rotation as f32), rect.center());
        }
        self.shapes.push(egui::Shape::mesh(mesh));
    }

    fn fill_text(&mut self, text: &str, pos: Vector2, font: Font, align: TextAlign, color: Color) {
        let shape = self.text_shape(text, pos, font, align, to_color(color, self.alpha));
        self.shapes.push(shape);
    }

    /// egui has no text outlines; copies are offset around the glyphs.
    fn stroke_text(
        &mut self,
        text: &str,
        pos: Vector2,
        font: Font,
        align: TextAlign,
        color: Color,
        width: f64,
    ) {
        let color = to_color(color, self.alpha);
        let r = (width / 2.0).max(0.5);
        for i in 0..8 {
            let a = i as f64 * PI / 4.0;
            let offset = Vector2::new(a.cos() * r, a.sin() * r);
            let shape = self.text_shape(text, pos + offset, font, align, color);
            self.shapes.push(shape);
        }
    }

    fn measure_text(&self, text: &str, font: Font) -> Vector2 {
        let size = self
            .ctx
            .fonts(|f| f.layout_no_wrap(text.to_owned(), font_id(font), egui::Color32::WHITE))
            .size();
        Vector2::new(size.x as f64, size.y as f64)
    }

    fn polyline(&mut self, points: &[Vector2], color: Color, width: f64) {
        if points.len() < 2 {
            return;
        }
        let stroke = egui::Stroke::new(width as f32, to_color(color, self.alpha));
        self.shapes
            .push(egui::Shape::line(points.iter().copied().map(to_pos).collect(), stroke));
    }

    fn circle(&mut self, center: Vector2, radius: f64, color: Color) {
        self.shapes.push(egui::Shape::circle_filled(
            to_pos(center),
            radius as f32,
            to_color(color, self.alpha),
        ));
    }
}

/// Shows every visible overlay as an egui area. Returns the overlays whose
/// rendered size changed, unscaled.
fn draw_overlays(ctx: &egui::Context, globe: &Globe) -> Vec<(ElementId, egui::Vec2)> {
    let mut resized = Vec::new();
    for overlay in globe.overlays() {
        let Some(p) = overlay.placement().filter(|p| p.visible) else {
            continue;
        };
        let (ax, ay) = overlay.anchor();
        let size = overlay.size();
        let scale = p.scale.max(0.01);
        let min = Vector2::new(
            p.screen.x - ax * size.x * scale,
            p.screen.y - ay * size.y * scale,
        );

        let response = egui::Area::new(egui::Id::new(("overlay", p.id.0)))
            .fixed_pos(to_pos(min))
            .order(egui::Order::Middle)
            .interactable(p.pointer_events)
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new(overlay.text())
                        .size(OVERLAY_FONT_SIZE * scale as f32)
                        .color(egui::Color32::WHITE.gamma_multiply(p.opacity as f32)),
                );
            });

        let rendered = response.response.rect.size() / scale as f32;
        if (rendered.x as f64 - size.x).abs() > 0.5 || (rendered.y as f64 - size.y).abs() > 0.5 {
            resized.push((p.id, rendered));
        }
    }
    resized
}

pub struct App {
    window: Arc<Window>,
    pub renderer: Renderer,
    pub globe: Globe,
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    textures: TextureCache,
    sprite: Option<Arc<DynamicImage>>,
    cursor: Vector2,
    started: Instant,
    last_frame: Instant,
    fps: f64,
    complete: bool,
}

fn egui_for(window: &Window) -> (egui::Context, egui_winit::State) {
    let ctx = egui::Context::default();
    let state = egui_winit::State::new(ctx.clone(), ctx.viewport_id(), window, None, None);
    (ctx, state)
}

impl App {
    pub async fn new(
        window: Arc<Window>,
        document: Document,
        heightmap: Heightmap,
        base_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let renderer = Renderer::new(window.clone()).await?;
        let (egui_ctx, egui_state) = egui_for(&window);

        let mut globe = Globe::new(document, heightmap, Resources::new(base_dir));
        let size = renderer.gfx.size;
        let sf = window.scale_factor();
        globe.resize(size.width as f64 / sf, size.height as f64 / sf, sf);

        let now = Instant::now();
        Ok(Self {
            window,
            renderer,
            globe,
            egui_ctx,
            egui_state,
            textures: TextureCache::default(),
            sprite: None,
            cursor: Vector2::ZERO,
            started: now,
            last_frame: now,
            fps: 0.0,
            complete: false,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.renderer.resize(new_size);
            let sf = self.window.scale_factor();
            self.globe.resize(
                new_size.width as f64 / sf,
                new_size.height as f64 / sf,
                sf,
            );
        }
    }

    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(window, event);

        match event {
            WindowEvent::Resized(physical_size) => self.resize(*physical_size),
            WindowEvent::ScaleFactorChanged { .. } => self.resize(window.inner_size()),
            _ => {}
        }
        if response.consumed {
            return true;
        }

        let t = self.started.elapsed().as_secs_f64();
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                let sf = window.scale_factor();
                self.cursor = Vector2::new(position.x / sf, position.y / sf);
                self.globe.pointer_move(self.cursor, t);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => self.globe.pointer_down(self.cursor, t),
                ElementState::Released => self.globe.pointer_up(self.cursor, t),
            },
            WindowEvent::CursorLeft { .. } => {
                self.globe.pointer_cancel(t);
                self.globe.pointer_leave();
            }
            WindowEvent::Focused(false) => self.globe.pointer_cancel(t),
            WindowEvent::MouseWheel { delta, .. } => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y as f64,
                    MouseScrollDelta::PixelDelta(p) => p.y / PIXELS_PER_LINE,
                };
                self.zoom(notches);
            }
            _ => {}
        }

        false
    }

    fn zoom(&mut self, notches: f64) {
        let scale = (self.globe.settings().scale * ZOOM_STEP.powf(notches)).clamp(0.1, 10.0);
        self.globe.set("scale", &scale.to_string());
    }

    /// Builds a fresh GPU context after device loss.
    fn rebuild_backend(&mut self) -> Result<()> {
        log::warn!("rebuilding GPU context");
        self.renderer = pollster::block_on(Renderer::new(self.window.clone()))?;

        // egui only sends textures once; a new context re-sends them all.
        let (ctx, state) = egui_for(&self.window);
        self.egui_ctx = ctx;
        self.egui_state = state;
        self.textures.clear();
        self.sprite = None;

        self.globe.backend_restored();
        Ok(())
    }

    /// Uploads changed points, sprite and this frame's uniforms.
    fn sync_gpu(&mut self) {
        self.renderer.upload(self.globe.field());

        let sprite = self.globe.sprite().cloned();
        let unchanged = match (&sprite, &self.sprite) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if !unchanged {
            self.renderer.set_sprite(sprite.as_deref());
            self.sprite = sprite;
        }

        let size = self.renderer.gfx.size;
        let uniforms = self
            .globe
            .point_uniforms([size.width, size.height], self.window.scale_factor());
        self.renderer.write_uniforms(&uniforms);
    }

    fn drain_events(&mut self) {
        for event in self.globe.drain_events() {
            match event {
                GlobeEvent::Init => {}
                GlobeEvent::Complete => self.complete = true,
                GlobeEvent::Change { center } => {
                    log::trace!("center {:.3} {:.3}", center.lat, center.lng)
                }
                GlobeEvent::Tap { element, location } => {
                    log::info!("tap: element {element:?} at {location:?}")
                }
            }
        }
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;
        if dt > 0.0 {
            self.fps = self.fps * 0.9 + 0.1 / dt;
        }

        self.globe.set_backend_state(self.renderer.state());
        if self.globe.backend_state() == BackendState::Lost {
            if let Err(err) = self.rebuild_backend() {
                log::error!("GPU context rebuild failed: {err:#}");
            }
        }

        self.globe.update(dt);
        if self.globe.backend_state() != BackendState::Lost {
            self.sync_gpu();
        }

        let frame = self.renderer.gfx.surface.get_current_texture()?;
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let egui_input = self.egui_state.take_egui_input(&self.window);
        self.egui_ctx.begin_frame(egui_input);

        let (front, back) = {
            let mut front = ShapeSurface::new(&self.egui_ctx, &self.textures);
            let mut back = ShapeSurface::new(&self.egui_ctx, &self.textures);
            self.globe.draw(&mut front, &mut back);
            (front.into_clipped(), back.into_clipped())
        };

        for (id, size) in draw_overlays(&self.egui_ctx, &self.globe) {
            self.globe.set_object(id, "width", &format!("{:.0}", size.x));
            self.globe.set_object(id, "height", &format!("{:.0}", size.y));
        }

        self.drain_events();
        ui::draw_hud(
            &self.egui_ctx,
            &ui::HudInfo {
                backend: self.globe.backend_state(),
                complete: self.complete,
                points: self.globe.field().len(),
                center: self.globe.settings().center,
                fps: self.fps,
            },
        );

        let egui_output = self.egui_ctx.end_frame();
        let ppp = self.egui_ctx.pixels_per_point();
        let back = self.egui_ctx.tessellate(back, ppp);
        let front = self.egui_ctx.tessellate(front, ppp);
        let hud = self.egui_ctx.tessellate(egui_output.shapes, ppp);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [
                self.renderer.gfx.config.width,
                self.renderer.gfx.config.height,
            ],
            pixels_per_point: ppp,
        };

        for (id, delta) in &egui_output.textures_delta.set {
            self.renderer.egui_renderer.update_texture(
                &self.renderer.gfx.device,
                &self.renderer.gfx.queue,
                *id,
                delta,
            );
        }

        // Back surface, points, front surface, then the HUD and overlays.
        let [r, g, b, a] = color_to_linear(self.globe.settings().background_color);
        self.renderer.render_egui(
            &swap_view,
            &back,
            &screen_descriptor,
            Some(wgpu::Color { r, g, b, a }),
        );
        if self.globe.points_visible() {
            self.renderer.render_points(&swap_view);
        }
        self.renderer
            .render_egui(&swap_view, &front, &screen_descriptor, None);
        self.renderer
            .render_egui(&swap_view, &hud, &screen_descriptor, None);

        for id in &egui_output.textures_delta.free {
            self.renderer.egui_renderer.free_texture(id);
        }

        frame.present();
        self.egui_state
            .handle_platform_output(&self.window, egui_output.platform_output);

        Ok(())
    }
}
