//! The globe controller: one instance's document, options, point field,
//! view, scene objects, interaction and resources, advanced once per frame.

use crate::config::{
    options::globe_properties, AnimateOptions, AnimationHandle, Binding, Document, Element,
    ElementId, ElementKind, GlobeSettings, Invalidate, PropertyBag, Value,
};
use crate::events::GlobeEvent;
use crate::field::{FieldParams, MapSampler, PointField};
use crate::interaction::{
    panning, Autorotate, AutorotateParams, Panning, Pointer, PointerEvent, Speedometer,
};
use crate::math::{Bounds, Location, Vector2};
use crate::objects::{FrameContext, ObjectStore, Overlay};
use crate::renderer::{BackendState, PointStyle, PointUniforms};
use crate::resources::Resources;
use crate::view::{Camera, Compositor, Projected, Surface2d, View};
use hgt::Heightmap;
use image::DynamicImage;
use std::sync::Arc;

/// A color or opacity map, resampled once per loaded url.
#[derive(Default)]
struct MapSlot {
    url: Option<String>,
    sampler: Option<MapSampler>,
}

impl MapSlot {
    /// Follows `url` once its image is ready; returns true if the sampler
    /// changed.
    fn refresh(&mut self, url: Option<&str>, resources: &Resources, heightmap: &Heightmap) -> bool {
        let image = url.and_then(|u| resources.image(u));
        let ready = url.filter(|_| image.is_some());
        if self.url.as_deref() == ready {
            return false;
        }
        self.url = ready.map(str::to_string);
        self.sampler = image.map(|img| MapSampler::from_image(img, heightmap.width, heightmap.height));
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Running,
    Complete,
    Disposed,
}

pub struct Globe {
    document: Document,
    bag: PropertyBag,
    settings: GlobeSettings,
    /// Invalidation requested between updates.
    pending: Invalidate,

    heightmap: Heightmap,
    field: PointField,
    field_dirty: bool,
    color_map: MapSlot,
    opacity_map: MapSlot,

    view: View,
    css: (f64, f64, f64),
    compositor: Compositor,
    objects: ObjectStore,

    pointer: Pointer,
    speedometer: Speedometer,
    panning: Panning,
    autorotate: Autorotate,
    hovered: Option<ElementId>,

    resources: Resources,
    backend: BackendState,
    events: Vec<GlobeEvent>,
    lifecycle: Lifecycle,
    last_center: Location,
    time: f64,
}

impl Globe {
    pub fn new(document: Document, heightmap: Heightmap, resources: Resources) -> Self {
        let bag = PropertyBag::new(globe_properties());
        let settings = GlobeSettings::from_bag(&bag);
        let view = View::new(1.0, 1.0, 1.0, settings.quality);
        Self {
            document,
            bag,
            settings,
            pending: Invalidate::NONE,
            heightmap,
            field: PointField::new(),
            field_dirty: true,
            color_map: MapSlot::default(),
            opacity_map: MapSlot::default(),
            view,
            css: (1.0, 1.0, 1.0),
            compositor: Compositor::new(),
            objects: ObjectStore::new(),
            pointer: Pointer::new(),
            speedometer: Speedometer::new(),
            panning: Panning::new(),
            autorotate: Autorotate::new(),
            hovered: None,
            resources,
            backend: BackendState::default(),
            events: Vec::new(),
            lifecycle: Lifecycle::Created,
            last_center: Location::default(),
            time: 0.0,
        }
    }

    fn is_disposed(&self) -> bool {
        self.lifecycle == Lifecycle::Disposed
    }

    // ---------------------------------------------------------------------
    // Options and children
    // ---------------------------------------------------------------------

    /// Current value of a globe option, in raw string form.
    pub fn get(&self, name: &str) -> Option<String> {
        self.bag.get(name).map(Value::to_raw)
    }

    /// Writes a globe option; it takes effect at the next update.
    /// Returns false for unknown names.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        if self.is_disposed() {
            return false;
        }
        match self.bag.binding(name) {
            Some(Binding::Attribute) => self.document.root.set_attribute(name, value),
            Some(Binding::Style) => self.document.root.set_style(name, value),
            None => {
                log::debug!("set: unknown option {name}");
                return false;
            }
        }
        self.bag.touch(name);
        true
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Current value of a child's property, falling back to the element's
    /// raw string before its object exists.
    pub fn get_object(&self, id: ElementId, name: &str) -> Option<String> {
        if let Some(value) = self.objects.get(id).and_then(|o| o.properties().get(name)) {
            return Some(value.to_raw());
        }
        let element = &self.document.get(id)?.element;
        let raw = if name.starts_with("--") {
            element.style.get(name)
        } else {
            element.attributes.get(name)
        };
        raw.cloned()
    }

    /// Writes a child property. Names starting with `--` are styles.
    pub fn set_object(&mut self, id: ElementId, name: &str, value: &str) -> bool {
        if self.is_disposed() {
            return false;
        }
        let Some(child) = self.document.get_mut(id) else {
            return false;
        };
        if name.starts_with("--") {
            child.element.set_style(name, value);
        } else {
            child.element.set_attribute(name, value);
        }
        if let Some(obj) = self.objects.get_mut(id) {
            obj.properties_mut().touch(name);
        }
        true
    }

    /// Sets a child's text content.
    pub fn set_text(&mut self, id: ElementId, text: &str) -> bool {
        let disposed = self.is_disposed();
        match self.document.get_mut(id) {
            Some(child) if !disposed => {
                child.element.text = text.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn append(&mut self, kind: ElementKind, element: Element) -> ElementId {
        self.document.append(kind, element)
    }

    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        if self.hovered == Some(id) {
            self.hovered = None;
        }
        self.document.remove(id)
    }

    /// Animates globe options toward `targets`.
    pub fn animate(&mut self, targets: Vec<(&str, Value)>, options: AnimateOptions) -> AnimationHandle {
        let (handle, dirty) = self.bag.animate(targets, options);
        self.pending |= dirty;
        handle
    }

    /// Animates a child's properties. `None` until the child has been
    /// through an update.
    pub fn animate_object(
        &mut self,
        id: ElementId,
        targets: Vec<(&str, Value)>,
        options: AnimateOptions,
    ) -> Option<AnimationHandle> {
        let obj = self.objects.get_mut(id)?;
        let (handle, dirty) = obj.properties_mut().animate(targets, options);
        self.pending |= dirty;
        Some(handle)
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn settings(&self) -> &GlobeSettings {
        &self.settings
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn field(&self) -> &PointField {
        &self.field
    }

    /// Where `location` is drawn this frame.
    pub fn project(&self, location: &Location) -> Projected {
        self.view.project(location, 1.0)
    }

    /// The nearest generated point within `tolerance` CSS pixels, else the
    /// front-hemisphere surface location under `screen`.
    pub fn location_at(&self, screen: Vector2, tolerance: f64) -> Option<Location> {
        match self.field.nearest(screen, tolerance) {
            Some(p) => Some(Location::new(p.location.lat, p.location.lng)),
            None => self.view.unproject(screen),
        }
    }

    /// Great-circle distance in kilometres.
    pub fn distance(&self, a: &Location, b: &Location) -> f64 {
        a.distance_km(b)
    }

    /// Topmost child under `screen`.
    pub fn hit_test(&self, screen: Vector2) -> Option<ElementId> {
        if self.is_disposed() {
            return None;
        }
        self.compositor.hit_test(screen)
    }

    pub fn hovered(&self) -> Option<ElementId> {
        self.hovered
    }

    pub fn overlays(&self) -> impl Iterator<Item = &Overlay> + '_ {
        self.objects.overlays()
    }

    pub fn drain_events(&mut self) -> Vec<GlobeEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn backend_state(&self) -> BackendState {
        self.backend
    }

    /// Whether the point layer should be drawn.
    pub fn points_visible(&self) -> bool {
        !self.is_disposed() && self.backend != BackendState::Lost && !self.field.is_empty()
    }

    /// The point sprite, once loaded.
    pub fn sprite(&self) -> Option<&Arc<DynamicImage>> {
        self.settings
            .point_texture
            .as_deref()
            .and_then(|url| self.resources.image(url))
    }

    pub fn point_uniforms(&self, viewport: [u32; 2], pixel_ratio: f64) -> PointUniforms {
        let style = PointStyle::from_settings(&self.settings, self.sprite().is_some());
        PointUniforms::new(
            self.view.model_view(),
            self.view.projection(),
            viewport,
            pixel_ratio,
            self.time,
            &style,
        )
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    // ---------------------------------------------------------------------
    // Host plumbing
    // ---------------------------------------------------------------------

    /// Sets the CSS size and device pixel ratio.
    pub fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) {
        self.css = (width, height, device_pixel_ratio);
        self.view
            .resize(width, height, device_pixel_ratio, self.settings.quality);
    }

    pub fn set_backend_state(&mut self, state: BackendState) {
        if state == self.backend {
            return;
        }
        match (self.backend, state) {
            (_, BackendState::Lost) => log::warn!("rendering backend lost, point layer hidden"),
            (BackendState::Lost, _) => {
                log::info!("rendering backend restored, regenerating points");
                self.field_dirty = true;
            }
            _ => {}
        }
        self.backend = state;
    }

    pub fn backend_lost(&mut self) {
        self.set_backend_state(BackendState::Lost);
    }

    /// The host rebuilt its GPU context; the field is regenerated.
    pub fn backend_restored(&mut self) {
        self.set_backend_state(BackendState::NotReady);
    }

    // ---------------------------------------------------------------------
    // Pointer input, positions in CSS pixels, `time` in seconds
    // ---------------------------------------------------------------------

    pub fn pointer_down(&mut self, pos: Vector2, time: f64) {
        if !self.is_disposed() {
            let events = self.pointer.down(pos);
            self.handle_pointer(events, time);
        }
    }

    pub fn pointer_move(&mut self, pos: Vector2, time: f64) {
        if !self.is_disposed() {
            let events = self.pointer.moved(pos);
            self.handle_pointer(events, time);
        }
    }

    pub fn pointer_up(&mut self, pos: Vector2, time: f64) {
        if !self.is_disposed() {
            let events = self.pointer.up(pos);
            self.handle_pointer(events, time);
        }
    }

    pub fn pointer_cancel(&mut self, time: f64) {
        if !self.is_disposed() {
            let events = self.pointer.cancel();
            self.handle_pointer(events, time);
        }
    }

    /// The pointer left the surface.
    pub fn pointer_leave(&mut self) {
        self.hovered = None;
    }

    fn handle_pointer(&mut self, events: Vec<PointerEvent>, time: f64) {
        for event in events {
            match event {
                PointerEvent::Down(pos) => {
                    self.panning.stop();
                    self.autorotate.interrupt();
                    self.speedometer.reset();
                    self.speedometer.record(time, pos);
                }
                PointerEvent::Move(pos) => self.speedometer.record(time, pos),
                PointerEvent::Hover(pos) => self.hovered = self.compositor.hit_test(pos),
                PointerEvent::DragMove { delta, .. } => {
                    let d = panning::drag_delta(delta, self.settings.drag, self.view.radius_px());
                    self.set_center(panning::apply(self.settings.center, d, self.settings.lat_limit));
                }
                PointerEvent::DragEnd(_) => {
                    let velocity = self.speedometer.velocity(time);
                    self.panning
                        .release(velocity, self.settings.drag, self.view.radius_px());
                }
                // A cancelled drag must not slide.
                PointerEvent::Cancel => self.speedometer.reset(),
                PointerEvent::Tap(pos) => self.events.push(GlobeEvent::Tap {
                    element: self.compositor.hit_test(pos),
                    location: self.view.unproject(pos),
                }),
                PointerEvent::Up(_) | PointerEvent::DragStart(_) => {}
            }
        }
    }

    fn set_center(&mut self, center: Location) {
        self.pending |= self.bag.set_value("center", Value::Location(center));
        self.settings.center = center;
    }

    // ---------------------------------------------------------------------
    // Frame
    // ---------------------------------------------------------------------

    /// Applies every option change, advances animations and interaction,
    /// and reprojects the scene. Nothing is drawn.
    pub fn update(&mut self, dt: f64) {
        if self.is_disposed() {
            return;
        }
        let dt = dt.max(0.0);
        self.time += dt;

        let first = self.lifecycle == Lifecycle::Created;
        let mut dirty = std::mem::take(&mut self.pending) | self.bag.update(&self.document.root, dt);
        if first {
            dirty |= Invalidate::FIELD | Invalidate::RESOURCES | Invalidate::VIEW;
        }
        self.settings = GlobeSettings::from_bag(&self.bag);

        self.request_resources();
        self.resources.poll();
        let s = &self.settings;
        let maps_changed = self
            .color_map
            .refresh(s.color_map.as_deref(), &self.resources, &self.heightmap)
            | self
                .opacity_map
                .refresh(s.opacity_map.as_deref(), &self.resources, &self.heightmap);
        if maps_changed || dirty.contains(Invalidate::FIELD) {
            self.field_dirty = true;
        }

        self.step_camera(dt);

        if dirty.contains(Invalidate::VIEW) {
            let (w, h, dpr) = self.css;
            self.view.resize(w, h, dpr, self.settings.quality);
        }
        self.view.set_camera(Camera {
            center: self.settings.center,
            scale: self.settings.scale,
            tilt: self.settings.tilt,
        });

        if self.field_dirty && self.backend != BackendState::Lost {
            let params = FieldParams::from_settings(
                &self.settings,
                self.color_map.sampler.as_ref(),
                self.opacity_map.sampler.as_ref(),
            );
            self.field.generate(&self.heightmap, &params);
            self.field_dirty = false;
        }
        self.field.project(self.view.projector());

        let ctx = FrameContext {
            view: &self.view,
            settings: &self.settings,
            resources: &self.resources,
            hovered: self.hovered,
        };
        self.objects.sync(&self.document, dt, &ctx);
        self.compositor.arrange(self.objects.layers());
        if self.hovered.is_some_and(|id| !self.document.contains(id)) {
            self.hovered = None;
        }

        if first {
            log::info!("globe initialised: {} points", self.field.len());
            self.lifecycle = Lifecycle::Running;
            self.last_center = self.settings.center;
            self.events.push(GlobeEvent::Init);
        } else if self.settings.center != self.last_center {
            self.last_center = self.settings.center;
            self.events.push(GlobeEvent::Change {
                center: self.settings.center,
            });
        }
    }

    fn request_resources(&mut self) {
        let s = &self.settings;
        let urls = [
            &s.background,
            &s.foreground,
            &s.color_map,
            &s.opacity_map,
            &s.point_texture,
        ];
        for url in urls.into_iter().flatten() {
            self.resources.request(url);
        }
        for url in self.objects.urls() {
            self.resources.request(&url);
        }
    }

    fn step_camera(&mut self, dt: f64) {
        if let Some(d) = self.panning.step(dt, self.settings.damping) {
            self.set_center(panning::apply(self.settings.center, d, self.settings.lat_limit));
        }

        let params = AutorotateParams {
            enabled: self.settings.autorotate,
            speed: self.settings.autorotate_speed,
            delay: self.settings.autorotate_delay,
            latitude: self.settings.autorotate_latitude,
        };
        let suppressed = self.pointer.is_captured() || self.panning.is_sliding();
        if let Some(center) = self
            .autorotate
            .step(dt, &params, self.settings.center, suppressed)
        {
            self.set_center(center);
        }
    }

    /// Square the globe disc is inscribed in.
    fn disc_bounds(&self) -> Bounds {
        let r = self.view.radius_px();
        let c = self.view.center_px();
        Bounds::new(c.x - r, c.y - r, 2.0 * r, 2.0 * r)
    }

    /// Paints the 2D layers: background image and far-side content on
    /// `back`, near-side content and the foreground image on `front`.
    /// The host draws the point layer between the two.
    pub fn draw(&mut self, front: &mut dyn Surface2d, back: &mut dyn Surface2d) {
        if self.is_disposed() || self.lifecycle == Lifecycle::Created {
            return;
        }
        front.clear();
        back.clear();

        let disc = self.disc_bounds();
        if let Some(url) = self.settings.background.as_deref() {
            if let Some(img) = self.resources.image(url) {
                back.image(url, img, disc, 0.0);
            }
        }

        let ctx = FrameContext {
            view: &self.view,
            settings: &self.settings,
            resources: &self.resources,
            hovered: self.hovered,
        };
        self.objects.draw(self.compositor.order(), &ctx, front, back);
        // Text is first measured while drawing.
        self.compositor.arrange(self.objects.layers());

        if let Some(url) = self.settings.foreground.as_deref() {
            if let Some(img) = self.resources.image(url) {
                front.image(url, img, disc, 0.0);
            }
        }

        if self.lifecycle == Lifecycle::Running
            && self.resources.is_settled()
            && self.backend == BackendState::Ready
        {
            log::info!("globe complete");
            self.lifecycle = Lifecycle::Complete;
            self.events.push(GlobeEvent::Complete);
        }
    }

    /// Stops everything and releases resources. Every later call is a no-op.
    pub fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.pointer.cancel();
        self.panning.stop();
        self.bag.cancel_animations();
        self.objects.cancel_animations();
        self.objects.clear();
        self.compositor.clear();
        self.resources.dispose();
        self.field = PointField::new();
        self.color_map = MapSlot::default();
        self.opacity_map = MapSlot::default();
        self.hovered = None;
        self.events.clear();
        self.lifecycle = Lifecycle::Disposed;
        log::info!("globe disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Color;
    use crate::view::{DrawCommand, DrawList};
    use image::{Rgba, RgbaImage};

    const DT: f64 = 1.0 / 60.0;
    const CENTER: Vector2 = Vector2::new(400.0, 300.0);

    fn globe_with(resources: Resources, root: Element) -> Globe {
        let heightmap = Heightmap::filled(64, 32, 1.0);
        let mut g = Globe::new(Document::new(root), heightmap, resources);
        g.resize(800.0, 600.0, 1.0);
        g
    }

    fn globe() -> Globe {
        globe_with(Resources::new(None), Element::new())
    }

    fn draw(g: &mut Globe) -> (DrawList, DrawList) {
        let (mut front, mut back) = (DrawList::new(), DrawList::new());
        g.draw(&mut front, &mut back);
        (front, back)
    }

    #[test]
    fn first_update_initialises_once() {
        let mut g = globe();
        assert!(g.field().is_empty());
        g.update(DT);
        g.update(DT);
        assert_eq!(g.drain_events(), vec![GlobeEvent::Init]);
        assert!(!g.field().is_empty());
        assert_eq!(g.field().generation(), 1);
    }

    #[test]
    fn options_apply_on_the_next_update() {
        let mut g = globe();
        g.update(DT);
        assert!(g.set("density", "0"));
        assert!(g.set("--point-size", "3"));
        assert!(!g.set("no-such-option", "1"));
        assert_eq!(g.settings().density, 0.5);

        g.update(DT);
        assert_eq!(g.settings().density, 0.0);
        assert_eq!(g.settings().point_size, 3.0);
        assert_eq!(g.get("density").as_deref(), Some("0"));
        assert_eq!(g.field().rings(), 40);
        assert_eq!(g.field().generation(), 2);
    }

    #[test]
    fn antipodal_marker_is_hit_only_once_facing() {
        let mut g = globe();
        let id = g.append(
            ElementKind::Marker,
            Element::new().with_attribute("location", "0 180"),
        );
        g.update(DT);
        assert_eq!(g.hit_test(CENTER), None);

        g.set("center", "0 180");
        g.update(DT);
        assert_eq!(g.hit_test(CENTER), Some(id));
        assert!(g.drain_events().contains(&GlobeEvent::Change {
            center: Location::new(0.0, 180.0)
        }));
        assert_eq!(g.hit_test(Vector2::new(10.0, 10.0)), None);
    }

    #[test]
    fn dragging_pans_and_releasing_slides() {
        let mut g = globe();
        g.update(DT);
        g.drain_events();

        g.pointer_down(CENTER, 0.0);
        for i in 1..=5 {
            let t = i as f64 * 0.02;
            g.pointer_move(CENTER + Vector2::new(i as f64 * 40.0, 0.0), t);
        }
        let dragged = g.settings().center;
        assert!(dragged.lng < 0.0, "surface follows the pointer east");
        assert_eq!(dragged.lat, 0.0);

        g.pointer_up(CENTER + Vector2::new(200.0, 0.0), 0.1);
        g.update(DT);
        assert!(g.settings().center.lng < dragged.lng, "slides on");
        let events = g.drain_events();
        assert!(matches!(events.last(), Some(GlobeEvent::Change { .. })));
        assert!(!events.iter().any(|e| matches!(e, GlobeEvent::Tap { .. })));

        for _ in 0..300 {
            g.update(DT);
        }
        let settled = g.settings().center;
        g.update(DT);
        assert_eq!(g.settings().center, settled);
    }

    #[test]
    fn latitude_stops_at_the_limit() {
        let mut g = globe_with(
            Resources::new(None),
            Element::new().with_attribute("lat-limit", "30"),
        );
        g.update(DT);
        g.pointer_down(CENTER, 0.0);
        g.pointer_move(CENTER + Vector2::new(0.0, 500.0), 0.5);
        g.pointer_cancel(0.5);
        assert_eq!(g.settings().center.lat, 30.0);
    }

    #[test]
    fn tap_reports_element_and_location() {
        let mut g = globe();
        let id = g.append(ElementKind::Marker, Element::new());
        g.update(DT);
        g.drain_events();

        g.pointer_down(CENTER, 0.0);
        g.pointer_up(CENTER + Vector2::new(1.0, 0.0), 0.05);
        let events = g.drain_events();
        let Some(GlobeEvent::Tap { element, location }) = events.first() else {
            panic!("expected a tap, got {events:?}");
        };
        assert_eq!(*element, Some(id));
        let loc = location.expect("on the globe");
        assert!(loc.lat.abs() < 1e-9 && loc.lng > 0.0 && loc.lng < 1.0);

        g.pointer_down(Vector2::new(5.0, 5.0), 1.0);
        g.pointer_up(Vector2::new(5.0, 5.0), 1.0);
        assert_eq!(
            g.drain_events(),
            vec![GlobeEvent::Tap {
                element: None,
                location: None
            }]
        );
    }

    #[test]
    fn new_text_label_is_hit_after_its_first_frame() {
        let mut g = globe();
        g.update(DT);
        let id = g.append(ElementKind::Text, Element::new().with_text("label"));
        g.update(DT);
        draw(&mut g);
        assert_eq!(g.hit_test(CENTER), Some(id));

        g.set_object(id, "location", "0 180");
        g.update(DT);
        assert_eq!(g.hit_test(CENTER), None);
    }

    #[test]
    fn hover_tracks_the_topmost_object() {
        let mut g = globe();
        let id = g.append(ElementKind::Marker, Element::new());
        g.update(DT);
        g.pointer_move(CENTER, 0.0);
        assert_eq!(g.hovered(), Some(id));
        g.remove(id);
        assert_eq!(g.hovered(), None);
    }

    #[test]
    fn location_at_prefers_generated_points() {
        let mut g = globe();
        g.update(DT);
        let exact = g.location_at(CENTER, 0.0).expect("front hemisphere");
        assert!(exact.lat.abs() < 1e-9 && exact.lng.abs() < 1e-9);
        let snapped = g.location_at(CENTER + Vector2::new(1.0, 0.0), 20.0).expect("point");
        assert!(g
            .field()
            .points()
            .iter()
            .any(|p| p.location.lat == snapped.lat && p.location.lng == snapped.lng));
        assert_eq!(g.location_at(Vector2::new(0.0, 0.0), 0.0), None);
    }

    #[test]
    fn complete_waits_for_the_backend() {
        let mut g = globe();
        g.update(DT);
        draw(&mut g);
        assert_eq!(g.drain_events(), vec![GlobeEvent::Init]);

        g.set_backend_state(BackendState::Ready);
        draw(&mut g);
        draw(&mut g);
        assert_eq!(g.drain_events(), vec![GlobeEvent::Complete]);
    }

    #[test]
    fn lost_backend_hides_points_until_restored() {
        let mut g = globe();
        g.update(DT);
        assert!(g.points_visible());

        g.backend_lost();
        g.set("density", "1");
        g.update(DT);
        assert!(!g.points_visible());
        assert_eq!(g.field().generation(), 1);

        g.backend_restored();
        g.update(DT);
        assert!(g.points_visible());
        assert_eq!(g.field().generation(), 2);
        assert_eq!(g.field().rings(), 158);
    }

    #[test]
    fn images_frame_the_globe_on_both_surfaces() {
        let mut resources = Resources::new(None);
        resources.insert("bg.png", DynamicImage::new_rgba8(2, 2));
        resources.insert("fg.png", DynamicImage::new_rgba8(2, 2));
        let root = Element::new()
            .with_attribute("background", "url(bg.png)")
            .with_attribute("foreground", "fg.png");
        let mut g = globe_with(resources, root);
        g.update(DT);

        let (front, back) = draw(&mut g);
        let disc = Bounds::new(100.0, 0.0, 600.0, 600.0);
        assert!(matches!(
            back.commands.first(),
            Some(DrawCommand::Image { key, rect, .. }) if key == "bg.png" && *rect == disc
        ));
        assert!(matches!(
            front.commands.last(),
            Some(DrawCommand::Image { key, .. }) if key == "fg.png"
        ));
    }

    #[test]
    fn color_map_recolors_the_field() {
        let mut resources = Resources::new(None);
        let red = RgbaImage::from_pixel(4, 2, Rgba([255, 0, 0, 255]));
        resources.insert("red.png", DynamicImage::ImageRgba8(red));
        let mut g = globe_with(resources, Element::new());
        g.update(DT);
        assert!(g.field().points().iter().all(|p| p.color == Color::WHITE));

        g.set("color-map", "red.png");
        g.update(DT);
        assert_eq!(g.field().generation(), 2);
        assert!(g.field().points().iter().all(|p| p.color.r > 250 && p.color.g < 5));
    }

    #[test]
    fn missing_map_falls_back_to_flat_color() {
        let mut g = globe_with(
            Resources::new(None),
            Element::new().with_attribute("color-map", "https://example.com/earth.png"),
        );
        g.update(DT);
        assert!(g.resources().is_settled());
        assert!(g.field().points().iter().all(|p| p.color == Color::WHITE));
    }

    #[test]
    fn object_properties_read_and_write() {
        let mut g = globe();
        let id = g.append(ElementKind::Line, Element::new().with_attribute("to", "10 10"));
        assert_eq!(g.get_object(id, "to").as_deref(), Some("10 10"));
        g.update(DT);

        assert!(g.set_object(id, "--line-width", "4"));
        g.update(DT);
        assert_eq!(g.get_object(id, "--line-width").as_deref(), Some("4"));
        assert!(!g.set_object(ElementId(99), "to", "0 0"));

        let handle = g
            .animate_object(id, vec![("offset", Value::Float(1.0))], AnimateOptions::default().duration(0.1))
            .expect("object exists");
        handle.finish();
        g.update(DT);
        assert_eq!(g.get_object(id, "offset").as_deref(), Some("1"));
    }

    #[test]
    fn animating_the_center_emits_changes() {
        let mut g = globe();
        g.update(DT);
        g.drain_events();
        let handle = g.animate(
            vec![("center", Value::Location(Location::new(0.0, 90.0)))],
            AnimateOptions::default().duration(0.5),
        );
        g.update(0.25);
        let mid = g.settings().center;
        assert!(mid.lng > 0.0 && mid.lng < 90.0);
        handle.finish();
        g.update(DT);
        assert_eq!(g.settings().center, Location::new(0.0, 90.0));
        assert_eq!(g.drain_events().len(), 2);
    }

    #[test]
    fn dispose_silences_everything() {
        let mut g = globe();
        let id = g.append(ElementKind::Marker, Element::new());
        g.update(DT);
        assert!(g.set_text(id, "label"));
        assert!(!g.set_text(ElementId(99), "label"));
        g.dispose();
        assert!(!g.set_text(id, "later"));

        g.update(DT);
        let (front, back) = draw(&mut g);
        assert!(front.is_empty() && back.is_empty());
        assert!(g.drain_events().is_empty());
        assert_eq!(g.hit_test(CENTER), None);
        assert!(!g.set("density", "1"));
        assert!(!g.points_visible());
        assert!(g.document().contains(id));
        assert_eq!(g.document().get(id).map(|c| c.element.text.as_str()), Some("label"));
    }

    #[test]
    fn distance_is_great_circle_km() {
        let g = globe();
        let d = g.distance(&Location::new(0.0, 0.0), &Location::new(0.0, 90.0));
        assert!((d - std::f64::consts::FRAC_PI_2 * 6371.0).abs() < 1e-6);
    }
}
