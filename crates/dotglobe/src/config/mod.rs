//! Reactive configuration: typed properties read from declarative elements,
//! change detection, invalidation and value animation.

pub mod animation;
pub mod element;
pub mod format;
pub mod options;

pub use animation::{AnimateOptions, AnimationHandle, Easing, UnknownEasing};
pub use element::{Child, Document, Element, ElementId, ElementKind, Source};
pub use format::{Kind, Value};
pub use options::GlobeSettings;

use crate::math::{Color, Location};
use animation::Control;
use std::cell::Cell;
use std::collections::HashMap;
use std::ops::{BitOr, BitOrAssign};
use std::rc::Rc;

/// Where a property's raw string lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Attribute,
    /// Style custom-property; names carry their leading `--`.
    Style,
}

/// Caches a property change makes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Invalidate(u32);

impl Invalidate {
    pub const NONE: Invalidate = Invalidate(0);
    /// Point-field topology or colors.
    pub const FIELD: Invalidate = Invalidate(1 << 0);
    /// Image resources to (re)request.
    pub const RESOURCES: Invalidate = Invalidate(1 << 1);
    /// Surface size, pixel ratio or projection.
    pub const VIEW: Invalidate = Invalidate(1 << 2);
    /// Camera center moved.
    pub const CENTER: Invalidate = Invalidate(1 << 3);
    /// Cached text metrics or object geometry.
    pub const LAYOUT: Invalidate = Invalidate(1 << 4);

    pub fn contains(self, other: Invalidate) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Invalidate {
    type Output = Invalidate;
    fn bitor(self, o: Invalidate) -> Invalidate {
        Invalidate(self.0 | o.0)
    }
}

impl BitOrAssign for Invalidate {
    fn bitor_assign(&mut self, o: Invalidate) {
        self.0 |= o.0;
    }
}

/// A typed option descriptor.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: &'static str,
    pub binding: Binding,
    pub kind: Kind,
    pub default: Value,
    pub invalidates: Invalidate,
}

impl Property {
    pub fn attr(name: &'static str, kind: Kind, default: Value) -> Self {
        Self {
            name,
            binding: Binding::Attribute,
            kind,
            default,
            invalidates: Invalidate::NONE,
        }
    }

    pub fn style(name: &'static str, kind: Kind, default: Value) -> Self {
        Self {
            binding: Binding::Style,
            ..Self::attr(name, kind, default)
        }
    }

    pub fn invalidates(mut self, mask: Invalidate) -> Self {
        self.invalidates = mask;
        self
    }

    fn read<'a>(&self, source: &'a dyn Source) -> Option<&'a str> {
        match self.binding {
            Binding::Attribute => source.attribute(self.name),
            Binding::Style => source.style(self.name),
        }
    }
}

#[derive(Debug)]
struct Slot {
    prop: Property,
    raw: Option<String>,
    value: Value,
}

#[derive(Debug)]
struct Track {
    slot: usize,
    from: Value,
    to: Value,
}

#[derive(Debug)]
struct Animation {
    tracks: Vec<Track>,
    elapsed: f64,
    duration: f64,
    easing: Easing,
    shortest_path: bool,
    control: Rc<Cell<Control>>,
}

/// The typed values of one element, kept in sync with its raw strings.
#[derive(Debug)]
pub struct PropertyBag {
    slots: Vec<Slot>,
    index: HashMap<&'static str, usize>,
    animations: Vec<Animation>,
}

impl PropertyBag {
    pub fn new(props: Vec<Property>) -> Self {
        let index = props.iter().enumerate().map(|(i, p)| (p.name, i)).collect();
        let slots = props
            .into_iter()
            .map(|prop| Slot {
                value: prop.default.clone(),
                raw: None,
                prop,
            })
            .collect();
        Self {
            slots,
            index,
            animations: Vec::new(),
        }
    }

    /// Re-reads every raw value, coercing only those that changed, then
    /// settles pending animation requests and advances running animations by
    /// `dt` seconds. Returns what the changes invalidated.
    pub fn update(&mut self, source: &dyn Source, dt: f64) -> Invalidate {
        let mut dirty = Invalidate::NONE;

        for slot in &mut self.slots {
            let raw = slot.prop.read(source);
            if raw == slot.raw.as_deref() {
                continue;
            }
            slot.raw = raw.map(str::to_string);
            let value = match raw {
                None => slot.prop.default.clone(),
                Some(raw) => slot.prop.kind.coerce(raw).unwrap_or_else(|| {
                    log::debug!("{}: malformed value {:?}, using default", slot.prop.name, raw);
                    slot.prop.default.clone()
                }),
            };
            if value != slot.value {
                slot.value = value;
                dirty |= slot.prop.invalidates;
            }
        }

        dirty | self.step(dt)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index.get(name).map(|&i| &self.slots[i].value)
    }

    pub fn binding(&self, name: &str) -> Option<Binding> {
        self.index.get(name).map(|&i| self.slots[i].prop.binding)
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Forgets the cached raw string, so the next update re-coerces it even
    /// if it did not change.
    pub fn touch(&mut self, name: &str) {
        if let Some(&i) = self.index.get(name) {
            self.slots[i].raw = None;
        }
    }

    /// Sets a typed value directly, bypassing the raw string.
    pub fn set_value(&mut self, name: &str, value: Value) -> Invalidate {
        let Some(&i) = self.index.get(name) else {
            return Invalidate::NONE;
        };
        let slot = &mut self.slots[i];
        if slot.value == value {
            return Invalidate::NONE;
        }
        slot.value = value;
        slot.prop.invalidates
    }

    pub fn f64(&self, name: &str) -> f64 {
        self.get(name).and_then(Value::as_f64).unwrap_or(0.0)
    }

    pub fn opt_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn bool(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn str(&self, name: &str) -> &str {
        self.get(name).and_then(Value::as_str).unwrap_or("")
    }

    /// Url or string value, `None` when unset or empty.
    pub fn url(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn color(&self, name: &str) -> Color {
        self.get(name).and_then(Value::as_color).unwrap_or_default()
    }

    pub fn location(&self, name: &str) -> Option<Location> {
        self.get(name).and_then(Value::as_location)
    }

    pub fn locations(&self, name: &str) -> &[Location] {
        self.get(name).map(Value::as_locations).unwrap_or(&[])
    }

    /// Starts interpolating the named values toward `targets`.
    ///
    /// Unknown names are ignored; non-interpolable kinds are applied immediately.
    /// A value already being animated is taken over by the new animation.
    pub fn animate(
        &mut self,
        targets: Vec<(&str, Value)>,
        options: AnimateOptions,
    ) -> (AnimationHandle, Invalidate) {
        let mut dirty = Invalidate::NONE;
        let mut tracks = Vec::new();

        for (name, to) in targets {
            let Some(&slot) = self.index.get(name) else {
                log::debug!("animate: unknown property {name}");
                continue;
            };
            let from = self.slots[slot].value.clone();
            if from.lerp(&to, 0.0, true).is_none() {
                dirty |= self.set_value(name, to);
                continue;
            }
            for anim in &mut self.animations {
                anim.tracks.retain(|t| t.slot != slot);
            }
            tracks.push(Track { slot, from, to });
        }

        if tracks.is_empty() {
            return (AnimationHandle::done(), dirty);
        }

        let duration = options
            .duration
            .unwrap_or_else(|| animation::auto_duration(tracks.iter().map(|t| (&t.from, &t.to))));
        let handle = AnimationHandle::new();
        self.animations.push(Animation {
            tracks,
            elapsed: 0.0,
            duration,
            easing: options.easing,
            shortest_path: options.shortest_path,
            control: handle.control.clone(),
        });
        (handle, dirty)
    }

    pub fn is_animating(&self) -> bool {
        !self.animations.is_empty()
    }

    /// Settles every animation at its start values.
    pub fn cancel_animations(&mut self) -> Invalidate {
        for anim in &self.animations {
            anim.control.set(Control::CancelRequested);
        }
        self.step(0.0)
    }

    fn step(&mut self, dt: f64) -> Invalidate {
        let mut dirty = Invalidate::NONE;
        let slots = &mut self.slots;

        self.animations.retain_mut(|anim| {
            let progress = match anim.control.get() {
                Control::FinishRequested => Some(1.0),
                Control::CancelRequested => None,
                Control::Done => return false,
                Control::Running => {
                    anim.elapsed += dt.max(0.0);
                    Some(if anim.duration <= 0.0 {
                        1.0
                    } else {
                        (anim.elapsed / anim.duration).min(1.0)
                    })
                }
            };

            for track in &anim.tracks {
                let slot = &mut slots[track.slot];
                let value = match progress {
                    None => track.from.clone(),
                    Some(p) if p >= 1.0 => track.to.clone(),
                    Some(p) => track
                        .from
                        .lerp(&track.to, anim.easing.apply(p), anim.shortest_path)
                        .unwrap_or_else(|| track.to.clone()),
                };
                if slot.value != value {
                    slot.value = value;
                    dirty |= slot.prop.invalidates;
                }
            }

            let finished = !matches!(progress, Some(p) if p < 1.0) || anim.tracks.is_empty();
            if finished {
                anim.control.set(Control::Done);
            }
            !finished
        });

        dirty
    }
}
