//! The 2D drawing surface scene objects paint on.
//!
//! The globe draws into two of these per frame, one behind the points and
//! one in front. `DrawList` records commands for headless use and tests;
//! the viewer implements the trait on top of egui shapes.

use crate::math::{Bounds, Color, Vector2};
use image::DynamicImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl TextAlign {
    /// Left below 0.5, centred at 0.5, right above.
    pub fn from_anchor(x: f64) -> Self {
        if x < 0.5 {
            TextAlign::Left
        } else if x > 0.5 {
            TextAlign::Right
        } else {
            TextAlign::Center
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontFamily {
    #[default]
    Proportional,
    Monospace,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    /// Size in CSS pixels.
    pub size: f64,
    pub family: FontFamily,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            size: 12.0,
            family: FontFamily::Proportional,
        }
    }
}

pub trait Surface2d {
    /// Drops everything drawn so far.
    fn clear(&mut self);

    /// Opacity multiplied into every following command, in [0, 1].
    fn set_alpha(&mut self, alpha: f64);

    /// Draws `image` into `rect`, rotated by `rotation` radians around the
    /// rect's center. `key` identifies the image across frames.
    fn image(&mut self, key: &str, image: &DynamicImage, rect: Bounds, rotation: f64);

    /// Draws one line of text; `pos` is the top of the line at the
    /// alignment edge.
    fn fill_text(&mut self, text: &str, pos: Vector2, font: Font, align: TextAlign, color: Color);

    fn stroke_text(
        &mut self,
        text: &str,
        pos: Vector2,
        font: Font,
        align: TextAlign,
        color: Color,
        width: f64,
    );

    /// Width and height of one line of text.
    fn measure_text(&self, text: &str, font: Font) -> Vector2;

    fn polyline(&mut self, points: &[Vector2], color: Color, width: f64);

    fn circle(&mut self, center: Vector2, radius: f64, color: Color);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Image {
        key: String,
        rect: Bounds,
        rotation: f64,
        alpha: f64,
    },
    FillText {
        text: String,
        pos: Vector2,
        font: Font,
        align: TextAlign,
        color: Color,
    },
    StrokeText {
        text: String,
        pos: Vector2,
        font: Font,
        align: TextAlign,
        color: Color,
        width: f64,
    },
    Polyline {
        points: Vec<Vector2>,
        color: Color,
        width: f64,
    },
    Circle {
        center: Vector2,
        radius: f64,
        color: Color,
    },
}

/// Records draw commands instead of rasterizing them.
#[derive(Debug, Clone)]
pub struct DrawList {
    pub commands: Vec<DrawCommand>,
    alpha: f64,
}

impl Default for DrawList {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            alpha: 1.0,
        }
    }
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Replays the recorded commands onto another surface. Images are
    /// resolved through `lookup`.
    pub fn replay<'a>(
        &self,
        target: &mut dyn Surface2d,
        lookup: impl Fn(&str) -> Option<&'a DynamicImage>,
    ) {
        for cmd in &self.commands {
            match cmd {
                DrawCommand::Image {
                    key,
                    rect,
                    rotation,
                    alpha,
                } => {
                    if let Some(img) = lookup(key) {
                        target.set_alpha(*alpha);
                        target.image(key, img, *rect, *rotation);
                        target.set_alpha(1.0);
                    }
                }
                DrawCommand::FillText {
                    text,
                    pos,
                    font,
                    align,
                    color,
                } => target.fill_text(text, *pos, *font, *align, *color),
                DrawCommand::StrokeText {
                    text,
                    pos,
                    font,
                    align,
                    color,
                    width,
                } => target.stroke_text(text, *pos, *font, *align, *color, *width),
                DrawCommand::Polyline {
                    points,
                    color,
                    width,
                } => target.polyline(points, *color, *width),
                DrawCommand::Circle {
                    center,
                    radius,
                    color,
                } => target.circle(*center, *radius, *color),
            }
        }
    }
}

impl Surface2d for DrawList {
    fn clear(&mut self) {
        self.commands.clear();
        self.alpha = 1.0;
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    fn image(&mut self, key: &str, _image: &DynamicImage, rect: Bounds, rotation: f64) {
        self.commands.push(DrawCommand::Image {
            key: key.to_string(),
            rect,
            rotation,
            alpha: self.alpha,
        });
    }

    fn fill_text(&mut self, text: &str, pos: Vector2, font: Font, align: TextAlign, color: Color) {
        self.commands.push(DrawCommand::FillText {
            text: text.to_string(),
            pos,
            font,
            align,
            color: color.with_alpha(self.alpha),
        });
    }

    fn stroke_text(
        &mut self,
        text: &str,
        pos: Vector2,
        font: Font,
        align: TextAlign,
        color: Color,
        width: f64,
    ) {
        self.commands.push(DrawCommand::StrokeText {
            text: text.to_string(),
            pos,
            font,
            align,
            color: color.with_alpha(self.alpha),
            width,
        });
    }

    /// Fixed-advance estimate; good enough for layout without a font.
    fn measure_text(&self, text: &str, font: Font) -> Vector2 {
        let advance = match font.family {
            FontFamily::Proportional => 0.55,
            FontFamily::Monospace => 0.6,
        };
        Vector2::new(text.chars().count() as f64 * font.size * advance, font.size)
    }

    fn polyline(&mut self, points: &[Vector2], color: Color, width: f64) {
        if points.len() < 2 {
            return;
        }
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            color: color.with_alpha(self.alpha),
            width,
        });
    }

    fn circle(&mut self, center: Vector2, radius: f64, color: Color) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color: color.with_alpha(self.alpha),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_from_anchor() {
        assert_eq!(TextAlign::from_anchor(0.0), TextAlign::Left);
        assert_eq!(TextAlign::from_anchor(0.5), TextAlign::Center);
        assert_eq!(TextAlign::from_anchor(1.0), TextAlign::Right);
    }

    #[test]
    fn alpha_applies_to_following_commands() {
        let mut list = DrawList::new();
        list.circle(Vector2::ZERO, 2.0, Color::WHITE);
        list.set_alpha(0.5);
        list.circle(Vector2::ZERO, 2.0, Color::WHITE);
        list.polyline(&[Vector2::ZERO], Color::WHITE, 1.0);

        assert_eq!(list.len(), 2);
        let alphas: Vec<u8> = list
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Circle { color, .. } => Some(color.a),
                _ => None,
            })
            .collect();
        assert_eq!(alphas, vec![255, 128]);

        list.clear();
        assert!(list.is_empty());
    }

    #[test]
    fn replay_reproduces_commands() {
        let mut a = DrawList::new();
        a.fill_text("hi", Vector2::new(1.0, 2.0), Font::default(), TextAlign::Left, Color::WHITE);
        a.circle(Vector2::new(3.0, 4.0), 1.0, Color::BLACK);
        let mut b = DrawList::new();
        a.replay(&mut b, |_| None);
        assert_eq!(a.commands, b.commands);
    }
}
