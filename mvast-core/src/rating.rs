//! Rating scale semantics and on-screen geometry.
//!
//! Geometry is derived from the screen size relative to a 1080 px tall
//! reference display so the scale keeps its proportions on any monitor.

const REFERENCE_HEIGHT: f32 = 1080.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKind {
    Unpleasantness,
    Brightness,
}

impl ScaleKind {
    pub fn title(&self) -> &'static str {
        match self {
            ScaleKind::Unpleasantness => {
                "Please rate the unpleasantness of the image you just viewed."
            }
            ScaleKind::Brightness => "Please rate the brightness of the image you just viewed.",
        }
    }

    /// Lines printed under the low and high ends of the bar.
    pub fn end_labels(&self) -> (&'static [&'static str], &'static [&'static str]) {
        match self {
            ScaleKind::Unpleasantness => (
                &["Not", "Unpleasant"],
                &["Most Unpleasant", "Image", "Imaginable"],
            ),
            ScaleKind::Brightness => (&["No Image", "Visible"], &["Brightest Image", "Imaginable"]),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScaleKind::Unpleasantness => "unpleasantness",
            ScaleKind::Brightness => "brightness",
        }
    }
}

/// Axis-aligned screen rectangle; `contains` is half-open on the far edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Region {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w * 0.5, self.y + self.h * 0.5)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleLayout {
    pub screen: (u32, u32),
    pub ui_scale: f32,
    pub bar: Region,
    pub slider: (f32, f32),
    pub confirm: Region,
}

impl ScaleLayout {
    pub fn for_screen(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let s = (h / REFERENCE_HEIGHT).clamp(0.5, 3.0);
        let px = |v: f32| (v * s).trunc();

        let bar_w = px(800.0).min((w * 0.85).trunc());
        let bar_h = px(10.0).max(5.0);
        let bar_x = ((w - bar_w) / 2.0).floor();
        let bar_y = (h / 2.0).floor();

        let slider = (px(20.0).max(10.0), px(40.0).max(20.0));

        let confirm_w = px(150.0);
        let confirm_h = px(50.0);
        let confirm = Region::new(
            ((w - confirm_w) / 2.0).floor(),
            bar_y + px(120.0),
            confirm_w,
            confirm_h,
        );

        Self {
            screen: (width, height),
            ui_scale: s,
            bar: Region::new(bar_x, bar_y, bar_w, bar_h),
            slider,
            confirm,
        }
    }

    /// Area in which a press starts a drag: the bar grown by one slider size.
    pub fn interaction_region(&self) -> Region {
        let (sw, sh) = self.slider;
        Region::new(
            self.bar.x - sw,
            self.bar.y - sh,
            self.bar.w + 2.0 * sw,
            self.bar.h + 2.0 * sh,
        )
    }

    /// Linear pointer-to-value mapping, clamped to the bar ends.
    pub fn value_at(&self, pointer_x: f32, min: i32, max: i32) -> i32 {
        if self.bar.w <= 0.0 {
            return min;
        }
        let t = ((pointer_x - self.bar.x) as f64 / self.bar.w as f64).clamp(0.0, 1.0);
        let value = (min as f64 + t * (max - min) as f64).round() as i32;
        value.clamp(min.min(max), max.max(min))
    }

    /// Horizontal slider centre for `value`.
    pub fn slider_x(&self, value: i32, min: i32, max: i32) -> f32 {
        if max == min {
            return self.bar.x;
        }
        let t = (value - min) as f32 / (max - min) as f32;
        (self.bar.x + t * self.bar.w).clamp(self.bar.x, self.bar.x + self.bar.w)
    }
}

/// Everything a renderer needs to draw one rating screen.
#[derive(Debug, Clone, Copy)]
pub struct RatingView<'a> {
    pub kind: ScaleKind,
    pub layout: &'a ScaleLayout,
    pub min: i32,
    pub max: i32,
    pub value: i32,
    pub pointer: (f32, f32),
}

impl RatingView<'_> {
    pub fn confirm_hovered(&self) -> bool {
        self.layout.confirm.contains(self.pointer.0, self.pointer.1)
    }
}
