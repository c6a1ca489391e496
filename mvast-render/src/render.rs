use ab_glyph::{point, Font, FontVec, Glyph, PxScale, ScaleFont};
use bytemuck::{try_cast_slice, try_cast_slice_mut};
use mvast_cache::intern_text;
use mvast_core::{FrameBuffer, PresentationError, RatingView, ScaleLayout};
use std::collections::HashMap;
use std::sync::Arc;
use tiny_skia::{Color, Paint, Pixmap, PremultipliedColorU8, Rect, Transform};

const WHITE: [u8; 4] = [255, 255, 255, 255];
const GRAY: [u8; 4] = [150, 150, 150, 255];
const SLIDER: [u8; 4] = [200, 200, 200, 255];
const BUTTON: [u8; 4] = [0, 200, 0, 255];
const BUTTON_HOVER: [u8; 4] = [0, 150, 0, 255];
const TICKS: i32 = 11;
const REFERENCE_HEIGHT: f32 = 1080.0;

/// Where a text block is placed relative to the given point.
#[derive(Debug, Clone, Copy)]
enum Anchor {
    Center,
    Top,
    Bottom,
}

struct TextCache {
    font: Option<FontVec>,
    map: HashMap<(usize, u32), Arc<Pixmap>>,
}

impl TextCache {
    fn new(font: Option<FontVec>) -> Self {
        Self {
            font,
            map: HashMap::new(),
        }
    }

    fn line_height(&self, size_px: f32) -> f32 {
        match &self.font {
            Some(font) => {
                let sf = font.as_scaled(PxScale::from(size_px));
                sf.ascent() - sf.descent() + sf.line_gap()
            }
            None => size_px,
        }
    }

    fn get_or_render(&mut self, text: &str, size_px: f32) -> Option<Arc<Pixmap>> {
        let font = self.font.as_ref()?;
        let key = (intern_text(text), size_px.round() as u32);
        if let Some(p) = self.map.get(&key) {
            return Some(Arc::clone(p));
        }
        let pm = Arc::new(render_text_pixmap(
            text,
            key.1 as f32,
            font,
            Color::from_rgba8(255, 255, 255, 255),
        )?);
        self.map.insert(key, Arc::clone(&pm));
        Some(pm)
    }
}

/// Rasterises one line of text into a tight, premultiplied pixmap.
pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: Color,
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // Layout with baseline at ascent
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for g in &glyphs {
        if let Some(out) = font.outline_glyph(g.clone()) {
            let b = out.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }
    }
    if min_x == f32::INFINITY {
        return None;
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;

    let stride = pm.width() as usize;
    let dst = pm.pixels_mut();
    let cu = [
        (color.red() * 255.0) as u8,
        (color.green() * 255.0) as u8,
        (color.blue() * 255.0) as u8,
        (color.alpha() * 255.0) as u8,
    ];

    for g in &glyphs {
        if let Some(out) = font.outline_glyph(g.clone()) {
            let b = out.px_bounds();
            out.draw(|x, y, cov| {
                if cov <= f32::EPSILON {
                    return;
                }
                let ix = (x as f32 + b.min.x - min_x).floor() as i32;
                let iy = (y as f32 + b.min.y - min_y).floor() as i32;
                if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                    return;
                }
                let i = iy as usize * stride + ix as usize;

                let a_lin = (cov * cu[3] as f32 / 255.0).clamp(0.0, 1.0);
                let sa = (a_lin * 255.0) as u8;
                let bg = dst[i];
                // Porter-Duff over in premultiplied space
                let inv = 1.0 - (sa as f32 / 255.0);
                let over = |s: u8, d: u8| {
                    ((s as f32 * a_lin) as u8).saturating_add((d as f32 * inv) as u8)
                };
                let a = sa.saturating_add((bg.alpha() as f32 * inv) as u8);
                let r = over(cu[0], bg.red()).min(a);
                let gg = over(cu[1], bg.green()).min(a);
                let bb = over(cu[2], bg.blue()).min(a);
                if let Some(px) = PremultipliedColorU8::from_rgba(r, gg, bb, a) {
                    dst[i] = px;
                }
            });
        }
    }

    Some(pm)
}

/// Software renderer for every screen of a run. The canvas is kept opaque,
/// so its premultiplied bytes can be copied to an RGBA surface as-is.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    canvas: Pixmap,
    clear_buffer: Vec<u8>,
    text_cache: TextCache,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, font: Option<FontVec>) -> Result<Self, PresentationError> {
        let (canvas, clear_buffer) = blank_canvas(width, height)?;
        Ok(Self {
            width,
            height,
            canvas,
            clear_buffer,
            text_cache: TextCache::new(font),
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn has_font(&self) -> bool {
        self.text_cache.font.is_some()
    }

    /// Canvas bytes, RGBA8.
    pub fn data(&self) -> &[u8] {
        self.canvas.data()
    }

    pub fn copy_to(&self, target: &mut [u8]) -> Result<(), PresentationError> {
        let src = self.canvas.data();
        if target.len() != src.len() {
            return Err(PresentationError::Render(format!(
                "target holds {} bytes, canvas has {}",
                target.len(),
                src.len()
            )));
        }
        target.copy_from_slice(src);
        Ok(())
    }

    fn ui_scale(&self) -> f32 {
        (self.height as f32 / REFERENCE_HEIGHT).clamp(0.5, 3.0)
    }

    pub fn clear(&mut self) {
        self.canvas.data_mut().copy_from_slice(&self.clear_buffer);
    }

    pub fn draw_fixation(&mut self) {
        self.clear();
        let s = self.ui_scale();
        let size = (40.0 * s).round();
        let thick = (3.0 * s).round().max(2.0);
        let (cx, cy) = (self.width as f32 / 2.0, self.height as f32 / 2.0);
        self.fill(cx - size / 2.0, (cy - thick / 2.0).floor(), size, thick, WHITE);
        self.fill((cx - thick / 2.0).floor(), cy - size / 2.0, thick, size, WHITE);
    }

    pub fn draw_frame(&mut self, frame: &FrameBuffer) -> Result<(), PresentationError> {
        if frame.size() != self.size() {
            return Err(PresentationError::FrameSize {
                frame: frame.size(),
                surface: self.size(),
            });
        }
        self.canvas.data_mut().copy_from_slice(frame.data());
        Ok(())
    }

    pub fn draw_message(&mut self, text: &str) {
        self.clear();
        let size = 38.0 * self.ui_scale();
        let line_h = self.text_cache.line_height(size);
        let spacing = line_h * 1.2;

        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        let total: f32 = lines
            .iter()
            .map(|l| if l.is_empty() { spacing / 2.0 } else { spacing })
            .sum();
        let cx = self.width as f32 / 2.0;
        let mut y = ((self.height as f32 - total) / 2.0).floor();
        for line in lines {
            if line.is_empty() {
                y += spacing / 2.0;
                continue;
            }
            self.text(line, size, (cx, y), Anchor::Top);
            y += spacing;
        }
    }

    pub fn draw_rating(&mut self, view: &RatingView<'_>) {
        self.clear();
        let layout: &ScaleLayout = view.layout;
        let s = layout.ui_scale;
        let bar = layout.bar;
        let font_px = 28.0 * s;
        let cx = self.width as f32 / 2.0;

        self.text(view.kind.title(), font_px, (cx, bar.y - 60.0 * s), Anchor::Bottom);

        self.fill(bar.x - 1.0, bar.y - 1.0, bar.w + 2.0, bar.h + 2.0, GRAY);
        self.fill(bar.x, bar.y, bar.w, bar.h, WHITE);

        let tick_h = (10.0 * s).trunc();
        let num_off = (15.0 * s).trunc();
        let tick_w = s.trunc().max(1.0);
        let bar_bottom = bar.y + bar.h;
        let span = (view.max - view.min) as f32;
        for i in 0..TICKS {
            let t = i as f32 / (TICKS - 1) as f32;
            let tx = bar.x + t * bar.w;
            self.fill((tx - tick_w / 2.0).floor(), bar_bottom, tick_w, tick_h, WHITE);
            if i % 2 == 0 {
                let label = ((view.min as f32 + t * span) as i32).to_string();
                self.text(&label, font_px, (tx, bar_bottom + num_off), Anchor::Top);
            }
        }

        let line_h = self.text_cache.line_height(font_px);
        let label_top = bar_bottom + num_off + line_h + (10.0 * s).trunc();
        let (low, high) = view.kind.end_labels();
        for (lines, x) in [(low, bar.x), (high, bar.x + bar.w)] {
            for (i, line) in lines.iter().enumerate() {
                let y = label_top + i as f32 * (line_h * 0.9).trunc();
                self.text(line, font_px, (x, y), Anchor::Top);
            }
        }

        let (sw, sh) = layout.slider;
        let sx = layout.slider_x(view.value, view.min, view.max);
        let (left, top) = (sx - sw / 2.0, bar.y + (bar.h / 2.0).floor() - sh / 2.0);
        let border = (2.0 * s).trunc().max(1.0);
        self.fill(left, top, sw, sh, WHITE);
        self.fill(left + border, top + border, sw - 2.0 * border, sh - 2.0 * border, SLIDER);

        self.text(
            &view.value.to_string(),
            38.0 * s,
            (sx, top - (10.0 * s).trunc()),
            Anchor::Bottom,
        );

        let button = layout.confirm;
        let colour = if view.confirm_hovered() { BUTTON_HOVER } else { BUTTON };
        self.fill(button.x, button.y, button.w, button.h, colour);
        self.text("Confirm", 24.0 * s, button.center(), Anchor::Center);
    }

    fn fill(&mut self, x: f32, y: f32, w: f32, h: f32, rgba: [u8; 4]) {
        let Some(rect) = Rect::from_xywh(x, y, w, h) else {
            return;
        };
        let mut paint = Paint::default();
        paint.anti_alias = false;
        paint.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
        self.canvas
            .fill_rect(rect, &paint, Transform::identity(), None);
    }

    fn text(&mut self, text: &str, size_px: f32, at: (f32, f32), anchor: Anchor) {
        let Some(pm) = self.text_cache.get_or_render(text, size_px) else {
            return;
        };
        let (w, h) = (pm.width() as f32, pm.height() as f32);
        let x = at.0 - w * 0.5;
        let y = match anchor {
            Anchor::Center => at.1 - h * 0.5,
            Anchor::Top => at.1,
            Anchor::Bottom => at.1 - h,
        };
        // Keep text on screen, the way the value label is clamped.
        let x = x.clamp(0.0, (self.width as f32 - w).max(0.0));
        self.blit(&pm, x as i32, y as i32);
    }

    fn blit(&mut self, pm: &Pixmap, x: i32, y: i32) {
        let (w, h) = (pm.width() as i32, pm.height() as i32);
        let (cw, ch) = (self.width as i32, self.height as i32);
        if x + w <= 0 || y + h <= 0 || x >= cw || y >= ch {
            return;
        }

        let dst_x = x.max(0) as usize;
        let dst_y = y.max(0) as usize;
        let src_x = (-x).max(0) as usize;
        let src_y = (-y).max(0) as usize;
        let copy_w = (w as usize - src_x).min(cw as usize - dst_x);
        let copy_h = (h as usize - src_y).min(ch as usize - dst_y);

        let src_data = pm.data();
        let src_stride = pm.width() as usize * 4;
        let dst_stride = self.width as usize * 4;
        let dst_data = self.canvas.data_mut();
        for row in 0..copy_h {
            let s = (src_y + row) * src_stride + src_x * 4;
            let d = (dst_y + row) * dst_stride + dst_x * 4;
            blend_row(&src_data[s..s + copy_w * 4], &mut dst_data[d..d + copy_w * 4]);
        }
    }
}

fn blank_canvas(width: u32, height: u32) -> Result<(Pixmap, Vec<u8>), PresentationError> {
    let mut canvas = Pixmap::new(width, height).ok_or_else(|| {
        PresentationError::Render(format!("cannot allocate a {width}x{height} canvas"))
    })?;
    canvas.fill(Color::from_rgba8(0, 0, 0, 255));
    let clear_buffer = canvas.data().to_vec();
    Ok((canvas, clear_buffer))
}

/// Premultiplied source-over for one row of RGBA8 pixels.
fn blend_row(src: &[u8], dst: &mut [u8]) {
    if let (Ok(src_u32), Ok(dst_u32)) = (
        try_cast_slice::<u8, u32>(src),
        try_cast_slice_mut::<u8, u32>(dst),
    ) {
        for (s, d) in src_u32.iter().zip(dst_u32.iter_mut()) {
            let sa = s >> 24 & 0xFF;
            if sa == 0xFF {
                *d = *s;
                continue;
            }
            let inv = 255 - sa;
            let mut out = 0u32;
            for shift in [0, 8, 16, 24] {
                let sc = s >> shift & 0xFF;
                let dc = *d >> shift & 0xFF;
                out |= ((sc + (dc * inv + 127) / 255).min(255)) << shift;
            }
            *d = out;
        }
        return;
    }

    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let inv = 255 - s[3] as u32;
        for c in 0..4 {
            d[c] = (s[c] as u32 + (d[c] as u32 * inv + 127) / 255).min(255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvast_core::ScaleKind;

    fn renderer(w: u32, h: u32) -> SkiaRenderer {
        SkiaRenderer::new(w, h, None).unwrap()
    }

    fn pixel(r: &SkiaRenderer, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * r.size().0 + x) * 4) as usize;
        let d = r.data();
        [d[i], d[i + 1], d[i + 2], d[i + 3]]
    }

    #[test]
    fn fixation_cross_is_centred_on_black() {
        let mut r = renderer(200, 100);
        r.draw_fixation();
        assert_eq!(pixel(&r, 100, 50), WHITE);
        assert_eq!(pixel(&r, 0, 0), [0, 0, 0, 255]);
        assert_eq!(pixel(&r, 199, 99), [0, 0, 0, 255]);
    }

    #[test]
    fn frames_must_match_the_canvas() {
        let mut r = renderer(4, 4);
        let frame = FrameBuffer::solid(4, 4, [9, 8, 7, 255]);
        r.draw_frame(&frame).unwrap();
        assert_eq!(r.data(), frame.data());

        let wrong = FrameBuffer::solid(5, 4, [0, 0, 0, 255]);
        assert!(matches!(
            r.draw_frame(&wrong),
            Err(PresentationError::FrameSize { .. })
        ));
    }

    #[test]
    fn rating_screen_draws_bar_and_button() {
        let mut r = renderer(1920, 1080);
        let layout = ScaleLayout::for_screen(1920, 1080);
        let mut view = RatingView {
            kind: ScaleKind::Brightness,
            layout: &layout,
            min: 0,
            max: 100,
            value: 0,
            pointer: (0.0, 0.0),
        };
        r.draw_rating(&view);
        // bar interior well away from the slider
        assert_eq!(pixel(&r, 1200, 545), WHITE);
        assert_eq!(pixel(&r, 900, 670), BUTTON);

        view.pointer = (960.0, 680.0);
        r.draw_rating(&view);
        assert_eq!(pixel(&r, 900, 670), BUTTON_HOVER);
    }

    #[test]
    fn blending_over_opaque_keeps_it_opaque() {
        let src = [0u8, 64, 0, 128, 255, 255, 255, 255];
        let mut dst = [0u8, 0, 200, 255, 1, 2, 3, 255];
        blend_row(&src, &mut dst);
        assert_eq!(dst[3], 255);
        assert_eq!(dst[1], 64);
        assert_eq!(&dst[4..], &[255, 255, 255, 255]);
    }

    #[test]
    fn canvas_matches_the_requested_size() {
        let r = renderer(20, 5);
        assert_eq!(r.size(), (20, 5));
        assert_eq!(r.data().len(), 20 * 5 * 4);
        assert!(SkiaRenderer::new(0, 5, None).is_err());
        assert!(!r.has_font());
    }
}
