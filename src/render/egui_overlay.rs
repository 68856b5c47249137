//! Software painter for egui output, drawn straight into the RGBA frame
//! that `pixels` presents.

#[derive(Clone, Copy)]
struct UiVertex {
    pos: [f32; 2],
    uv: [f32; 2],
    color: [u8; 4],
}

pub struct EguiOverlay {
    atlas_texture_id: Option<egui::TextureId>,
    atlas_size: Option<[u32; 2]>,
    atlas_pixels: Vec<u8>,
    warned_texture_mismatch: bool,
}

impl Default for EguiOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl EguiOverlay {
    pub fn new() -> Self {
        Self {
            atlas_texture_id: None,
            atlas_size: None,
            atlas_pixels: Vec::new(),
            warned_texture_mismatch: false,
        }
    }

    pub fn update(&mut self, textures_delta: &egui::TexturesDelta) -> Result<(), String> {
        for (texture_id, image_delta) in &textures_delta.set {
            if let Some(current) = self.atlas_texture_id {
                if current != *texture_id {
                    if !self.warned_texture_mismatch {
                        log::warn!(
                            "egui texture id {:?} unsupported; current atlas is {:?}.",
                            texture_id,
                            current
                        );
                        self.warned_texture_mismatch = true;
                    }
                    continue;
                }
            } else {
                self.atlas_texture_id = Some(*texture_id);
            }

            let (w, h, pixels) = image_to_rgba8(image_delta)?;
            match image_delta.pos {
                Some([x, y]) => self.patch_atlas(x, y, w, h, &pixels)?,
                None => {
                    self.atlas_size = Some([w, h]);
                    self.atlas_pixels = pixels;
                }
            }
        }

        for texture_id in &textures_delta.free {
            let replaced_in_set = textures_delta
                .set
                .iter()
                .any(|(set_id, _)| set_id == texture_id);
            if Some(*texture_id) == self.atlas_texture_id && !replaced_in_set {
                self.atlas_texture_id = None;
                self.atlas_size = None;
                self.atlas_pixels.clear();
                break;
            }
        }
        Ok(())
    }

    fn patch_atlas(
        &mut self,
        x: usize,
        y: usize,
        w: u32,
        h: u32,
        pixels: &[u8],
    ) -> Result<(), String> {
        let x = u32::try_from(x).map_err(|_| "egui atlas x overflow".to_string())?;
        let y = u32::try_from(y).map_err(|_| "egui atlas y overflow".to_string())?;
        self.ensure_atlas_capacity(x.saturating_add(w), y.saturating_add(h));
        let [atlas_w, _] = self
            .atlas_size
            .ok_or_else(|| "missing egui atlas size".to_string())?;

        let row_bytes = (w as usize) * 4;
        for row in 0..(h as usize) {
            let src = row * row_bytes;
            let dst = (((y as usize) + row) * (atlas_w as usize) + (x as usize)) * 4;
            self.atlas_pixels[dst..dst + row_bytes].copy_from_slice(&pixels[src..src + row_bytes]);
        }
        Ok(())
    }

    fn ensure_atlas_capacity(&mut self, required_w: u32, required_h: u32) {
        let [cur_w, cur_h] = self.atlas_size.unwrap_or([0, 0]);
        if cur_w >= required_w && cur_h >= required_h {
            return;
        }

        let new_w = cur_w.max(required_w).max(1);
        let new_h = cur_h.max(required_h).max(1);
        let mut new_pixels = vec![0u8; (new_w as usize) * (new_h as usize) * 4];
        if cur_w > 0 && cur_h > 0 && !self.atlas_pixels.is_empty() {
            let copy_w_bytes = (cur_w as usize) * 4;
            for row in 0..(cur_h as usize) {
                let src = row * copy_w_bytes;
                let dst = row * (new_w as usize) * 4;
                new_pixels[dst..dst + copy_w_bytes]
                    .copy_from_slice(&self.atlas_pixels[src..src + copy_w_bytes]);
            }
        }
        self.atlas_size = Some([new_w, new_h]);
        self.atlas_pixels = new_pixels;
    }

    /// Composites egui meshes over `target`, a tightly packed RGBA8 frame.
    pub fn paint(
        &self,
        clipped_primitives: &[egui::ClippedPrimitive],
        pixels_per_point: f32,
        target: &mut [u8],
        width: u32,
        height: u32,
    ) {
        let Some(atlas_id) = self.atlas_texture_id else {
            return;
        };
        let ppp = pixels_per_point.max(0.01);
        for clipped in clipped_primitives {
            let egui::epaint::Primitive::Mesh(mesh) = &clipped.primitive else {
                continue;
            };
            if mesh.texture_id != atlas_id {
                continue;
            }
            let clip = [
                (clipped.clip_rect.min.x * ppp).max(0.0),
                (clipped.clip_rect.min.y * ppp).max(0.0),
                (clipped.clip_rect.max.x * ppp).min(width as f32),
                (clipped.clip_rect.max.y * ppp).min(height as f32),
            ];
            if clip[0] >= clip[2] || clip[1] >= clip[3] {
                continue;
            }
            for tri in mesh.indices.chunks_exact(3) {
                let fetch = |i: u32| {
                    mesh.vertices
                        .get(i as usize)
                        .map(|v| mesh_vertex_to_ui(*v, ppp))
                };
                let (Some(a), Some(b), Some(c)) = (fetch(tri[0]), fetch(tri[1]), fetch(tri[2]))
                else {
                    continue;
                };
                self.fill_triangle([a, b, c], clip, target, width);
            }
        }
    }

    fn fill_triangle(&self, tri: [UiVertex; 3], clip: [f32; 4], target: &mut [u8], width: u32) {
        let [a, b, c] = tri;
        let area = edge(a.pos, b.pos, c.pos);
        if area.abs() <= f32::EPSILON {
            return;
        }
        let min_x = a.pos[0].min(b.pos[0]).min(c.pos[0]).max(clip[0]).floor() as u32;
        let min_y = a.pos[1].min(b.pos[1]).min(c.pos[1]).max(clip[1]).floor() as u32;
        let max_x = a.pos[0].max(b.pos[0]).max(c.pos[0]).min(clip[2]).ceil() as u32;
        let max_y = a.pos[1].max(b.pos[1]).max(c.pos[1]).min(clip[3]).ceil() as u32;

        for y in min_y..max_y {
            let py = y as f32 + 0.5;
            for x in min_x..max_x {
                let p = [x as f32 + 0.5, py];
                let w0 = edge(b.pos, c.pos, p) / area;
                let w1 = edge(c.pos, a.pos, p) / area;
                let w2 = 1.0 - w0 - w1;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let uv = [
                    a.uv[0] * w0 + b.uv[0] * w1 + c.uv[0] * w2,
                    a.uv[1] * w0 + b.uv[1] * w1 + c.uv[1] * w2,
                ];
                let texel = self.sample_atlas(uv);
                let mut src = [0u8; 4];
                for (i, out) in src.iter_mut().enumerate() {
                    let vertex =
                        a.color[i] as f32 * w0 + b.color[i] as f32 * w1 + c.color[i] as f32 * w2;
                    *out = (vertex * texel[i] as f32 / 255.0).round().min(255.0) as u8;
                }
                let offset = ((y as usize) * (width as usize) + x as usize) * 4;
                if let Some(dst) = target.get_mut(offset..offset + 4) {
                    blend_premultiplied(dst, src);
                }
            }
        }
    }

    fn sample_atlas(&self, uv: [f32; 2]) -> [u8; 4] {
        let Some([w, h]) = self.atlas_size else {
            return [255; 4];
        };
        let x = ((uv[0] * w as f32) as u32).min(w.saturating_sub(1));
        let y = ((uv[1] * h as f32) as u32).min(h.saturating_sub(1));
        let offset = ((y as usize) * (w as usize) + x as usize) * 4;
        self.atlas_pixels
            .get(offset..offset + 4)
            .and_then(|px| px.try_into().ok())
            .unwrap_or([255; 4])
    }
}

fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

fn blend_premultiplied(dst: &mut [u8], src: [u8; 4]) {
    let inv_alpha = 255 - src[3] as u32;
    for i in 0..3 {
        let value = src[i] as u32 + (dst[i] as u32 * inv_alpha + 127) / 255;
        dst[i] = value.min(255) as u8;
    }
    dst[3] = 255;
}

fn dimension(value: usize, what: &str) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("egui {what} overflow"))
}

fn image_to_rgba8(
    image_delta: &egui::epaint::image::ImageDelta,
) -> Result<(u32, u32, Vec<u8>), String> {
    match &image_delta.image {
        egui::ImageData::Color(image) => {
            let w = dimension(image.width(), "color image width")?;
            let h = dimension(image.height(), "color image height")?;
            let mut out = Vec::with_capacity(image.pixels.len() * 4);
            for pixel in &image.pixels {
                out.extend_from_slice(&pixel.to_array());
            }
            Ok((w, h, out))
        }
        egui::ImageData::Font(image) => {
            let w = dimension(image.width(), "font image width")?;
            let h = dimension(image.height(), "font image height")?;
            let mut out = Vec::with_capacity((w as usize) * (h as usize) * 4);
            for pixel in image.srgba_pixels(None) {
                out.extend_from_slice(&pixel.to_array());
            }
            Ok((w, h, out))
        }
    }
}

fn mesh_vertex_to_ui(v: egui::epaint::Vertex, pixels_per_point: f32) -> UiVertex {
    UiVertex {
        pos: [v.pos.x * pixels_per_point, v.pos.y * pixels_per_point],
        uv: [v.uv.x, v.uv.y],
        color: v.color.to_array(),
    }
}
