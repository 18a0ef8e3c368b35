use heatmap_common::{HeatmapError, Result};

pub const BACKGROUND: [u8; 3] = [0xff, 0xff, 0xff];

/// Six-sector HSV to RGB. `h` in degrees `[0, 360]`, `s` and `v` in `[0, 1]`.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Result<[u8; 3]> {
    if !(0.0..=360.0).contains(&h) {
        return Err(HeatmapError::Domain { component: "hue", value: h });
    }
    if !(0.0..=1.0).contains(&s) {
        return Err(HeatmapError::Domain { component: "saturation", value: s });
    }
    if !(0.0..=1.0).contains(&v) {
        return Err(HeatmapError::Domain { component: "value", value: v });
    }

    if s == 0.0 {
        // achromatic
        return Ok([channel(v); 3]);
    }

    let h = h / 60.0;
    let i = h.floor();
    let f = h - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match (i as u32) % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    Ok([channel(r), channel(g), channel(b)])
}

fn channel(x: f64) -> u8 {
    (x * 255.0).round() as u8
}
