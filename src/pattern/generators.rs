/*
 *  pattern/generators.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  Built-in frame generators - alignment aids and ambient effects
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use super::{PatternError, PatternParams};
use crate::frame::{PixelFrame, Rgb};

/// Classic 256-step color wheel: red -> green -> blue -> red.
fn wheel(pos: u8) -> Rgb {
    let p = pos as u16;
    if p < 85 {
        Rgb::new((255 - p * 3) as u8, (p * 3) as u8, 0)
    } else if p < 170 {
        let p = p - 85;
        Rgb::new(0, (255 - p * 3) as u8, (p * 3) as u8)
    } else {
        let p = p - 170;
        Rgb::new((p * 3) as u8, 0, (255 - p * 3) as u8)
    }
}

fn param_color(params: &PatternParams, fallback: Rgb) -> Rgb {
    params
        .color
        .map(|[r, g, b]| Rgb::new(r, g, b))
        .unwrap_or(fallback)
}

pub fn solid(w: u32, h: u32, _counter: u64, params: &PatternParams) -> Result<PixelFrame, PatternError> {
    Ok(PixelFrame::filled(w, h, param_color(params, Rgb::WHITE)))
}

/// Colored markers in each corner, for verifying panel position and
/// rotation: red top-left, green top-right, blue bottom-left, yellow
/// bottom-right.
pub fn corners(w: u32, h: u32, _counter: u64, _params: &PatternParams) -> Result<PixelFrame, PatternError> {
    let mut frame = PixelFrame::black(w, h);
    let size = 3.min(w).min(h);
    let marks = [
        (0, 0, Rgb::new(255, 0, 0)),
        (w - size, 0, Rgb::new(0, 255, 0)),
        (0, h - size, Rgb::new(0, 0, 255)),
        (w - size, h - size, Rgb::new(255, 255, 0)),
    ];
    for (ox, oy, color) in marks {
        for dy in 0..size {
            for dx in 0..size {
                frame.set(ox + dx, oy + dy, color);
            }
        }
    }
    Ok(frame)
}

/// Full-width cross through the canvas center.
pub fn cross(w: u32, h: u32, _counter: u64, params: &PatternParams) -> Result<PixelFrame, PatternError> {
    let color = param_color(params, Rgb::WHITE);
    let mut frame = PixelFrame::black(w, h);
    let (mx, my) = (w / 2, h / 2);
    for x in 0..w {
        frame.set(x, my, color);
    }
    for y in 0..h {
        frame.set(mx, y, color);
    }
    Ok(frame)
}

pub fn checkerboard(w: u32, h: u32, _counter: u64, params: &PatternParams) -> Result<PixelFrame, PatternError> {
    let color = param_color(params, Rgb::WHITE);
    let cell = params.scale.max(1);
    let mut frame = PixelFrame::black(w, h);
    for y in 0..h {
        for x in 0..w {
            if (x / cell + y / cell) % 2 == 0 {
                frame.set(x, y, color);
            }
        }
    }
    Ok(frame)
}

/// Grid lines every `scale` pixels, default pitch matching a 16px panel.
pub fn grid(w: u32, h: u32, _counter: u64, params: &PatternParams) -> Result<PixelFrame, PatternError> {
    let color = param_color(params, Rgb::WHITE);
    let pitch = if params.scale > 1 { params.scale } else { 16 };
    let mut frame = PixelFrame::black(w, h);
    for y in 0..h {
        for x in 0..w {
            if x % pitch == 0 || y % pitch == 0 {
                frame.set(x, y, color);
            }
        }
    }
    Ok(frame)
}

/// Horizontally scrolling hue gradient.
pub fn rainbow(w: u32, h: u32, counter: u64, params: &PatternParams) -> Result<PixelFrame, PatternError> {
    let mut frame = PixelFrame::black(w, h);
    let shift = (counter as f32 * 2.0 * params.speed) as u32;
    for x in 0..w {
        let hue = ((x * 256 / w.max(1)) + shift) as u8;
        let color = wheel(hue);
        for y in 0..h {
            frame.set(x, y, color);
        }
    }
    Ok(frame)
}

/// A water-colored sine wave sweeping across the canvas.
pub fn wave(w: u32, h: u32, counter: u64, params: &PatternParams) -> Result<PixelFrame, PatternError> {
    let mut frame = PixelFrame::black(w, h);
    let t = counter as f32 * 0.15 * params.speed;
    let mid = h as f32 / 2.0;
    let amp = h as f32 / 3.0;
    for x in 0..w {
        let crest = mid + (x as f32 * 0.4 + t).sin() * amp;
        for y in 0..h {
            let d = (y as f32 - crest).abs();
            if d < 2.5 {
                let i = 1.0 - d / 2.5;
                frame.set(x, y, Rgb::new(0, (120.0 * i) as u8, (255.0 * i) as u8));
            }
        }
    }
    Ok(frame)
}

/// Three-oscillator plasma mapped onto the color wheel.
pub fn plasma(w: u32, h: u32, counter: u64, params: &PatternParams) -> Result<PixelFrame, PatternError> {
    let mut frame = PixelFrame::black(w, h);
    let t = counter as f32 * 0.08 * params.speed;
    for y in 0..h {
        for x in 0..w {
            let (fx, fy) = (x as f32, y as f32);
            let v = (fx * 0.25 + t).sin()
                + (fy * 0.25 + t * 0.7).sin()
                + ((fx + fy) * 0.17 + t * 1.3).sin();
            let hue = ((v + 3.0) / 6.0 * 255.0) as u8;
            frame.set(x, y, wheel(hue));
        }
    }
    Ok(frame)
}

/// Single pixel walking the canvas in row-major order. Doubles as a chain
/// continuity check at panel seams.
pub fn dot(w: u32, h: u32, counter: u64, params: &PatternParams) -> Result<PixelFrame, PatternError> {
    let color = param_color(params, Rgb::WHITE);
    let mut frame = PixelFrame::black(w, h);
    let pos = (counter % (w as u64 * h as u64)) as u32;
    frame.set(pos % w, pos / w, color);
    Ok(frame)
}

/// Diagnostic generator that deliberately fails on its third frame, used to
/// exercise the pattern-failure path end to end.
pub fn selftest_fault(w: u32, h: u32, counter: u64, _params: &PatternParams) -> Result<PixelFrame, PatternError> {
    if counter >= 2 {
        return Err(PatternError::Failed(
            "selftest_fault".to_string(),
            "injected fault".to_string(),
        ));
    }
    Ok(PixelFrame::filled(w, h, Rgb::new(255, 0, 0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_generators_match_canvas() {
        let params = PatternParams::default();
        for name in super::super::list_patterns() {
            let gen = super::super::lookup(name).unwrap();
            let frame = gen(32, 16, 5, &params).unwrap();
            assert_eq!(frame.dimensions(), (32, 16), "pattern {}", name);
        }
    }

    #[test]
    fn test_generators_are_pure() {
        let params = PatternParams::default();
        for name in super::super::list_patterns() {
            let gen = super::super::lookup(name).unwrap();
            let a = gen(16, 16, 42, &params).unwrap();
            let b = gen(16, 16, 42, &params).unwrap();
            assert_eq!(a, b, "pattern {} is not deterministic", name);
        }
    }

    #[test]
    fn test_solid_uses_param_color() {
        let params = PatternParams {
            color: Some([10, 20, 30]),
            ..Default::default()
        };
        let frame = solid(4, 4, 0, &params).unwrap();
        assert!(frame.as_slice().iter().all(|&p| p == Rgb::new(10, 20, 30)));
    }

    #[test]
    fn test_corners_markers_land_where_expected() {
        let frame = corners(32, 32, 0, &PatternParams::default()).unwrap();
        assert_eq!(frame.get(0, 0), Rgb::new(255, 0, 0));
        assert_eq!(frame.get(31, 0), Rgb::new(0, 255, 0));
        assert_eq!(frame.get(0, 31), Rgb::new(0, 0, 255));
        assert_eq!(frame.get(31, 31), Rgb::new(255, 255, 0));
        assert_eq!(frame.get(16, 16), Rgb::BLACK);
    }

    #[test]
    fn test_wheel_endpoints() {
        assert_eq!(wheel(0), Rgb::new(255, 0, 0));
        assert_eq!(wheel(85), Rgb::new(0, 255, 0));
        assert_eq!(wheel(170), Rgb::new(0, 0, 255));
    }

    #[test]
    fn test_dot_walks_rows() {
        let params = PatternParams::default();
        let f0 = dot(4, 4, 0, &params).unwrap();
        let f5 = dot(4, 4, 5, &params).unwrap();
        assert_eq!(f0.get(0, 0), Rgb::WHITE);
        assert_eq!(f5.get(1, 1), Rgb::WHITE);
        // wraps around after covering the canvas
        let f16 = dot(4, 4, 16, &params).unwrap();
        assert_eq!(f16.get(0, 0), Rgb::WHITE);
    }
}
