//! 标量到颜色的映射，以及由二维数组生成图像。

use image::{Rgb, RgbImage};
use ndarray::ArrayView2;

pub mod rgb {
    use image::Rgb;

    #[inline]
    pub fn black() -> Rgb<u8> {
        Rgb::from([0x00, 0x00, 0x00])
    }

    #[inline]
    pub fn white() -> Rgb<u8> {
        Rgb::from([0xFF, 0xFF, 0xFF])
    }

    #[inline]
    pub fn red() -> Rgb<u8> {
        Rgb::from([0xFF, 0x00, 0x00])
    }

    #[inline]
    pub fn blue() -> Rgb<u8> {
        Rgb::from([0x00, 0x00, 0xFF])
    }
}

#[inline]
fn channel(x: f64) -> u8 {
    (x * 255.0).round().clamp(0.0, 255.0) as u8
}

/// 蓝-白-红发散色图，`value`被截断到`[-limit, limit]`。NaN 映射为白色。
pub fn diverging(value: f64, limit: f64) -> Rgb<u8> {
    if value.is_nan() || limit <= 0.0 {
        return rgb::white();
    }
    let s = (value / limit).clamp(-1.0, 1.0);
    if s >= 0.0 {
        let c = channel(1.0 - s);
        Rgb::from([0xFF, c, c])
    } else {
        let c = channel(1.0 + s);
        Rgb::from([c, c, 0xFF])
    }
}

/// 白-红色图，`value`按`[0, max]`归一化。
pub fn white_red(value: f64, max: f64) -> Rgb<u8> {
    if value.is_nan() || max <= 0.0 {
        return rgb::white();
    }
    let c = channel(1.0 - (value / max).clamp(0.0, 1.0));
    Rgb::from([0xFF, c, c])
}

/// 灰度图，`value`按`[min, max]`线性归一化。NaN 或区间退化时为黑色。
pub fn gray(value: f64, min: f64, max: f64) -> Rgb<u8> {
    if value.is_nan() || !(max > min) {
        return rgb::black();
    }
    let c = channel((value - min) / (max - min));
    Rgb::from([c, c, c])
}

/// 黑-红-黄-白的热度色图，`value`按`[0, max]`归一化。
pub fn hot(value: f64, max: f64) -> Rgb<u8> {
    if value.is_nan() || max <= 0.0 {
        return rgb::black();
    }
    let s = (value / max).clamp(0.0, 1.0);
    Rgb::from([
        channel(s / 0.375),
        channel((s - 0.375) / 0.375),
        channel((s - 0.75) / 0.25),
    ])
}

/// 二值图：真为白色，假为黑色。
#[inline]
pub fn binary(value: bool) -> Rgb<u8> {
    if value {
        rgb::white()
    } else {
        rgb::black()
    }
}

/// 把二维数组渲染成图像：第0轴为行（高），第1轴为列（宽）。
pub fn render<A, F>(data: ArrayView2<'_, A>, color: F) -> RgbImage
where
    A: Copy,
    F: Fn(A) -> Rgb<u8>,
{
    let (h, w) = data.dim();
    RgbImage::from_fn(w as u32, h as u32, |x, y| color(data[[y as usize, x as usize]]))
}

/// 将若干面板以`gap`像素的白色间隔横向拼接，高度不足的面板顶端对齐。
pub fn hstack(panels: &[RgbImage], gap: u32) -> RgbImage {
    let height = panels.iter().map(|p| p.height()).max().unwrap_or(0);
    let width = panels.iter().map(|p| p.width()).sum::<u32>()
        + gap * panels.len().saturating_sub(1) as u32;
    let mut canvas = RgbImage::from_pixel(width, height, rgb::white());
    let mut x = 0i64;
    for p in panels {
        image::imageops::replace(&mut canvas, p, x, 0);
        x += (p.width() + gap) as i64;
    }
    canvas
}

/// 将若干图像以`gap`像素的白色间隔纵向拼接，宽度不足的图像左端对齐。
pub fn vstack(rows: &[RgbImage], gap: u32) -> RgbImage {
    let width = rows.iter().map(|r| r.width()).max().unwrap_or(0);
    let height =
        rows.iter().map(|r| r.height()).sum::<u32>() + gap * rows.len().saturating_sub(1) as u32;
    let mut canvas = RgbImage::from_pixel(width, height, rgb::white());
    let mut y = 0i64;
    for r in rows {
        image::imageops::replace(&mut canvas, r, 0, y);
        y += (r.height() + gap) as i64;
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_diverging_endpoints() {
        assert_eq!(diverging(0.0, 5.0), rgb::white());
        assert_eq!(diverging(5.0, 5.0), rgb::red());
        assert_eq!(diverging(100.0, 5.0), rgb::red());
        assert_eq!(diverging(-7.0, 5.0), rgb::blue());
        assert_eq!(diverging(f64::NAN, 5.0), rgb::white());
        assert_eq!(diverging(2.5, 5.0), Rgb::from([0xFF, 128, 128]));
    }

    #[test]
    fn test_white_red() {
        assert_eq!(white_red(0.0, 2.0), rgb::white());
        assert_eq!(white_red(2.0, 2.0), rgb::red());
        assert_eq!(white_red(1.0, 0.0), rgb::white());
    }

    #[test]
    fn test_render_orientation_and_hstack() {
        let a = array![[true, false, false], [false, false, true]];
        let img = render(a.view(), binary);
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(*img.get_pixel(0, 0), rgb::white());
        assert_eq!(*img.get_pixel(2, 1), rgb::white());
        assert_eq!(*img.get_pixel(1, 0), rgb::black());

        let wide = hstack(&[img.clone(), img], 4);
        assert_eq!(wide.dimensions(), (10, 2));
        assert_eq!(*wide.get_pixel(7, 0), rgb::white());
        assert_eq!(*wide.get_pixel(4, 0), rgb::white());
        assert_eq!(*wide.get_pixel(8, 0), rgb::black());

        let tall = vstack(&[wide, render(a.view(), binary)], 1);
        assert_eq!(tall.dimensions(), (10, 5));
        assert_eq!(*tall.get_pixel(0, 3), rgb::white());
        assert_eq!(*tall.get_pixel(1, 3), rgb::black());
        // 较窄的一行右侧和行间隔都是白色
        assert_eq!(*tall.get_pixel(9, 4), rgb::white());
        assert_eq!(*tall.get_pixel(1, 2), rgb::white());
    }

    #[test]
    fn test_gray_and_hot() {
        assert_eq!(gray(0.0, 0.0, 100.0), rgb::black());
        assert_eq!(gray(100.0, 0.0, 100.0), rgb::white());
        assert_eq!(gray(5.0, 5.0, 5.0), rgb::black());
        assert_eq!(gray(f64::NAN, 0.0, 1.0), rgb::black());

        assert_eq!(hot(0.0, 1.0), rgb::black());
        assert_eq!(hot(1.0, 1.0), rgb::white());
        assert_eq!(hot(0.375, 1.0), rgb::red());
        assert_eq!(hot(0.75, 1.0), Rgb::from([0xFF, 0xFF, 0x00]));
        assert_eq!(hot(1.0, 0.0), rgb::black());
    }
}
