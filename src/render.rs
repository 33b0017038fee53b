//! Overlay rendering of planned paths on the reference image

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use std::path::Path;
use tracing::{debug, info};

use crate::config::RenderConfig;
use crate::geometry::Point2D;

/// Marker appearance for a scatter layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    pub color: [u8; 4],
    pub radius: i32,
}

/// Anything that can draw 2D point sets in pixel coordinates
pub trait PlotSurface {
    fn scatter(&mut self, points: &[Point2D], style: MarkerStyle);
    fn polyline(&mut self, points: &[Point2D], color: [u8; 4]);
}

/// An RGBA raster to draw overlays on
pub struct ImageCanvas {
    image: RgbaImage,
}

impl ImageCanvas {
    /// Opaque black canvas
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])),
        }
    }

    /// Load a reference image from disk
    pub fn open(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Failed to open reference image {:?}", path))?
            .to_rgba8();
        info!("Loaded reference image {:?} ({}x{})", path, image.width(), image.height());
        Ok(Self { image })
    }

    /// Use the configured reference image, or a blank canvas when none is set
    pub fn from_config(config: &RenderConfig) -> Result<Self> {
        match &config.image {
            Some(path) => Self::open(path),
            None => Ok(Self::blank(config.width, config.height)),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
        }
        self.image
            .save(path)
            .with_context(|| format!("Failed to write overlay to {:?}", path))?;
        info!("Saved overlay to {:?}", path);
        Ok(())
    }
}

impl PlotSurface for ImageCanvas {
    fn scatter(&mut self, points: &[Point2D], style: MarkerStyle) {
        let color = Rgba(style.color);
        let (w, h) = self.image.dimensions();
        for p in points.iter().filter(|p| p.is_finite()) {
            let (x, y) = (p.x.round() as i32, p.y.round() as i32);
            if style.radius > 0 {
                draw_filled_circle_mut(&mut self.image, (x, y), style.radius, color);
            } else if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
                self.image.put_pixel(x as u32, y as u32, color);
            }
        }
    }

    fn polyline(&mut self, points: &[Point2D], color: [u8; 4]) {
        let color = Rgba(color);
        for pair in points.windows(2) {
            if !(pair[0].is_finite() && pair[1].is_finite()) {
                continue;
            }
            draw_line_segment_mut(
                &mut self.image,
                (pair[0].x as f32, pair[0].y as f32),
                (pair[1].x as f32, pair[1].y as f32),
                color,
            );
        }
    }
}

/// One spiral in pixel coordinates
#[derive(Debug, Clone, Default)]
pub struct OverlayPath {
    pub points: Vec<Point2D>,
    /// Falls back to `RenderConfig::path_color`
    pub color: Option<[u8; 4]>,
}

/// Everything drawn on one overlay, already in pixel coordinates
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    pub paths: Vec<OverlayPath>,
    pub points_of_interest: Vec<Point2D>,
    pub corners: Vec<Point2D>,
}

/// Draw every path, then region corners, then points of interest
pub fn draw_overlay<S: PlotSurface>(surface: &mut S, overlay: &Overlay, config: &RenderConfig) {
    for path in &overlay.paths {
        let color = path.color.unwrap_or(config.path_color);
        if config.draw_lines {
            surface.polyline(&path.points, color);
        }
        surface.scatter(
            &path.points,
            MarkerStyle {
                color,
                radius: config.marker_radius,
            },
        );
    }
    surface.scatter(
        &overlay.corners,
        MarkerStyle {
            color: config.corner_color,
            radius: config.marker_radius + 1,
        },
    );
    surface.scatter(
        &overlay.points_of_interest,
        MarkerStyle {
            color: config.poi_color,
            radius: config.marker_radius + 1,
        },
    );
    debug!(
        paths = overlay.paths.len(),
        waypoints = overlay.paths.iter().map(|p| p.points.len()).sum::<usize>(),
        corners = overlay.corners.len(),
        pois = overlay.points_of_interest.len(),
        "Drew overlay"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(&'static str, usize, [u8; 4])>,
    }

    impl PlotSurface for Recorder {
        fn scatter(&mut self, points: &[Point2D], style: MarkerStyle) {
            self.calls.push(("scatter", points.len(), style.color));
        }

        fn polyline(&mut self, points: &[Point2D], color: [u8; 4]) {
            self.calls.push(("polyline", points.len(), color));
        }
    }

    #[test]
    fn test_scatter_marks_pixels() {
        let mut canvas = ImageCanvas::blank(20, 20);
        let style = MarkerStyle {
            color: [255, 0, 0, 255],
            radius: 0,
        };
        canvas.scatter(
            &[Point2D::new(5.0, 7.0), Point2D::new(-3.0, 2.0), Point2D::new(f64::NAN, 1.0)],
            style,
        );

        assert_eq!(canvas.image().get_pixel(5, 7), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.image().get_pixel(0, 2), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_circle_markers_and_lines() {
        let mut canvas = ImageCanvas::blank(50, 50);
        canvas.scatter(
            &[Point2D::new(25.0, 25.0)],
            MarkerStyle {
                color: [0, 255, 0, 255],
                radius: 3,
            },
        );
        assert_eq!(canvas.image().get_pixel(27, 25), &Rgba([0, 255, 0, 255]));

        canvas.polyline(
            &[Point2D::new(0.0, 10.0), Point2D::new(49.0, 10.0)],
            [0, 0, 255, 255],
        );
        assert_eq!(canvas.image().get_pixel(40, 10), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_overlay_layer_order() {
        let config = RenderConfig {
            draw_lines: true,
            ..Default::default()
        };
        let green = [0, 255, 0, 255];
        let overlay = Overlay {
            paths: vec![
                OverlayPath {
                    points: vec![Point2D::new(1.0, 1.0); 5],
                    color: None,
                },
                OverlayPath {
                    points: vec![Point2D::new(4.0, 4.0); 3],
                    color: Some(green),
                },
            ],
            points_of_interest: vec![Point2D::new(2.0, 2.0); 2],
            corners: vec![Point2D::new(3.0, 3.0); 8],
        };
        let mut recorder = Recorder::default();
        draw_overlay(&mut recorder, &overlay, &config);

        assert_eq!(
            recorder.calls,
            vec![
                ("polyline", 5, config.path_color),
                ("scatter", 5, config.path_color),
                ("polyline", 3, green),
                ("scatter", 3, green),
                ("scatter", 8, config.corner_color),
                ("scatter", 2, config.poi_color),
            ]
        );
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = std::env::temp_dir().join(format!("spiralplan-render-{}", std::process::id()));
        let path = dir.join("overlay.png");

        let mut canvas = ImageCanvas::blank(8, 6);
        canvas.scatter(
            &[Point2D::new(1.0, 1.0)],
            MarkerStyle {
                color: [10, 20, 30, 255],
                radius: 0,
            },
        );
        canvas.save(&path).unwrap();

        let reopened = ImageCanvas::open(&path).unwrap();
        assert_eq!(reopened.dimensions(), (8, 6));
        assert_eq!(reopened.image().get_pixel(1, 1), &Rgba([10, 20, 30, 255]));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
