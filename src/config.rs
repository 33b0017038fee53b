//! Configuration management for spiral search planning
//!
//! The defaults reproduce the lunar south-pole survey the tool was first
//! written for. None of these literals leak into the planning core; they only
//! reach it through [`Config::frame_chain`] and [`SearchConfig::region`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::frames::{Frame, FrameChain};
use crate::geometry::{Point2D, Quadrilateral};
use crate::spiral::{SpiralParams, DEFAULT_STEP_SIZE, DEFAULT_THRESHOLD};

/// Shorthand for writing corner literals
fn quad(points: [[f64; 2]; 4]) -> Quadrilateral {
    Quadrilateral::new(points.map(Point2D::from))
}

/// One corner of a search region
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CornerConfig {
    /// Frame of `position`; the search's own frame when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<Frame>,
    pub position: Point2D,
}

impl CornerConfig {
    /// A corner given in the search's own frame
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            frame: None,
            position: Point2D::new(x, y),
        }
    }

    pub fn in_frame(frame: Frame, x: f64, y: f64) -> Self {
        Self {
            frame: Some(frame),
            position: Point2D::new(x, y),
        }
    }
}

/// A region to cover and how densely
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub label: String,
    /// Frame the spiral is generated in
    pub frame: Frame,
    pub step_size: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Marker colour; `render.path_color` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 4]>,
    /// Order: first corner is where the spiral starts, the next two fix
    /// its first and second leg directions
    pub corners: [CornerConfig; 4],
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl SearchConfig {
    /// A search whose corners are all given in its own frame
    pub fn new(label: &str, frame: Frame, step_size: f64, corners: Quadrilateral) -> Self {
        Self {
            label: label.to_string(),
            frame,
            step_size,
            threshold: DEFAULT_THRESHOLD,
            color: None,
            corners: corners.corners.map(|p| CornerConfig::at(p.x, p.y)),
        }
    }

    pub fn params(&self) -> SpiralParams {
        SpiralParams::new(self.step_size, self.threshold)
    }

    /// Corners mapped into the search frame
    pub fn region(&self, chain: &FrameChain) -> crate::Result<Quadrilateral> {
        let mut corners = [Point2D::default(); 4];
        for (out, corner) in corners.iter_mut().zip(self.corners.iter()) {
            *out = chain.map(corner.position, corner.frame.unwrap_or(self.frame), self.frame)?;
        }
        Ok(Quadrilateral::new(corners))
    }
}

fn default_searches() -> Vec<SearchConfig> {
    let square1 = SearchConfig {
        label: "square1".to_string(),
        frame: Frame::Pixel,
        step_size: DEFAULT_STEP_SIZE,
        threshold: DEFAULT_THRESHOLD,
        color: Some([0, 255, 0, 255]),
        corners: [
            CornerConfig::in_frame(Frame::Geographic, -89.39, -134.5),
            CornerConfig::at(355.0, 220.0),
            CornerConfig::at(260.0, 215.0),
            CornerConfig::in_frame(Frame::Geographic, -89.38819, -135.741814),
        ],
    };
    vec![
        SearchConfig::new("search-area", Frame::Local, 100.0, default_local_search()),
        square1,
    ]
}

/// The search area in local metres, order TL, TR, BR, BL
fn default_local_search() -> Quadrilateral {
    quad([
        [-317.154, 735.680],
        [1199.211, 795.979],
        [1199.962, -776.878],
        [-316.460, -718.026],
    ])
}

/// The same four points as latitude/longitude
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalGeoCalibration {
    pub local: Quadrilateral,
    pub geographic: Quadrilateral,
}

impl Default for LocalGeoCalibration {
    fn default() -> Self {
        Self {
            local: default_local_search(),
            geographic: quad([
                [-89.39, -134.5],
                [-89.34, -134.5],
                [-89.34, -139.0],
                [-89.39, -139.0],
            ]),
        }
    }
}

/// Geographic position of the reference image corners
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPixelCalibration {
    /// Order: top-left, top-right, bottom-right, bottom-left
    pub geographic: Quadrilateral,

    /// Matching pixel corners. Derived from the image size when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel: Option<Quadrilateral>,
}

impl Default for GeoPixelCalibration {
    fn default() -> Self {
        Self {
            geographic: quad([
                [-89.33843, -139.69528],
                [-89.33738, -133.78184],
                [-89.40591, -133.34033],
                [-89.40708, -139.93771],
            ]),
            pixel: None,
        }
    }
}

impl GeoPixelCalibration {
    /// Pixel corners, falling back to the outermost pixel centres of the image
    pub fn pixel_corners(&self, width: u32, height: u32) -> Quadrilateral {
        self.pixel.unwrap_or_else(|| {
            let right = width.saturating_sub(1) as f64;
            let bottom = height.saturating_sub(1) as f64;
            quad([
                [0.0, 0.0],       // Top-left
                [right, 0.0],     // Top-right
                [right, bottom],  // Bottom-right
                [0.0, bottom],    // Bottom-left
            ])
        })
    }
}

/// Reference points used to anchor the frame transforms
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationConfig {
    #[serde(default)]
    pub local_geo: LocalGeoCalibration,

    #[serde(default)]
    pub geo_pixel: GeoPixelCalibration,
}

/// A labelled location drawn on top of the overlay
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointOfInterest {
    pub label: String,
    pub frame: Frame,
    pub position: Point2D,
}

impl PointOfInterest {
    pub fn new(label: &str, frame: Frame, x: f64, y: f64) -> Self {
        Self {
            label: label.to_string(),
            frame,
            position: Point2D::new(x, y),
        }
    }
}

fn default_points_of_interest() -> Vec<PointOfInterest> {
    vec![
        PointOfInterest::new("crater", Frame::Geographic, -89.36867, -136.51529),
        PointOfInterest::new("spawn", Frame::Geographic, -89.405715, -134.533586),
    ]
}

/// Overlay output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Reference image; a blank canvas of `width` x `height` is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Marker radius in pixels
    pub marker_radius: i32,
    /// Connect consecutive waypoints with line segments
    #[serde(default)]
    pub draw_lines: bool,
    /// RGBA colours
    pub path_color: [u8; 4],
    pub poi_color: [u8; 4],
    pub corner_color: [u8; 4],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            image: None,
            output: PathBuf::from("search_overlay.png"),
            width: 1024,
            height: 1024,
            marker_radius: 1,
            draw_lines: false,
            path_color: [31, 119, 180, 255],
            poi_color: [255, 0, 0, 255],
            corner_color: [0, 255, 0, 255],
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_searches")]
    pub searches: Vec<SearchConfig>,

    #[serde(default)]
    pub calibration: CalibrationConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default = "default_points_of_interest")]
    pub points_of_interest: Vec<PointOfInterest>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            searches: default_searches(),
            calibration: CalibrationConfig::default(),
            render: RenderConfig::default(),
            points_of_interest: default_points_of_interest(),
        }
    }
}

impl Config {
    /// Load configuration from a file, or create default if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let config = Self::load(path)?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Build the local <-> geographic <-> pixel chain for an image of the given size
    pub fn frame_chain(&self, width: u32, height: u32) -> Result<FrameChain> {
        let cal = &self.calibration;
        let pixel = cal.geo_pixel.pixel_corners(width, height);
        FrameChain::new(
            &cal.local_geo.local,
            &cal.local_geo.geographic,
            &cal.geo_pixel.geographic,
            &pixel,
        )
        .context("Calibration points do not define a valid frame chain")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("spiralplan-{}-{}", name, std::process::id()))
            .join("spiralplan.toml")
    }

    #[test]
    fn test_default_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();

        assert_eq!(parsed.searches.len(), 2);
        assert_eq!(parsed.searches[0].frame, Frame::Local);
        assert_eq!(parsed.searches[0].corners, config.searches[0].corners);
        assert_eq!(parsed.searches[1].corners, config.searches[1].corners);
        assert_eq!(parsed.searches[1].color, Some([0, 255, 0, 255]));
        assert_eq!(parsed.points_of_interest, config.points_of_interest);
        assert!(parsed.calibration.geo_pixel.pixel.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let text = r#"
            [[searches]]
            label = "west"
            frame = "pixel"
            step_size = 40.0
            corners = [
                { position = [10.0, 10.0] },
                { position = [200.0, 10.0] },
                { frame = "geographic", position = [-89.36, -136.5] },
                { position = [10.0, 200.0] },
            ]
        "#;
        let config: Config = toml::from_str(text).unwrap();

        assert_eq!(config.searches.len(), 1);
        let search = &config.searches[0];
        assert_eq!(search.frame, Frame::Pixel);
        assert_eq!(search.threshold, DEFAULT_THRESHOLD);
        assert_eq!(search.color, None);
        assert_eq!(search.corners[1], CornerConfig::at(200.0, 10.0));
        assert_eq!(search.corners[2].frame, Some(Frame::Geographic));
        assert_eq!(config.render.width, 1024);
        assert_eq!(config.points_of_interest.len(), 2);
    }

    #[test]
    fn test_default_searches() {
        let searches = default_searches();
        assert_eq!(searches[0].label, "search-area");
        assert_eq!(searches[0].step_size, 100.0);
        assert_eq!(searches[0].threshold, DEFAULT_THRESHOLD);
        assert_eq!(searches[0].corners[0], CornerConfig::at(-317.154, 735.680));

        assert_eq!(searches[1].label, "square1");
        assert_eq!(searches[1].frame, Frame::Pixel);
        assert_eq!(searches[1].params(), SpiralParams::default());
    }

    #[test]
    fn test_region_maps_mixed_frame_corners() {
        let config = Config::default();
        let chain = config.frame_chain(1024, 1024).unwrap();
        let square1 = &config.searches[1];
        let region = square1.region(&chain).unwrap();

        assert_eq!(region.corners[1], Point2D::new(355.0, 220.0));
        assert_eq!(region.corners[2], Point2D::new(260.0, 215.0));
        let expected = chain
            .map(Point2D::new(-89.39, -134.5), Frame::Geographic, Frame::Pixel)
            .unwrap();
        assert_eq!(region.corners[0], expected);
    }

    #[test]
    fn test_pixel_corners_from_image_size() {
        let cal = GeoPixelCalibration::default();
        let corners = cal.pixel_corners(640, 480);
        assert_eq!(corners.corners[0], Point2D::new(0.0, 0.0));
        assert_eq!(corners.corners[1], Point2D::new(639.0, 0.0));
        assert_eq!(corners.corners[2], Point2D::new(639.0, 479.0));
        assert_eq!(corners.corners[3], Point2D::new(0.0, 479.0));

        let explicit = GeoPixelCalibration {
            pixel: Some(quad([[1.0, 1.0], [9.0, 1.0], [9.0, 9.0], [1.0, 9.0]])),
            ..Default::default()
        };
        assert_eq!(explicit.pixel_corners(640, 480).corners[2], Point2D::new(9.0, 9.0));
    }

    #[test]
    fn test_default_chain_places_crater_on_image() {
        let config = Config::default();
        let chain = config.frame_chain(1024, 1024).unwrap();

        let crater = &config.points_of_interest[0];
        let px = chain.map(crater.position, crater.frame, Frame::Pixel).unwrap();
        assert!(px.x > 0.0 && px.x < 1023.0);
        assert!(px.y > 0.0 && px.y < 1023.0);
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let path = temp_path("create");
        let _ = std::fs::remove_file(&path);

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());

        let loaded = Config::load_or_create(&path).unwrap();
        assert_eq!(loaded.searches[1].corners, created.searches[1].corners);
        assert_eq!(loaded.render.output, created.render.output);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let path = temp_path("invalid");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[[searches]]\nframe = \"ecef\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{}", err).contains("Failed to parse config"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
