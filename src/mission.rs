//! Search planning: spiral generation plus projection into every frame

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::config::{Config, SearchConfig};
use crate::frames::{Frame, FrameChain};
use crate::geometry::Point2D;
use crate::render::{Overlay, OverlayPath};
use crate::spiral::{plan_spiral, Leg, SpiralParams};

/// A point of interest resolved to pixel coordinates
#[derive(Debug, Clone, Serialize)]
pub struct MappedPoint {
    pub label: String,
    pub pixel: Point2D,
}

/// The same point sequence in all three frames
#[derive(Debug, Clone, Default, Serialize)]
pub struct FramedPoints {
    pub local: Vec<Point2D>,
    pub geographic: Vec<Point2D>,
    pub pixel: Vec<Point2D>,
}

impl FramedPoints {
    fn project(chain: &FrameChain, points: &[Point2D], from: Frame) -> crate::Result<Self> {
        Ok(Self {
            local: chain.map_path(points, from, Frame::Local)?,
            geographic: chain.map_path(points, from, Frame::Geographic)?,
            pixel: chain.map_path(points, from, Frame::Pixel)?,
        })
    }

    pub fn get(&self, frame: Frame) -> &[Point2D] {
        match frame {
            Frame::Local => &self.local,
            Frame::Geographic => &self.geographic,
            Frame::Pixel => &self.pixel,
        }
    }
}

/// One spiral expressed in all three frames
#[derive(Debug, Clone, Serialize)]
pub struct SearchPlan {
    pub label: String,
    /// Frame the spiral was generated in
    pub frame: Frame,
    pub params: SpiralParams,
    pub rings: usize,
    pub legs: Vec<Leg>,
    pub path: FramedPoints,
    pub corners: FramedPoints,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 4]>,
}

impl SearchPlan {
    pub fn waypoints(&self, frame: Frame) -> &[Point2D] {
        self.path.get(frame)
    }
}

/// Every configured search plus the points of interest
#[derive(Debug, Clone, Serialize)]
pub struct MissionPlan {
    pub searches: Vec<SearchPlan>,
    pub points_of_interest: Vec<MappedPoint>,
}

impl MissionPlan {
    pub fn search(&self, label: &str) -> Option<&SearchPlan> {
        self.searches.iter().find(|s| s.label == label)
    }

    pub fn overlay(&self) -> Overlay {
        Overlay {
            paths: self
                .searches
                .iter()
                .map(|s| OverlayPath {
                    points: s.path.pixel.clone(),
                    color: s.color,
                })
                .collect(),
            points_of_interest: self.points_of_interest.iter().map(|p| p.pixel).collect(),
            corners: self
                .searches
                .iter()
                .flat_map(|s| s.corners.pixel.iter().copied())
                .collect(),
        }
    }
}

/// Resolve one search's corners, generate its spiral and map it through the frame chain
pub fn plan_search(search: &SearchConfig, chain: &FrameChain) -> Result<SearchPlan> {
    let params = search.params();
    let region = search
        .region(chain)
        .with_context(|| format!("Failed to map corners into {} frame", search.frame))?;

    let spiral = plan_spiral(&region, &params).context("Failed to generate spiral")?;
    info!(
        "Search '{}' in {} frame: {} rings, {} legs, {} waypoints",
        search.label,
        search.frame,
        spiral.rings,
        spiral.legs.len(),
        spiral.waypoints.len()
    );

    let path = FramedPoints::project(chain, &spiral.waypoints, search.frame)
        .context("Failed to map spiral between frames")?;
    let corners = FramedPoints::project(chain, &region.corners, search.frame)
        .context("Failed to map region corners between frames")?;

    Ok(SearchPlan {
        label: search.label.clone(),
        frame: search.frame,
        params,
        rings: spiral.rings,
        legs: spiral.legs,
        path,
        corners,
        color: search.color,
    })
}

/// Plan every configured search and place the points of interest
pub fn plan_mission(config: &Config, chain: &FrameChain) -> Result<MissionPlan> {
    let searches = config
        .searches
        .iter()
        .map(|search| {
            plan_search(search, chain).with_context(|| format!("Search '{}'", search.label))
        })
        .collect::<Result<Vec<_>>>()?;

    let points_of_interest = config
        .points_of_interest
        .iter()
        .map(|poi| {
            let pixel = chain
                .map(poi.position, poi.frame, Frame::Pixel)
                .with_context(|| format!("Failed to map point of interest '{}'", poi.label))?;
            Ok(MappedPoint {
                label: poi.label.clone(),
                pixel,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(MissionPlan {
        searches,
        points_of_interest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Quadrilateral;

    fn default_plan() -> (Config, FrameChain, MissionPlan) {
        let config = Config::default();
        let chain = config.frame_chain(1024, 1024).unwrap();
        let plan = plan_mission(&config, &chain).unwrap();
        (config, chain, plan)
    }

    #[test]
    fn test_default_plan_covers_search_area() {
        let (config, _, plan) = default_plan();
        let area = plan.search("search-area").unwrap();

        assert_eq!(area.path.local.len(), area.path.geographic.len());
        assert_eq!(area.path.local.len(), area.path.pixel.len());
        assert_eq!(area.path.local[0], config.searches[0].corners[0].position);
        assert_eq!(area.corners.pixel.len(), 4);
        assert_eq!(plan.points_of_interest.len(), 2);

        // The local search quad is not a parallelogram, so the spiral may
        // overhang its lower edge (western longitude) by about a hundred metres
        for p in &area.path.geographic {
            assert!(p.x >= -89.395 && p.x <= -89.335);
            assert!(p.y >= -139.5 && p.y <= -134.5 + 1e-3);
        }
        for p in &area.path.pixel {
            assert!(p.x >= 0.0 && p.x <= 1023.0);
            assert!(p.y >= 0.0 && p.y <= 1023.0);
        }
    }

    #[test]
    fn test_default_plan_includes_pixel_square() {
        let (_, chain, plan) = default_plan();
        assert_eq!(plan.searches.len(), 2);

        let square = plan.search("square1").unwrap();
        assert_eq!(square.frame, Frame::Pixel);
        assert_eq!(square.color, Some([0, 255, 0, 255]));
        assert!(square.rings > 0);

        // Literal pixel corners pass through untouched, geographic ones are projected
        assert_eq!(square.corners.pixel[1], Point2D::new(355.0, 220.0));
        assert_eq!(square.corners.pixel[2], Point2D::new(260.0, 215.0));
        assert_eq!(square.path.pixel[0], square.corners.pixel[0]);
        let g = square.corners.geographic[0];
        assert!(g.distance(Point2D::new(-89.39, -134.5)) < 1e-6);

        // Corners mapped back to the local grid land on the same pixels
        let back = chain
            .map_path(&square.corners.local, Frame::Local, Frame::Pixel)
            .unwrap();
        for (a, b) in back.iter().zip(square.corners.pixel.iter()) {
            assert!(a.distance(*b) < 1e-3);
        }
        assert!(square.path.local.iter().all(|p| p.is_finite()));

        let overlay = plan.overlay();
        assert_eq!(overlay.paths.len(), 2);
        assert_eq!(overlay.paths[1].points.len(), square.path.pixel.len());
        assert_eq!(overlay.paths[0].color, None);
        assert_eq!(overlay.corners.len(), 8);
    }

    #[test]
    fn test_pixel_frame_spiral_maps_back_to_local() {
        let search = SearchConfig::new(
            "box",
            Frame::Pixel,
            40.0,
            Quadrilateral::new([
                Point2D::new(500.0, 300.0),
                Point2D::new(700.0, 300.0),
                Point2D::new(700.0, 500.0),
                Point2D::new(500.0, 500.0),
            ]),
        );
        let chain = Config::default().frame_chain(1024, 1024).unwrap();
        let plan = plan_search(&search, &chain).unwrap();

        assert_eq!(plan.waypoints(Frame::Pixel)[0], Point2D::new(500.0, 300.0));
        let back = chain
            .map_path(plan.waypoints(Frame::Local), Frame::Local, Frame::Pixel)
            .unwrap();
        for (a, b) in back.iter().zip(plan.path.pixel.iter()) {
            assert!(a.distance(*b) < 1e-3);
        }
    }

    #[test]
    fn test_invalid_step_is_reported() {
        let mut config = Config::default();
        config.searches[1].step_size = 0.0;
        let chain = config.frame_chain(1024, 1024).unwrap();

        let err = plan_mission(&config, &chain).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("square1"));
        assert!(message.contains("step_size"));
    }

    #[test]
    fn test_points_of_interest_without_searches() {
        let config = Config {
            searches: Vec::new(),
            ..Default::default()
        };
        let chain = config.frame_chain(1024, 1024).unwrap();
        let plan = plan_mission(&config, &chain).unwrap();

        assert!(plan.searches.is_empty());
        assert_eq!(plan.points_of_interest[0].label, "crater");
        let overlay = plan.overlay();
        assert!(overlay.paths.is_empty());
        assert_eq!(overlay.points_of_interest.len(), 2);
    }
}
