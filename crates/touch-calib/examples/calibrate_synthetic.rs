//! End-to-end calibration against a synthetic scene.
//!
//! Renders four markers into a fake camera frame, runs the detection sweep
//! off-thread, assembles a calibration session with stub collaborators, and
//! prints the resulting record as JSON.

use std::time::Duration;

use nalgebra::{Point2, Point3};
use touch_calib::{
    CalibrationSession, DepthProjector, GrayBuffer, MarkerCanvas, SweepConfig, ViewportMapping,
};
use touch_calib_fiducial::render::{place_marker, render_marker};
use touch_calib_fiducial::{builtins, spawn_detection};

struct FlatSurface;

impl DepthProjector for FlatSurface {
    fn try_map_pixel(&self, color_x: f32, color_y: f32) -> Option<Point3<f64>> {
        Some(Point3::new(
            (color_x as f64 - 320.0) * 0.002,
            (color_y as f64 - 240.0) * 0.002,
            1.4,
        ))
    }
}

struct ProjectorLayout;

impl MarkerCanvas for ProjectorLayout {
    fn marker_count(&self) -> usize {
        4
    }

    fn rendered_marker_center(&self, index: usize) -> Point2<f32> {
        [
            Point2::new(240.0, 180.0),
            Point2::new(1680.0, 180.0),
            Point2::new(1680.0, 900.0),
            Point2::new(240.0, 900.0),
        ][index]
    }
}

fn main() {
    env_logger::init();

    let dict = builtins::builtin_dictionary("ARUCO_4X4_50").expect("builtin dict");
    let mut camera = GrayBuffer::filled(640, 480, 255);
    for (id, (x, y)) in [(70, 60), (480, 60), (480, 330), (70, 330)].iter().enumerate() {
        let marker = render_marker(&dict, id, 12).expect("render");
        place_marker(&mut camera, &marker, *x, *y);
    }

    let mut handle = spawn_detection(camera, SweepConfig::default());
    let report = loop {
        if let Some(report) = handle.try_result() {
            break report;
        }
        std::thread::sleep(Duration::from_millis(20));
    };
    println!(
        "detection: success={} markers={} strategy={:?} in {:.0}ms",
        report.success,
        report.markers.len(),
        report.strategy,
        report.elapsed.as_secs_f64() * 1000.0
    );

    let mapper = FlatSurface;
    let viewport = ViewportMapping::new(800.0, 600.0, 640, 480);
    let mut session = CalibrationSession::new();
    session
        .capture_plane_point(0, &mapper, Point2::new(120.0, 110.0))
        .expect("plane point");
    session
        .capture_plane_point(1, &mapper, Point2::new(520.0, 130.0))
        .expect("plane point");
    session
        .capture_plane_point(2, &mapper, Point2::new(320.0, 400.0))
        .expect("plane point");
    session
        .capture_corners(
            &mapper,
            &viewport,
            [
                Point2::new(40.0, 40.0),
                Point2::new(600.0, 40.0),
                Point2::new(600.0, 440.0),
                Point2::new(40.0, 440.0),
            ],
        )
        .expect("corners");
    session.set_detection(report);
    session
        .capture_projector_centers(&ProjectorLayout)
        .expect("projector centers");

    let state = session.finish().expect("calibration");
    println!(
        "{}",
        serde_json::to_string_pretty(&state).expect("serialize")
    );
}
