pub mod camera_model;
pub mod config;
pub mod correspondence;
pub mod data_loader;
pub mod error;
pub mod features;
pub mod geometry;
pub mod io;
pub mod odometry;
pub mod pose_estimator;
pub mod trajectory;
pub mod visualization;

pub use config::OdometryConfig;
pub use error::{OdometryError, Result};
pub use odometry::{FrameReport, FrameState, VisualOdometry};
