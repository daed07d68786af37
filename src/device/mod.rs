//! Device collaborator seam.
//!
//! The orchestration loop only talks to this trait; the adb implementation
//! lives in `adb.rs` and mocks live in the test suites.
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::actions::{SwipeDirection, SwipeDistance};
use crate::errors::DroidClawResult;

pub mod adb;

pub use adb::{list_all_devices, AdbDevice};

#[async_trait]
pub trait Device: Send + Sync {
    async fn get_screen_size(&self) -> DroidClawResult<(u32, u32)>;

    /// Captures a screenshot on the device and pulls it into `save_dir` as
    /// `<prefix>.png`, returning the local path.
    async fn get_screenshot(&self, prefix: &str, save_dir: &Path) -> DroidClawResult<PathBuf>;

    /// Dumps the UI hierarchy and pulls it into `save_dir` as
    /// `<prefix>.xml`, returning the local path.
    async fn get_xml(&self, prefix: &str, save_dir: &Path) -> DroidClawResult<PathBuf>;

    async fn tap(&self, x: i32, y: i32) -> DroidClawResult<()>;

    async fn long_press(&self, x: i32, y: i32) -> DroidClawResult<()>;

    async fn swipe(
        &self,
        x: i32,
        y: i32,
        direction: SwipeDirection,
        distance: SwipeDistance,
        quick: bool,
    ) -> DroidClawResult<()>;

    async fn swipe_precise(
        &self,
        start: (i32, i32),
        end: (i32, i32),
        duration_ms: u32,
    ) -> DroidClawResult<()>;

    async fn input_text(&self, text: &str) -> DroidClawResult<()>;

    async fn back(&self) -> DroidClawResult<()>;
}
