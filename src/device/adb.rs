//! adb-backed device driver.
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::actions::{SwipeDirection, SwipeDistance};
use crate::config::DeviceConfig;
use crate::device::Device;
use crate::errors::{DroidClawError, DroidClawResult};

/// Lists the serials of all devices currently visible to adb.
pub async fn list_all_devices() -> DroidClawResult<Vec<String>> {
    let output = Command::new("adb").arg("devices").output().await?;
    if !output.status.success() {
        return Err(DroidClawError::Device(format!(
            "adb devices failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let devices = stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(serial), Some("device")) => Some(serial.to_string()),
                _ => None,
            }
        })
        .collect();
    Ok(devices)
}

/// Horizontal/vertical swipe offset from the start point. Unit is a tenth
/// of the screen width; vertical swipes travel two units per step so a
/// medium swipe clears roughly half a screen.
pub fn swipe_offset(width: u32, direction: SwipeDirection, distance: SwipeDistance) -> (i32, i32) {
    let unit = (width / 10) as i32;
    let base = match direction {
        SwipeDirection::Up => (0, -2 * unit),
        SwipeDirection::Down => (0, 2 * unit),
        SwipeDirection::Left => (-unit, 0),
        SwipeDirection::Right => (unit, 0),
    };
    let factor = match distance {
        SwipeDistance::Short => 1,
        SwipeDistance::Medium => 2,
        SwipeDistance::Long => 3,
    };
    (base.0 * factor, base.1 * factor)
}

/// Escapes free text for `input text`: spaces become `%s`, single quotes
/// are dropped (they break the shell quoting on the device side).
pub fn escape_input_text(text: &str) -> String {
    text.replace(' ', "%s").replace('\'', "")
}

pub struct AdbDevice {
    serial: String,
    width: u32,
    height: u32,
    screenshot_dir: String,
    xml_dir: String,
}

impl AdbDevice {
    /// Connects to the device and caches its physical screen size.
    pub async fn connect(serial: &str, config: &DeviceConfig) -> DroidClawResult<Self> {
        let mut device = Self {
            serial: serial.to_string(),
            width: 0,
            height: 0,
            screenshot_dir: config.screenshot_dir.clone(),
            xml_dir: config.xml_dir.clone(),
        };
        let (width, height) = device.query_screen_size().await?;
        device.width = width;
        device.height = height;
        tracing::info!(serial, width, height, "device connected");
        Ok(device)
    }

    async fn adb(&self, args: &[&str]) -> DroidClawResult<String> {
        let output = Command::new("adb")
            .args(["-s", &self.serial])
            .args(args)
            .output()
            .await?;
        if !output.status.success() {
            return Err(DroidClawError::Device(format!(
                "adb {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn query_screen_size(&self) -> DroidClawResult<(u32, u32)> {
        // "Physical size: 1080x1920"
        let out = self.adb(&["shell", "wm", "size"]).await?;
        let dims = out
            .rsplit(": ")
            .next()
            .and_then(|s| s.split_once('x'))
            .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)))
            .ok_or_else(|| DroidClawError::Device(format!("unparseable wm size: '{out}'")))?;
        Ok(dims)
    }
}

#[async_trait]
impl Device for AdbDevice {
    async fn get_screen_size(&self) -> DroidClawResult<(u32, u32)> {
        Ok((self.width, self.height))
    }

    async fn get_screenshot(&self, prefix: &str, save_dir: &Path) -> DroidClawResult<PathBuf> {
        let remote = format!("{}/{prefix}.png", self.screenshot_dir);
        let local = save_dir.join(format!("{prefix}.png"));
        self.adb(&["shell", "screencap", "-p", &remote]).await?;
        self.adb(&["pull", &remote, &local.to_string_lossy()])
            .await?;
        Ok(local)
    }

    async fn get_xml(&self, prefix: &str, save_dir: &Path) -> DroidClawResult<PathBuf> {
        let remote = format!("{}/{prefix}.xml", self.xml_dir);
        let local = save_dir.join(format!("{prefix}.xml"));
        self.adb(&["shell", "uiautomator", "dump", &remote]).await?;
        self.adb(&["pull", &remote, &local.to_string_lossy()])
            .await?;
        Ok(local)
    }

    async fn tap(&self, x: i32, y: i32) -> DroidClawResult<()> {
        self.adb(&["shell", "input", "tap", &x.to_string(), &y.to_string()])
            .await?;
        Ok(())
    }

    async fn long_press(&self, x: i32, y: i32) -> DroidClawResult<()> {
        // A 1000 ms swipe to the same point registers as a long press.
        let (xs, ys) = (x.to_string(), y.to_string());
        self.adb(&["shell", "input", "swipe", &xs, &ys, &xs, &ys, "1000"])
            .await?;
        Ok(())
    }

    async fn swipe(
        &self,
        x: i32,
        y: i32,
        direction: SwipeDirection,
        distance: SwipeDistance,
        quick: bool,
    ) -> DroidClawResult<()> {
        let (dx, dy) = swipe_offset(self.width, direction, distance);
        let duration = if quick { 200 } else { 400 };
        self.adb(&[
            "shell",
            "input",
            "swipe",
            &x.to_string(),
            &y.to_string(),
            &(x + dx).to_string(),
            &(y + dy).to_string(),
            &duration.to_string(),
        ])
        .await?;
        Ok(())
    }

    async fn swipe_precise(
        &self,
        start: (i32, i32),
        end: (i32, i32),
        duration_ms: u32,
    ) -> DroidClawResult<()> {
        self.adb(&[
            "shell",
            "input",
            "swipe",
            &start.0.to_string(),
            &start.1.to_string(),
            &end.0.to_string(),
            &end.1.to_string(),
            &duration_ms.to_string(),
        ])
        .await?;
        Ok(())
    }

    async fn input_text(&self, text: &str) -> DroidClawResult<()> {
        let escaped = escape_input_text(text);
        self.adb(&["shell", "input", "text", &escaped]).await?;
        Ok(())
    }

    async fn back(&self) -> DroidClawResult<()> {
        self.adb(&["shell", "input", "keyevent", "KEYCODE_BACK"])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swipe_offsets_scale_with_distance() {
        // width 1000 -> unit 100
        assert_eq!(
            swipe_offset(1000, SwipeDirection::Up, SwipeDistance::Short),
            (0, -200)
        );
        assert_eq!(
            swipe_offset(1000, SwipeDirection::Down, SwipeDistance::Medium),
            (0, 400)
        );
        assert_eq!(
            swipe_offset(1000, SwipeDirection::Left, SwipeDistance::Long),
            (-300, 0)
        );
        assert_eq!(
            swipe_offset(1000, SwipeDirection::Right, SwipeDistance::Short),
            (100, 0)
        );
    }

    #[test]
    fn input_text_escaping() {
        assert_eq!(escape_input_text("hello world"), "hello%sworld");
        assert_eq!(escape_input_text("it's fine"), "its%sfine");
        assert_eq!(escape_input_text("plain"), "plain");
    }
}
