//! Capture command construction
//!
//! Output naming and the platform-specific capture program invocation.

use std::fmt;
use std::path::{Path, PathBuf};

/// Desktop platform a capture command is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// Platform this binary was built for, if it has a capture command
    pub fn current() -> Option<Platform> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS name as reported by `std::env::consts::OS`
    pub fn from_os(os: &str) -> Option<Platform> {
        match os {
            "linux" => Some(Platform::Linux),
            "macos" => Some(Platform::MacOs),
            "windows" => Some(Platform::Windows),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
        })
    }
}

/// Capture program settings
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Capture program, looked up on `PATH` unless absolute
    pub program: String,
    pub framerate: u32,
    /// Grab size on Linux
    pub video_size: Option<(u32, u32)>,
    /// X display on Linux; `$DISPLAY` or `:0.0` when unset
    pub display: Option<String>,
    /// Screen device index on macOS
    pub screen: String,
    /// Container extension of the output file
    pub extension: String,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            framerate: 30,
            video_size: None,
            display: None,
            screen: "1".to_string(),
            extension: "mp4".to_string(),
        }
    }
}

/// Program and arguments of one capture process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl CaptureCommand {
    /// Build the capture invocation writing to `output`
    pub fn build(platform: Platform, options: &CaptureOptions, output: &Path) -> Self {
        let mut args: Vec<String> = vec!["-y".to_string()];

        match platform {
            Platform::Linux => {
                let display = options
                    .display
                    .clone()
                    .or_else(|| std::env::var("DISPLAY").ok().filter(|d| !d.is_empty()))
                    .unwrap_or_else(|| ":0.0".to_string());

                args.extend(["-f".to_string(), "x11grab".to_string()]);
                args.extend(["-framerate".to_string(), options.framerate.to_string()]);
                if let Some((width, height)) = options.video_size {
                    args.extend(["-video_size".to_string(), format!("{}x{}", width, height)]);
                }
                args.extend(["-i".to_string(), display]);
            }
            Platform::MacOs => {
                args.extend(["-f".to_string(), "avfoundation".to_string()]);
                args.extend(["-framerate".to_string(), options.framerate.to_string()]);
                args.extend(["-i".to_string(), format!("{}:none", options.screen)]);
            }
            Platform::Windows => {
                args.extend(["-f".to_string(), "gdigrab".to_string()]);
                args.extend(["-framerate".to_string(), options.framerate.to_string()]);
                args.extend(["-i".to_string(), "desktop".to_string()]);
            }
        }

        args.extend(
            ["-c:v", "libx264", "-preset", "ultrafast", "-pix_fmt", "yuv420p"]
                .iter()
                .map(|a| a.to_string()),
        );
        args.push(output.to_string_lossy().to_string());

        Self {
            program: options.program.clone(),
            args,
        }
    }
}

/// Replace every character that is not an ASCII letter or digit with `_`
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// `<dir>/<sanitized-name>-<epoch-ms>.<extension>`
pub fn output_path(dir: &Path, name: &str, epoch_ms: i64, extension: &str) -> PathBuf {
    dir.join(format!("{}-{}.{}", sanitize_name(name), epoch_ms, extension))
}
