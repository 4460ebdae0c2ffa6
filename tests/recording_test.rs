//! Recording lifecycle against real child processes
//!
//! A small shell script stands in for the capture program: it prints ffmpeg-style
//! progress lines and exits when interrupted.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use stepwright::recording::{CaptureOptions, Platform, RecordingManager, RecordingOptions, RecordingState};

const RECORDER: &str = "#!/bin/sh
trap 'exit 255' INT
while :; do
  echo \"frame=   30 fps= 30 q=-1.0 size=     256kB time=00:00:01.00\" >&2
  sleep 0.1
done
";

const CRASHER: &str = "#!/bin/sh
echo \"x11grab: cannot open display\" >&2
exit 1
";

fn write_program(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn options(output_dir: &Path, program: &Path) -> RecordingOptions {
    RecordingOptions {
        output_dir: output_dir.to_path_buf(),
        grace_period: Duration::from_secs(3),
        platform: Some(Platform::Linux),
        capture: CaptureOptions {
            program: program.to_string_lossy().to_string(),
            display: Some(":99".to_string()),
            ..Default::default()
        },
    }
}

async fn wait_for_state(recordings: &RecordingManager, name: &str, state: RecordingState) -> bool {
    for _ in 0..100 {
        if recordings.state(name) == state {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

// Everything that spawns lives in one test so no other thread forks while the
// scripts are still open for writing.
#[tokio::test]
async fn test_recording_lifecycle_with_real_processes() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = write_program(dir.path(), "recorder.sh", RECORDER);
    let crasher = write_program(dir.path(), "crasher.sh", CRASHER);
    let output_dir = dir.path().join("recordings");

    // Interrupted by stop
    let recordings = RecordingManager::with_ffmpeg(options(&output_dir, &recorder));
    recordings.start("Checkout Flow").await;
    assert!(recordings.is_recording("Checkout Flow"));

    let path = recordings.get_output_path("Checkout Flow").unwrap();
    assert!(path.starts_with(&output_dir));
    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("Checkout_Flow-"));

    tokio::time::sleep(Duration::from_millis(300)).await;
    let started = std::time::Instant::now();
    recordings.stop("Checkout Flow").await;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(recordings.state("Checkout Flow"), RecordingState::Stopped);
    assert_eq!(recordings.get_output_path("Checkout Flow"), Some(path));

    // Exits on its own
    let failing = RecordingManager::with_ffmpeg(options(&output_dir, &crasher));
    failing.start("Broken Display").await;
    assert!(failing.get_output_path("Broken Display").is_some());
    assert!(wait_for_state(&failing, "Broken Display", RecordingState::Stopped).await);
    assert_eq!(failing.active_count(), 0);

    // Missing program
    let missing = RecordingManager::with_ffmpeg(options(&output_dir, &dir.path().join("no-such-ffmpeg")));
    missing.start("Nothing").await;
    assert_eq!(missing.state("Nothing"), RecordingState::Idle);
    assert_eq!(missing.get_output_path("Nothing"), None);
}
