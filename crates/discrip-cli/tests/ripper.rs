//! Scan flow against a scripted drive, a shell stand-in for makemkvcon and
//! a recording transport.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use discrip_cli::Ripper;
use discrip_core::{
    ControlCodes, ControlError, DeviceControl, DiscIdentity, DiscStore, DriveTopics, ItemAttribute,
    OutboundMessage, PublishError, Source, Transport,
};
use discrip_runtime::{
    CommandRunner, DeviceLock, DriveConfig, DriveController, JsonDiscStore, OutboundPublisher,
    PublisherConfig, RunnerConfig,
};
use serde_json::Value;

const SCAN_SCRIPT: &str = r#"
printf 'MSG:1005,0,1,"MakeMKV started","%%1 started","MakeMKV"\n'
printf 'PRGT:5018,0,"Scanning CD-ROM devices"\n'
printf 'PRGC:5018,0,"Scanning CD-ROM devices"\n'
printf 'PRGV:32768,32768,65536\n'
printf 'CINFO:2,0,"Movie Disc"\n'
printf 'TINFO:0,8,0,"12"\n'
printf 'PRGV:65536,65536,65536\n'
"#;

/// Drive that always reports a disc and records every request.
#[derive(Default)]
struct RecordingDrive {
    calls: Mutex<Vec<(u64, i64)>>,
}

impl DeviceControl for RecordingDrive {
    fn device_path(&self) -> &Path {
        Path::new("/dev/sr0")
    }

    fn control(&self, request: u64, arg: i64) -> Result<i32, ControlError> {
        self.calls.lock().unwrap().push((request, arg));
        Ok(ControlCodes::default().status_disc_ok)
    }
}

#[derive(Default, Clone)]
struct RecordingTransport {
    messages: Arc<Mutex<Vec<OutboundMessage>>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn connect(&mut self) -> Result<(), PublishError> {
        Ok(())
    }

    async fn publish(&mut self, message: &OutboundMessage) -> Result<(), PublishError> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct Fixture {
    ripper: Ripper,
    drive: Arc<RecordingDrive>,
    worker: discrip_runtime::PublisherWorker,
    out_dir: PathBuf,
    _dir: tempfile::TempDir,
}

fn fixture(script: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let drive = Arc::new(RecordingDrive::default());
    let lock = DeviceLock::new();

    let controller = DriveController::new(
        Arc::clone(&drive) as _,
        ControlCodes::default(),
        lock.clone(),
        DriveConfig::default(),
    );
    let runner = Arc::new(CommandRunner::with_lock(
        Source::Device("/dev/sr0".into()),
        RunnerConfig::default().with_program("sh", ["-c", script, "makemkvcon"]),
        lock,
    ));
    let (publisher, worker) = OutboundPublisher::new(PublisherConfig::default());
    let topics = DriveTopics::new("djmkv", "shelf", Path::new("/dev/sr0"));
    let store: Arc<dyn DiscStore> = Arc::new(JsonDiscStore::new(&out_dir));

    Fixture {
        ripper: Ripper::new(controller, runner, publisher, topics, store, false),
        drive,
        worker,
        out_dir,
        _dir: dir,
    }
}

fn json(message: &OutboundMessage) -> Value {
    serde_json::from_slice(&message.payload).unwrap()
}

#[tokio::test]
async fn test_process_disc_publishes_and_records() {
    let Fixture {
        ripper,
        drive,
        worker,
        out_dir,
        _dir,
    } = fixture(SCAN_SCRIPT);
    let identity = DiscIdentity {
        disc_id: -7,
        label: "MOVIE_DISC".to_string(),
    };

    let summary = tokio_test::assert_ok!(ripper.process_disc(&identity).await);
    assert_eq!(
        summary.get(ItemAttribute::Name).and_then(|v| v.as_text()),
        Some("Movie Disc")
    );
    assert_eq!(
        summary.titles[0]
            .get(ItemAttribute::ChapterCount)
            .and_then(|v| v.as_integer()),
        Some(12)
    );

    // The door was locked around the scan and unlocked afterwards.
    let lock_door = ControlCodes::default().lock_door;
    assert_eq!(*drive.calls.lock().unwrap(), vec![(lock_door, 1), (lock_door, 0)]);

    // Dropping the ripper closes the queue; the worker then drains it.
    drop(ripper);
    let transport = RecordingTransport::default();
    let stats = worker.run(transport.clone()).await;
    assert_eq!(stats.dropped, 0);

    let messages = transport.messages.lock().unwrap().clone();
    let topics: Vec<&str> = messages.iter().map(|m| m.topic.as_str()).collect();
    assert_eq!(
        topics,
        vec![
            "djmkv/shelf/dev_sr0/progress",
            "djmkv/shelf/dev_sr0/message",
            "djmkv/shelf/dev_sr0/progress",
            "djmkv/shelf/dev_sr0/progress",
            "djmkv/shelf/dev_sr0/progress",
        ]
    );
    assert_eq!(json(&messages[0])["current"]["name"], "Starting");
    assert_eq!(json(&messages[1]), "MakeMKV started");
    assert_eq!(json(&messages[2])["current"]["progress"], 0.5);
    assert_eq!(json(&messages[2])["total"]["name"], "Scanning CD-ROM devices");
    assert_eq!(json(&messages[3])["total"]["progress"], 1.0);
    assert_eq!(json(&messages[4])["current"]["name"], "Complete");

    let record: Value =
        serde_json::from_slice(&std::fs::read(out_dir.join("-7.json")).unwrap()).unwrap();
    assert_eq!(record["Name"], "Movie Disc");
    assert_eq!(record["Disc"]["label"], "MOVIE_DISC");
}

#[tokio::test]
async fn test_failed_tool_still_unlocks_door() {
    let Fixture {
        ripper, drive, ..
    } = fixture("exit 1");

    let summary = ripper.scan_disc().await.unwrap();
    assert!(summary.titles.is_empty());

    let lock_door = ControlCodes::default().lock_door;
    assert_eq!(drive.calls.lock().unwrap().last(), Some(&(lock_door, 0)));
}

#[tokio::test]
async fn test_consecutive_scans_use_fresh_commands() {
    let Fixture { ripper, .. } = fixture(SCAN_SCRIPT);
    ripper.scan_disc().await.unwrap();
    let second = ripper.scan_disc().await.unwrap();
    assert_eq!(second.titles.len(), 1);
}

#[tokio::test]
async fn test_scan_after_cancelled_scan_completes() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("first-run");
    // The first run hangs after its first line; later runs scan normally.
    let script = format!(
        "if [ -e {marker} ]; then {SCAN_SCRIPT}\nelse touch {marker}; printf 'TCOUT:1\\n'; exec sleep 30; fi",
        marker = marker.display(),
    );
    let Fixture { ripper, .. } = fixture(&script);

    let cancelled = tokio::time::timeout(std::time::Duration::from_millis(500), ripper.scan_disc()).await;
    assert!(cancelled.is_err());

    let summary = tokio::time::timeout(std::time::Duration::from_secs(10), ripper.scan_disc())
        .await
        .expect("scan after a cancelled scan never finished")
        .unwrap();
    assert_eq!(
        summary.get(ItemAttribute::Name).and_then(|v| v.as_text()),
        Some("Movie Disc")
    );
}
