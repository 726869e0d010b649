#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("lab.json"),
            serde_json::to_string_pretty(&lab_snapshot()).expect("lab json"),
        )
        .expect("write lab");
        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn session(&self) -> Value {
        let raw = fs::read_to_string(self.path("session.json")).expect("session file");
        serde_json::from_str(&raw).expect("session json")
    }

    /// Runs `fct` with the lab and session flags prepended.
    pub fn run_raw(&self, args: &[&str]) -> (bool, Value) {
        let lab = self.path("lab.json");
        let session = self.path("session.json");
        let output = fct()
            .env_remove("FCT_CONFIG")
            .arg("--quiet")
            .arg("--lab")
            .arg(&lab)
            .arg("--session")
            .arg(&session)
            .args(args)
            .output()
            .expect("command run");
        let body: Value = serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
            panic!(
                "invalid json ({err}): {}\nstderr: {}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            )
        });
        (output.status.success(), body)
    }

    pub fn run(&self, args: &[&str]) -> Value {
        let (ok, body) = self.run_raw(args);
        assert!(ok, "command {args:?} failed: {body}");
        assert_eq!(body["status"], "ok");
        body
    }
}

#[allow(deprecated)]
pub fn fct() -> Command {
    Command::cargo_bin("fct").expect("binary")
}

pub fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write file");
    path
}

fn product_order(key: &str, clinical: bool) -> Value {
    json!({
        "ticket_key": key,
        "product": {
            "name": "Exome Express",
            "read_length": 76,
            "paired_end_read": true
        },
        "clinical": clinical
    })
}

fn certain_tube(barcode: &str, start: &str, event_id: u64, day: u32) -> Value {
    json!({
        "barcode": barcode,
        "created_on": "2024-06-01T08:00:00Z",
        "sample_instances": [{
            "sample_name": format!("SM-{start}"),
            "single_batch": "LCSET-7",
            "workflow_batches": ["LCSET-7"],
            "bucket_entries": [{
                "batch": "LCSET-7",
                "vessel": {"barcode": start, "sample_count": 1},
                "product_order": product_order(&format!("PDO-{start}"), false)
            }],
            "batch_starting_vessels": [{
                "batch": "LCSET-7",
                "vessel": {"barcode": start, "sample_count": 1}
            }]
        }],
        "events": [{
            "id": event_id,
            "event_type": "denature_transfer",
            "event_date": format!("2024-06-{day:02}T09:00:00Z")
        }]
    })
}

/// LCSET-7 holds DEN-1 and DEN-2; DEN-3 could be LCSET-7 or LCSET-8.
pub fn lab_snapshot() -> Value {
    json!({
        "batches": [
            {"name": "LCSET-7", "ticket_url": "https://tickets.example.org/browse/LCSET-7"},
            {"name": "LCSET-8", "ticket_url": "https://tickets.example.org/browse/LCSET-8"}
        ],
        "vessels": [
            certain_tube("DEN-1", "ST-1", 11, 3),
            certain_tube("DEN-2", "ST-2", 12, 4),
            {
                "barcode": "DEN-3",
                "created_on": "2024-06-02T08:00:00Z",
                "sample_instances": [{
                    "sample_name": "SM-3",
                    "workflow_batches": ["LCSET-7", "LCSET-8"],
                    "bucket_entries": [
                        {
                            "batch": "LCSET-7",
                            "vessel": {"barcode": "ST-3", "sample_count": 1},
                            "product_order": product_order("PDO-3", false)
                        },
                        {
                            "batch": "LCSET-8",
                            "vessel": {"barcode": "ST-3", "sample_count": 1},
                            "product_order": product_order("PDO-4", false)
                        }
                    ]
                }],
                "events": [{
                    "id": 13,
                    "event_type": "denature_transfer",
                    "event_date": "2024-06-05T09:00:00Z"
                }]
            }
        ]
    })
}

pub const NOW: &str = "2024-06-10T00:00:00Z";
