// Package builder against a local release server.
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use axum::Router;
use axum::extract::Path as UrlPath;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use binshim::config::ShimConfig;
use binshim::pack::PackageBuilder;
use binshim::platform::{ArchiveFormat, PLATFORMS, PlatformTarget};
use serde_json::Value;

const ROOT_MANIFEST: &str = r#"{
  "name": "tool",
  "version": "0.0.0",
  "bin": { "tool": "bin/binshim" },
  "optionalDependencies": {
    "@tool/tool-linux-x64": "0.0.0",
    "@tool/tool-darwin-arm64": "0.0.0"
  }
}
"#;

fn tar_gz(entries: &[(&str, &str)]) -> Vec<u8> {
    let gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(gz);
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, data.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

fn zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, zip::write::SimpleFileOptions::default()).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Archive for `target`, rotating through the layouts seen upstream.
fn release_archive(cfg: &ShimConfig, version: &str, index: usize, target: &PlatformTarget) -> (String, Vec<u8>) {
    let name = cfg.archive_file_name(version, target);
    let binary = target.binary_file_name(&cfg.binary);
    let path = match index % 3 {
        0 => format!("tool-{version}/{binary}"),
        1 => binary.clone(),
        _ => format!("dist/{}/{binary}", target.archive_suffix),
    };
    let entries = [(path.as_str(), "payload"), ("LICENSE", "MIT")];
    let bytes = match target.archive_format() {
        ArchiveFormat::TarGz => tar_gz(&entries),
        ArchiveFormat::Zip => zip(&entries),
    };
    (name, bytes)
}

async fn serve(files: HashMap<String, Vec<u8>>) -> String {
    let files = Arc::new(files);
    let app = Router::new().route(
        "/{name}",
        get(move |UrlPath(name): UrlPath<String>| {
            let files = files.clone();
            async move {
                match files.get(&name) {
                    Some(bytes) => (StatusCode::OK, bytes.clone()).into_response(),
                    None => StatusCode::NOT_FOUND.into_response(),
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(root: &Path, base_url: &str) -> ShimConfig {
    ShimConfig {
        out_dir: root.join("npm"),
        cache_dir: Some(root.join("cache")),
        root_manifest: root.join("package.json"),
        release_url: format!("{base_url}/{{archive}}"),
        ..ShimConfig::default()
    }
}

fn bin_entries(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir.join("bin"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn builds_every_platform_from_release_server() {
    let tmp = tempfile::tempdir().unwrap();
    let probe = ShimConfig::default();
    let files: HashMap<_, _> = PLATFORMS
        .iter()
        .enumerate()
        .map(|(i, t)| release_archive(&probe, "1.2.3", i, t))
        .collect();
    let base = serve(files).await;

    let cfg = config(tmp.path(), &base);
    std::fs::write(&cfg.root_manifest, ROOT_MANIFEST).unwrap();
    // Stale output from an earlier run must disappear
    std::fs::create_dir_all(cfg.out_dir.join("stale")).unwrap();

    let builder = PackageBuilder::new(cfg.clone()).unwrap();
    let report = builder.build_all("1.2.3").await.unwrap();
    assert_eq!(report.built.len(), 6, "skipped: {:?}", report.skipped);
    assert!(!cfg.out_dir.join("stale").exists());

    for pkg in &report.built {
        assert_eq!(bin_entries(&pkg.dir), vec![pkg.target.binary_file_name("tool")]);
        assert_eq!(std::fs::read_to_string(&pkg.binary).unwrap(), "payload");

        let manifest: Value =
            serde_json::from_str(&std::fs::read_to_string(pkg.dir.join("package.json")).unwrap()).unwrap();
        assert_eq!(manifest["version"], "1.2.3");
        assert_eq!(manifest["os"][0], pkg.target.os);
        assert_eq!(manifest["cpu"][0], pkg.target.cpu);
    }

    let root: Value = serde_json::from_str(&std::fs::read_to_string(&cfg.root_manifest).unwrap()).unwrap();
    assert_eq!(root["version"], "1.2.3");
    let deps = root["optionalDependencies"].as_object().unwrap();
    assert_eq!(deps.len(), 6);
    assert!(deps.values().all(|v| v == "1.2.3"));

    // Archives are cached by name: a second run builds the same tree
    let first = std::fs::read(&cfg.root_manifest).unwrap();
    let again = builder.build_all("1.2.3").await.unwrap();
    assert_eq!(again.built.len(), 6);
    assert_eq!(std::fs::read(&cfg.root_manifest).unwrap(), first);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_release_asset_is_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let probe = ShimConfig::default();
    let absent = PlatformTarget::find("win32", "x64").unwrap();
    let files: HashMap<_, _> = PLATFORMS
        .iter()
        .enumerate()
        .filter(|(_, t)| **t != absent)
        .map(|(i, t)| release_archive(&probe, "3.0.0", i, t))
        .collect();
    let base = serve(files).await;

    let cfg = config(tmp.path(), &base);
    std::fs::write(&cfg.root_manifest, ROOT_MANIFEST).unwrap();

    let report = PackageBuilder::new(cfg.clone())
        .unwrap()
        .build_all("3.0.0")
        .await
        .unwrap();

    assert_eq!(report.built.len(), 5);
    assert!(!report.is_built(&absent));
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].target, absent);
    assert!(report.skipped[0].reason.to_string().contains("404"));
    assert!(!cfg.out_dir.join(absent.key()).exists());

    let cached = cfg.archive_cache_dir().join(cfg.archive_file_name("3.0.0", &absent));
    assert!(!cached.exists());

    let root: Value = serde_json::from_str(&std::fs::read_to_string(&cfg.root_manifest).unwrap()).unwrap();
    assert_eq!(root["version"], "3.0.0");
}

#[test]
fn pack_cli_requires_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_binshim-pack"))
        .output()
        .expect("run binshim-pack");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage: binshim-pack <version>"));
}
