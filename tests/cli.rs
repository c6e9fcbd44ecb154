use std::fs;
use std::path::Path;
use std::process::Command;

fn yolo_stage(workdir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_yolo-stage"));
    cmd.arg("--workdir").arg(workdir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn download_with_unreachable_sources_exits_1() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let assets = tmp.path().join("app/src/main/assets");
    fs::create_dir_all(&assets).unwrap();

    let status = yolo_stage(tmp.path())
        .args(["download", "--timeout-secs", "5"])
        .args(["--url", "http://127.0.0.1:9/v8.3.0/yolov8n.tflite"])
        .args(["--url", "http://127.0.0.1:9/v8.2.0/yolov8n.tflite"])
        .args(["--url", "http://127.0.0.1:9/v8.1.0/yolov8n.tflite"])
        .env("NO_PROXY", "127.0.0.1")
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
    assert!(!assets.join("yolov8n.tflite").exists());
    assert!(!assets.join("yolov8n.tflite.part").exists());
}

#[test]
fn download_without_assets_dir_exits_1() {
    let tmp = tempfile::tempdir().expect("tempdir");

    let output = yolo_stage(tmp.path())
        .args(["download", "--url", "http://127.0.0.1:9/yolov8n.tflite"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("assets directory does not exist"), "{stderr}");
}

#[test]
fn bad_config_file_exits_1() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cfg = tmp.path().join("yolo-stage.toml");
    fs::write(&cfg, "imgsz = \"large\"").unwrap();

    let status = yolo_stage(tmp.path())
        .arg("--config")
        .arg(&cfg)
        .arg("download")
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
}

#[cfg(unix)]
mod with_fake_python {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Ultralytics already installed; any script writes a 2 MiB ONNX file
    /// into the cwd.
    const INSTALLED: &str = "case \"$2\" in\n\
         \"import ultralytics\") exit 0 ;;\n\
         *) head -c 2097152 /dev/zero > yolov8n.onnx ;;\n\
         esac\n";

    /// Imports fail until `-m pip` has run once.
    const INSTALLABLE: &str = "dir=$(dirname \"$0\")\n\
         if [ \"$1\" = \"-m\" ]; then touch \"$dir/installed\"; exit 0; fi\n\
         case \"$2\" in\n\
         \"import ultralytics\") [ -f \"$dir/installed\" ] ;;\n\
         *) head -c 2097152 /dev/zero > yolov8n.onnx ;;\n\
         esac\n";

    /// Imports fail and pip cannot install anything.
    const UNINSTALLABLE: &str = "exit 1\n";

    /// Installed, but the export script itself fails.
    const BROKEN_EXPORT: &str = "case \"$2\" in\n\
         \"import ultralytics\") exit 0 ;;\n\
         *) exit 1 ;;\n\
         esac\n";

    /// Installed, but the export comes out at 512 KiB.
    const TINY_EXPORT: &str = "case \"$2\" in\n\
         \"import ultralytics\") exit 0 ;;\n\
         *) head -c 524288 /dev/zero > yolov8n.onnx ;;\n\
         esac\n";

    fn fake_python(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("fake-python");
        fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn export(workdir: &Path, python: &Path) -> std::process::Output {
        yolo_stage(workdir)
            .arg("export")
            .arg("--python")
            .arg(python)
            .output()
            .unwrap()
    }

    fn assets_in(dir: &Path) -> std::path::PathBuf {
        let assets = dir.join("app/src/main/assets");
        fs::create_dir_all(&assets).unwrap();
        assets
    }

    #[test]
    fn export_stages_into_assets() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let bin = tempfile::tempdir().expect("tempdir");
        let assets = assets_in(tmp.path());
        fs::write(assets.join("yolov8n.onnx"), b"old").unwrap();
        let python = fake_python(bin.path(), INSTALLED);

        let output = export(tmp.path(), &python);

        assert_eq!(output.status.code(), Some(0));
        assert_eq!(fs::metadata(assets.join("yolov8n.onnx")).unwrap().len(), 2 * 1024 * 1024);
        assert_eq!(fs::read(assets.join("yolov8n.onnx.backup")).unwrap(), b"old");
    }

    #[test]
    fn missing_toolkit_is_installed_then_used() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let bin = tempfile::tempdir().expect("tempdir");
        let assets = assets_in(tmp.path());
        let python = fake_python(bin.path(), INSTALLABLE);

        let output = export(tmp.path(), &python);

        assert_eq!(output.status.code(), Some(0));
        assert!(bin.path().join("installed").exists());
        assert_eq!(fs::metadata(assets.join("yolov8n.onnx")).unwrap().len(), 2 * 1024 * 1024);
    }

    #[test]
    fn failed_install_exits_1() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let bin = tempfile::tempdir().expect("tempdir");
        let assets = assets_in(tmp.path());
        let python = fake_python(bin.path(), UNINSTALLABLE);

        let output = export(tmp.path(), &python);

        assert_eq!(output.status.code(), Some(1));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("could not be installed"), "{stderr}");
        assert!(!assets.join("yolov8n.onnx").exists());
    }

    #[test]
    fn failing_export_script_exits_1() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let bin = tempfile::tempdir().expect("tempdir");
        let assets = assets_in(tmp.path());
        let python = fake_python(bin.path(), BROKEN_EXPORT);

        let output = export(tmp.path(), &python);

        assert_eq!(output.status.code(), Some(1));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("export failed"), "{stderr}");
        assert!(!assets.join("yolov8n.onnx").exists());
    }

    #[test]
    fn undersized_export_is_not_reported_as_success() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let bin = tempfile::tempdir().expect("tempdir");
        let assets = assets_in(tmp.path());
        let python = fake_python(bin.path(), TINY_EXPORT);

        let output = export(tmp.path(), &python);

        assert_eq!(output.status.code(), Some(1));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("too small (0.50 MB)"), "{stdout}");
        assert!(!stdout.contains("exported "), "{stdout}");
        assert!(!assets.join("yolov8n.onnx").exists());
    }

    #[test]
    fn export_without_assets_dir_exits_1() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let bin = tempfile::tempdir().expect("tempdir");
        let python = fake_python(bin.path(), INSTALLED);

        let output = export(tmp.path(), &python);

        assert_eq!(output.status.code(), Some(1));
        // the export ran; staging is what failed
        assert!(tmp.path().join("yolov8n.onnx").exists());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("assets directory does not exist"), "{stderr}");
        assert!(!stderr.contains("panicked"), "{stderr}");
    }
}
