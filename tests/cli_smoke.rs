mod support;

use std::path::PathBuf;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_turntable")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "turntable.exe"
            } else {
                "turntable"
            });
            p
        })
}

#[test]
fn cli_still_writes_png() {
    let dir = support::scratch_dir("cli_still");
    let model = support::write_quad_gltf(&dir);
    let out = dir.join("out.png");

    let status = std::process::Command::new(exe())
        .arg("still")
        .arg("--in")
        .arg(&model)
        .args(["--width", "64", "--height", "48", "--out"])
        .arg(&out)
        .status()
        .unwrap();

    assert!(status.success());
    let img = image::open(&out).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (64, 48));
}

#[test]
fn cli_sequence_honours_config_and_flags() {
    let dir = support::scratch_dir("cli_sequence");
    let model = support::write_quad_gltf(&dir);
    let config = dir.join("turntable.json");
    std::fs::write(
        &config,
        r#"{ "width": 48, "height": 32, "endpoint": "inclusive", "index_width": 3 }"#,
    )
    .unwrap();
    let out_dir = dir.join("frames");

    let status = std::process::Command::new(exe())
        .arg("sequence")
        .arg("--in")
        .arg(&model)
        .arg("--config")
        .arg(&config)
        .args(["--frames", "3", "--end", "180", "--axis", "x", "--out-dir"])
        .arg(&out_dir)
        .status()
        .unwrap();

    assert!(status.success());
    for i in 0..3 {
        assert!(out_dir.join(format!("frame_{i:03}.png")).is_file());
    }
    assert!(!out_dir.join("frame_003.png").exists());
}

#[test]
fn cli_reports_missing_model() {
    let dir = support::scratch_dir("cli_missing");
    let output = std::process::Command::new(exe())
        .arg("still")
        .arg("--in")
        .arg(dir.join("absent.gltf"))
        .arg("--out")
        .arg(dir.join("out.png"))
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("asset load error"), "{stderr}");
}

#[test]
fn cli_rejects_correction_angle_without_axis() {
    let dir = support::scratch_dir("cli_correction");
    let model = support::write_quad_gltf(&dir);
    let out = dir.join("out.png");

    let output = std::process::Command::new(exe())
        .arg("still")
        .arg("--in")
        .arg(&model)
        .args(["--correction-deg", "90", "--out"])
        .arg(&out)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--correction-axis"), "{stderr}");
    assert!(!out.exists());
}
