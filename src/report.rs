//! Console output for the person running the tool.

use colored::Colorize;

use crate::acquire::MIB;
use crate::config::DEFAULT_ASSETS_DIR;

const RULE: &str = "==================================================";

pub fn banner(title: &str) {
    println!("{}", title.bold());
    println!("{RULE}");
}

pub fn step(msg: &str) {
    println!("{} {}", "->".cyan(), msg);
}

pub fn ok(msg: &str) {
    println!("{} {}", "ok".green().bold(), msg);
}

pub fn warn(msg: &str) {
    println!("{} {}", "!!".yellow().bold(), msg);
}

pub fn fail(msg: &str) {
    eprintln!("{} {}", "error:".red().bold(), msg);
}

pub fn megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / MIB as f64)
}

pub fn next_steps() {
    println!();
    println!("{RULE}");
    println!("{}", "Model is ready.".green().bold());
    println!("Next steps:");
    println!("  1. Rebuild the Android project");
    println!("  2. Run the app and exercise object detection");
    println!("  3. Check the logs to confirm the model loaded");
}

pub fn export_hints() {
    println!();
    println!("{RULE}");
    println!("Alternatives:");
    println!("  1. Download manually from https://github.com/ultralytics/assets");
    println!("  2. Check your network connection");
    println!("  3. Try `yolo-stage download` for a pre-converted TFLite file");
}

pub fn download_hints() {
    println!();
    println!("{RULE}");
    println!("Manual download:");
    println!("  1. Visit https://github.com/ultralytics/assets/releases");
    println!("  2. Download yolov8n.tflite (about 4-6 MB)");
    println!("  3. Place it in {DEFAULT_ASSETS_DIR}/");
}
