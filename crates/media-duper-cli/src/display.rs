use colored::*;
use media_duper_core::extractor::video::VideoSampler;
use media_duper_core::{DuplicatePair, MediaKind};
use std::fs;
use std::path::Path;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

pub fn format_size(bytes: u64) -> String {
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn format_duration(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds.filter(|s| s.is_finite() && *s > 0.0) else {
        return "Unknown".to_string();
    };
    let total = seconds as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// The two sides of a duplicate pair, with size and (for video) running time.
pub fn print_pair(pair: &DuplicatePair, prober: &VideoSampler) {
    println!();
    println!(
        "{} {}",
        "🔍 Duplicate detected".yellow(),
        format!("(distance {:.2})", pair.distance).dimmed()
    );
    print_side(1, &pair.first, pair.first_kind, prober);
    println!();
    print_side(2, &pair.second, pair.second_kind, prober);
    println!();
}

fn print_side(index: usize, path: &Path, kind: MediaKind, prober: &VideoSampler) {
    let size = fs::metadata(path)
        .map(|m| format_size(m.len()))
        .unwrap_or_else(|_| "Unknown size".to_string());

    println!("{}", format!("[{}] {}", index, file_name(path)).cyan());
    println!("   📁 Path: {}", path.display());
    println!("   📊 Size: {}", size);
    if kind == MediaKind::Video {
        println!(
            "   ⏱️ Duration: {}",
            format_duration(prober.probe_duration(path))
        );
    }
}
